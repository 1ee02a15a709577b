//! Names, namespaces and attributes shared by the tokenizer and tree builder.
//!
//! Local names, namespaces and prefixes are interned via
//! `string_cache::DefaultAtom` directly, without code generation, since the
//! full identifier set here is small and fixed.

use std::fmt;
use string_cache::DefaultAtom;

/// Interned local (tag or attribute) name.
pub type LocalName = DefaultAtom;
/// Interned namespace URI.
pub type Namespace = DefaultAtom;
/// Interned namespace prefix.
pub type Prefix = DefaultAtom;

/// Build a `LocalName` from a literal.
#[macro_export]
macro_rules! local_name {
    ($s:expr) => {
        $crate::interface::LocalName::from($s)
    };
}

/// Build a `Prefix` from a literal.
#[macro_export]
macro_rules! namespace_prefix {
    ($s:expr) => {
        $crate::interface::Prefix::from($s)
    };
}

/// Namespace URI constants.
#[macro_export]
macro_rules! ns {
    () => {
        $crate::interface::Namespace::from("")
    };
    (html) => {
        $crate::interface::Namespace::from("http://www.w3.org/1999/xhtml")
    };
    (xml) => {
        $crate::interface::Namespace::from("http://www.w3.org/XML/1998/namespace")
    };
    (xmlns) => {
        $crate::interface::Namespace::from("http://www.w3.org/2000/xmlns/")
    };
    (xlink) => {
        $crate::interface::Namespace::from("http://www.w3.org/1999/xlink")
    };
    (svg) => {
        $crate::interface::Namespace::from("http://www.w3.org/2000/svg")
    };
    (mathml) => {
        $crate::interface::Namespace::from("http://www.w3.org/1998/Math/MathML")
    };
}

/// Build an `ExpandedName` from a namespace identifier and a local-name literal.
#[macro_export]
macro_rules! expanded_name {
    ("", $local:expr) => {
        $crate::interface::ExpandedName {
            ns: &ns!(),
            local: &local_name!($local),
        }
    };
    ($ns:ident $local:expr) => {
        $crate::interface::ExpandedName {
            ns: &ns!($ns),
            local: &local_name!($local),
        }
    };
}

/// https://www.w3.org/TR/REC-xml-names/#dt-expname
#[derive(Copy, Clone, Eq, Hash)]
pub struct ExpandedName<'a> {
    pub ns: &'a Namespace,
    pub local: &'a LocalName,
}

impl<'a, 'b> PartialEq<ExpandedName<'a>> for ExpandedName<'b> {
    fn eq(&self, other: &ExpandedName<'a>) -> bool {
        self.ns == other.ns && self.local == other.local
    }
}

impl<'a> fmt::Debug for ExpandedName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ns.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}:{}", self.ns, self.local)
        }
    }
}

/// A fully qualified element or attribute name.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct QualName {
    pub prefix: Option<Prefix>,
    pub ns: Namespace,
    pub local: LocalName,
}

impl QualName {
    #[inline]
    pub fn new(prefix: Option<Prefix>, ns: Namespace, local: LocalName) -> QualName {
        QualName { prefix, ns, local }
    }

    /// An HTML-namespace name with no prefix; the overwhelming common case.
    #[inline]
    pub fn html(local: LocalName) -> QualName {
        QualName::new(None, ns!(html), local)
    }

    #[inline]
    pub fn expanded(&self) -> ExpandedName<'_> {
        ExpandedName {
            ns: &self.ns,
            local: &self.local,
        }
    }
}

/// A tag attribute.
///
/// The namespace on the attribute name is almost always `ns!()`; the tree
/// builder adjusts a handful of attribute names inside foreign (MathML/SVG)
/// content.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct Attribute {
    pub name: QualName,
    pub value: tendril::StrTendril,
}

/// Quirks mode of a `Document`, as determined from its DOCTYPE (or lack of one).
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    NoQuirks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_macro() {
        assert_eq!(ns!(), Namespace::from(""));
        assert_eq!(ns!(html), Namespace::from("http://www.w3.org/1999/xhtml"));
        assert_eq!(ns!(xml), Namespace::from("http://www.w3.org/XML/1998/namespace"));
        assert_eq!(ns!(xmlns), Namespace::from("http://www.w3.org/2000/xmlns/"));
        assert_eq!(ns!(xlink), Namespace::from("http://www.w3.org/1999/xlink"));
        assert_eq!(ns!(svg), Namespace::from("http://www.w3.org/2000/svg"));
        assert_eq!(ns!(mathml), Namespace::from("http://www.w3.org/1998/Math/MathML"));
    }

    #[test]
    fn expanded_name_eq() {
        let q = QualName::html(local_name!("div"));
        assert_eq!(q.expanded(), expanded_name!(html "div"));
    }
}
