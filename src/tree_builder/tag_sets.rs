//! Named sets of tags used by scope predicates and the "generate implied end
//! tags" algorithm.
//!
//! Each set is a `Fn(ExpandedName) -> bool` built from the Standard's own
//! enumeration of that set.

use crate::interface::ExpandedName;
use crate::{local_name, ns};

/// Build a `Fn(ExpandedName) -> bool` matching a fixed list of HTML-namespace
/// local names.
macro_rules! html_tag_set {
    ($($name:expr),+ $(,)?) => {
        |name: ExpandedName| {
            name.ns == &ns!(html) && matches!(&**name.local, $($name)|+)
        }
    };
}

/// https://html.spec.whatwg.org/multipage/parsing.html#special
pub fn special_category(name: ExpandedName) -> bool {
    if name.ns == &ns!(html) {
        matches!(
            &**name.local,
            "address" | "applet" | "area" | "article" | "aside" | "base" | "basefont"
                | "bgsound" | "blockquote" | "body" | "br" | "button" | "caption" | "center"
                | "col" | "colgroup" | "dd" | "details" | "dir" | "div" | "dl" | "dt"
                | "embed" | "fieldset" | "figcaption" | "figure" | "footer" | "form"
                | "frame" | "frameset" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "head"
                | "header" | "hgroup" | "hr" | "html" | "iframe" | "img" | "input"
                | "keygen" | "li" | "link" | "listing" | "main" | "marquee" | "menu"
                | "meta" | "nav" | "noembed" | "noframes" | "noscript" | "object" | "ol"
                | "p" | "param" | "plaintext" | "pre" | "script" | "section" | "select"
                | "source" | "style" | "summary" | "table" | "tbody" | "td" | "template"
                | "textarea" | "tfoot" | "th" | "thead" | "title" | "tr" | "track" | "ul"
                | "wbr" | "xmp"
        )
    } else if name.ns == &ns!(mathml) {
        matches!(&**name.local, "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml")
    } else if name.ns == &ns!(svg) {
        matches!(&**name.local, "foreignObject" | "desc" | "title")
    } else {
        false
    }
}

/// The base scope set shared by `default_scope`, `list_item_scope`, etc.,
/// per https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-the-specific-scope
pub fn default_scope(name: ExpandedName) -> bool {
    if name.ns == &ns!(html) {
        matches!(
            &**name.local,
            "applet" | "caption" | "html" | "table" | "td" | "th" | "marquee" | "object"
                | "template"
        )
    } else if name.ns == &ns!(mathml) {
        matches!(&**name.local, "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml")
    } else if name.ns == &ns!(svg) {
        matches!(&**name.local, "foreignObject" | "desc" | "title")
    } else {
        false
    }
}

pub fn list_item_scope(name: ExpandedName) -> bool {
    default_scope(name) || html_tag_set!("ol", "ul")(name)
}

pub fn button_scope(name: ExpandedName) -> bool {
    default_scope(name) || html_tag_set!("button")(name)
}

pub fn table_scope(name: ExpandedName) -> bool {
    name.ns == &ns!(html) && matches!(&**name.local, "html" | "table" | "template")
}

pub fn select_scope(name: ExpandedName) -> bool {
    // Select scope is everything except optgroup/option, applied as an
    // exclusion rather than a normal scope list.
    !(name.ns == &ns!(html) && matches!(&**name.local, "optgroup" | "option"))
}

/// https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags
pub fn implied_end_tags(name: ExpandedName) -> bool {
    html_tag_set!(
        "dd", "dt", "li", "option", "optgroup", "p", "rb", "rp", "rt", "rtc"
    )(name)
}

/// The stronger set used when generating implied end tags "thoroughly",
/// i.e. before inserting a `<table>`-family element.
pub fn implied_end_tags_thorough(name: ExpandedName) -> bool {
    implied_end_tags(name) || html_tag_set!("caption", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr")(name)
}

pub fn heading_tag(name: ExpandedName) -> bool {
    html_tag_set!("h1", "h2", "h3", "h4", "h5", "h6")(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::LocalName;

    #[test]
    fn special_category_matches_div_not_span() {
        let div_name = local_name!("div");
        let span_name = local_name!("span");
        let html_ns = ns!(html);
        let div = ExpandedName { ns: &html_ns, local: &div_name };
        let span = ExpandedName { ns: &html_ns, local: &span_name };
        assert!(special_category(div));
        assert!(!special_category(span));
        let _: LocalName = div_name;
    }

    #[test]
    fn table_scope_stops_at_table() {
        let table_name = local_name!("table");
        let html_ns = ns!(html);
        let table = ExpandedName { ns: &html_ns, local: &table_name };
        assert!(table_scope(table));
    }
}
