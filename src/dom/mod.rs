//! An arena-backed DOM: nodes live in one `Vec`, addressed by a stable
//! `NodeId` index.
//!
//! `NodeId` equality gives O(1) "is this the same node" checks for the
//! adoption agency algorithm, and the tree can be walked or serialized
//! without reference-counting overhead.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use log::warn;
use tendril::StrTendril;

use crate::interface::{Attribute, ExpandedName, LocalName, Namespace, QualName, QuirksMode};
use crate::tokenizer::Tag;

/// An index into a [`Dom`]'s node arena. Cheap to copy and compare; stable
/// for the lifetime of the `Dom` (nodes are never moved, only detached).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(usize);

impl NodeId {
    /// The node's position in the arena, for callers (e.g. a serializer)
    /// that want a stable, orderable key without going through `Dom`.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub enum NodeData {
    Document,
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        /// `<template>`'s content document fragment, created alongside the
        /// element itself.
        template_contents: Option<NodeId>,
        mathml_annotation_xml_integration_point: bool,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
}

#[derive(Debug)]
pub struct Node {
    parent: Cell<Option<NodeId>>,
    children: RefCell<Vec<NodeId>>,
    pub data: NodeData,
}

/// The document itself: the arena plus the handful of document-wide facts
/// (quirks mode, accumulated parse errors) the Standard tracks outside any
/// single node.
pub struct Dom {
    nodes: RefCell<Vec<Node>>,
    document: NodeId,
    pub errors: RefCell<Vec<Cow<'static, str>>>,
    pub quirks_mode: Cell<QuirksMode>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let document_node = Node {
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            data: NodeData::Document,
        };
        Dom {
            nodes: RefCell::new(vec![document_node]),
            document: NodeId(0),
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
        }
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    fn push_node(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(Node {
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            data,
        });
        id
    }

    /// Borrow the full node arena, for serialization walks that need to
    /// inspect many nodes without repeated indexed borrows.
    pub fn nodes(&self) -> std::cell::Ref<'_, Vec<Node>> {
        self.nodes.borrow()
    }

    fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.nodes.borrow()[id.0])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.with_node(id, |n| n.parent.get())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.with_node(id, |n| n.children.borrow().clone())
    }

    pub fn elem_name(&self, id: NodeId) -> (Namespace, LocalName) {
        self.with_node(id, |n| match &n.data {
            NodeData::Element { name, .. } => (name.ns.clone(), name.local.clone()),
            _ => (Namespace::from(""), LocalName::from("")),
        })
    }

    pub fn expanded_name(&self, id: NodeId) -> ExpandedNameOwned {
        let (ns, local) = self.elem_name(id);
        ExpandedNameOwned { ns, local }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.with_node(id, |n| matches!(n.data, NodeData::Element { .. }))
    }

    pub fn element_attrs(&self, id: NodeId) -> Vec<Attribute> {
        self.with_node(id, |n| match &n.data {
            NodeData::Element { attrs, .. } => attrs.borrow().clone(),
            _ => Vec::new(),
        })
    }

    pub fn template_contents(&self, id: NodeId) -> Option<NodeId> {
        self.with_node(id, |n| match &n.data {
            NodeData::Element { template_contents, .. } => *template_contents,
            _ => None,
        })
    }

    pub fn is_mathml_annotation_xml_integration_point(&self, id: NodeId) -> bool {
        self.with_node(id, |n| match &n.data {
            NodeData::Element {
                mathml_annotation_xml_integration_point,
                ..
            } => *mathml_annotation_xml_integration_point,
            _ => false,
        })
    }

    pub fn create_element(&self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let is_template = name.ns == crate::ns!(html) && &*name.local == "template";
        let is_annotation_xml = name.ns == crate::ns!(mathml) && &*name.local == "annotation-xml";
        let integration_point = is_annotation_xml
            && attrs.iter().any(|a| {
                &*a.name.local == "encoding"
                    && (a.value.eq_ignore_ascii_case("text/html")
                        || a.value.eq_ignore_ascii_case("application/xhtml+xml"))
            });
        let template_contents = if is_template { Some(self.push_node(NodeData::Document)) } else { None };
        self.push_node(NodeData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents,
            mathml_annotation_xml_integration_point: integration_point,
        })
    }

    pub fn create_comment(&self, text: StrTendril) -> NodeId {
        self.push_node(NodeData::Comment { contents: text })
    }

    pub fn create_doctype(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) -> NodeId {
        self.push_node(NodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    fn detach_inner(&self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.with_node(parent, |p| {
                p.children.borrow_mut().retain(|&c| c != id);
            });
            self.with_node(id, |n| n.parent.set(None));
        }
    }

    pub fn detach(&self, id: NodeId) {
        self.detach_inner(id);
    }

    /// Append `child` as the last child of `parent`, coalescing with a
    /// trailing text node when both are text.
    pub fn append(&self, parent: NodeId, child: NodeId) {
        self.detach_inner(child);
        let coalesced = self.with_node(parent, |p| {
            let children = p.children.borrow();
            match (children.last(), self.with_node(child, |c| matches!(c.data, NodeData::Text { .. }))) {
                (Some(&last), true) => self.with_node(last, |l| matches!(l.data, NodeData::Text { .. })),
                _ => false,
            }
        });
        if coalesced {
            let last = self.with_node(parent, |p| *p.children.borrow().last().unwrap());
            let text = self.with_node(child, |c| match &c.data {
                NodeData::Text { contents } => contents.borrow().clone(),
                _ => unreachable!(),
            });
            self.with_node(last, |l| match &l.data {
                NodeData::Text { contents } => contents.borrow_mut().push_tendril(&text),
                _ => unreachable!(),
            });
            return;
        }
        self.with_node(child, |c| c.parent.set(Some(parent)));
        self.with_node(parent, |p| p.children.borrow_mut().push(child));
    }

    /// Insert `child` immediately before `sibling`, which must currently be
    /// a child of `sibling`'s parent.
    pub fn append_before_sibling(&self, sibling: NodeId, child: NodeId) {
        self.detach_inner(child);
        let parent = self.parent(sibling).expect("append_before_sibling: sibling has no parent");
        let coalesced = self.with_node(parent, |p| {
            let children = p.children.borrow();
            let idx = children.iter().position(|&c| c == sibling).unwrap();
            let is_text = self.with_node(child, |c| matches!(c.data, NodeData::Text { .. }));
            if idx == 0 || !is_text {
                return None;
            }
            let prev = children[idx - 1];
            if self.with_node(prev, |p| matches!(p.data, NodeData::Text { .. })) {
                Some(prev)
            } else {
                None
            }
        });
        if let Some(prev) = coalesced {
            let text = self.with_node(child, |c| match &c.data {
                NodeData::Text { contents } => contents.borrow().clone(),
                _ => unreachable!(),
            });
            self.with_node(prev, |p| match &p.data {
                NodeData::Text { contents } => contents.borrow_mut().push_tendril(&text),
                _ => unreachable!(),
            });
            return;
        }
        self.with_node(child, |c| c.parent.set(Some(parent)));
        self.with_node(parent, |p| {
            let mut children = p.children.borrow_mut();
            let idx = children.iter().position(|&c| c == sibling).unwrap();
            children.insert(idx, child);
        });
    }

    pub fn append_text(&self, parent: NodeId, text: StrTendril) {
        let node = self.push_node(NodeData::Text {
            contents: RefCell::new(text),
        });
        self.append(parent, node);
    }

    pub fn append_text_before_sibling(&self, sibling: NodeId, text: StrTendril) {
        let node = self.push_node(NodeData::Text {
            contents: RefCell::new(text),
        });
        self.append_before_sibling(sibling, node);
    }

    pub fn add_attrs_if_missing(&self, id: NodeId, attrs: Vec<Attribute>) {
        self.with_node(id, |n| {
            if let NodeData::Element { attrs: existing, .. } = &n.data {
                let mut existing = existing.borrow_mut();
                for attr in attrs {
                    if !existing.iter().any(|a| a.name == attr.name) {
                        existing.push(attr);
                    }
                }
            }
        });
    }

    /// Move all of `node`'s children to become children of `new_parent`,
    /// used when closing a misnested `<table>` and again by the adoption
    /// agency algorithm.
    pub fn reparent_children(&self, node: NodeId, new_parent: NodeId) {
        let children = self.children(node);
        for child in children {
            self.append(new_parent, child);
        }
    }

    pub fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    pub fn parse_error(&self, msg: Cow<'static, str>) {
        warn!("parse error: {}", msg);
        self.errors.borrow_mut().push(msg);
    }
}

/// An owned `ExpandedName`, since borrowing straight out of the arena would
/// tie the borrow to a `Ref` guard the caller would have to keep alive.
pub struct ExpandedNameOwned {
    pub ns: Namespace,
    pub local: LocalName,
}

impl ExpandedNameOwned {
    pub fn as_expanded(&self) -> ExpandedName<'_> {
        ExpandedName {
            ns: &self.ns,
            local: &self.local,
        }
    }
}

/// Build the `(name, attrs)` pair a freshly-seen start [`Tag`] needs turned
/// into an element, applying the HTML-namespace default.
pub fn qualname_from_tag(tag: &Tag) -> (QualName, Vec<Attribute>) {
    (QualName::html(tag.name.local.clone()), tag.attrs.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_name;

    #[test]
    fn append_and_detach() {
        let dom = Dom::new();
        let html = dom.create_element(QualName::html(local_name!("html")), Vec::new());
        dom.append(dom.document(), html);
        assert_eq!(dom.children(dom.document()), vec![html]);
        dom.detach(html);
        assert!(dom.children(dom.document()).is_empty());
    }

    #[test]
    fn adjacent_text_coalesces() {
        let dom = Dom::new();
        let body = dom.create_element(QualName::html(local_name!("body")), Vec::new());
        dom.append(dom.document(), body);
        dom.append_text(body, StrTendril::from_slice("hello "));
        dom.append_text(body, StrTendril::from_slice("world"));
        let children = dom.children(body);
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn template_gets_content_document() {
        let dom = Dom::new();
        let template = dom.create_element(QualName::html(local_name!("template")), Vec::new());
        assert!(dom.template_contents(template).is_some());
    }
}
