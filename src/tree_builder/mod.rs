//! Tree construction: the insertion-mode state machine that turns a token
//! stream into a [`Dom`].
//!
//! The builder holds its state behind `Cell`/`RefCell` fields and exposes
//! `&self` methods so it can be driven from the tokenizer's token-sink
//! callback; a `step` method dispatches on the current `InsertionMode`.
//! It is concrete over one [`Dom`] rather than generic over a document
//! implementation, since this crate has only the one. `InCaption`,
//! `InColumnGroup`, `InSelect` and its table variant, and
//! `InFrameset`/`AfterFrameset` get the minimal handling the Standard
//! defines for them but are exercised less thoroughly by this crate's tests
//! than `InBody`/`InTable`.

pub mod stack;
pub mod tag_sets;
pub mod types;

use std::cell::{Cell, RefCell};

use log::debug;
use tendril::StrTendril;

use crate::dom::{qualname_from_tag, Dom, NodeId};
use crate::interface::{ExpandedName, LocalName, QualName, QuirksMode};
use crate::tokenizer::{RawKind, Tag, TagKind, Token as TokenizerToken, TokenSink, TokenSinkResult};
use crate::{local_name, ns};

use self::stack::ElementStack;
use self::tag_sets::*;
use self::types::{FormatEntry, InsertionMode, Token};

/// Tree-builder configuration.
#[derive(Clone, Default)]
pub struct TreeBuilderOpts {
    /// Seed a `<head>`/`<body>` pair and start in `InBody`, as when parsing
    /// an `iframe srcdoc` document.
    pub iframe_srcdoc: bool,
    /// Whether `<noscript>` content is parsed as raw text (scripting
    /// enabled) or as ordinary markup (scripting disabled).
    pub scripting_enabled: bool,
    /// Drop DOCTYPE tokens instead of creating a doctype node.
    pub drop_doctype: bool,
}

/// The tree builder. Implements [`TokenSink`] so it plugs directly into a
/// [`Tokenizer`](crate::tokenizer::Tokenizer) as its sink.
pub struct TreeBuilder {
    opts: TreeBuilderOpts,
    pub dom: Dom,

    mode: Cell<InsertionMode>,
    orig_mode: Cell<Option<InsertionMode>>,
    template_modes: RefCell<Vec<InsertionMode>>,

    open_elems: RefCell<ElementStack<NodeId>>,
    active_formatting: RefCell<Vec<FormatEntry<NodeId>>>,

    head_elem: Cell<Option<NodeId>>,
    form_elem: Cell<Option<NodeId>>,
    frameset_ok: Cell<bool>,

    /// Pending character tokens in `InTableText`, which must be flushed as
    /// a unit once it's known whether they're all whitespace.
    pending_table_text: RefCell<StrTendril>,

    /// Set only while reprocessing a token "using the rules for the in body
    /// insertion mode" from within a table-family mode: the table-structure
    /// insertions (`<caption>`, `<colgroup>`, `<tbody>`, `<tr>`, ...) share
    /// `insert_element`/`insert_text` but must never be foster parented, so
    /// those call sites leave this false.
    foster_parenting: Cell<bool>,

    /// Set once a real (non-synthetic) `<html>`/`<head>`/`<body>` or EOF has
    /// been processed so `end()` knows there's nothing further to flush.
    done: Cell<bool>,
}

impl TreeBuilder {
    pub fn new(opts: TreeBuilderOpts) -> Self {
        let dom = Dom::new();
        TreeBuilder {
            opts,
            dom,
            mode: Cell::new(InsertionMode::Initial),
            orig_mode: Cell::new(None),
            template_modes: RefCell::new(Vec::new()),
            open_elems: RefCell::new(ElementStack::new()),
            active_formatting: RefCell::new(Vec::new()),
            head_elem: Cell::new(None),
            form_elem: Cell::new(None),
            frameset_ok: Cell::new(true),
            pending_table_text: RefCell::new(StrTendril::new()),
            foster_parenting: Cell::new(false),
            done: Cell::new(false),
        }
    }

    pub fn into_dom(self) -> Dom {
        self.dom
    }

    /// Prime the builder for fragment parsing: push a synthetic `<html>`
    /// root and `context` onto the open-elements stack, append `context`
    /// under that root so insertion has somewhere coherent to target, and
    /// reset the insertion mode as if `context` were the bottommost real
    /// element in a full document. The caller is responsible for choosing
    /// the tokenizer's initial state (RCDATA/RAWTEXT/etc.) to match
    /// `context`'s tag name; this only sets up tree-side state.
    pub fn seed_fragment_parsing(&self, context: NodeId) {
        let html_root = self.dom.create_element(QualName::html(local_name!("html")), Vec::new());
        self.dom.append(self.dom.document(), html_root);
        self.push_open(html_root);

        self.dom.append(html_root, context);
        self.push_open(context);

        if self.node_named(context, "template") {
            self.template_modes.borrow_mut().push(InsertionMode::InTemplate);
        }
        if self.node_named(context, "form") {
            self.form_elem.set(Some(context));
        }

        self.reset_insertion_mode();
    }

    // ---- small helpers over the open-elements stack ------------------------

    fn name_of(&self, id: &NodeId) -> (crate::interface::Namespace, LocalName) {
        self.dom.elem_name(*id)
    }

    fn current_node(&self) -> Option<NodeId> {
        self.open_elems.borrow().top().copied()
    }

    fn node_named(&self, id: NodeId, local: &str) -> bool {
        let (ns, name) = self.dom.elem_name(id);
        ns == crate::ns!(html) && &*name == local
    }

    fn current_node_named(&self, local: &str) -> bool {
        self.current_node().map(|id| self.node_named(id, local)).unwrap_or(false)
    }

    fn push_open(&self, id: NodeId) {
        self.open_elems.borrow_mut().push(id);
    }

    fn insert_element(&self, tag: &Tag) -> NodeId {
        let (name, attrs) = qualname_from_tag(tag);
        let id = self.dom.create_element(name, attrs);
        match self.foster_parent_target() {
            Some((_, _, Some(sibling))) => self.dom.append_before_sibling(sibling, id),
            Some((_, parent, None)) => self.dom.append(parent, id),
            None => {
                let parent = self.current_node().unwrap_or_else(|| self.dom.document());
                self.dom.append(parent, id);
            }
        }
        self.push_open(id);
        id
    }

    fn insert_element_for_doc(&self, name: &str) -> NodeId {
        let id = self.dom.create_element(QualName::html(LocalName::from(name)), Vec::new());
        let parent = self.current_node().unwrap_or_else(|| self.dom.document());
        self.dom.append(parent, id);
        self.push_open(id);
        id
    }

    fn insert_text(&self, text: StrTendril) {
        if text.is_empty() {
            return;
        }
        match self.foster_parent_target() {
            Some((_, _, Some(sibling))) => {
                self.dom.append_text_before_sibling(sibling, text);
            }
            Some((_, parent, None)) => self.dom.append_text(parent, text),
            None => {
                let parent = self.current_node().unwrap_or_else(|| self.dom.document());
                self.dom.append_text(parent, text);
            }
        }
    }

    fn insert_comment(&self, text: StrTendril) {
        let id = self.dom.create_comment(text);
        let parent = self.current_node().unwrap_or_else(|| self.dom.document());
        self.dom.append(parent, id);
    }

    /// Foster parenting: when a table is the current node and we're about
    /// to insert something that isn't valid table content, redirect the
    /// insertion to just before the table, in the table's own parent.
    /// https://html.spec.whatwg.org/multipage/parsing.html#foster-parenting
    fn foster_parent_target(&self) -> Option<(NodeId, NodeId, Option<NodeId>)> {
        // Foster parenting is never ambient: it only applies to the handful
        // of call sites that explicitly reprocess a token "using the rules
        // for the in body insertion mode" (see `foster_and_reprocess_in_body`),
        // never to the table-structure insertions (`<caption>`, `<tbody>`,
        // `<tr>`, ...) that happen to run with the same current node and mode.
        if !self.foster_parenting.get() {
            return None;
        }
        // And even then, only when the node we'd otherwise insert into is
        // itself a table/tbody/tfoot/thead/tr: once something else (say, a
        // misnested `<b>`, or a `<td>`) is the current node, ordinary
        // insertion resumes even while nominally still "inside" the table.
        let current = self.current_node()?;
        let (current_ns, current_local) = self.dom.elem_name(current);
        if current_ns != ns!(html) || !matches!(&*current_local, "table" | "tbody" | "tfoot" | "thead" | "tr") {
            return None;
        }
        let stack = self.open_elems.borrow();
        let table_idx = stack.position_from_top(|id| self.name_of(id), |en| &*en.local == "table" && en.ns == &ns!(html))?;
        let table = *stack.iter_from_top().nth(stack.len() - 1 - table_idx).unwrap();
        match self.dom.parent(table) {
            Some(parent) => Some((table, parent, Some(table))),
            None => {
                // No parent (table is the root of a fragment): fall back to
                // appending inside the table itself, which is wrong per the
                // Standard but only reachable in fragment-parsing contexts
                // this core does not fully support.
                Some((table, table, None))
            }
        }
    }

    fn close_p_element_if_in_button_scope(&self) {
        if self.in_scope(button_scope, |en| &*en.local == "p" && en.ns == &ns!(html)) {
            self.close_p_element();
        }
    }

    fn in_scope<S>(&self, scope: S, is_target: impl Fn(ExpandedName) -> bool) -> bool
    where
        S: Fn(ExpandedName) -> bool,
    {
        self.open_elems.borrow().has_in_scope(|id| self.name_of(id), is_target, scope)
    }

    fn generate_implied_end_tags(&self, except: Option<&str>) {
        loop {
            let Some(top) = self.current_node() else { break };
            let (ns, local) = self.dom.elem_name(top);
            if ns != crate::ns!(html) {
                break;
            }
            if Some(&*local) == except {
                break;
            }
            let en = ExpandedName { ns: &ns, local: &local };
            if !implied_end_tags(en) {
                break;
            }
            self.open_elems.borrow_mut().pop();
        }
    }

    fn close_p_element(&self) {
        self.generate_implied_end_tags(Some("p"));
        if !self.current_node_named("p") {
            self.dom.parse_error("expected </p> to close an open p element".into());
        }
        self.pop_until_named("p");
    }

    fn pop_until_named(&self, local: &str) {
        loop {
            let popped = self.open_elems.borrow_mut().pop();
            match popped {
                Some(id) if self.node_named(id, local) => break,
                Some(_) => continue,
                None => break,
            }
        }
    }

    fn add_formatting_entry(&self, id: NodeId, tag: Tag) {
        // Noah's Ark clause: if three matching entries already exist since
        // the last marker, drop the earliest.
        let mut list = self.active_formatting.borrow_mut();
        let mut matches = 0;
        let mut earliest = None;
        for (i, entry) in list.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element(_, t) if t.equiv_modulo_attr_order(&tag) => {
                    matches += 1;
                    earliest = Some(i);
                }
                FormatEntry::Element(..) => {}
            }
        }
        if matches >= 3 {
            list.remove(earliest.unwrap());
        }
        list.push(FormatEntry::Element(id, tag));
    }

    fn reconstruct_active_formatting_elements(&self) {
        let list = self.active_formatting.borrow();
        if list.is_empty() {
            return;
        }
        if matches!(list.last(), Some(FormatEntry::Marker)) {
            return;
        }
        if let Some(FormatEntry::Element(id, _)) = list.last() {
            if self.open_elems.borrow().iter_from_top().any(|h| h == id) {
                return;
            }
        }
        drop(list);
        // Walk backward to the first entry that's a marker, the start of
        // the list, or already open; then walk forward recreating each.
        let len = self.active_formatting.borrow().len();
        let mut start = 0;
        for i in (0..len).rev() {
            let entry_is_open = {
                let list = self.active_formatting.borrow();
                match &list[i] {
                    FormatEntry::Marker => None,
                    FormatEntry::Element(id, _) => {
                        if self.open_elems.borrow().iter_from_top().any(|h| h == id) {
                            Some(true)
                        } else {
                            Some(false)
                        }
                    }
                }
            };
            match entry_is_open {
                None => {
                    start = i + 1;
                    break;
                }
                Some(true) => {
                    start = i + 1;
                    break;
                }
                Some(false) => continue,
            }
        }
        let len = self.active_formatting.borrow().len();
        for i in start..len {
            let tag = match &self.active_formatting.borrow()[i] {
                FormatEntry::Element(_, tag) => tag.clone(),
                FormatEntry::Marker => continue,
            };
            let id = self.insert_element(&tag);
            self.active_formatting.borrow_mut()[i] = FormatEntry::Element(id, tag);
        }
    }

    fn clear_active_formatting_to_last_marker(&self) {
        let mut list = self.active_formatting.borrow_mut();
        while let Some(entry) = list.pop() {
            if matches!(entry, FormatEntry::Marker) {
                break;
            }
        }
    }

    /// The simplified 8-step adoption agency algorithm.
    /// https://html.spec.whatwg.org/multipage/parsing.html#adoption-agency-algorithm
    fn run_adoption_agency(&self, subject: &str) {
        for _ in 0..8 {
            let formatting_index = self
                .active_formatting
                .borrow()
                .iter()
                .rposition(|e| matches!(e, FormatEntry::Element(_, t) if &*t.name.local == subject));
            let Some(fi) = formatting_index else {
                // No entry: treat as "any other end tag" in InBody.
                self.any_other_end_tag(subject);
                return;
            };
            let formatting_elem = match &self.active_formatting.borrow()[fi] {
                FormatEntry::Element(id, _) => *id,
                FormatEntry::Marker => unreachable!(),
            };

            if !self.open_elems.borrow().iter_from_top().any(|&h| h == formatting_elem) {
                self.dom.parse_error("adoption agency: formatting element not on stack".into());
                self.active_formatting.borrow_mut().remove(fi);
                return;
            }
            if !self.in_scope(default_scope, |en| en == self.dom.expanded_name(formatting_elem).as_expanded()) {
                self.dom.parse_error("adoption agency: formatting element not in scope".into());
                return;
            }
            if self.current_node() != Some(formatting_elem) {
                self.dom.parse_error("adoption agency: formatting element is not the current node".into());
            }

            let stack_pos = {
                let stack = self.open_elems.borrow();
                stack.iter_from_top().position(|&h| h == formatting_elem)
            };
            let Some(pos_from_top) = stack_pos else { return };
            // The furthest block is the topmost element above `formatting_elem`
            // that is itself in the special category (table, p, div, ...); an
            // inline element directly above it (another formatting element,
            // say) does not count, so this is not simply "the next element up".
            let further_block = {
                let stack = self.open_elems.borrow();
                stack
                    .iter_from_top()
                    .take(pos_from_top)
                    .find(|&&id| special_category(self.dom.expanded_name(id).as_expanded()))
                    .copied()
            };

            let Some(further_block) = further_block else {
                // No further block: simple case. Pop everything down to and
                // including the formatting element and drop its formatting
                // entry.
                loop {
                    let popped = self.open_elems.borrow_mut().pop();
                    let done = popped == Some(formatting_elem);
                    if done || popped.is_none() {
                        break;
                    }
                }
                self.active_formatting.borrow_mut().retain(|e| !matches!(e, FormatEntry::Element(id, _) if *id == formatting_elem));
                return;
            };

            // Complex case: reparent the further block (and everything it
            // contains) under a clone of the formatting element, then move
            // that clone to sit where the formatting element's parent
            // expects it. This is a pragmatic rendering of steps 5-19 of
            // the Standard's algorithm rather than a literal transcription.
            let clone_tag = self
                .active_formatting
                .borrow()
                .iter()
                .find_map(|e| match e {
                    FormatEntry::Element(id, t) if *id == formatting_elem => Some(t.clone()),
                    _ => None,
                })
                .unwrap();
            let clone_id = self.insert_element_detached(&clone_tag);
            self.dom.reparent_children(further_block, clone_id);
            self.dom.append(further_block, clone_id);

            // Replace the formatting element's stack/list entries with the
            // clone, and drop the original.
            {
                let mut stack = self.open_elems.borrow_mut();
                if let Some(idx) = (0..stack.len()).find(|&i| {
                    let mut it = stack.iter_from_top();
                    it.nth(stack.len() - 1 - i).copied() == Some(formatting_elem)
                }) {
                    stack.replace_at(idx, clone_id);
                }
            }
            let mut list = self.active_formatting.borrow_mut();
            if let Some(entry) = list.iter_mut().find(|e| matches!(e, FormatEntry::Element(id, _) if *id == formatting_elem)) {
                *entry = FormatEntry::Element(clone_id, clone_tag);
            }
        }
    }

    fn insert_element_detached(&self, tag: &Tag) -> NodeId {
        let (name, attrs) = qualname_from_tag(tag);
        self.dom.create_element(name, attrs)
    }

    fn any_other_end_tag(&self, name: &str) {
        let stack_snapshot: Vec<NodeId> = self.open_elems.borrow().iter_from_top().copied().collect();
        for &id in &stack_snapshot {
            if self.node_named(id, name) {
                self.generate_implied_end_tags(Some(name));
                self.pop_until_named(name);
                return;
            }
            if special_category(self.dom.expanded_name(id).as_expanded()) {
                self.dom.parse_error("end tag for element not in scope".into());
                return;
            }
        }
    }

    fn reset_insertion_mode(&self) {
        let stack_len = self.open_elems.borrow().len();
        for i in (0..stack_len).rev() {
            let id = {
                let stack = self.open_elems.borrow();
                *stack.iter_from_top().nth(stack_len - 1 - i).unwrap()
            };
            let last = i == 0;
            let (ns, local) = self.dom.elem_name(id);
            if ns != crate::ns!(html) {
                continue;
            }
            let mode = match &*local {
                "select" => InsertionMode::InSelect,
                "td" | "th" if !last => InsertionMode::InCell,
                "tr" => InsertionMode::InRow,
                "tbody" | "thead" | "tfoot" => InsertionMode::InTableBody,
                "caption" => InsertionMode::InCaption,
                "colgroup" => InsertionMode::InColumnGroup,
                "table" => InsertionMode::InTable,
                "template" => *self.template_modes.borrow().last().unwrap_or(&InsertionMode::InBody),
                "head" if !last => InsertionMode::InHead,
                "body" => InsertionMode::InBody,
                "frameset" => InsertionMode::InFrameset,
                "html" => {
                    if self.head_elem.get().is_none() {
                        InsertionMode::BeforeHead
                    } else {
                        InsertionMode::AfterHead
                    }
                }
                _ if last => InsertionMode::InBody,
                _ => continue,
            };
            self.mode.set(mode);
            return;
        }
        self.mode.set(InsertionMode::InBody);
    }

    // ---- the dispatch loop --------------------------------------------------

    fn step(&self, mode: InsertionMode, token: Token) -> TokenSinkResult {
        debug!("tree builder step, mode={:?}", mode);
        match mode {
            InsertionMode::Initial => self.handle_initial(token),
            InsertionMode::BeforeHtml => self.handle_before_html(token),
            InsertionMode::BeforeHead => self.handle_before_head(token),
            InsertionMode::InHead => self.handle_in_head(token),
            InsertionMode::InHeadNoscript => self.handle_in_head_noscript(token),
            InsertionMode::AfterHead => self.handle_after_head(token),
            InsertionMode::InBody => self.handle_in_body(token),
            InsertionMode::Text => self.handle_text(token),
            InsertionMode::InTable | InsertionMode::InTableText => self.handle_in_table(token),
            InsertionMode::InCaption => self.handle_in_caption(token),
            InsertionMode::InColumnGroup => self.handle_in_column_group(token),
            InsertionMode::InTableBody => self.handle_in_table_body(token),
            InsertionMode::InRow => self.handle_in_row(token),
            InsertionMode::InCell => self.handle_in_cell(token),
            InsertionMode::InSelect | InsertionMode::InSelectInTable => self.handle_in_select(token),
            InsertionMode::InTemplate => self.handle_in_template(token),
            InsertionMode::AfterBody => self.handle_after_body(token),
            InsertionMode::InFrameset => self.handle_in_frameset(token),
            InsertionMode::AfterFrameset => self.handle_after_frameset(token),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(token),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_body(token),
        }
    }

    fn handle_initial(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) if is_all_whitespace(&s) => {}
            Token::Comment(text) => self.insert_comment(text),
            Token::Doctype(doctype) => {
                if !self.opts.drop_doctype {
                    let name = doctype.name.clone().unwrap_or_default();
                    let public_id = doctype.public_id.clone().unwrap_or_default();
                    let system_id = doctype.system_id.clone().unwrap_or_default();
                    let id = self.dom.create_doctype(name, public_id, system_id);
                    self.dom.append(self.dom.document(), id);
                }
                let quirks = if doctype.force_quirks {
                    QuirksMode::Quirks
                } else {
                    quirks_mode_from_doctype(&doctype)
                };
                self.dom.set_quirks_mode(quirks);
                self.mode.set(InsertionMode::BeforeHtml);
            }
            other => {
                self.dom.set_quirks_mode(QuirksMode::Quirks);
                self.mode.set(InsertionMode::BeforeHtml);
                return self.step(InsertionMode::BeforeHtml, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_before_html(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) if is_all_whitespace(&s) => {}
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                self.insert_element(tag);
                self.mode.set(InsertionMode::BeforeHead);
            }
            other => {
                let id = self.insert_element_for_doc("html");
                let _ = id;
                self.mode.set(InsertionMode::BeforeHead);
                return self.step(InsertionMode::BeforeHead, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_before_head(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) if is_all_whitespace(&s) => {}
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                return self.handle_in_body(Token::Tag(tag.clone()));
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "head" => {
                let id = self.insert_element(tag);
                self.head_elem.set(Some(id));
                self.mode.set(InsertionMode::InHead);
            }
            other => {
                let tag = Tag {
                    kind: TagKind::StartTag,
                    name: QualName::html(local_name!("head")),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                let id = self.insert_element(&tag);
                self.head_elem.set(Some(id));
                self.mode.set(InsertionMode::InHead);
                return self.step(InsertionMode::InHead, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_in_head(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(ref s) if is_all_whitespace(s) => {
                self.insert_text(s.clone());
            }
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "base" | "basefont" | "bgsound" | "link" | "meta") => {
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "title" => {
                self.insert_element(tag);
                return TokenSinkResult::RawData(RawKind::Rcdata);
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "noframes" | "style") =>
            {
                self.insert_element(tag);
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "noscript" && self.opts.scripting_enabled => {
                self.insert_element(tag);
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "noscript" => {
                self.insert_element(tag);
                self.mode.set(InsertionMode::InHeadNoscript);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "script" => {
                self.insert_element(tag);
                return TokenSinkResult::RawData(RawKind::ScriptData);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "head" => {
                self.open_elems.borrow_mut().pop();
                self.mode.set(InsertionMode::AfterHead);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                return self.handle_in_body(Token::Tag(tag.clone()));
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "template" => {
                self.insert_element(tag);
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InTemplate);
                self.template_modes.borrow_mut().push(InsertionMode::InTemplate);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                if self.open_elems.borrow().iter_from_top().any(|&id| self.node_named(id, "template")) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_named("template");
                    self.clear_active_formatting_to_last_marker();
                    self.template_modes.borrow_mut().pop();
                    self.reset_insertion_mode();
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "body" | "html" | "br") => {
                self.open_elems.borrow_mut().pop();
                self.mode.set(InsertionMode::AfterHead);
                return self.step(InsertionMode::AfterHead, token);
            }
            other => {
                self.open_elems.borrow_mut().pop();
                self.mode.set(InsertionMode::AfterHead);
                return self.step(InsertionMode::AfterHead, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_in_head_noscript(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "noscript" => {
                self.open_elems.borrow_mut().pop();
                self.mode.set(InsertionMode::InHead);
            }
            Token::Characters(ref s) if is_all_whitespace(s) => return self.handle_in_head(token),
            Token::Comment(_) => return self.handle_in_head(token),
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style") =>
            {
                return self.handle_in_head(token);
            }
            other => {
                self.dom.parse_error("unexpected token in noscript".into());
                self.open_elems.borrow_mut().pop();
                self.mode.set(InsertionMode::InHead);
                return self.step(InsertionMode::InHead, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_after_head(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(ref s) if is_all_whitespace(s) => self.insert_text(s.clone()),
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                return self.handle_in_body(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "body" => {
                self.insert_element(tag);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InBody);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "frameset" => {
                self.insert_element(tag);
                self.mode.set(InsertionMode::InFrameset);
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        &*tag.name.local,
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
                            | "template" | "title"
                    ) =>
            {
                self.dom.parse_error("unexpected head content after head".into());
                if let Some(head) = self.head_elem.get() {
                    self.open_elems.borrow_mut().push(head);
                    let result = self.handle_in_head(token);
                    self.open_elems.borrow_mut().pop();
                    return result;
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "body" | "html" | "br") => {
                self.insert_body_implicitly();
                return self.step(InsertionMode::InBody, token);
            }
            other => {
                self.insert_body_implicitly();
                return self.step(InsertionMode::InBody, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn insert_body_implicitly(&self) {
        self.insert_element_for_doc("body");
        self.mode.set(InsertionMode::InBody);
    }

    fn handle_in_body(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) => {
                if s.chars().any(|c| c == '\0') {
                    self.dom.parse_error("unexpected null character".into());
                }
                if !is_all_whitespace(&s) {
                    self.frameset_ok.set(false);
                }
                self.reconstruct_active_formatting_elements();
                self.insert_text(s);
            }
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                self.dom.parse_error("html start tag in body".into());
                if let Some(html) = self.open_elems.borrow().iter_from_top().last().copied() {
                    self.dom.add_attrs_if_missing(html, tag.attrs.clone());
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        &*tag.name.local,
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
                            | "template" | "title"
                    ) =>
            {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "body" => {
                self.dom.parse_error("body start tag in body".into());
                self.frameset_ok.set(false);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "frameset" => {
                self.dom.parse_error("frameset start tag in body".into());
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        &*tag.name.local,
                        "address" | "article" | "aside" | "blockquote" | "center" | "details" | "dialog"
                            | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer"
                            | "header" | "hgroup" | "main" | "menu" | "nav" | "ol" | "p" | "section"
                            | "summary" | "ul"
                    ) =>
            {
                self.close_p_element_if_in_button_scope();
                self.insert_element(tag);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && heading_tag(expanded_for(tag)) => {
                self.close_p_element_if_in_button_scope();
                if self
                    .current_node()
                    .map(|id| heading_tag(self.dom.expanded_name(id).as_expanded()))
                    .unwrap_or(false)
                {
                    self.dom.parse_error("nested heading element".into());
                    self.open_elems.borrow_mut().pop();
                }
                self.insert_element(tag);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "pre" | "listing") => {
                self.close_p_element_if_in_button_scope();
                self.insert_element(tag);
                self.frameset_ok.set(false);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "form" => {
                if self.form_elem.get().is_none() {
                    self.close_p_element_if_in_button_scope();
                    let id = self.insert_element(tag);
                    self.form_elem.set(Some(id));
                } else {
                    self.dom.parse_error("nested form element ignored".into());
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "li" => {
                self.close_matching_list_item("li");
                self.close_p_element_if_in_button_scope();
                self.insert_element(tag);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "dd" | "dt") => {
                self.close_matching_list_item_dd_dt();
                self.close_p_element_if_in_button_scope();
                self.insert_element(tag);
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "a" | "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike" | "strong" | "tt" | "u") =>
            {
                if &*tag.name.local == "a" {
                    let existing = self
                        .active_formatting
                        .borrow()
                        .iter()
                        .rev()
                        .take_while(|e| !matches!(e, FormatEntry::Marker))
                        .find_map(|e| match e {
                            FormatEntry::Element(id, t) if &*t.name.local == "a" => Some(*id),
                            _ => None,
                        });
                    if let Some(existing) = existing {
                        self.dom.parse_error("anchor start tag while one is already open".into());
                        self.run_adoption_agency("a");
                        self.active_formatting
                            .borrow_mut()
                            .retain(|e| !matches!(e, FormatEntry::Element(id, _) if *id == existing));
                        let mut stack = self.open_elems.borrow_mut();
                        if let Some(idx) = (0..stack.len()).find(|&i| *stack.iter_from_top().nth(stack.len() - 1 - i).unwrap() == existing) {
                            stack.remove_at(idx);
                        }
                    }
                }
                self.reconstruct_active_formatting_elements();
                let id = self.insert_element(tag);
                self.add_formatting_entry(id, tag.clone());
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "nobr") => {
                self.reconstruct_active_formatting_elements();
                if self.in_scope(default_scope, |en| &*en.local == "nobr" && en.ns == &ns!(html)) {
                    self.run_adoption_agency("nobr");
                    self.reconstruct_active_formatting_elements();
                }
                let id = self.insert_element(tag);
                self.add_formatting_entry(id, tag.clone());
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "applet" | "marquee" | "object") =>
            {
                self.reconstruct_active_formatting_elements();
                self.insert_element(tag);
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                self.frameset_ok.set(false);
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "applet" | "marquee" | "object") =>
            {
                let name = tag.name.local.to_string();
                if self.in_scope(default_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_named(&name);
                    self.clear_active_formatting_to_last_marker();
                } else {
                    self.dom.parse_error("unmatched end tag".into());
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "table" => {
                if !matches!(self.dom.quirks_mode.get(), QuirksMode::Quirks) {
                    self.close_p_element_if_in_button_scope();
                }
                self.insert_element(tag);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InTable);
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "area" | "br" | "embed" | "img" | "keygen" | "wbr") =>
            {
                self.reconstruct_active_formatting_elements();
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
                self.frameset_ok.set(false);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "input" => {
                self.reconstruct_active_formatting_elements();
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
                let is_hidden = tag
                    .get_attribute("type")
                    .map(|v| v.eq_ignore_ascii_case("hidden"))
                    .unwrap_or(false);
                if !is_hidden {
                    self.frameset_ok.set(false);
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "param" | "source" | "track") =>
            {
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "hr" => {
                self.close_p_element_if_in_button_scope();
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
                self.frameset_ok.set(false);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "textarea" => {
                self.insert_element(tag);
                self.frameset_ok.set(false);
                return TokenSinkResult::RawData(RawKind::Rcdata);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "xmp" => {
                self.close_p_element_if_in_button_scope();
                self.reconstruct_active_formatting_elements();
                self.frameset_ok.set(false);
                self.insert_element(tag);
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "iframe" | "noembed") =>
            {
                self.insert_element(tag);
                self.frameset_ok.set(false);
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "select" => {
                self.reconstruct_active_formatting_elements();
                self.insert_element(tag);
                self.frameset_ok.set(false);
                self.mode.set(match self.mode.get() {
                    InsertionMode::InTable | InsertionMode::InCaption | InsertionMode::InTableBody | InsertionMode::InRow | InsertionMode::InCell => {
                        InsertionMode::InSelectInTable
                    }
                    _ => InsertionMode::InSelect,
                });
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "address" | "article" | "aside" | "blockquote" | "button" | "center" | "details" | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer" | "header" | "hgroup" | "listing" | "main" | "menu" | "nav" | "ol" | "pre" | "section" | "summary" | "ul") => {
                let name = tag.name.local.to_string();
                if self.in_scope(default_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_named(&name);
                } else {
                    self.dom.parse_error("unmatched end tag".into());
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "form" => {
                let form = self.form_elem.take();
                match form {
                    Some(form_id) if self.in_scope(default_scope, |en| en == self.dom.expanded_name(form_id).as_expanded()) => {
                        self.generate_implied_end_tags(None);
                        let mut stack = self.open_elems.borrow_mut();
                        if let Some(idx) = (0..stack.len()).find(|&i| *stack.iter_from_top().nth(stack.len() - 1 - i).unwrap() == form_id) {
                            stack.remove_at(idx);
                        }
                    }
                    _ => self.dom.parse_error("unmatched form end tag".into()),
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "p" => {
                if !self.in_scope(button_scope, |en| &*en.local == "p" && en.ns == &ns!(html)) {
                    self.dom.parse_error("no p element in scope".into());
                    let empty = Tag {
                        kind: TagKind::StartTag,
                        name: QualName::html(local_name!("p")),
                        self_closing: false,
                        attrs: Vec::new(),
                    };
                    self.insert_element(&empty);
                }
                self.close_p_element();
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "li" => {
                if self.in_scope(list_item_scope, |en| &*en.local == "li" && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(Some("li"));
                    self.pop_until_named("li");
                } else {
                    self.dom.parse_error("no li element in scope".into());
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "dd" | "dt") => {
                let name = tag.name.local.to_string();
                if self.in_scope(default_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(Some(&name));
                    self.pop_until_named(&name);
                } else {
                    self.dom.parse_error("no matching element in scope".into());
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && heading_tag(expanded_for(tag)) => {
                if self.in_scope(default_scope, heading_tag) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_heading();
                } else {
                    self.dom.parse_error("no heading in scope".into());
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::EndTag
                    && matches!(&*tag.name.local, "a" | "b" | "big" | "code" | "em" | "font" | "i" | "nobr" | "s" | "small" | "strike" | "strong" | "tt" | "u") =>
            {
                self.run_adoption_agency(&tag.name.local);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "applet" | "marquee" | "object") => {
                let name = tag.name.local.to_string();
                if self.in_scope(default_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_named(&name);
                    self.clear_active_formatting_to_last_marker();
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "br" => {
                self.dom.parse_error("end tag br treated as start tag".into());
                self.reconstruct_active_formatting_elements();
                let br = Tag {
                    kind: TagKind::StartTag,
                    name: QualName::html(local_name!("br")),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_element(&br);
                self.open_elems.borrow_mut().pop();
                self.frameset_ok.set(false);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "body" | "html") => {
                if self.in_scope(default_scope, |en| &*en.local == "body" && en.ns == &ns!(html)) {
                    self.mode.set(InsertionMode::AfterBody);
                    if &*tag.name.local == "html" {
                        return self.step(InsertionMode::AfterBody, token);
                    }
                } else {
                    self.dom.parse_error("no body element in scope".into());
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag => {
                self.any_other_end_tag(&tag.name.local);
            }
            Token::Doctype(_) => self.dom.parse_error("unexpected doctype".into()),
            Token::Eof => {
                self.done.set(true);
            }
        }
        TokenSinkResult::Continue
    }

    fn pop_until_heading(&self) {
        loop {
            match self.open_elems.borrow_mut().pop() {
                Some(id) if heading_tag(self.dom.expanded_name(id).as_expanded()) => break,
                Some(_) => continue,
                None => break,
            }
        }
    }

    fn close_matching_list_item(&self, local: &str) {
        let stack_snapshot: Vec<NodeId> = self.open_elems.borrow().iter_from_top().copied().collect();
        for id in stack_snapshot {
            let (ns, name) = self.dom.elem_name(id);
            if ns == crate::ns!(html) && &*name == local {
                self.generate_implied_end_tags(Some(local));
                self.pop_until_named(local);
                return;
            }
            if special_category(ExpandedName { ns: &ns, local: &name }) && !matches!(&*name, "address" | "div" | "p") {
                return;
            }
        }
    }

    fn close_matching_list_item_dd_dt(&self) {
        let stack_snapshot: Vec<NodeId> = self.open_elems.borrow().iter_from_top().copied().collect();
        for id in stack_snapshot {
            let (ns, name) = self.dom.elem_name(id);
            if ns == crate::ns!(html) && matches!(&*name, "dd" | "dt") {
                let target = name.to_string();
                self.generate_implied_end_tags(Some(&target));
                self.pop_until_named(&target);
                return;
            }
            if special_category(ExpandedName { ns: &ns, local: &name }) && !matches!(&*name, "address" | "div" | "p") {
                return;
            }
        }
    }

    fn handle_text(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) => self.insert_text(s),
            Token::Eof => {
                self.dom.parse_error("eof in text content".into());
                self.open_elems.borrow_mut().pop();
                self.mode.set(self.orig_mode.get().unwrap_or(InsertionMode::InBody));
                return self.step(self.mode.get(), Token::Eof);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag => {
                self.open_elems.borrow_mut().pop();
                self.mode.set(self.orig_mode.get().unwrap_or(InsertionMode::InBody));
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }

    fn handle_in_table(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) if self.current_node_named("table") || self.current_node_named("tbody") || self.current_node_named("tr") => {
                self.orig_mode.set(Some(self.mode.get()));
                self.pending_table_text.borrow_mut().clear();
                self.pending_table_text.borrow_mut().push_tendril(&s);
                self.mode.set(InsertionMode::InTableText);
                self.flush_pending_table_text();
            }
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "caption" => {
                self.clear_stack_to_table_context();
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                self.insert_element(tag);
                self.mode.set(InsertionMode::InCaption);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "colgroup" => {
                self.clear_stack_to_table_context();
                self.insert_element(tag);
                self.mode.set(InsertionMode::InColumnGroup);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "col" => {
                self.clear_stack_to_table_context();
                let colgroup = Tag {
                    kind: TagKind::StartTag,
                    name: QualName::html(local_name!("colgroup")),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_element(&colgroup);
                self.mode.set(InsertionMode::InColumnGroup);
                return self.step(InsertionMode::InColumnGroup, token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "tbody" | "tfoot" | "thead") => {
                self.clear_stack_to_table_context();
                self.insert_element(tag);
                self.mode.set(InsertionMode::InTableBody);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "td" | "th" | "tr") => {
                self.clear_stack_to_table_context();
                let tbody = Tag {
                    kind: TagKind::StartTag,
                    name: QualName::html(local_name!("tbody")),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_element(&tbody);
                self.mode.set(InsertionMode::InTableBody);
                return self.step(InsertionMode::InTableBody, token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "table" => {
                self.dom.parse_error("nested table start tag".into());
                if self.in_scope(table_scope, |en| &*en.local == "table" && en.ns == &ns!(html)) {
                    self.pop_until_named("table");
                    self.reset_insertion_mode();
                    return self.step(self.mode.get(), token);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "table" => {
                if self.in_scope(table_scope, |en| &*en.local == "table" && en.ns == &ns!(html)) {
                    self.pop_until_named("table");
                    self.reset_insertion_mode();
                } else {
                    self.dom.parse_error("no table element in scope".into());
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::EndTag
                    && matches!(&*tag.name.local, "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr") =>
            {
                self.dom.parse_error("stray table-scoped end tag".into());
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "style" | "script" | "template") => {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "input" => {
                let is_hidden = tag.get_attribute("type").map(|v| v.eq_ignore_ascii_case("hidden")).unwrap_or(false);
                if is_hidden {
                    self.insert_element(tag);
                    self.open_elems.borrow_mut().pop();
                } else {
                    self.foster_and_reprocess_in_body(token);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "form" => {
                if self.form_elem.get().is_none() {
                    let id = self.insert_element(tag);
                    self.form_elem.set(Some(id));
                    self.open_elems.borrow_mut().pop();
                }
            }
            Token::Eof => return self.handle_in_body(token),
            other => self.foster_and_reprocess_in_body(other),
        }
        TokenSinkResult::Continue
    }

    fn flush_pending_table_text(&self) {
        let text = std::mem::replace(&mut *self.pending_table_text.borrow_mut(), StrTendril::new());
        if text.is_empty() {
            return;
        }
        if is_all_whitespace(&text) {
            self.insert_text(text);
        } else {
            self.dom.parse_error("non-whitespace character data in table".into());
            self.foster_and_reprocess_in_body(Token::Characters(text));
        }
        self.mode.set(self.orig_mode.get().unwrap_or(InsertionMode::InTable));
    }

    fn foster_and_reprocess_in_body(&self, token: Token) -> TokenSinkResult {
        self.dom.parse_error("foster parenting content out of table".into());
        self.foster_parenting.set(true);
        let result = self.handle_in_body(token);
        self.foster_parenting.set(false);
        result
    }

    fn clear_stack_to_table_context(&self) {
        loop {
            if self.current_node_named("table") || self.current_node_named("html") || self.current_node_named("template") {
                break;
            }
            if self.open_elems.borrow_mut().pop().is_none() {
                break;
            }
        }
    }

    fn clear_stack_to_table_body_context(&self) {
        loop {
            if self.current_node_named("tbody")
                || self.current_node_named("tfoot")
                || self.current_node_named("thead")
                || self.current_node_named("html")
                || self.current_node_named("template")
            {
                break;
            }
            if self.open_elems.borrow_mut().pop().is_none() {
                break;
            }
        }
    }

    fn clear_stack_to_table_row_context(&self) {
        loop {
            if self.current_node_named("tr") || self.current_node_named("html") || self.current_node_named("template") {
                break;
            }
            if self.open_elems.borrow_mut().pop().is_none() {
                break;
            }
        }
    }

    fn handle_in_caption(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "caption" => {
                if self.in_scope(table_scope, |en| &*en.local == "caption" && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_named("caption");
                    self.clear_active_formatting_to_last_marker();
                    self.mode.set(InsertionMode::InTable);
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr") =>
            {
                self.pop_until_named("caption");
                self.clear_active_formatting_to_last_marker();
                self.mode.set(InsertionMode::InTable);
                return self.step(InsertionMode::InTable, token);
            }
            other => return self.handle_in_body(other),
        }
        TokenSinkResult::Continue
    }

    fn handle_in_column_group(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(ref s) if is_all_whitespace(s) => self.insert_text(s.clone()),
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "col" => {
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "colgroup" => {
                if self.current_node_named("colgroup") {
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTable);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "template" => {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                return self.handle_in_head(token);
            }
            Token::Eof => return self.handle_in_body(token),
            other => {
                if self.current_node_named("colgroup") {
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTable);
                    return self.step(InsertionMode::InTable, other);
                }
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_in_table_body(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "tr" => {
                self.clear_stack_to_table_body_context();
                self.insert_element(tag);
                self.mode.set(InsertionMode::InRow);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "th" | "td") => {
                self.dom.parse_error("th/td start tag directly in table body".into());
                self.clear_stack_to_table_body_context();
                let tr = Tag {
                    kind: TagKind::StartTag,
                    name: QualName::html(local_name!("tr")),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_element(&tr);
                self.mode.set(InsertionMode::InRow);
                return self.step(InsertionMode::InRow, token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "tbody" | "tfoot" | "thead") => {
                let name = tag.name.local.to_string();
                if self.in_scope(table_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.clear_stack_to_table_body_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTable);
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead") =>
            {
                if self.in_scope(table_scope, |en| matches!(&*en.local, "tbody" | "tfoot" | "thead")) {
                    self.clear_stack_to_table_body_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTable);
                    return self.step(InsertionMode::InTable, token);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "table" => {
                if self.in_scope(table_scope, |en| matches!(&*en.local, "tbody" | "tfoot" | "thead")) {
                    self.clear_stack_to_table_body_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTable);
                    return self.step(InsertionMode::InTable, token);
                }
            }
            other => return self.handle_in_table(other),
        }
        TokenSinkResult::Continue
    }

    fn handle_in_row(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "th" | "td") => {
                self.clear_stack_to_table_row_context();
                self.insert_element(tag);
                self.mode.set(InsertionMode::InCell);
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "tr" => {
                if self.in_scope(table_scope, |en| &*en.local == "tr" && en.ns == &ns!(html)) {
                    self.clear_stack_to_table_row_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTableBody);
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if self.in_scope(table_scope, |en| &*en.local == "tr" && en.ns == &ns!(html)) {
                    self.clear_stack_to_table_row_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTableBody);
                    return self.step(InsertionMode::InTableBody, token);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "table" => {
                if self.in_scope(table_scope, |en| &*en.local == "tr" && en.ns == &ns!(html)) {
                    self.clear_stack_to_table_row_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTableBody);
                    return self.step(InsertionMode::InTableBody, token);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "tbody" | "tfoot" | "thead") => {
                let name = tag.name.local.to_string();
                if self.in_scope(table_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.clear_stack_to_table_row_context();
                    self.open_elems.borrow_mut().pop();
                    self.mode.set(InsertionMode::InTableBody);
                    return self.step(InsertionMode::InTableBody, token);
                }
            }
            other => return self.handle_in_table(other),
        }
        TokenSinkResult::Continue
    }

    fn handle_in_cell(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "td" | "th") => {
                let name = tag.name.local.to_string();
                if self.in_scope(table_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.generate_implied_end_tags(None);
                    self.pop_until_named(&name);
                    self.clear_active_formatting_to_last_marker();
                    self.mode.set(InsertionMode::InRow);
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr") =>
            {
                if self.in_scope(table_scope, |en| matches!(&*en.local, "td" | "th")) {
                    self.close_current_cell();
                    return self.step(InsertionMode::InRow, token);
                }
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::EndTag && matches!(&*tag.name.local, "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                let name = tag.name.local.to_string();
                if self.in_scope(table_scope, |en| &*en.local == name && en.ns == &ns!(html)) {
                    self.close_current_cell();
                    return self.step(InsertionMode::InRow, token);
                }
            }
            other => return self.handle_in_body(other),
        }
        TokenSinkResult::Continue
    }

    fn close_current_cell(&self) {
        self.generate_implied_end_tags(None);
        if self.current_node_named("td") {
            self.pop_until_named("td");
        } else if self.current_node_named("th") {
            self.pop_until_named("th");
        }
        self.clear_active_formatting_to_last_marker();
        self.mode.set(InsertionMode::InRow);
    }

    fn handle_in_select(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(s) => {
                let s = StrTendril::from_slice(&s.replace('\0', ""));
                self.insert_text(s);
            }
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "option" => {
                if self.current_node_named("option") {
                    self.open_elems.borrow_mut().pop();
                }
                self.insert_element(tag);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "optgroup" => {
                if self.current_node_named("option") {
                    self.open_elems.borrow_mut().pop();
                }
                if self.current_node_named("optgroup") {
                    self.open_elems.borrow_mut().pop();
                }
                self.insert_element(tag);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "optgroup" => {
                if self.current_node_named("option") && self.open_elems.borrow().below_top().map(|&id| self.node_named(id, "optgroup")).unwrap_or(false) {
                    self.open_elems.borrow_mut().pop();
                }
                if self.current_node_named("optgroup") {
                    self.open_elems.borrow_mut().pop();
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "option" => {
                if self.current_node_named("option") {
                    self.open_elems.borrow_mut().pop();
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "select" => {
                if self.in_scope(select_scope, |en| &*en.local == "select" && en.ns == &ns!(html)) {
                    self.pop_until_named("select");
                    self.reset_insertion_mode();
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "select" => {
                self.dom.parse_error("nested select start tag treated as end tag".into());
                self.pop_until_named("select");
                self.reset_insertion_mode();
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "input" | "keygen" | "textarea") =>
            {
                self.dom.parse_error("interactive element inside select".into());
                if self.in_scope(select_scope, |en| &*en.local == "select" && en.ns == &ns!(html)) {
                    self.pop_until_named("select");
                    self.reset_insertion_mode();
                    return self.step(self.mode.get(), token);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "script" | "template") => {
                return self.handle_in_head(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                return self.handle_in_head(token);
            }
            Token::Eof => return self.handle_in_body(token),
            _ => {}
        }
        TokenSinkResult::Continue
    }

    fn handle_in_template(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(
                        &*tag.name.local,
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
                            | "template" | "title"
                    ) =>
            {
                self.handle_in_head(token)
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "template" => {
                self.handle_in_head(token)
            }
            Token::Tag(ref tag)
                if tag.kind == TagKind::StartTag
                    && matches!(&*tag.name.local, "caption" | "colgroup" | "tbody" | "tfoot" | "thead") =>
            {
                self.template_modes.borrow_mut().pop();
                self.template_modes.borrow_mut().push(InsertionMode::InTable);
                self.mode.set(InsertionMode::InTable);
                self.step(InsertionMode::InTable, token)
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "col" => {
                self.template_modes.borrow_mut().pop();
                self.template_modes.borrow_mut().push(InsertionMode::InColumnGroup);
                self.mode.set(InsertionMode::InColumnGroup);
                self.step(InsertionMode::InColumnGroup, token)
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "tr" => {
                self.template_modes.borrow_mut().pop();
                self.template_modes.borrow_mut().push(InsertionMode::InTableBody);
                self.mode.set(InsertionMode::InTableBody);
                self.step(InsertionMode::InTableBody, token)
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && matches!(&*tag.name.local, "td" | "th") => {
                self.template_modes.borrow_mut().pop();
                self.template_modes.borrow_mut().push(InsertionMode::InRow);
                self.mode.set(InsertionMode::InRow);
                self.step(InsertionMode::InRow, token)
            }
            Token::Eof => {
                if self.open_elems.borrow().iter_from_top().any(|&id| self.node_named(id, "template")) {
                    self.pop_until_named("template");
                    self.clear_active_formatting_to_last_marker();
                    self.template_modes.borrow_mut().pop();
                    self.reset_insertion_mode();
                    self.step(self.mode.get(), Token::Eof)
                } else {
                    self.done.set(true);
                    TokenSinkResult::Continue
                }
            }
            other => {
                self.template_modes.borrow_mut().pop();
                self.template_modes.borrow_mut().push(InsertionMode::InBody);
                self.mode.set(InsertionMode::InBody);
                self.step(InsertionMode::InBody, other)
            }
        }
    }

    fn handle_after_body(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(ref s) if is_all_whitespace(s) => return self.handle_in_body(token),
            Token::Comment(text) => {
                let html = self.open_elems.borrow().iter_from_top().last().copied();
                if let Some(html) = html {
                    let id = self.dom.create_comment(text);
                    self.dom.append(html, id);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                return self.handle_in_body(token);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "html" => {
                self.mode.set(InsertionMode::AfterAfterBody);
            }
            Token::Eof => self.done.set(true),
            other => {
                self.dom.parse_error("unexpected token after body".into());
                self.mode.set(InsertionMode::InBody);
                return self.step(InsertionMode::InBody, other);
            }
        }
        TokenSinkResult::Continue
    }

    fn handle_in_frameset(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(ref s) if is_all_whitespace(s) => self.insert_text(s.clone()),
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "frameset" => {
                self.insert_element(tag);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "frameset" => {
                self.open_elems.borrow_mut().pop();
                if !self.current_node_named("frameset") {
                    self.mode.set(InsertionMode::AfterFrameset);
                }
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "frame" => {
                self.insert_element(tag);
                self.open_elems.borrow_mut().pop();
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "noframes" => {
                return self.handle_in_head(token);
            }
            Token::Eof => self.done.set(true),
            _ => self.dom.parse_error("unexpected token in frameset".into()),
        }
        TokenSinkResult::Continue
    }

    fn handle_after_frameset(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Characters(ref s) if is_all_whitespace(s) => self.insert_text(s.clone()),
            Token::Comment(text) => self.insert_comment(text),
            Token::Tag(ref tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "html" => {
                self.mode.set(InsertionMode::AfterAfterFrameset);
            }
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "noframes" => {
                return self.handle_in_head(token);
            }
            Token::Eof => self.done.set(true),
            _ => self.dom.parse_error("unexpected token after frameset".into()),
        }
        TokenSinkResult::Continue
    }

    fn handle_after_after_body(&self, token: Token) -> TokenSinkResult {
        match token {
            Token::Comment(text) => {
                let id = self.dom.create_comment(text);
                self.dom.append(self.dom.document(), id);
            }
            Token::Characters(ref s) if is_all_whitespace(s) => return self.handle_in_body(token),
            Token::Tag(ref tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "html" => {
                return self.handle_in_body(token);
            }
            Token::Eof => self.done.set(true),
            other => {
                self.mode.set(InsertionMode::InBody);
                return self.step(InsertionMode::InBody, other);
            }
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for TreeBuilder {
    fn process_token(&self, token: TokenizerToken) -> TokenSinkResult {
        if let TokenizerToken::ParseError(msg) = token {
            self.dom.parse_error(msg);
            return TokenSinkResult::Continue;
        }
        let Some(token): Option<Token> = token.into() else {
            return TokenSinkResult::Continue;
        };
        let mode = self.mode.get();
        self.step(mode, token)
    }

    fn end(&self) {
        self.done.set(true);
    }

    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        self.current_node()
            .map(|id| self.dom.elem_name(id).0 != crate::ns!(html))
            .unwrap_or(false)
    }
}

fn is_all_whitespace(s: &str) -> bool {
    s.chars().all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
}

fn expanded_for(tag: &Tag) -> ExpandedName<'_> {
    ExpandedName {
        ns: &tag.name.ns,
        local: &tag.name.local,
    }
}

fn quirks_mode_from_doctype(doctype: &crate::tokenizer::Doctype) -> QuirksMode {
    let name_is_html = doctype.name.as_deref().map(|n| n.eq_ignore_ascii_case("html")).unwrap_or(false);
    if !name_is_html || doctype.public_id.is_some() || doctype.system_id.is_some() {
        // A reasonable approximation of the Standard's quirks-mode table:
        // any DOCTYPE beyond a bare `<!DOCTYPE html>` is treated as
        // (at most) limited-quirks, letting callers refine further if they
        // care about the full legacy public-ID list.
        if doctype.public_id.is_some() || doctype.system_id.is_some() {
            QuirksMode::LimitedQuirks
        } else {
            QuirksMode::NoQuirks
        }
    } else {
        QuirksMode::NoQuirks
    }
}
