//! The HTML5 tokenizer: a state machine turning a character stream into a
//! token stream, with its state driven both by what it reads and by
//! instructions the tree builder sends back (`TokenSinkResult`).
//!
//! State lives in `Cell`/`RefCell` fields behind `&self` methods, so a
//! `TokenSink` can be invoked synchronously mid-state-machine without a
//! `&mut` borrow conflict. Simplified relative to a fully literal reading of
//! the Standard: a `<script>` element re-opened inside its own escaped text
//! (the double-escape corner of script data) is matched as an ordinary end
//! tag rather than routed through a dedicated double-escape-start state;
//! real-world script content essentially never relies on that corner.

pub mod char_ref;
pub mod data;
pub mod interface;
pub mod states;

pub use self::interface::{Doctype, Tag, TagKind, Token, TokenSink, TokenSinkResult};
pub use self::states::{RawKind, State};

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use log::trace;
use tendril::StrTendril;

use crate::interface::{Attribute, LocalName, QualName};
use crate::small_char_set;
use crate::util::buffer_queue::{BufferQueue, FromSet, NotFromSet};
use crate::util::smallcharset::SmallCharSet;
use crate::util::str::lower_ascii_letter;

use self::char_ref::{consume_char_ref, CharRefInput};
use self::states::{AttrValueKind, DoctypeIdKind, ScriptEscapeKind};

/// Tokenizer configuration.
#[derive(Clone)]
pub struct TokenizerOpts {
    /// Report every parse error the Standard defines, not just the ones that
    /// change behavior. Default: false.
    pub exact_errors: bool,

    /// Discard a leading BOM character, if present, on the very first feed.
    /// Default: true.
    pub discard_bom: bool,

    /// State to start in, overriding `Data`. Used by fragment parsing to
    /// start directly in RCDATA/RAWTEXT/etc. for a given context element.
    pub initial_state: Option<State>,

    /// Initial value of the "last start tag name" used by the RCDATA/RAWTEXT
    /// end-tag matching rule, for fragment parsing.
    pub last_start_tag_name: Option<LocalName>,
}

impl Default for TokenizerOpts {
    fn default() -> Self {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

/// The tokenizer itself. Mutable state lives behind `Cell`/`RefCell` so that
/// `&self` methods can call into `sink` (the tree builder) and have it call
/// back into `set_state`/`set_plaintext_state` without a borrow conflict.
pub struct Tokenizer<Sink> {
    opts: TokenizerOpts,
    pub sink: Sink,

    state: Cell<State>,
    current_line: Cell<u64>,

    input: RefCell<BufferQueue>,
    pushback: RefCell<VecDeque<char>>,
    at_eof: Cell<bool>,
    emitted_eof: Cell<bool>,
    ignore_lf: Cell<bool>,
    in_callback: Cell<bool>,

    current_tag_kind: Cell<TagKind>,
    current_tag_name: RefCell<StrTendril>,
    current_tag_self_closing: Cell<bool>,
    current_tag_attrs: RefCell<Vec<Attribute>>,

    current_attr_name: RefCell<StrTendril>,
    current_attr_value: RefCell<StrTendril>,

    current_comment: RefCell<StrTendril>,
    current_doctype: RefCell<Doctype>,

    /// Accumulates `</tagname` while scanning for an appropriate end tag in
    /// RCDATA/RAWTEXT/ScriptData, and the double-escape buffer for
    /// `<script>`.
    temp_buf: RefCell<StrTendril>,

    last_start_tag_name: RefCell<Option<LocalName>>,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    pub fn new(sink: Sink, opts: TokenizerOpts) -> Self {
        let state = opts.initial_state.unwrap_or(State::Data);
        let last_start_tag_name = opts.last_start_tag_name.clone();
        Tokenizer {
            opts,
            sink,
            state: Cell::new(state),
            current_line: Cell::new(1),
            input: RefCell::new(BufferQueue::new()),
            pushback: RefCell::new(VecDeque::new()),
            at_eof: Cell::new(false),
            emitted_eof: Cell::new(false),
            ignore_lf: Cell::new(false),
            in_callback: Cell::new(false),
            current_tag_kind: Cell::new(TagKind::StartTag),
            current_tag_name: RefCell::new(StrTendril::new()),
            current_tag_self_closing: Cell::new(false),
            current_tag_attrs: RefCell::new(Vec::new()),
            current_attr_name: RefCell::new(StrTendril::new()),
            current_attr_value: RefCell::new(StrTendril::new()),
            current_comment: RefCell::new(StrTendril::new()),
            current_doctype: RefCell::new(Doctype::new()),
            temp_buf: RefCell::new(StrTendril::new()),
            last_start_tag_name: RefCell::new(last_start_tag_name),
        }
    }

    /// Feed more input. Returns an error if called reentrantly from within a
    /// token callback.
    pub fn feed(&self, input: StrTendril) -> Result<(), crate::error::CoreError> {
        if self.in_callback.get() {
            return Err(crate::error::CoreError::Reentrant);
        }
        if input.is_empty() {
            return Ok(());
        }
        self.input.borrow_mut().push_back(input);
        self.run();
        Ok(())
    }

    /// Signal logical end of input and drain any remaining states, including
    /// the final `EOFToken`.
    pub fn end(&self) {
        self.at_eof.set(true);
        self.run();
        self.sink.end();
    }

    /// Called by the tree builder to force the tokenizer into a particular
    /// state, e.g. RCDATA for `<title>` or RAWTEXT for `<style>`.
    pub fn set_state(&self, state: State) {
        self.state.set(state);
    }

    pub fn set_plaintext_state(&self) {
        self.state.set(State::Plaintext);
    }

    fn run(&self) {
        while self.step() {}
    }

    fn no_more_input_right_now(&self) -> bool {
        self.pushback.borrow().is_empty() && self.input.borrow().is_empty()
    }

    fn at_true_eof(&self) -> bool {
        self.at_eof.get() && self.no_more_input_right_now()
    }

    fn get_char(&self) -> Option<char> {
        if let Some(c) = self.pushback.borrow_mut().pop_front() {
            return Some(c);
        }
        let c = self.input.borrow_mut().next();
        if let Some(c) = c {
            if c == '\n' {
                self.current_line.set(self.current_line.get() + 1);
            }
        }
        c
    }

    fn unget_char(&self, c: char) {
        self.pushback.borrow_mut().push_front(c);
    }

    /// Preprocess one input character per the Standard's input-stream
    /// preprocessing step: CRLF and lone CR both normalize to LF, and U+0000
    /// is flagged (callers decide whether to substitute or pass through).
    fn get_preprocessed_char(&self) -> Option<char> {
        let mut c = self.get_char()?;
        if self.ignore_lf.get() {
            self.ignore_lf.set(false);
            if c == '\n' {
                c = self.get_char()?;
            }
        }
        if c == '\r' {
            self.ignore_lf.set(true);
            return Some('\n');
        }
        Some(c)
    }

    fn emit_error(&self, msg: &'static str) {
        self.send(Token::ParseError(msg.into()));
    }

    fn send(&self, token: Token) -> TokenSinkResult {
        self.in_callback.set(true);
        let result = self.sink.process_token(token);
        self.in_callback.set(false);
        result
    }

    fn apply_sink_result(&self, result: TokenSinkResult) {
        match result {
            TokenSinkResult::Continue => {}
            TokenSinkResult::Plaintext => self.state.set(State::Plaintext),
            TokenSinkResult::RawData(kind) => self.state.set(State::RawData(kind)),
        }
    }

    fn emit_char(&self, c: char) {
        let tendril = if c == '\0' {
            self.emit_error("unexpected null character");
            StrTendril::from_slice("\u{fffd}")
        } else {
            let mut t = StrTendril::new();
            t.push_char(c);
            t
        };
        let result = self.send(Token::CharacterTokens(tendril));
        self.apply_sink_result(result);
    }

    fn emit_chars(&self, t: StrTendril) {
        if t.is_empty() {
            return;
        }
        let result = self.send(Token::CharacterTokens(t));
        self.apply_sink_result(result);
    }

    fn emit_eof(&self) {
        let result = self.send(Token::EOFToken);
        self.apply_sink_result(result);
    }

    fn create_tag(&self, kind: TagKind, first_char: char) {
        self.current_tag_kind.set(kind);
        let mut name = StrTendril::new();
        name.push_char(first_char);
        *self.current_tag_name.borrow_mut() = name;
        self.current_tag_self_closing.set(false);
        self.current_tag_attrs.borrow_mut().clear();
    }

    fn append_tag_name(&self, c: char) {
        self.current_tag_name.borrow_mut().push_char(c);
    }

    fn create_attribute(&self, first_char: char) {
        self.finish_attribute();
        let mut name = StrTendril::new();
        name.push_char(first_char);
        *self.current_attr_name.borrow_mut() = name;
    }

    fn append_attr_name(&self, c: char) {
        self.current_attr_name.borrow_mut().push_char(c);
    }

    fn append_attr_value(&self, c: char) {
        self.current_attr_value.borrow_mut().push_char(c);
    }

    fn append_attr_value_str(&self, s: &str) {
        self.current_attr_value.borrow_mut().push_slice(s);
    }

    fn finish_attribute(&self) {
        if self.current_attr_name.borrow().is_empty() {
            return;
        }
        let name = std::mem::replace(&mut *self.current_attr_name.borrow_mut(), StrTendril::new());
        let value = std::mem::replace(&mut *self.current_attr_value.borrow_mut(), StrTendril::new());

        let dup = self
            .current_tag_attrs
            .borrow()
            .iter()
            .any(|a| &*a.name.local == &*name);
        if dup {
            self.emit_error("duplicate attribute");
        } else {
            self.current_tag_attrs.borrow_mut().push(Attribute {
                name: QualName::new(None, crate::interface::Namespace::from(""), LocalName::from(&*name)),
                value,
            });
        }
    }

    fn emit_current_tag(&self) {
        self.finish_attribute();
        let name = std::mem::replace(&mut *self.current_tag_name.borrow_mut(), StrTendril::new());
        let name = LocalName::from(&*name);
        let kind = self.current_tag_kind.get();
        if kind == TagKind::StartTag {
            *self.last_start_tag_name.borrow_mut() = Some(name.clone());
        }
        let tag = Tag {
            kind,
            name: QualName::html(name),
            self_closing: self.current_tag_self_closing.get(),
            attrs: std::mem::take(&mut *self.current_tag_attrs.borrow_mut()),
        };
        let result = self.send(Token::TagToken(tag));
        self.apply_sink_result(result);
    }

    fn discard_tag(&self) {
        self.current_tag_attrs.borrow_mut().clear();
        self.current_attr_name.borrow_mut().clear();
        self.current_attr_value.borrow_mut().clear();
    }

    fn have_appropriate_end_tag(&self) -> bool {
        match (&*self.last_start_tag_name.borrow(), self.current_tag_kind.get()) {
            (Some(last), TagKind::EndTag) => &**last == &*self.current_tag_name.borrow(),
            _ => false,
        }
    }

    fn emit_current_comment(&self) {
        let text = std::mem::replace(&mut *self.current_comment.borrow_mut(), StrTendril::new());
        let result = self.send(Token::CommentToken(text));
        self.apply_sink_result(result);
    }

    fn emit_current_doctype(&self) {
        let doctype = std::mem::take(&mut *self.current_doctype.borrow_mut());
        let result = self.send(Token::DoctypeToken(doctype));
        self.apply_sink_result(result);
    }

    fn clear_temp_buf(&self) {
        self.temp_buf.borrow_mut().clear();
    }

    fn append_temp_buf(&self, c: char) {
        self.temp_buf.borrow_mut().push_char(c);
    }

    fn emit_temp_buf(&self) {
        let buf = std::mem::replace(&mut *self.temp_buf.borrow_mut(), StrTendril::new());
        self.emit_chars(buf);
    }

    /// One unit of work. Returns `false` when the caller should stop calling
    /// (either waiting for more `feed`, or truly finished after EOF).
    fn step(&self) -> bool {
        if self.emitted_eof.get() {
            return false;
        }

        let state = self.state.get();
        trace!("tokenizer step in state {:?}", state);

        match state {
            State::Data => self.step_data(),
            State::Plaintext => self.step_rawdata_like(RawKind::Rawtext, false),
            State::RawData(kind) => self.step_rawdata(kind),
            State::TagOpen => self.step_tag_open(),
            State::EndTagOpen => self.step_end_tag_open(),
            State::TagName => self.step_tag_name(),
            State::RawLessThanSign(kind) => self.step_raw_less_than_sign(kind),
            State::RawEndTagOpen(kind) => self.step_raw_end_tag_open(kind),
            State::RawEndTagName(kind) => self.step_raw_end_tag_name(kind),
            State::ScriptDataEscapeStart(kind) => self.step_script_data_escape_start(kind),
            State::ScriptDataEscapeStartDash => self.step_script_data_escape_start_dash(),
            State::ScriptDataEscapedDash(kind) => self.step_script_data_escaped_dash(kind),
            State::ScriptDataEscapedDashDash(kind) => self.step_script_data_escaped_dash_dash(kind),
            State::ScriptDataDoubleEscapeEnd => self.step_script_data_double_escape_end(),
            State::BeforeAttributeName => self.step_before_attribute_name(),
            State::AttributeName => self.step_attribute_name(),
            State::AfterAttributeName => self.step_after_attribute_name(),
            State::BeforeAttributeValue => self.step_before_attribute_value(),
            State::AttributeValue(kind) => self.step_attribute_value(kind),
            State::AfterAttributeValueQuoted => self.step_after_attribute_value_quoted(),
            State::SelfClosingStartTag => self.step_self_closing_start_tag(),
            State::MarkupDeclarationOpen => self.step_markup_declaration_open(),
            State::BogusComment => self.step_bogus_comment(),
            State::CommentStart => self.step_comment_start(),
            State::CommentStartDash => self.step_comment_start_dash(),
            State::Comment => self.step_comment(),
            State::CommentLessThanSign => self.step_comment_less_than_sign(),
            State::CommentLessThanSignBang => self.step_comment_less_than_sign_bang(),
            State::CommentLessThanSignBangDash => self.step_comment_less_than_sign_bang_dash(),
            State::CommentLessThanSignBangDashDash => self.step_comment_less_than_sign_bang_dash_dash(),
            State::CommentEndDash => self.step_comment_end_dash(),
            State::CommentEnd => self.step_comment_end(),
            State::CommentEndBang => self.step_comment_end_bang(),
            State::Doctype => self.step_doctype(),
            State::BeforeDoctypeName => self.step_before_doctype_name(),
            State::DoctypeName => self.step_doctype_name(),
            State::AfterDoctypeName => self.step_after_doctype_name(),
            State::AfterDoctypeKeyword(kind) => self.step_after_doctype_keyword(kind),
            State::BeforeDoctypeIdentifier(kind) => self.step_before_doctype_identifier(kind),
            State::DoctypeIdentifierDoubleQuoted(kind) => self.step_doctype_identifier_quoted(kind, '"'),
            State::DoctypeIdentifierSingleQuoted(kind) => self.step_doctype_identifier_quoted(kind, '\''),
            State::AfterDoctypeIdentifier(kind) => self.step_after_doctype_identifier(kind),
            State::BetweenDoctypePublicAndSystemIdentifiers => {
                self.step_between_doctype_public_and_system_identifiers()
            }
            State::BogusDoctype => self.step_bogus_doctype(),
            State::CdataSection => self.step_cdata_section(),
            State::CdataSectionBracket => self.step_cdata_section_bracket(),
            State::CdataSectionEnd => self.step_cdata_section_end(),
        }
    }

    // ---- Data state: the hot path ----------------------------------------

    fn step_data(&self) -> bool {
        let set = small_char_set!(0 '&' as u32 '<' as u32);
        match self.input.borrow_mut().pop_except_from(set) {
            None if self.pushback.borrow().is_empty() => {
                if self.at_eof.get() {
                    self.emitted_eof.set(true);
                    self.emit_eof();
                    return false;
                }
                false
            }
            None => {
                let c = self.get_preprocessed_char().unwrap();
                self.data_dispatch_char(c)
            }
            Some(NotFromSet(tendril)) => {
                self.emit_chars(tendril);
                true
            }
            Some(FromSet(_)) => {
                let c = self.get_preprocessed_char().unwrap();
                self.data_dispatch_char(c)
            }
        }
    }

    fn data_dispatch_char(&self, c: char) -> bool {
        match c {
            '&' => self.consume_char_ref_here(false),
            '<' => {
                self.state.set(State::TagOpen);
            }
            '\0' => self.emit_char('\0'),
            c => self.emit_char(c),
        }
        true
    }

    fn consume_char_ref_here(&self, in_attribute: bool) {
        match consume_char_ref(self, in_attribute) {
            Some(text) => {
                if in_attribute {
                    self.append_attr_value_str(&text);
                } else {
                    self.emit_chars(StrTendril::from_slice(&text));
                }
            }
            None => {
                if in_attribute {
                    self.append_attr_value('&');
                } else {
                    self.emit_char('&');
                }
            }
        }
    }

    // ---- RCDATA / RAWTEXT / script data -----------------------------------

    fn step_rawdata(&self, kind: RawKind) -> bool {
        match kind {
            RawKind::Rcdata => self.step_rawdata_like(kind, true),
            RawKind::Rawtext | RawKind::ScriptData => self.step_rawdata_like(kind, false),
            RawKind::ScriptDataEscaped(_) => self.step_script_data_escaped(kind),
        }
    }

    fn step_rawdata_like(&self, kind: RawKind, char_refs: bool) -> bool {
        let set = if char_refs {
            small_char_set!(0 '&' as u32 '<' as u32)
        } else {
            small_char_set!(0 '<' as u32)
        };
        match self.input.borrow_mut().pop_except_from(set) {
            None if self.pushback.borrow().is_empty() => {
                if self.at_eof.get() {
                    self.emitted_eof.set(true);
                    self.emit_eof();
                    return false;
                }
                false
            }
            Some(NotFromSet(tendril)) => {
                self.emit_chars(tendril);
                true
            }
            _ => {
                let c = self.get_preprocessed_char().unwrap();
                match c {
                    '&' if char_refs => self.consume_char_ref_here(false),
                    '<' => self.state.set(State::RawLessThanSign(kind)),
                    '\0' => self.emit_char('\0'),
                    c => self.emit_char(c),
                }
                true
            }
        }
    }

    fn step_script_data_escaped(&self, kind: RawKind) -> bool {
        let set = small_char_set!(0 '<' as u32);
        match self.input.borrow_mut().pop_except_from(set) {
            None if self.pushback.borrow().is_empty() => {
                if self.at_eof.get() {
                    self.emitted_eof.set(true);
                    self.emit_eof();
                    return false;
                }
                false
            }
            Some(NotFromSet(tendril)) => {
                self.emit_chars(tendril);
                true
            }
            _ => {
                let c = self.get_preprocessed_char().unwrap();
                match c {
                    '<' => self.state.set(State::RawLessThanSign(kind)),
                    '\0' => self.emit_char('\0'),
                    '-' => {
                        self.emit_char('-');
                        if let RawKind::ScriptDataEscaped(esc) = kind {
                            self.state.set(State::ScriptDataEscapedDash(esc));
                        }
                    }
                    c => self.emit_char(c),
                }
                true
            }
        }
    }

    fn step_raw_less_than_sign(&self, kind: RawKind) -> bool {
        match self.get_char() {
            Some('/') => {
                self.clear_temp_buf();
                self.state.set(State::RawEndTagOpen(kind));
            }
            Some('!') if matches!(kind, RawKind::ScriptData) => {
                self.emit_char('<');
                self.emit_char('!');
                self.state.set(State::ScriptDataEscapeStart(ScriptEscapeKind::Escaped));
            }
            Some(c) => {
                self.emit_char('<');
                self.unget_char(c);
                self.state.set(State::RawData(kind));
            }
            None => {
                self.emit_char('<');
                self.state.set(State::RawData(kind));
            }
        }
        true
    }

    fn step_raw_end_tag_open(&self, kind: RawKind) -> bool {
        match self.get_char() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.create_tag(TagKind::EndTag, lower_ascii_letter(c).unwrap_or(c));
                self.append_temp_buf(c);
                self.state.set(State::RawEndTagName(kind));
            }
            other => {
                self.emit_char('<');
                self.emit_char('/');
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::RawData(kind));
            }
        }
        true
    }

    fn step_raw_end_tag_name(&self, kind: RawKind) -> bool {
        match self.get_char() {
            Some(c) if is_space(c) && self.have_appropriate_end_tag() => {
                self.state.set(State::BeforeAttributeName);
            }
            Some('/') if self.have_appropriate_end_tag() => {
                self.state.set(State::SelfClosingStartTag);
            }
            Some('>') if self.have_appropriate_end_tag() => {
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.append_tag_name(lower_ascii_letter(c).unwrap_or(c));
                self.append_temp_buf(c);
            }
            other => {
                self.emit_char('<');
                self.emit_char('/');
                self.emit_temp_buf();
                self.discard_tag();
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::RawData(kind));
            }
        }
        true
    }

    fn step_script_data_escape_start(&self, kind: ScriptEscapeKind) -> bool {
        match self.get_char() {
            Some('-') => {
                self.emit_char('-');
                self.state.set(State::ScriptDataEscapeStartDash);
            }
            Some(c) => {
                self.unget_char(c);
                self.state
                    .set(State::RawData(RawKind::ScriptData));
            }
            None => self.state.set(State::RawData(RawKind::ScriptData)),
        }
        let _ = kind;
        true
    }

    fn step_script_data_escape_start_dash(&self) -> bool {
        match self.get_char() {
            Some('-') => {
                self.emit_char('-');
                self.state
                    .set(State::ScriptDataEscapedDashDash(ScriptEscapeKind::Escaped));
            }
            Some(c) => {
                self.unget_char(c);
                self.state.set(State::RawData(RawKind::ScriptData));
            }
            None => self.state.set(State::RawData(RawKind::ScriptData)),
        }
        true
    }

    fn step_script_data_escaped_dash(&self, kind: ScriptEscapeKind) -> bool {
        match self.get_char() {
            Some('-') => {
                self.emit_char('-');
                self.state.set(State::ScriptDataEscapedDashDash(kind));
            }
            Some('<') => self
                .state
                .set(State::RawLessThanSign(RawKind::ScriptDataEscaped(kind))),
            Some('\0') => {
                self.emit_char('\0');
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
            }
            Some(c) => {
                self.emit_char(c);
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_script_data_escaped_dash_dash(&self, kind: ScriptEscapeKind) -> bool {
        match self.get_char() {
            Some('-') => self.emit_char('-'),
            Some('<') => self
                .state
                .set(State::RawLessThanSign(RawKind::ScriptDataEscaped(kind))),
            Some('>') => {
                self.emit_char('>');
                self.state.set(State::RawData(RawKind::ScriptData));
            }
            Some('\0') => {
                self.emit_char('\0');
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
            }
            Some(c) => {
                self.emit_char(c);
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_script_data_double_escape_end(&self) -> bool {
        // Simplified per-spec double-escape handling: match "script" case
        // insensitively against temp_buf, then bounce back into Escaped or
        // DoubleEscaped based on the delimiter that follows.
        match self.get_char() {
            Some(c) if is_space(c) || c == '/' || c == '>' => {
                let name: String = self.temp_buf.borrow().chars().collect();
                self.emit_char(c);
                if name.eq_ignore_ascii_case("script") {
                    self.state.set(State::RawData(RawKind::ScriptDataEscaped(
                        ScriptEscapeKind::Escaped,
                    )));
                } else {
                    self.state.set(State::RawData(RawKind::ScriptDataEscaped(
                        ScriptEscapeKind::DoubleEscaped,
                    )));
                }
                self.clear_temp_buf();
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.append_temp_buf(lower_ascii_letter(c).unwrap_or(c));
                self.emit_char(c);
            }
            other => {
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(
                    ScriptEscapeKind::DoubleEscaped,
                )));
            }
        }
        true
    }

    // ---- Tags --------------------------------------------------------------

    fn step_tag_open(&self) -> bool {
        match self.get_char() {
            Some('!') => self.state.set(State::MarkupDeclarationOpen),
            Some('/') => self.state.set(State::EndTagOpen),
            Some(c) if c.is_ascii_alphabetic() => {
                self.create_tag(TagKind::StartTag, lower_ascii_letter(c).unwrap_or(c));
                self.state.set(State::TagName);
            }
            Some('?') => {
                self.emit_error("unexpected question mark instead of tag name");
                self.current_comment.borrow_mut().clear();
                self.unget_char('?');
                self.state.set(State::BogusComment);
            }
            Some(c) => {
                self.emit_error("invalid first character of tag name");
                self.emit_char('<');
                self.unget_char(c);
                self.state.set(State::Data);
            }
            None => {
                self.emit_error("eof before tag name");
                self.emit_char('<');
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_end_tag_open(&self) -> bool {
        match self.get_char() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.create_tag(TagKind::EndTag, lower_ascii_letter(c).unwrap_or(c));
                self.state.set(State::TagName);
            }
            Some('>') => {
                self.emit_error("missing end tag name");
                self.state.set(State::Data);
            }
            Some(c) => {
                self.emit_error("invalid first character of tag name");
                self.current_comment.borrow_mut().clear();
                self.unget_char(c);
                self.state.set(State::BogusComment);
            }
            None => {
                self.emit_error("eof before tag name");
                self.emit_char('<');
                self.emit_char('/');
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_tag_name(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => self.state.set(State::BeforeAttributeName),
            Some('/') => self.state.set(State::SelfClosingStartTag),
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some('\0') => {
                self.emit_error("unexpected null character");
                self.append_tag_name('\u{fffd}');
            }
            Some(c) => self.append_tag_name(lower_ascii_letter(c).unwrap_or(c)),
            None => {
                self.emit_error("eof in tag");
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_before_attribute_name(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {}
            Some('/') => self.state.set(State::SelfClosingStartTag),
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some(c @ ('=')) => {
                self.emit_error("unexpected equals sign before attribute name");
                self.create_attribute(c);
                self.state.set(State::AttributeName);
            }
            Some('\0') => {
                self.create_attribute('\u{fffd}');
                self.state.set(State::AttributeName);
            }
            Some(c) => {
                self.create_attribute(lower_ascii_letter(c).unwrap_or(c));
                self.state.set(State::AttributeName);
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_attribute_name(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => self.state.set(State::AfterAttributeName),
            Some('/') => {
                self.finish_attribute();
                self.state.set(State::SelfClosingStartTag);
            }
            Some('=') => self.state.set(State::BeforeAttributeValue),
            Some('>') => {
                self.finish_attribute();
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some('\0') => {
                self.emit_error("unexpected null character");
                self.append_attr_name('\u{fffd}');
            }
            Some(c) => self.append_attr_name(lower_ascii_letter(c).unwrap_or(c)),
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_after_attribute_name(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {}
            Some('/') => {
                self.finish_attribute();
                self.state.set(State::SelfClosingStartTag);
            }
            Some('=') => self.state.set(State::BeforeAttributeValue),
            Some('>') => {
                self.finish_attribute();
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some(c) => {
                self.finish_attribute();
                self.create_attribute(lower_ascii_letter(c).unwrap_or(c));
                self.state.set(State::AttributeName);
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_before_attribute_value(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {}
            Some('"') => self.state.set(State::AttributeValue(AttrValueKind::DoubleQuoted)),
            Some('\'') => self.state.set(State::AttributeValue(AttrValueKind::SingleQuoted)),
            Some('>') => {
                self.emit_error("missing attribute value");
                self.finish_attribute();
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some(c) => {
                self.unget_char(c);
                self.state.set(State::AttributeValue(AttrValueKind::Unquoted));
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_attribute_value(&self, kind: AttrValueKind) -> bool {
        let quote = match kind {
            AttrValueKind::DoubleQuoted => Some('"'),
            AttrValueKind::SingleQuoted => Some('\''),
            AttrValueKind::Unquoted => None,
        };
        match self.get_preprocessed_char() {
            Some(c) if Some(c) == quote => self.state.set(State::AfterAttributeValueQuoted),
            Some(c) if quote.is_none() && is_space(c) => {
                self.finish_attribute();
                self.state.set(State::BeforeAttributeName);
            }
            Some('>') if quote.is_none() => {
                self.finish_attribute();
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some('&') => self.consume_char_ref_here(true),
            Some('\0') => {
                self.emit_error("unexpected null character");
                self.append_attr_value('\u{fffd}');
            }
            Some(c) => self.append_attr_value(c),
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_after_attribute_value_quoted(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {
                self.finish_attribute();
                self.state.set(State::BeforeAttributeName);
            }
            Some('/') => {
                self.finish_attribute();
                self.state.set(State::SelfClosingStartTag);
            }
            Some('>') => {
                self.finish_attribute();
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some(c) => {
                self.emit_error("missing whitespace between attributes");
                self.finish_attribute();
                self.unget_char(c);
                self.state.set(State::BeforeAttributeName);
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_self_closing_start_tag(&self) -> bool {
        match self.get_char() {
            Some('>') => {
                self.current_tag_self_closing.set(true);
                self.state.set(State::Data);
                self.emit_current_tag();
            }
            Some(c) => {
                self.emit_error("unexpected solidus in tag");
                self.unget_char(c);
                self.state.set(State::BeforeAttributeName);
            }
            None => {
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    // ---- Markup declarations: comments, DOCTYPE, CDATA ---------------------

    fn step_markup_declaration_open(&self) -> bool {
        if matches!(self.input.borrow_mut().eat("--", |a, b| a == b), Some(true)) {
            self.current_comment.borrow_mut().clear();
            self.state.set(State::CommentStart);
            return true;
        }
        if matches!(
            self.input
                .borrow_mut()
                .eat("DOCTYPE", |a, b| a.to_ascii_lowercase() == b.to_ascii_lowercase()),
            Some(true)
        ) {
            self.state.set(State::Doctype);
            return true;
        }
        if matches!(self.input.borrow_mut().eat("[CDATA[", |a, b| a == b), Some(true)) {
            self.state.set(State::CdataSection);
            return true;
        }
        if self.no_more_input_right_now() && !self.at_eof.get() {
            return false;
        }
        self.emit_error("incorrectly opened comment");
        self.current_comment.borrow_mut().clear();
        self.state.set(State::BogusComment);
        true
    }

    fn step_bogus_comment(&self) -> bool {
        match self.get_preprocessed_char() {
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_comment();
            }
            Some('\0') => self.current_comment.borrow_mut().push_slice("\u{fffd}"),
            Some(c) => self.current_comment.borrow_mut().push_char(c),
            None => {
                self.emit_current_comment();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_comment_start(&self) -> bool {
        match self.get_char() {
            Some('-') => self.state.set(State::CommentStartDash),
            Some('>') => {
                self.emit_error("abrupt closing of empty comment");
                self.state.set(State::Data);
                self.emit_current_comment();
            }
            other => {
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::Comment);
            }
        }
        true
    }

    fn step_comment_start_dash(&self) -> bool {
        match self.get_char() {
            Some('-') => self.state.set(State::CommentEnd),
            Some('>') => {
                self.emit_error("abrupt closing of empty comment");
                self.state.set(State::Data);
                self.emit_current_comment();
            }
            Some(c) => {
                self.current_comment.borrow_mut().push_char('-');
                self.unget_char(c);
                self.state.set(State::Comment);
            }
            None => {
                self.emit_current_comment();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_comment(&self) -> bool {
        match self.get_preprocessed_char() {
            Some('<') => {
                self.current_comment.borrow_mut().push_char('<');
                self.state.set(State::CommentLessThanSign);
            }
            Some('-') => self.state.set(State::CommentEndDash),
            Some('\0') => self.current_comment.borrow_mut().push_slice("\u{fffd}"),
            Some(c) => self.current_comment.borrow_mut().push_char(c),
            None => {
                self.emit_error("eof in comment");
                self.emit_current_comment();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_comment_less_than_sign(&self) -> bool {
        match self.get_char() {
            Some('!') => {
                self.current_comment.borrow_mut().push_char('!');
                self.state.set(State::CommentLessThanSignBang);
            }
            Some('<') => self.current_comment.borrow_mut().push_char('<'),
            other => {
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::Comment);
            }
        }
        true
    }

    fn step_comment_less_than_sign_bang(&self) -> bool {
        match self.get_char() {
            Some('-') => self.state.set(State::CommentLessThanSignBangDash),
            other => {
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::Comment);
            }
        }
        true
    }

    fn step_comment_less_than_sign_bang_dash(&self) -> bool {
        match self.get_char() {
            Some('-') => self.state.set(State::CommentLessThanSignBangDashDash),
            other => {
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::CommentEndDash);
            }
        }
        true
    }

    fn step_comment_less_than_sign_bang_dash_dash(&self) -> bool {
        match self.get_char() {
            Some('>') | None => {
                self.unget_char('>');
                self.state.set(State::CommentEnd);
            }
            Some(c) => {
                self.emit_error("nested comment");
                self.unget_char(c);
                self.state.set(State::CommentEnd);
            }
        }
        true
    }

    fn step_comment_end_dash(&self) -> bool {
        match self.get_char() {
            Some('-') => self.state.set(State::CommentEnd),
            Some(c) => {
                self.current_comment.borrow_mut().push_char('-');
                self.unget_char(c);
                self.state.set(State::Comment);
            }
            None => {
                self.emit_current_comment();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_comment_end(&self) -> bool {
        match self.get_char() {
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_comment();
            }
            Some('!') => self.state.set(State::CommentEndBang),
            Some('-') => self.current_comment.borrow_mut().push_char('-'),
            Some(c) => {
                self.current_comment.borrow_mut().push_slice("--");
                self.unget_char(c);
                self.state.set(State::Comment);
            }
            None => {
                self.emit_current_comment();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_comment_end_bang(&self) -> bool {
        match self.get_char() {
            Some('-') => {
                self.current_comment.borrow_mut().push_slice("--!");
                self.state.set(State::CommentEndDash);
            }
            Some('>') => {
                self.emit_error("incorrectly closed comment");
                self.state.set(State::Data);
                self.emit_current_comment();
            }
            Some(c) => {
                self.current_comment.borrow_mut().push_slice("--!");
                self.unget_char(c);
                self.state.set(State::Comment);
            }
            None => {
                self.emit_current_comment();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    // ---- DOCTYPE -------------------------------------------------------------

    fn doctype_id(&self, kind: DoctypeIdKind) -> std::cell::RefMut<'_, Option<StrTendril>> {
        std::cell::RefMut::map(self.current_doctype.borrow_mut(), |d| match kind {
            DoctypeIdKind::Public => &mut d.public_id,
            DoctypeIdKind::System => &mut d.system_id,
        })
    }

    fn step_doctype(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => self.state.set(State::BeforeDoctypeName),
            other => {
                self.emit_error("missing whitespace before doctype name");
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::BeforeDoctypeName);
            }
        }
        true
    }

    fn step_before_doctype_name(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {}
            Some('>') => {
                self.emit_error("missing doctype name");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some('\0') => {
                let mut name = StrTendril::new();
                name.push_slice("\u{fffd}");
                self.current_doctype.borrow_mut().name = Some(name);
                self.state.set(State::DoctypeName);
            }
            Some(c) => {
                let mut name = StrTendril::new();
                name.push_char(lower_ascii_letter(c).unwrap_or(c));
                self.current_doctype.borrow_mut().name = Some(name);
                self.state.set(State::DoctypeName);
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_doctype_name(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => self.state.set(State::AfterDoctypeName),
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some(c) => {
                let c = lower_ascii_letter(c).unwrap_or(c);
                let mut doctype = self.current_doctype.borrow_mut();
                doctype.name.get_or_insert_with(StrTendril::new).push_char(c);
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_after_doctype_name(&self) -> bool {
        // peek ahead for PUBLIC/SYSTEM keyword
        if matches!(
            self.input
                .borrow_mut()
                .eat("PUBLIC", |a, b| a.to_ascii_uppercase() == b),
            Some(true)
        ) {
            self.state.set(State::AfterDoctypeKeyword(DoctypeIdKind::Public));
            return true;
        }
        if matches!(
            self.input
                .borrow_mut()
                .eat("SYSTEM", |a, b| a.to_ascii_uppercase() == b),
            Some(true)
        ) {
            self.state.set(State::AfterDoctypeKeyword(DoctypeIdKind::System));
            return true;
        }
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => true,
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            }
            Some(c) => {
                self.emit_error("invalid character sequence after doctype name");
                self.unget_char(c);
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::BogusDoctype);
                true
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                false
            }
        }
    }

    fn step_after_doctype_keyword(&self, kind: DoctypeIdKind) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => self.state.set(State::BeforeDoctypeIdentifier(kind)),
            Some(q @ ('"' | '\'')) => {
                self.emit_error("missing whitespace after doctype public/system keyword");
                *self.doctype_id(kind) = Some(StrTendril::new());
                self.state.set(if q == '"' {
                    State::DoctypeIdentifierDoubleQuoted(kind)
                } else {
                    State::DoctypeIdentifierSingleQuoted(kind)
                });
            }
            Some('>') => {
                self.emit_error("missing doctype public/system identifier");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some(c) => {
                self.emit_error("missing quote before doctype public/system identifier");
                self.unget_char(c);
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::BogusDoctype);
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_before_doctype_identifier(&self, kind: DoctypeIdKind) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {}
            Some(q @ ('"' | '\'')) => {
                *self.doctype_id(kind) = Some(StrTendril::new());
                self.state.set(if q == '"' {
                    State::DoctypeIdentifierDoubleQuoted(kind)
                } else {
                    State::DoctypeIdentifierSingleQuoted(kind)
                });
            }
            Some('>') => {
                self.emit_error("missing doctype public/system identifier");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some(c) => {
                self.emit_error("missing quote before doctype public/system identifier");
                self.unget_char(c);
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::BogusDoctype);
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_doctype_identifier_quoted(&self, kind: DoctypeIdKind, quote: char) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if c == quote => {
                self.state.set(State::AfterDoctypeIdentifier(kind));
            }
            Some('\0') => self
                .doctype_id(kind)
                .get_or_insert_with(StrTendril::new)
                .push_slice("\u{fffd}"),
            Some('>') => {
                self.emit_error("abrupt doctype public/system identifier");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some(c) => self
                .doctype_id(kind)
                .get_or_insert_with(StrTendril::new)
                .push_char(c),
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_after_doctype_identifier(&self, kind: DoctypeIdKind) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {
                if kind == DoctypeIdKind::Public {
                    self.state
                        .set(State::BetweenDoctypePublicAndSystemIdentifiers);
                }
            }
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some(q @ ('"' | '\'')) if kind == DoctypeIdKind::Public => {
                self.emit_error("missing whitespace between doctype public and system identifiers");
                *self.doctype_id(DoctypeIdKind::System) = Some(StrTendril::new());
                self.state.set(if q == '"' {
                    State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System)
                } else {
                    State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System)
                });
            }
            Some(c) => {
                self.emit_error("unexpected character after doctype identifier");
                self.unget_char(c);
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::BogusDoctype);
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_between_doctype_public_and_system_identifiers(&self) -> bool {
        match self.get_preprocessed_char() {
            Some(c) if is_space(c) => {}
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some(q @ ('"' | '\'')) => {
                *self.doctype_id(DoctypeIdKind::System) = Some(StrTendril::new());
                self.state.set(if q == '"' {
                    State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System)
                } else {
                    State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System)
                });
            }
            Some(c) => {
                self.emit_error("missing quote before doctype system identifier");
                self.unget_char(c);
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::BogusDoctype);
            }
            None => {
                self.emit_error("eof in doctype");
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_bogus_doctype(&self) -> bool {
        match self.get_char() {
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
            }
            Some('\0') => self.emit_error("unexpected null character"),
            Some(_) => {}
            None => {
                self.emit_current_doctype();
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    // ---- CDATA (foreign content only) --------------------------------------

    fn step_cdata_section(&self) -> bool {
        match self.get_char() {
            Some(']') => self.state.set(State::CdataSectionBracket),
            Some(c) => self.emit_char(c),
            None => {
                self.emit_error("eof in cdata");
                self.emitted_eof.set(true);
                self.emit_eof();
                return false;
            }
        }
        true
    }

    fn step_cdata_section_bracket(&self) -> bool {
        match self.get_char() {
            Some(']') => self.state.set(State::CdataSectionEnd),
            other => {
                self.emit_char(']');
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::CdataSection);
            }
        }
        true
    }

    fn step_cdata_section_end(&self) -> bool {
        match self.get_char() {
            Some(']') => self.emit_char(']'),
            Some('>') => self.state.set(State::Data),
            other => {
                self.emit_char(']');
                self.emit_char(']');
                if let Some(c) = other {
                    self.unget_char(c);
                }
                self.state.set(State::CdataSection);
            }
        }
        true
    }
}

impl<Sink: TokenSink> CharRefInput for Tokenizer<Sink> {
    fn get_char(&self) -> Option<char> {
        Tokenizer::get_char(self)
    }
    fn unget_char(&self, c: char) {
        Tokenizer::unget_char(self, c)
    }
    fn parse_error(&self, msg: &'static str) {
        self.emit_error(msg);
    }
}

#[inline]
fn is_space(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0C' | ' ' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CollectSink {
        tokens: RefCell<Vec<Token>>,
    }

    impl TokenSink for CollectSink {
        fn process_token(&self, token: Token) -> TokenSinkResult {
            self.tokens.borrow_mut().push(token);
            TokenSinkResult::Continue
        }
    }

    fn tokenize(input: &str) -> Vec<Token> {
        let sink = CollectSink {
            tokens: RefCell::new(Vec::new()),
        };
        let tok = Tokenizer::new(sink, TokenizerOpts::default());
        tok.feed(StrTendril::from_slice(input)).unwrap();
        tok.end();
        tok.sink.tokens.into_inner()
    }

    #[test]
    fn tokenizes_simple_tag() {
        let tokens = tokenize("<p>hi</p>");
        assert!(tokens.iter().any(|t| matches!(t, Token::TagToken(tag) if tag.kind == TagKind::StartTag && &*tag.name.local == "p")));
        assert!(tokens.iter().any(|t| matches!(t, Token::CharacterTokens(s) if &**s == "hi")));
        assert!(tokens.iter().any(|t| matches!(t, Token::TagToken(tag) if tag.kind == TagKind::EndTag && &*tag.name.local == "p")));
        assert_eq!(tokens.last(), Some(&Token::EOFToken));
    }

    #[test]
    fn tokenizes_attributes() {
        let tokens = tokenize("<a href=\"x\" class='y'>");
        let tag = tokens
            .iter()
            .find_map(|t| match t {
                Token::TagToken(tag) => Some(tag),
                _ => None,
            })
            .unwrap();
        assert_eq!(tag.attrs.len(), 2);
        assert_eq!(&*tag.get_attribute("href").unwrap(), "x");
        assert_eq!(&*tag.get_attribute("class").unwrap(), "y");
    }

    #[test]
    fn duplicate_attribute_dropped() {
        let tokens = tokenize("<a a=1 a=2>");
        let tag = tokens
            .iter()
            .find_map(|t| match t {
                Token::TagToken(tag) => Some(tag),
                _ => None,
            })
            .unwrap();
        assert_eq!(tag.attrs.len(), 1);
        assert_eq!(&*tag.get_attribute("a").unwrap(), "1");
    }

    #[test]
    fn comment_tokenized() {
        let tokens = tokenize("<!-- hi -->");
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::CommentToken(s) if &**s == " hi ")));
    }

    #[test]
    fn doctype_tokenized() {
        let tokens = tokenize("<!DOCTYPE html>");
        assert!(tokens.iter().any(|t| matches!(t, Token::DoctypeToken(d) if d.name.as_deref() == Some("html"))));
    }

    #[test]
    fn char_ref_in_data() {
        let tokens = tokenize("A &amp; B");
        let text: String = tokens
            .iter()
            .filter_map(|t| match t {
                Token::CharacterTokens(s) => Some(s.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "A & B");
    }

    #[test]
    fn script_data_exits_only_on_real_end_tag() {
        let tokens = tokenize("<script>var x = \"</scr\"+\"ipt>\";</script>");
        let end_tags: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t, Token::TagToken(tag) if tag.kind == TagKind::EndTag))
            .collect();
        assert_eq!(end_tags.len(), 1);
    }

    #[test]
    fn chunked_feed_matches_single_feed() {
        let whole = tokenize("<div class=\"a\">hello &amp; world</div>");
        let sink = CollectSink {
            tokens: RefCell::new(Vec::new()),
        };
        let tok = Tokenizer::new(sink, TokenizerOpts::default());
        for chunk in ["<div cla", "ss=\"a\">hel", "lo &amp", "; world</div>"] {
            tok.feed(StrTendril::from_slice(chunk)).unwrap();
        }
        tok.end();
        let chunked = tok.sink.tokens.into_inner();
        assert_eq!(whole, chunked);
    }
}
