//! Token types and the `TokenSink` trait that couples the tokenizer to its
//! consumer (the tree builder).

use tendril::StrTendril;

use crate::interface::{Attribute, QualName};
use crate::tokenizer::states::RawKind;

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub force_quirks: bool,
}

impl Doctype {
    pub fn new() -> Doctype {
        Default::default()
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: QualName,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// Are the two tags the same up to attribute order?
    pub fn equiv_modulo_attr_order(&self, other: &Tag) -> bool {
        if self.kind != other.kind || self.name != other.name || self.self_closing != other.self_closing {
            return false;
        }
        let mut this_attrs = self.attrs.clone();
        let mut other_attrs = other.attrs.clone();
        this_attrs.sort();
        other_attrs.sort();
        this_attrs == other_attrs
    }

    pub fn get_attribute(&self, name: &str) -> Option<&StrTendril> {
        self.attrs
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| &a.value)
    }
}

/// A token produced by the tokenizer.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Token {
    DoctypeToken(Doctype),
    TagToken(Tag),
    CommentToken(StrTendril),
    CharacterTokens(StrTendril),
    NullCharacterToken,
    EOFToken,
    ParseError(std::borrow::Cow<'static, str>),
}

/// What the tree builder asks the tokenizer to do next, in response to one
/// token. `Script`/`Plaintext`/`RawData` are how the two bidirectionally
/// coupled state machines stay in sync: a `<title>` start tag makes the tree
/// builder tell the tokenizer to switch to RCDATA before the next character
/// is read.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum TokenSinkResult {
    Continue,
    Plaintext,
    RawData(RawKind),
}

/// The tree builder implements this to receive tokens from the tokenizer.
pub trait TokenSink {
    /// Process one token.
    fn process_token(&self, token: Token) -> TokenSinkResult;

    /// Called once, after the final `EOFToken` has been processed.
    fn end(&self) {}

    /// Does the tokenizer's current insertion point live in foreign (non-HTML)
    /// content? Some tree-construction rules key off this to change error
    /// recovery.
    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        false
    }
}
