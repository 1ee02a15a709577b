//! Internal types shared across the tree builder's insertion-mode handlers.

use tendril::StrTendril;

use crate::tokenizer::{Tag, Token as TokenizerToken};

/// The 23 insertion modes defined by the tree-construction algorithm.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// The tree builder's own token vocabulary: a thin reshaping of the
/// tokenizer's `Token` that merges adjacent character tokens as they arrive
/// and folds `NullCharacterToken`/non-character-reference whitespace
/// classification in at construction time, as `InBody` and several `InTable`
/// rules need to test "is every character in this chunk whitespace".
#[derive(Debug, Clone)]
pub enum Token {
    Doctype(crate::tokenizer::Doctype),
    Tag(Tag),
    Comment(StrTendril),
    Characters(StrTendril),
    Eof,
}

impl From<TokenizerToken> for Option<Token> {
    fn from(t: TokenizerToken) -> Self {
        match t {
            TokenizerToken::DoctypeToken(d) => Some(Token::Doctype(d)),
            TokenizerToken::TagToken(tag) => Some(Token::Tag(tag)),
            TokenizerToken::CommentToken(s) => Some(Token::Comment(s)),
            TokenizerToken::CharacterTokens(s) => Some(Token::Characters(s)),
            TokenizerToken::NullCharacterToken => {
                let mut s = StrTendril::new();
                s.push_char('\0');
                Some(Token::Characters(s))
            }
            TokenizerToken::EOFToken => Some(Token::Eof),
            // Parse errors are surfaced through `TokenSink::process_token`'s
            // return value before the builder ever calls this conversion.
            TokenizerToken::ParseError(_) => None,
        }
    }
}

/// One entry in the list of active formatting elements.
#[derive(Clone, Debug)]
pub enum FormatEntry<Handle> {
    Element(Handle, Tag),
    Marker,
}
