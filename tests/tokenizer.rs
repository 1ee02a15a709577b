//! Tokenizer-level tests that bypass tree construction: feed markup
//! straight into a [`Tokenizer`] with a recording sink and assert on the
//! token stream it emits.

use std::cell::RefCell;

use htmlcore::tokenizer::{TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts};
use tendril::StrTendril;

#[derive(Default)]
struct RecordingSink {
    tokens: RefCell<Vec<Token>>,
}

impl TokenSink for RecordingSink {
    fn process_token(&self, token: Token) -> TokenSinkResult {
        self.tokens.borrow_mut().push(token);
        TokenSinkResult::Continue
    }
}

fn tokenize(src: &str) -> Vec<Token> {
    let sink = RecordingSink::default();
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    tokenizer.feed(StrTendril::from_slice(src)).unwrap();
    tokenizer.end();
    tokenizer.sink.tokens.into_inner()
}

fn tag_names(tokens: &[Token]) -> Vec<(&str, TagKind)> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::TagToken(tag) => Some((&*tag.name.local, tag.kind)),
            _ => None,
        })
        .collect()
}

#[test]
fn simple_tags_and_text() {
    let tokens = tokenize("<p>Hi</p>");
    assert_eq!(
        tag_names(&tokens),
        vec![("p", TagKind::StartTag), ("p", TagKind::EndTag)]
    );
    let text: String = tokens
        .iter()
        .filter_map(|t| match t {
            Token::CharacterTokens(s) => Some(s.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hi");
}

#[test]
fn doctype_token_captures_name() {
    let tokens = tokenize("<!DOCTYPE html>");
    let doctype = tokens
        .iter()
        .find_map(|t| match t {
            Token::DoctypeToken(d) => Some(d),
            _ => None,
        })
        .expect("a doctype token");
    assert_eq!(doctype.name.as_deref(), Some("html"));
    assert!(!doctype.force_quirks);
}

#[test]
fn attribute_duplicate_name_keeps_first_value() {
    let tokens = tokenize("<x a=1 a=2>");
    let tag = tokens
        .iter()
        .find_map(|t| match t {
            Token::TagToken(tag) if &*tag.name.local == "x" => Some(tag),
            _ => None,
        })
        .expect("a tag token for <x>");
    let a_values: Vec<_> = tag
        .attrs
        .iter()
        .filter(|attr| &*attr.name.local == "a")
        .map(|attr| attr.value.to_string())
        .collect();
    assert_eq!(a_values, vec!["1"], "second a=2 must be dropped, not override the first");
}

#[test]
fn script_data_does_not_split_on_escaped_end_tag() {
    let src = r#"<script>var x = "</scr"+"ipt>";</script>"#;
    let tokens = tokenize(src);
    let end_tags: Vec<_> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::TagToken(tag) if tag.kind == TagKind::EndTag => Some(&*tag.name.local),
            _ => None,
        })
        .collect();
    assert_eq!(end_tags, vec!["script"], "only the real </script> ends the element");

    let body: String = tokens
        .iter()
        .filter_map(|t| match t {
            Token::CharacterTokens(s) => Some(s.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(body, r#"var x = "</scr"+"ipt>";"#);
}

#[test]
fn rcdata_title_resolves_entity_reference() {
    let tokens = tokenize("<title>A &amp; B</title>");
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
fn null_character_is_replaced_and_flagged_as_a_parse_error() {
    let tokens = tokenize("a\0b");
    let text: String = tokens
        .iter()
        .filter_map(|t| match t {
            Token::CharacterTokens(s) => Some(s.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "a\u{fffd}b");
    assert!(
        tokens.iter().any(|t| matches!(t, Token::ParseError(_))),
        "a bare NUL must be reported as a parse error"
    );
}

#[test]
fn feed_after_feed_is_not_reentrant() {
    let sink = RecordingSink::default();
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    assert!(tokenizer.feed(StrTendril::from_slice("<a>")).is_ok());
    assert!(tokenizer.feed(StrTendril::from_slice("</a>")).is_ok());
    tokenizer.end();
    assert_eq!(
        tag_names(&tokenizer.sink.tokens.into_inner()),
        vec![("a", TagKind::StartTag), ("a", TagKind::EndTag)]
    );
}
