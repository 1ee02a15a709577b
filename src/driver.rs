//! The top-level entry point: wires a [`Tokenizer`] to a [`TreeBuilder`] and
//! drives both from a sequence of input chunks.
//!
//! A thin `Parser` struct sits over `Tokenizer<TreeBuilder>`, plus
//! `parse_document`/`parse_fragment` convenience functions for the common
//! case of "I have a whole string, give me a tree".

use tendril::StrTendril;

use crate::dom::{Dom, NodeId};
use crate::error::CoreError;
use crate::interface::QualName;
use crate::tokenizer::{RawKind, State, Tokenizer, TokenizerOpts};
use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};

/// Options for a full parse, composing the tokenizer's and tree builder's
/// own option structs.
#[derive(Clone, Default)]
pub struct ParseOpts {
    pub tokenizer: TokenizerOpts,
    pub tree_builder: TreeBuilderOpts,
}

/// A document (or fragment) parse in progress. Feed it chunks, then call
/// [`Parser::finish`] to obtain the resulting [`Dom`].
pub struct Parser {
    tokenizer: Tokenizer<TreeBuilder>,
}

impl Parser {
    fn from_tokenizer(tokenizer: Tokenizer<TreeBuilder>) -> Self {
        Parser { tokenizer }
    }

    /// Feed one more chunk of decoded input.
    ///
    /// Returns an error only if called reentrantly from within a callback
    /// this parser itself issued; document text never causes an error here
    /// (malformed markup is reported as a recoverable parse error instead).
    pub fn feed(&self, input: StrTendril) -> Result<(), CoreError> {
        self.tokenizer.feed(input)
    }

    /// Signal end of input and return the finished tree.
    pub fn finish(self) -> Dom {
        self.tokenizer.end();
        self.tokenizer.sink.into_dom()
    }
}

/// Parse a complete, pre-decoded HTML document in one call.
///
/// Equivalent to constructing a [`Parser`] via [`parse_document`]'s own
/// building blocks, feeding `input` in a single chunk, and finishing.
pub fn parse_document(input: StrTendril, opts: ParseOpts) -> Dom {
    let tree_builder = TreeBuilder::new(opts.tree_builder);
    let tokenizer = Tokenizer::new(tree_builder, opts.tokenizer);
    let parser = Parser::from_tokenizer(tokenizer);
    parser.feed(input).expect("fresh parser cannot be fed reentrantly");
    parser.finish()
}

/// Parse `input` as an HTML fragment in the context of `context_name`
/// (e.g. `"div"`, `"td"`), per the Standard's fragment-parsing algorithm:
/// seed the open-elements stack with a synthetic `html` root and the
/// context element, prime the tokenizer's raw-text state for elements like
/// `<title>`/`<textarea>`/`<script>` when the context itself demands it,
/// and return the context element's children once parsing completes.
pub fn parse_fragment(input: StrTendril, context_name: &str, opts: ParseOpts) -> Vec<NodeId> {
    let tree_builder = TreeBuilder::new(opts.tree_builder);
    let context = tree_builder.dom.create_element(
        QualName::html(crate::local_name!(context_name.to_owned())),
        Vec::new(),
    );

    let mut tokenizer_opts = opts.tokenizer;
    tokenizer_opts.last_start_tag_name = Some(crate::local_name!(context_name.to_owned()));
    tokenizer_opts.initial_state = tokenizer_opts.initial_state.or(initial_state_for_context(context_name));

    tree_builder.seed_fragment_parsing(context);

    let tokenizer = Tokenizer::new(tree_builder, tokenizer_opts);
    let parser = Parser::from_tokenizer(tokenizer);
    parser.feed(input).expect("fresh parser cannot be fed reentrantly");
    let dom = parser.finish();
    dom.children(context)
}

/// The tokenizer state a fragment's context element implies, per the
/// Standard's fragment-parsing algorithm step that primes the tokenizer
/// before the first token is consumed.
fn initial_state_for_context(context_name: &str) -> Option<State> {
    match context_name {
        "title" | "textarea" => Some(State::RawData(RawKind::Rcdata)),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(State::RawData(RawKind::Rawtext)),
        "script" => Some(State::RawData(RawKind::ScriptData)),
        "plaintext" => Some(State::Plaintext),
        _ => None,
    }
}
