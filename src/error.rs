//! The three-tier error taxonomy: recoverable parse errors (out-of-band,
//! never unwind), fatal input-usage errors and internal invariant violations
//! (both returned from the driver), kept in distinct types so a caller can
//! tell "quirky markup" apart from "you misused this API" apart from "this is
//! a parser bug".

use std::borrow::Cow;

/// A recoverable, spec-defined parse error. Parsing always continues after
/// one of these; they are purely informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: Cow<'static, str>,
}

impl ParseError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Fatal errors: either the caller used the API incorrectly, or the parser
/// detected an internal invariant violation. Neither indicates a problem with
/// the input document.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// `feed` was called reentrantly from within a token/tree-construction
    /// callback.
    #[error("parser fed reentrantly from within its own callback")]
    Reentrant,

    /// The tree builder reached an insertion mode with no defined handling.
    #[error("unknown insertion mode: {0}")]
    UnknownInsertionMode(&'static str),

    /// An internal invariant (e.g. a non-empty open-elements stack
    /// guaranteed by the algorithm) did not hold.
    #[error("internal invariant violated: {0}")]
    StackInvariant(&'static str),
}
