//! An HTML5 tokenizer and tree constructor: turns a stream of document
//! chunks into an arena-backed DOM, following the WHATWG parsing algorithm.
//!
//! `driver` is the crate's top-level entry point, composing a
//! [`tokenizer::Tokenizer`] over a [`tree_builder::TreeBuilder`].

pub mod dom;
pub mod driver;
pub mod error;
pub mod interface;
pub mod tokenizer;
pub mod tree_builder;
pub mod util;

pub use dom::{Dom, NodeId};
pub use driver::{parse_document, parse_fragment, ParseOpts, Parser};
pub use error::{CoreError, ParseError};
