//! # Syntax layer
//!
//! Parsing for the two document families querynav navigates:
//!
//! - **GraphQL** schema and executable documents, parsed into an
//!   [`apollo_parser::SyntaxTree`] by [`parse_graphql`].
//! - **SQL** scripts, parsed into a tree-sitter tree by [`parse_sql`].
//!
//! Both parsers fail with a [`ParseError`] on malformed input instead of
//! handing back a partial tree, so callers can keep the last good result.
//!
//! The crate also provides [`LineIndex`] for translating byte offsets to
//! editor positions, and [`word_range_at`] for finding the token under a
//! cursor.

mod graphql;
mod line_index;
mod sql;
mod word;

pub use apollo_parser::SyntaxTree;
pub use graphql::parse_graphql;
pub use line_index::LineIndex;
pub use sql::{descendants, named_children, parse_sql, SqlTree};
pub use word::{is_word_byte, word_at, word_range_at};

/// A parse error with position information
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    pub message: String,
    /// Byte offset where the error occurred
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}
