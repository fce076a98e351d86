//! Language engines.
//!
//! A [`LanguageEngine`] is the capability set one document family needs for
//! navigation: parsing, declaration extraction, enclosing-type inference and
//! textual reference scanning. The index, resolver, scanner and fallback are
//! written once in [`crate::Navigator`] on top of this trait.

mod graphql;
mod sql;

use std::borrow::Cow;

use querynav_syntax::{LineIndex, ParseError};
use querynav_types::{Language, OffsetRange};

use crate::index::TokenClass;
use crate::types::DocumentSymbol;

pub use graphql::GraphQLEngine;
pub use sql::SqlEngine;

/// A declaration found while walking a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSite {
    /// Which lookup table the declaration belongs to
    pub class: TokenClass,
    /// Declared name; fields are qualified as `Type.field`
    pub name: String,
    /// Span of the name token
    pub range: OffsetRange,
}

impl DeclarationSite {
    pub fn new(class: TokenClass, name: impl Into<String>, range: OffsetRange) -> Self {
        Self {
            class,
            name: name.into(),
            range,
        }
    }
}

/// Where the reference scanner looks for occurrences of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceScope {
    /// Every workspace document matching the include globs
    Workspace {
        include: Vec<String>,
        exclude: Vec<String>,
    },
    /// Only the document the request came from
    Document,
}

pub trait LanguageEngine: Send + Sync + 'static {
    /// Parsed form of one document
    type Tree: Send + Sync + 'static;

    fn language(&self) -> Language;

    /// Parse a whole document. Malformed text is an error, never a partial tree.
    fn parse(&self, text: &str) -> Result<Self::Tree, ParseError>;

    /// Every declaration in the document, in source order.
    fn extract_declarations(&self, tree: &Self::Tree) -> Vec<DeclarationSite>;

    /// Name of the type-like declaration qualifying field lookups at `offset`.
    fn enclosing_type(&self, tree: &Self::Tree, offset: usize) -> Option<String>;

    /// Canonical lookup key for a declared or referenced name.
    fn normalize_name<'a>(&self, name: &'a str) -> Cow<'a, str>;

    fn reference_scope(&self) -> &ReferenceScope;

    /// Every textual occurrence of `token` in `text`.
    fn scan_references(&self, text: &str, token: &str) -> Vec<OffsetRange>;

    /// Outline of a parsed document.
    fn document_symbols(&self, tree: &Self::Tree, line_index: &LineIndex) -> Vec<DocumentSymbol>;
}

/// Build a whole-word pattern for `token`, optionally case-insensitive.
pub(crate) fn word_pattern(token: &str, case_insensitive: bool) -> Option<regex::Regex> {
    let flags = if case_insensitive { "(?i)" } else { "" };
    let pattern = format!(r"{flags}\b{}\b", regex::escape(token));
    match regex::Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(token, error = %e, "Could not build reference pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_pattern_is_whole_word() {
        let regex = word_pattern("User", false).unwrap();
        let text = "User Users user SuperUser User_ [User]";
        let hits: Vec<_> = regex.find_iter(text).map(|m| m.start()).collect();
        assert_eq!(hits, vec![0, 33]);
    }

    #[test]
    fn test_word_pattern_case_insensitive() {
        let regex = word_pattern("users", true).unwrap();
        assert_eq!(regex.find_iter("USERS users Users").count(), 3);
    }

    #[test]
    fn test_word_pattern_escapes_metacharacters() {
        assert!(word_pattern("a.b", false).unwrap().find("axb").is_none());
    }
}
