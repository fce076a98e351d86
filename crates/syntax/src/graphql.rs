use apollo_parser::{Parser, SyntaxTree};

use crate::ParseError;

/// Parse a GraphQL document.
///
/// apollo-parser is error-tolerant and always produces a tree, but a tree
/// built from malformed text would yield partial declarations. Any syntax
/// error therefore fails the whole parse, reporting the first error.
pub fn parse_graphql(text: &str) -> Result<SyntaxTree, ParseError> {
    let tree = Parser::new(text).parse();

    if let Some(error) = tree.errors().next() {
        let error_count = tree.errors().len();
        tracing::debug!(error_count, "GraphQL document has syntax errors");
        return Err(ParseError::new(error.message(), error.index()));
    }

    Ok(tree)
}
