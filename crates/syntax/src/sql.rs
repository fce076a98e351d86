//! SQL parsing with the tree-sitter-sequel grammar.
//!
//! The grammar covers the common DDL and DML of the major dialects. Comments
//! are extras in the grammar, so text inside `--` and `/* */` never produces
//! statement nodes.

use std::borrow::Cow;

use querynav_types::OffsetRange;
use tree_sitter::{Node, Parser, Tree};

use crate::ParseError;

/// Node kinds at the top of a tree that are not statements.
const TRIVIA_KINDS: &[&str] = &["comment", "marginalia"];

/// A parsed SQL document.
#[derive(Debug, Clone)]
pub struct SqlTree {
    source: String,
    tree: Tree,
}

impl SqlTree {
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Top-level statements, in source order.
    pub fn statements(&self) -> impl Iterator<Item = Node<'_>> {
        named_children(self.root())
            .into_iter()
            .filter(|node| !TRIVIA_KINDS.contains(&node.kind()))
    }

    /// The statement containing `offset`, or ending right at it.
    #[must_use]
    pub fn statement_at(&self, offset: usize) -> Option<Node<'_>> {
        self.statements()
            .find(|node| node.start_byte() <= offset && offset <= node.end_byte())
    }

    /// The source text of `node`.
    #[must_use]
    pub fn text(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// The name an identifier node spells, with quotes removed.
    ///
    /// The returned range covers the name without its quotes.
    #[must_use]
    pub fn identifier(&self, node: Node<'_>) -> Option<(&str, OffsetRange)> {
        let text = self.text(node);
        let start = node.start_byte();
        let quoted = text.len() >= 2
            && matches!(
                (text.as_bytes()[0], text.as_bytes()[text.len() - 1]),
                (b'"', b'"') | (b'`', b'`') | (b'[', b']')
            );

        if quoted {
            let inner = &text[1..text.len() - 1];
            Some((inner, OffsetRange::new(start + 1, start + 1 + inner.len())))
        } else if text.is_empty() {
            None
        } else {
            Some((text, OffsetRange::new(start, node.end_byte())))
        }
    }
}

/// Named children of `node`, in source order.
#[must_use]
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

/// `node` followed by every named node under it, in source order.
#[must_use]
pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
    fn collect<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
        out.push(node);
        for child in named_children(node) {
            collect(child, out);
        }
    }

    let mut nodes = Vec::new();
    collect(node, &mut nodes);
    nodes
}

/// Parse a SQL document.
///
/// tree-sitter recovers from errors and always produces a tree, but error
/// nodes can swallow or invent statements. Any syntax error therefore fails
/// the whole parse, reporting the first error.
pub fn parse_sql(text: &str) -> Result<SqlTree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_sequel::LANGUAGE.into())
        .map_err(|e| ParseError::new(format!("SQL grammar failed to load: {e}"), 0))?;

    let normalized = normalize_escapes(text);
    let tree = parser
        .parse(normalized.as_ref(), None)
        .ok_or_else(|| ParseError::new("SQL parser produced no tree", 0))?;

    let root = tree.root_node();
    if root.has_error() {
        let error = first_error(root).unwrap_or_else(|| ParseError::new("syntax error", 0));
        tracing::debug!(offset = error.offset, "SQL document has syntax errors");
        return Err(error);
    }

    Ok(SqlTree {
        source: text.to_string(),
        tree,
    })
}

/// Rewrite backslash-escaped quotes (`'it\'s'`) to the standard doubled form.
///
/// Both spellings are two bytes long, so offsets into the rewritten text are
/// offsets into the original. Any other backslash pair is skipped whole, which
/// keeps `'a\\'` terminated at its last quote.
fn normalize_escapes(text: &str) -> Cow<'_, str> {
    if !text.contains("\\'") {
        return Cow::Borrowed(text);
    }

    let mut bytes = text.as_bytes().to_vec();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\\' {
            if bytes[i + 1] == b'\'' {
                bytes[i] = b'\'';
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    // Only ASCII bytes were replaced, so the text is still UTF-8
    String::from_utf8(bytes).map_or(Cow::Borrowed(text), Cow::Owned)
}

/// The first error or missing node under `node`, in source order.
fn first_error(node: Node<'_>) -> Option<ParseError> {
    if node.is_error() {
        return Some(ParseError::new("syntax error", node.start_byte()));
    }
    if node.is_missing() {
        return Some(ParseError::new(
            format!("missing {}", node.kind()),
            node.start_byte(),
        ));
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}
