//! SQL engine, built on the tree-sitter tree from [`querynav_syntax::parse_sql`].
//!
//! Declarations come from `CREATE` statements. Tables and views are the
//! type-like entries, table columns are their fields, and every other named
//! object (functions, triggers, indexes...) shares the third table. Names are
//! case-insensitive, so every key is folded to lower case.

use std::borrow::Cow;

use querynav_config::SqlConfig;
use querynav_syntax::{descendants, named_children, parse_sql, LineIndex, ParseError, SqlTree};
use querynav_types::{Language, OffsetRange};
use tree_sitter::Node;

use super::{word_pattern, DeclarationSite, LanguageEngine, ReferenceScope};
use crate::index::TokenClass;
use crate::types::{DocumentSymbol, SymbolKind};

/// Node kinds whose `object_reference` child names the relation a statement
/// reads or writes.
const RELATION_PARENTS: &[&str] = &["relation", "insert", "update", "delete", "from"];

#[derive(Debug, Clone)]
pub struct SqlEngine {
    comment_marker: String,
    scope: ReferenceScope,
}

impl SqlEngine {
    #[must_use]
    pub fn new(config: &SqlConfig) -> Self {
        Self {
            comment_marker: config.comment_marker.clone(),
            scope: ReferenceScope::Document,
        }
    }

    /// Whether the line containing `offset` is a line comment.
    fn in_comment_line(&self, text: &str, offset: usize) -> bool {
        let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
        text[line_start..]
            .trim_start()
            .starts_with(self.comment_marker.as_str())
    }
}

impl Default for SqlEngine {
    fn default() -> Self {
        Self::new(&SqlConfig::default())
    }
}

impl LanguageEngine for SqlEngine {
    type Tree = SqlTree;

    fn language(&self) -> Language {
        Language::Sql
    }

    fn parse(&self, text: &str) -> Result<SqlTree, ParseError> {
        parse_sql(text)
    }

    fn extract_declarations(&self, tree: &SqlTree) -> Vec<DeclarationSite> {
        let mut sites = Vec::new();

        for object in SqlObject::all(tree) {
            let class = if object.kind.is_relation() {
                TokenClass::Type
            } else {
                TokenClass::Fragment
            };
            sites.push(DeclarationSite::new(class, object.name.clone(), object.name_range));

            for column in &object.columns {
                sites.push(DeclarationSite::new(
                    TokenClass::Field,
                    format!("{}.{}", object.name, column.name),
                    column.name_range,
                ));
            }
        }

        sites
    }

    fn enclosing_type(&self, tree: &SqlTree, offset: usize) -> Option<String> {
        let stmt = tree.statement_at(offset)?;
        let nodes = descendants(stmt);

        // Inside a CREATE TABLE or CREATE VIEW, the object being created
        let declaring = nodes
            .iter()
            .filter(|node| node.start_byte() <= offset && offset <= node.end_byte())
            .filter_map(|node| SqlObject::from_node(tree, *node))
            .find(|object| object.kind.is_relation());
        if let Some(object) = declaring {
            return Some(object.name);
        }

        // Otherwise the first relation the statement reads or writes
        nodes
            .iter()
            .filter(|node| node.kind() == "object_reference")
            .find(|node| {
                node.parent()
                    .is_some_and(|parent| RELATION_PARENTS.contains(&parent.kind()))
            })
            .and_then(|reference| reference_name(*reference))
            .and_then(|name| tree.identifier(name))
            .map(|(name, _)| name.to_string())
    }

    fn normalize_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if name.chars().any(char::is_uppercase) {
            Cow::Owned(name.to_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    }

    fn reference_scope(&self) -> &ReferenceScope {
        &self.scope
    }

    fn scan_references(&self, text: &str, token: &str) -> Vec<OffsetRange> {
        let Some(regex) = word_pattern(token, true) else {
            return Vec::new();
        };
        regex
            .find_iter(text)
            .filter(|m| !self.in_comment_line(text, m.start()))
            .map(|m| OffsetRange::new(m.start(), m.end()))
            .collect()
    }

    fn document_symbols(&self, tree: &SqlTree, line_index: &LineIndex) -> Vec<DocumentSymbol> {
        SqlObject::all(tree)
            .into_iter()
            .map(|object| {
                let children = object
                    .columns
                    .iter()
                    .map(|column| {
                        let symbol = DocumentSymbol::new(
                            column.name.clone(),
                            SymbolKind::Column,
                            line_index.offset_range_to_range(column.range),
                            line_index.offset_range_to_range(column.name_range),
                        );
                        match &column.data_type {
                            Some(data_type) => symbol.with_detail(data_type.clone()),
                            None => symbol,
                        }
                    })
                    .collect();
                DocumentSymbol::new(
                    object.name,
                    object.kind.symbol_kind(),
                    line_index.offset_range_to_range(object.range),
                    line_index.offset_range_to_range(object.name_range),
                )
                .with_children(children)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Table,
    View,
    Function,
    Procedure,
    Trigger,
    Index,
    Sequence,
    Type,
    Schema,
}

impl ObjectKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        Some(match kind {
            "create_table" => Self::Table,
            "create_view" | "create_materialized_view" => Self::View,
            "create_function" => Self::Function,
            "create_procedure" => Self::Procedure,
            "create_trigger" => Self::Trigger,
            "create_index" => Self::Index,
            "create_sequence" => Self::Sequence,
            "create_type" => Self::Type,
            "create_schema" => Self::Schema,
            _ => return None,
        })
    }

    const fn is_relation(self) -> bool {
        matches!(self, Self::Table | Self::View)
    }

    const fn symbol_kind(self) -> SymbolKind {
        match self {
            Self::Table => SymbolKind::Table,
            Self::View => SymbolKind::View,
            Self::Function => SymbolKind::Function,
            Self::Procedure => SymbolKind::Procedure,
            Self::Trigger => SymbolKind::Trigger,
            Self::Index => SymbolKind::Index,
            Self::Sequence => SymbolKind::Sequence,
            Self::Type => SymbolKind::Type,
            Self::Schema => SymbolKind::Schema,
        }
    }
}

/// An object declared by a `CREATE` statement.
struct SqlObject {
    kind: ObjectKind,
    name: String,
    name_range: OffsetRange,
    range: OffsetRange,
    columns: Vec<Column>,
}

struct Column {
    name: String,
    name_range: OffsetRange,
    range: OffsetRange,
    data_type: Option<String>,
}

impl SqlObject {
    /// Every declared object in the document, in source order.
    fn all(tree: &SqlTree) -> Vec<Self> {
        descendants(tree.root())
            .into_iter()
            .filter_map(|node| Self::from_node(tree, node))
            .collect()
    }

    fn from_node(tree: &SqlTree, node: Node<'_>) -> Option<Self> {
        let kind = ObjectKind::from_node_kind(node.kind())?;

        // An index's `object_reference` is the indexed table, and
        // `CREATE INDEX ON t (...)` declares nothing nameable
        let name_node = if kind == ObjectKind::Index {
            child_of_kind(node, "identifier")
        } else {
            child_of_kind(node, "object_reference")
                .and_then(reference_name)
                .or_else(|| child_of_kind(node, "identifier"))
        }?;
        let (name, name_range) = tree.identifier(name_node)?;

        let columns = if kind == ObjectKind::Table {
            child_of_kind(node, "column_definitions")
                .map(|list| {
                    named_children(list)
                        .into_iter()
                        .filter(|child| child.kind() == "column_definition")
                        .filter_map(|child| Column::from_node(tree, child))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        Some(Self {
            kind,
            name: name.to_string(),
            name_range,
            range: node_range(node),
            columns,
        })
    }
}

impl Column {
    fn from_node(tree: &SqlTree, node: Node<'_>) -> Option<Self> {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| child_of_kind(node, "identifier"))?;
        let (name, name_range) = tree.identifier(name_node)?;

        let data_type = node
            .child_by_field_name("type")
            .or_else(|| name_node.next_named_sibling())
            .map(|type_node| tree.text(type_node).to_string());

        Some(Self {
            name: name.to_string(),
            name_range,
            range: node_range(node),
            data_type,
        })
    }
}

/// The last segment of `schema.table`, or the only one.
fn reference_name(reference: Node<'_>) -> Option<Node<'_>> {
    reference.child_by_field_name("name").or_else(|| {
        named_children(reference)
            .into_iter()
            .rfind(|child| child.kind() == "identifier")
    })
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == kind)
}

fn node_range(node: Node<'_>) -> OffsetRange {
    OffsetRange::new(node.start_byte(), node.end_byte())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SqlTree {
        SqlEngine::default().parse(text).unwrap()
    }

    fn names(sites: &[DeclarationSite], class: TokenClass) -> Vec<&str> {
        sites
            .iter()
            .filter(|site| site.class == class)
            .map(|site| site.name.as_str())
            .collect()
    }

    #[test]
    fn test_extract_tables_and_columns() {
        let engine = SqlEngine::default();
        let text = r"
CREATE TABLE IF NOT EXISTS public.users (
    id int PRIMARY KEY,
    email varchar(255) NOT NULL,
    org_id int REFERENCES orgs (id),
    CONSTRAINT users_email_key UNIQUE (email)
);
CREATE OR REPLACE VIEW active_users AS SELECT * FROM users WHERE active;
";
        let sites = engine.extract_declarations(&parse(text));

        assert_eq!(names(&sites, TokenClass::Type), vec!["users", "active_users"]);
        assert_eq!(
            names(&sites, TokenClass::Field),
            vec!["users.id", "users.email", "users.org_id"]
        );
        assert_eq!(sites[0].range.slice(text), Some("users"));
    }

    #[test]
    fn test_extract_other_objects() {
        let engine = SqlEngine::default();
        let text = "
CREATE UNIQUE INDEX idx_users_email ON users (email);
CREATE INDEX ON users (created_at);
CREATE SEQUENCE order_seq;
CREATE MATERIALIZED VIEW stats AS SELECT 1;
CREATE SCHEMA billing;
";
        let sites = engine.extract_declarations(&parse(text));

        assert_eq!(
            names(&sites, TokenClass::Fragment),
            vec!["idx_users_email", "order_seq", "billing"]
        );
        assert_eq!(names(&sites, TokenClass::Type), vec!["stats"]);
    }

    #[test]
    fn test_keyword_named_columns() {
        let engine = SqlEngine::default();
        let text = "CREATE TABLE settings (key text NOT NULL, value text, PRIMARY KEY (key));";
        let sites = engine.extract_declarations(&parse(text));

        assert_eq!(names(&sites, TokenClass::Type), vec!["settings"]);
        assert_eq!(
            names(&sites, TokenClass::Field),
            vec!["settings.key", "settings.value"]
        );
        assert_eq!(sites[1].range.slice(text), Some("key"));
    }

    #[test]
    fn test_quoted_names_are_unquoted() {
        let engine = SqlEngine::default();
        let text = r#"CREATE TABLE "Order Items" ("Qty" int);"#;
        let sites = engine.extract_declarations(&parse(text));

        assert_eq!(sites[0].name, "Order Items");
        assert_eq!(sites[0].range.slice(text), Some("Order Items"));
        assert_eq!(sites[1].name, "Order Items.Qty");
    }

    #[test]
    fn test_commented_out_create_is_ignored() {
        let engine = SqlEngine::default();
        let text = "-- CREATE TABLE ghost (id int);\n/* CREATE TABLE ghost2 (id int); */";
        assert!(engine.extract_declarations(&parse(text)).is_empty());
    }

    #[test]
    fn test_enclosing_type() {
        let engine = SqlEngine::default();
        let text = "CREATE TABLE users (id int);\nSELECT email FROM app.users u JOIN orgs o ON o.id = u.org_id;\nUPDATE accounts SET balance = 0;";
        let tree = parse(text);

        assert_eq!(
            engine.enclosing_type(&tree, text.find("id int").unwrap()),
            Some("users".to_string())
        );
        assert_eq!(
            engine.enclosing_type(&tree, text.find("email").unwrap()),
            Some("users".to_string())
        );
        assert_eq!(
            engine.enclosing_type(&tree, text.find("balance").unwrap()),
            Some("accounts".to_string())
        );
    }

    #[test]
    fn test_normalize_name_folds_case() {
        let engine = SqlEngine::default();
        assert_eq!(engine.normalize_name("Users"), "users");
        assert!(matches!(engine.normalize_name("users"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_scan_references_skips_comment_lines() {
        let engine = SqlEngine::default();
        let text = "CREATE TABLE users (id int);\n  -- users is great\nSELECT * FROM USERS;";
        let hits = engine.scan_references(text, "users");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].slice(text), Some("USERS"));
    }

    #[test]
    fn test_custom_comment_marker() {
        let engine = SqlEngine::new(&SqlConfig {
            comment_marker: "#".to_string(),
            ..SqlConfig::default()
        });
        let text = "# users\n-- users\nSELECT 1";
        assert_eq!(engine.scan_references(text, "users").len(), 1);
    }

    #[test]
    fn test_document_symbols() {
        let engine = SqlEngine::default();
        let text = "CREATE TABLE users (\n  id int,\n  name text\n);\nCREATE SEQUENCE counter;";
        let symbols = engine.document_symbols(&parse(text), &LineIndex::new(text));

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].kind, SymbolKind::Table);
        assert_eq!(symbols[0].children.len(), 2);
        assert_eq!(symbols[0].children[1].name, "name");
        assert_eq!(symbols[0].children[1].detail.as_deref(), Some("text"));
        assert_eq!(symbols[1].kind, SymbolKind::Sequence);
        assert!(symbols[1].children.is_empty());
    }
}
