//! Integration tests for querynav-ide.
//!
//! These tests drive `AnalysisHost` / `Analysis` the way the language server
//! does: documents are opened into the host, requests run on snapshots.

use std::path::PathBuf;

use querynav_config::NavConfig;
use querynav_ide::{
    discover_files, AnalysisHost, CancellationToken, DefinitionResult, FileUri, Language, Location,
    Position, Range, SymbolKind,
};
use querynav_test_utils::{extract_cursor, extract_cursors, fixture_uri, position_of};

fn host() -> AnalysisHost {
    AnalysisHost::with_config(NavConfig::default(), vec![PathBuf::from("/querynav-fixture")])
}

fn open(host: &mut AnalysisHost, name: &str, text: &str) -> FileUri {
    let uri = fixture_uri(name);
    let language = Language::from_path(&PathBuf::from(name)).unwrap();
    host.open_document(&uri, text, language);
    uri
}

fn locations(result: Option<DefinitionResult>) -> Vec<Location> {
    match result {
        Some(DefinitionResult::Locations(locations)) => locations,
        other => panic!("expected declaration locations, got {other:?}"),
    }
}

// ============================================================================
// Declaration resolution
// ============================================================================

#[test]
fn test_type_resolves_to_other_document() {
    let mut host = host();
    let a = open(&mut host, "a.graphql", "type User { id: ID name: String }");
    let (text, cursor) = extract_cursor("type Query { user: Us$0er }");
    let b = open(&mut host, "b.graphql", &text);

    let result = host.snapshot().goto_definition(&b, cursor);

    assert_eq!(locations(result), vec![Location::new(a, Range::on_line(0, 5, 9))]);
}

#[test]
fn test_same_document_declaration_is_preferred() {
    let mut host = host();
    open(&mut host, "a.graphql", "type User { id: ID }");
    let (text, cursor) = extract_cursor("type User { id: ID }\ntype Query { me: User$0 }");
    let b = open(&mut host, "b.graphql", &text);

    let result = host.snapshot().goto_definition(&b, cursor);

    assert_eq!(locations(result), vec![Location::new(b, Range::on_line(0, 5, 9))]);
}

#[test]
fn test_fragment_spread_resolves() {
    let mut host = host();
    let fragments = open(
        &mut host,
        "fragments.graphql",
        "fragment UserFields on User { id name }",
    );
    let (text, cursor) = extract_cursor("query Me { me { ...User$0Fields } }");
    let query = open(&mut host, "query.graphql", &text);

    let result = host.snapshot().goto_definition(&query, cursor);

    assert_eq!(
        locations(result),
        vec![Location::new(fragments, Range::on_line(0, 9, 19))]
    );
}

#[test]
fn test_field_resolves_through_enclosing_type() {
    let mut host = host();
    let (text, cursor) = extract_cursor(
        "type User { name: String }\ntype Pet { name: String }\nextend type Pet { na$0me: String }",
    );
    let uri = open(&mut host, "schema.graphql", &text);

    let result = host.snapshot().declarations_at(&uri, cursor);

    // The extension redeclares Pet.name; the last declaration wins
    assert_eq!(result, vec![Location::new(uri, Range::on_line(2, 18, 22))]);
}

#[test]
fn test_field_does_not_leak_across_types() {
    let mut host = host();
    open(&mut host, "schema.graphql", "type User { email: String }\ntype Pet { id: ID }");
    let (text, cursor) = extract_cursor("fragment P on Pet { ema$0il }");
    let uri = open(&mut host, "pet.graphql", &text);

    assert!(host.snapshot().declarations_at(&uri, cursor).is_empty());
}

#[test]
fn test_operation_fields_resolve_on_root_type() {
    let mut host = host();
    let schema = open(
        &mut host,
        "schema.graphql",
        "type Query { viewer: String }\ntype Mutation { viewer: String }",
    );
    let (text, cursor) = extract_cursor("mutation { view$0er }");
    let op = open(&mut host, "op.graphql", &text);

    let result = host.snapshot().declarations_at(&op, cursor);

    assert_eq!(result, vec![Location::new(schema, Range::on_line(1, 16, 22))]);
}

// ============================================================================
// Index lifecycle
// ============================================================================

#[test]
fn test_update_is_idempotent() {
    let mut host = host();
    let text = "type User { id: ID }\nenum Role { ADMIN USER }\nfragment F on User { id }";
    let uri = open(&mut host, "a.graphql", text);
    let first = host.snapshot().file_declarations(&uri).unwrap();

    host.change_document(&uri, text);
    let second = host.snapshot().file_declarations(&uri).unwrap();

    assert_eq!(first, second);
    assert!(second.lookup_field("Role.ADMIN").is_some());
}

#[test]
fn test_parse_failure_keeps_previous_declarations() {
    let mut host = host();
    let uri = open(&mut host, "a.graphql", "type User { id: ID }");
    let before = host.snapshot().file_declarations(&uri).unwrap();

    assert!(!host.change_document(&uri, "type User { id: "));

    assert_eq!(host.snapshot().file_declarations(&uri).unwrap(), before);
}

#[test]
fn test_snapshot_is_isolated_from_later_updates() {
    let mut host = host();
    let uri = open(&mut host, "a.graphql", "type User { id: ID }");
    let snapshot = host.snapshot();

    host.change_document(&uri, "type Account { id: ID }");

    assert!(snapshot.file_declarations(&uri).unwrap().lookup_type("User").is_some());
    let fresh = host.snapshot().file_declarations(&uri).unwrap();
    assert!(fresh.lookup_type("User").is_none());
    assert!(fresh.lookup_type("Account").is_some());
}

#[test]
fn test_closed_document_stays_indexed() {
    let mut host = host();
    let a = open(&mut host, "a.graphql", "scalar Date");
    host.close_document(&a);

    assert_eq!(host.files(), vec![a.clone()]);
    assert!(host.snapshot().file_declarations(&a).is_some());
}

// ============================================================================
// Reference fallback
// ============================================================================

#[test]
fn test_undeclared_name_falls_back_to_references() {
    let mut host = host();
    let a = open(&mut host, "a.graphql", "type Query { now: DateTime }");
    let (text, cursor) = extract_cursor("type Event { at: Date$0Time }");
    let b = open(&mut host, "b.graphql", &text);

    let snapshot = host.snapshot();
    let result = snapshot.goto_definition(&b, cursor);
    let references = snapshot.find_references(&b, cursor, true);

    let Some(DefinitionResult::Links(links)) = result else {
        panic!("expected links, got {result:?}");
    };
    assert_eq!(references.len(), 2);
    assert_eq!(links.len(), references.len());
    for (link, reference) in links.iter().zip(&references) {
        assert_eq!(link.origin, Range::on_line(0, 17, 25));
        assert_eq!(&link.target, reference);
    }
    assert_eq!(references[0].file, a);
}

#[test]
fn test_document_outside_workspace_scans_itself() {
    let mut host = AnalysisHost::new();
    let (text, cursors) =
        extract_cursors("type Query { now: Date$1Time }\ntype Event { at: $2DateTime }");
    let uri = FileUri::new("file:///tmp/querynav-scratch/a.graphql");
    host.open_document(&uri, &text, Language::GraphQL);
    let snapshot = host.snapshot();

    let references = snapshot.find_references(&uri, cursors[0], true);
    assert_eq!(
        references,
        vec![
            Location::new(uri.clone(), Range::on_line(0, 18, 26)),
            Location::new(uri.clone(), Range::on_line(1, 17, 25)),
        ]
    );

    let result = snapshot.goto_definition(&uri, cursors[1]);
    let Some(DefinitionResult::Links(links)) = result else {
        panic!("expected links, got {result:?}");
    };
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|link| link.origin == Range::on_line(1, 17, 25)));
}

#[test]
fn test_no_word_under_cursor_is_none() {
    let mut host = host();
    let (text, cursor) = extract_cursor("type Query { a: Int }  $0 ");
    let uri = open(&mut host, "a.graphql", &text);

    assert_eq!(host.snapshot().goto_definition(&uri, cursor), None);
}

#[test]
fn test_find_references_reports_progress() {
    let mut host = host();
    open(&mut host, "a.graphql", "type User { id: ID }");
    open(&mut host, "b.graphql", "type Query { user: User }");
    let (text, cursor) = extract_cursor("fragment F on Us$0er { id }");
    let c = open(&mut host, "c.graphql", &text);

    let mut reports = Vec::new();
    let references = host.snapshot().find_references_with(
        &c,
        cursor,
        false,
        &CancellationToken::new(),
        &mut |progress| reports.push(progress.percentage()),
    );

    assert_eq!(references.len(), 3);
    assert_eq!(reports, vec![33, 66, 100]);
}

#[test]
fn test_cancelled_reference_search_is_partial() {
    let mut host = host();
    open(&mut host, "a.graphql", "type User { id: ID }");
    open(&mut host, "b.graphql", "type Query { user: User }");
    let (text, cursor) = extract_cursor("fragment F on Us$0er { id }");
    let c = open(&mut host, "c.graphql", &text);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let references = host
        .snapshot()
        .find_references_with(&c, cursor, true, &cancel, &mut |_| {});

    assert!(references.is_empty());
}

// ============================================================================
// SQL
// ============================================================================

#[test]
fn test_sql_table_resolves_to_create_statement() {
    let mut host = host();
    let (text, cursor) = extract_cursor(
        "CREATE TABLE users (id int, email text);\n-- users are people\nSELECT * FROM us$0ers;",
    );
    let uri = open(&mut host, "schema.sql", &text);

    let result = host.snapshot().goto_definition(&uri, cursor);

    assert_eq!(locations(result), vec![Location::new(uri, Range::on_line(0, 13, 18))]);
}

#[test]
fn test_sql_column_resolves_within_query_relation() {
    let mut host = host();
    let (text, cursor) =
        extract_cursor("CREATE TABLE Users (id int, email text);\nSELECT EMAIL$0 FROM users;");
    let uri = open(&mut host, "schema.sql", &text);

    let result = host.snapshot().declarations_at(&uri, cursor);

    assert_eq!(result, vec![Location::new(uri, Range::on_line(0, 28, 33))]);
}

#[test]
fn test_sql_references_skip_comment_lines() {
    let mut host = host();
    let text = "CREATE TABLE users (id int);\n  -- users is a table\nSELECT * FROM USERS;";
    let uri = open(&mut host, "schema.sql", text);

    let references = host
        .snapshot()
        .find_references(&uri, position_of(text, "USERS", 0), true);

    assert_eq!(
        references,
        vec![
            Location::new(uri.clone(), Range::on_line(0, 13, 18)),
            Location::new(uri, Range::on_line(2, 14, 19)),
        ]
    );
}

#[test]
fn test_sql_token_only_in_comments_is_none() {
    let mut host = host();
    let (text, cursor) = extract_cursor("-- Fo$0o is gone\n-- Foo again\nSELECT 1;");
    let uri = open(&mut host, "a.sql", &text);

    let snapshot = host.snapshot();
    assert!(snapshot.declarations_at(&uri, cursor).is_empty());
    assert!(snapshot.find_references(&uri, cursor, true).is_empty());
    assert_eq!(snapshot.goto_definition(&uri, cursor), None);
}

#[test]
fn test_sql_references_stay_in_document() {
    let mut host = host();
    open(&mut host, "other.sql", "SELECT * FROM orders;");
    let (text, cursor) = extract_cursor("SELECT * FROM ord$0ers;");
    let uri = open(&mut host, "a.sql", &text);

    let result = host.snapshot().goto_definition(&uri, cursor);

    let Some(DefinitionResult::Links(links)) = result else {
        panic!("expected links, got {result:?}");
    };
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target.file, uri);
}

#[test]
fn test_sql_reference_cache_follows_edits() {
    let mut host = host();
    let uri = open(&mut host, "a.sql", "SELECT * FROM orders;");
    let position = Position::new(0, 16);
    assert_eq!(host.snapshot().find_references(&uri, position, true).len(), 1);

    host.change_document(&uri, "SELECT * FROM orders JOIN orders o2 ON true;");

    assert_eq!(host.snapshot().find_references(&uri, position, true).len(), 2);
}

// ============================================================================
// Outline and workspace loading
// ============================================================================

#[test]
fn test_document_symbols_for_both_languages() {
    let mut host = host();
    let gql = open(&mut host, "a.graphql", "type User { id: ID }\nquery Me { me { id } }");
    let sql = open(&mut host, "a.sql", "CREATE VIEW v AS SELECT 1;");
    let snapshot = host.snapshot();

    let gql_symbols = snapshot.document_symbols(&gql);
    assert_eq!(gql_symbols.len(), 2);
    assert_eq!(gql_symbols[0].kind, SymbolKind::Type);
    assert_eq!(gql_symbols[1].kind, SymbolKind::Query);

    let sql_symbols = snapshot.document_symbols(&sql);
    assert_eq!(sql_symbols.len(), 1);
    assert_eq!(sql_symbols[0].kind, SymbolKind::View);
}

#[test]
fn test_workspace_files_are_discovered_and_resolved() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().to_path_buf();
    std::fs::write(root.join("schema.graphql"), "type User { id: ID }").unwrap();
    std::fs::create_dir_all(root.join("ops")).unwrap();
    std::fs::write(root.join("ops/me.graphql"), "query { me { id } }").unwrap();
    std::fs::write(root.join("db.sql"), "CREATE TABLE users (id int);").unwrap();

    let config = NavConfig::default();
    let files = discover_files(std::slice::from_ref(&root), &config);
    let mut host = AnalysisHost::with_config(config, vec![root.clone()]);
    assert_eq!(host.add_discovered_files(&files), 3);

    let (text, cursor) = extract_cursor("type Query { me: Us$0er }");
    let query = FileUri::from_path(&root.join("ops/query.graphql"));
    host.open_document(&query, &text, Language::GraphQL);

    let snapshot = host.snapshot();
    let result = snapshot.goto_definition(&query, cursor);
    assert_eq!(
        locations(result),
        vec![Location::new(
            FileUri::from_path(&root.join("schema.graphql")),
            Range::on_line(0, 5, 9)
        )]
    );

    // The unsaved buffer is part of the workspace scan
    let references = snapshot.find_references(&query, cursor, true);
    assert_eq!(references.len(), 2);
}
