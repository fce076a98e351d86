//! Reference Scanner: textual occurrences of a name.
//!
//! Scanning never looks at the index. Text is read through a
//! [`DocumentSource`] and matched by the engine's word pattern, so a
//! reference is found even in documents that do not currently parse.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use querynav_syntax::LineIndex;
use querynav_types::{FileUri, Location};
use tokio_util::sync::CancellationToken;

use crate::engine::{LanguageEngine, ReferenceScope};
use crate::source::{DocumentSource, SourceError};
use crate::types::ScanProgress;

/// A single scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    /// Document the request came from
    pub file: &'a FileUri,
    pub token: &'a str,
    /// Accepted for interface parity. Text scanning cannot tell a declaration
    /// from a use, so declarations are always part of the result.
    pub include_declaration: bool,
}

/// Memoized document-scoped scan results.
///
/// An entry is reused only while the document text it was computed from is
/// still the current text, and is dropped as soon as the document is updated.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

type CacheKey = (FileUri, String, bool);

#[derive(Debug)]
struct CacheEntry {
    text: Arc<str>,
    locations: Vec<Location>,
}

impl ReferenceCache {
    /// Drop every entry computed for `file`.
    pub fn invalidate(&self, file: &FileUri) {
        self.entries.lock().retain(|(cached, _, _), _| cached != file);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &CacheKey, text: &Arc<str>) -> Option<Vec<Location>> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        Arc::ptr_eq(&entry.text, text).then(|| entry.locations.clone())
    }

    fn insert(&self, key: CacheKey, text: Arc<str>, locations: Vec<Location>) {
        self.entries.lock().insert(key, CacheEntry { text, locations });
    }
}

/// Collect every occurrence of the request's token within the engine's scope.
///
/// Cancellation is checked once per document; a cancelled scan returns what
/// it found so far. A workspace document that fails to open is logged and
/// skipped. Only a failure to enumerate the workspace, or to open the
/// requesting document for a document-scoped scan, is an error.
///
/// A workspace scan always covers the requesting document, whether or not
/// the include globs reach it.
pub fn scan<E: LanguageEngine>(
    engine: &E,
    source: &dyn DocumentSource,
    cache: &ReferenceCache,
    request: ScanRequest<'_>,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(ScanProgress),
) -> Result<Vec<Location>, SourceError> {
    match engine.reference_scope() {
        ReferenceScope::Workspace { include, exclude } => {
            let mut files = source.find_files(include, exclude)?;
            // The requesting document is scanned even when no glob reaches it
            if let Err(at) = files.binary_search(request.file) {
                files.insert(at, request.file.clone());
            }
            Ok(scan_files(engine, source, &files, request.token, cancel, progress))
        }
        ReferenceScope::Document => scan_document(engine, source, cache, request, cancel, progress),
    }
}

fn scan_files<E: LanguageEngine>(
    engine: &E,
    source: &dyn DocumentSource,
    files: &[FileUri],
    token: &str,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(ScanProgress),
) -> Vec<Location> {
    let total = files.len();
    let mut locations = Vec::new();

    for (i, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(token, scanned = i, total, "Reference scan cancelled");
            break;
        }

        match source.open_document(file) {
            Ok(text) => locations.extend(locate(engine, file, &text, token)),
            Err(e) => tracing::warn!(file = %file, error = %e, "Skipping unreadable document"),
        }

        progress(ScanProgress {
            scanned: i + 1,
            total,
            file: file.clone(),
        });
    }

    tracing::debug!(token, files = total, matches = locations.len(), "Workspace scan finished");
    locations
}

fn scan_document<E: LanguageEngine>(
    engine: &E,
    source: &dyn DocumentSource,
    cache: &ReferenceCache,
    request: ScanRequest<'_>,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(ScanProgress),
) -> Result<Vec<Location>, SourceError> {
    if cancel.is_cancelled() {
        return Ok(Vec::new());
    }

    let text = source.open_document(request.file)?;
    let key = (
        request.file.clone(),
        request.token.to_string(),
        request.include_declaration,
    );

    let locations = match cache.get(&key, &text) {
        Some(locations) => {
            tracing::debug!(file = %request.file, token = request.token, "Reference cache hit");
            locations
        }
        None => {
            let locations = locate(engine, request.file, &text, request.token);
            cache.insert(key, text, locations.clone());
            locations
        }
    };

    progress(ScanProgress {
        scanned: 1,
        total: 1,
        file: request.file.clone(),
    });
    Ok(locations)
}

fn locate<E: LanguageEngine>(engine: &E, file: &FileUri, text: &str, token: &str) -> Vec<Location> {
    let matches = engine.scan_references(text, token);
    if matches.is_empty() {
        return Vec::new();
    }

    let line_index = LineIndex::new(text);
    matches
        .into_iter()
        .map(|range| Location::new(file.clone(), line_index.offset_range_to_range(range)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GraphQLEngine, SqlEngine};
    use crate::source::{FsDocumentSource, OpenDocument};
    use querynav_types::{Language, Range};
    use std::path::PathBuf;

    fn source(root: &str, docs: &[(&str, &str, Language)]) -> FsDocumentSource {
        let overlay = docs
            .iter()
            .map(|(path, text, language)| {
                (
                    FileUri::from_path(&PathBuf::from(root).join(path)),
                    OpenDocument {
                        text: Arc::from(*text),
                        language: *language,
                    },
                )
            })
            .collect();
        FsDocumentSource::new(vec![PathBuf::from(root)], Arc::new(overlay))
    }

    fn request<'a>(file: &'a FileUri, token: &'a str) -> ScanRequest<'a> {
        ScanRequest {
            file,
            token,
            include_declaration: true,
        }
    }

    #[test]
    fn test_workspace_scan_reports_progress() {
        let source = source(
            "/nonexistent-querynav-root",
            &[
                ("a.graphql", "type User { id: ID }", Language::GraphQL),
                ("b.graphql", "type Query { user: User users: [User] }", Language::GraphQL),
            ],
        );
        let origin = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/b.graphql"));
        let mut reports = Vec::new();

        let locations = scan(
            &GraphQLEngine::default(),
            &source,
            &ReferenceCache::default(),
            request(&origin, "User"),
            &CancellationToken::new(),
            &mut |p| reports.push(p),
        )
        .unwrap();

        assert_eq!(locations.len(), 3);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].scanned, 2);
        assert_eq!(reports[1].total, 2);
    }

    #[test]
    fn test_workspace_scan_covers_requesting_document() {
        let origin = FileUri::new("untitled:Untitled-1");
        let mut overlay = std::collections::HashMap::new();
        overlay.insert(
            origin.clone(),
            OpenDocument {
                text: Arc::from("type Query { now: DateTime }\ntype Event { at: DateTime }"),
                language: Language::GraphQL,
            },
        );
        let source = FsDocumentSource::new(Vec::new(), Arc::new(overlay));

        let locations = scan(
            &GraphQLEngine::default(),
            &source,
            &ReferenceCache::default(),
            request(&origin, "DateTime"),
            &CancellationToken::new(),
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(
            locations,
            vec![
                Location::new(origin.clone(), Range::on_line(0, 18, 26)),
                Location::new(origin, Range::on_line(1, 17, 25)),
            ]
        );
    }

    #[test]
    fn test_cancelled_scan_returns_partial_results() {
        let source = source(
            "/nonexistent-querynav-root",
            &[
                ("a.graphql", "type User { id: ID }", Language::GraphQL),
                ("b.graphql", "type Query { user: User }", Language::GraphQL),
            ],
        );
        let origin = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/a.graphql"));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let locations = scan(
            &GraphQLEngine::default(),
            &source,
            &ReferenceCache::default(),
            request(&origin, "User"),
            &cancel,
            &mut |_| trigger.cancel(),
        )
        .unwrap();

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].file, origin);
    }

    #[test]
    fn test_document_scan_stays_in_document() {
        let source = source(
            "/nonexistent-querynav-root",
            &[
                ("a.sql", "CREATE TABLE users (id int);\n-- users\nSELECT * FROM users;", Language::Sql),
                ("b.sql", "SELECT * FROM users;", Language::Sql),
            ],
        );
        let origin = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/a.sql"));

        let locations = scan(
            &SqlEngine::default(),
            &source,
            &ReferenceCache::default(),
            request(&origin, "users"),
            &CancellationToken::new(),
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(
            locations,
            vec![
                Location::new(origin.clone(), Range::on_line(0, 13, 18)),
                Location::new(origin, Range::on_line(2, 14, 19)),
            ]
        );
    }

    #[test]
    fn test_document_scan_is_memoized_until_invalidated() {
        let source = source(
            "/nonexistent-querynav-root",
            &[("a.sql", "SELECT * FROM users;", Language::Sql)],
        );
        let origin = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/a.sql"));
        let cache = ReferenceCache::default();
        let engine = SqlEngine::default();
        let cancel = CancellationToken::new();

        let first = scan(&engine, &source, &cache, request(&origin, "users"), &cancel, &mut |_| {}).unwrap();
        assert_eq!(cache.len(), 1);

        let second = scan(&engine, &source, &cache, request(&origin, "users"), &cancel, &mut |_| {}).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        cache.invalidate(&origin);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_document_scan_ignores_entry_for_other_text() {
        let origin = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/a.sql"));
        let cache = ReferenceCache::default();
        let engine = SqlEngine::default();
        let cancel = CancellationToken::new();

        let before = source(
            "/nonexistent-querynav-root",
            &[("a.sql", "SELECT * FROM users;", Language::Sql)],
        );
        scan(&engine, &before, &cache, request(&origin, "users"), &cancel, &mut |_| {}).unwrap();

        let after = source(
            "/nonexistent-querynav-root",
            &[("a.sql", "SELECT 1;\nSELECT * FROM users;", Language::Sql)],
        );
        let locations = scan(&engine, &after, &cache, request(&origin, "users"), &cancel, &mut |_| {}).unwrap();

        assert_eq!(locations[0].range.start.line, 1);
    }

    #[test]
    fn test_unreadable_document_is_skipped() {
        let source = source(
            "/nonexistent-querynav-root",
            &[("a.graphql", "type User { id: ID }", Language::GraphQL)],
        );
        let origin = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/a.graphql"));
        let missing = FileUri::from_path(&PathBuf::from("/nonexistent-querynav-root/gone.graphql"));

        let locations = scan_files(
            &GraphQLEngine::default(),
            &source,
            &[missing, origin],
            "User",
            &CancellationToken::new(),
            &mut |_| {},
        );

        assert_eq!(locations.len(), 1);
    }
}
