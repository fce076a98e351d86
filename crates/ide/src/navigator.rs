//! One language's index together with the operations that read it.

use std::sync::Arc;

use querynav_syntax::{word_at, LineIndex};
use querynav_types::{FileUri, Location, Position, Range};
use tokio_util::sync::CancellationToken;

use crate::engine::LanguageEngine;
use crate::fallback::resolve_or_fallback;
use crate::index::{DeclarationTables, DocumentIndex};
use crate::resolver;
use crate::scanner::{self, ReferenceCache, ScanRequest};
use crate::source::{DocumentSource, SourceError};
use crate::types::{DefinitionResult, DocumentSymbol, ScanProgress};

/// Document Index, Declaration Resolver, Reference Scanner and Fallback
/// Orchestrator for one [`LanguageEngine`].
///
/// Cloning is cheap and yields a snapshot: later updates to the original do
/// not show through the clone. The reference cache is shared between clones.
pub struct Navigator<E: LanguageEngine> {
    engine: Arc<E>,
    index: Arc<DocumentIndex<E::Tree>>,
    cache: Arc<ReferenceCache>,
}

impl<E: LanguageEngine> Clone for Navigator<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            index: Arc::clone(&self.index),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<E: LanguageEngine> std::fmt::Debug for Navigator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("language", &self.engine.language())
            .field("documents", &self.index.len())
            .finish_non_exhaustive()
    }
}

/// The word under a cursor, read from a document's current text.
struct Cursor {
    offset: usize,
    token: String,
    origin: Range,
}

impl<E: LanguageEngine> Navigator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            index: Arc::default(),
            cache: Arc::default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn index(&self) -> &DocumentIndex<E::Tree> {
        &self.index
    }

    /// Re-index `file` from `text`. Returns `false` on a parse failure, in
    /// which case the previous declarations for `file` stay in place.
    pub fn update(&mut self, file: &FileUri, text: &str) -> bool {
        self.cache.invalidate(file);
        Arc::make_mut(&mut self.index).update(&*self.engine, file, text)
    }

    /// Declaration tables currently held for `file`.
    pub fn declarations(&self, file: &FileUri) -> Option<&DeclarationTables> {
        self.index.slot(file).map(|slot| &slot.tables)
    }

    /// Declarations of the word at `position`, without any fallback.
    pub fn resolve(
        &self,
        source: &dyn DocumentSource,
        file: &FileUri,
        position: Position,
    ) -> Vec<Location> {
        self.cursor(source, file, position)
            .map(|cursor| self.resolve_token(file, cursor.offset, &cursor.token))
            .unwrap_or_default()
    }

    /// Declarations of `token`, found at byte `offset` of `file`.
    pub fn resolve_token(&self, file: &FileUri, offset: usize, token: &str) -> Vec<Location> {
        resolver::resolve(&*self.engine, &self.index, file, offset, token)
    }

    /// Every occurrence of the word at `position` within the engine's scope.
    ///
    /// `include_declaration` is threaded through but does not filter anything:
    /// declarations are always included.
    pub fn find_references(
        &self,
        source: &dyn DocumentSource,
        file: &FileUri,
        position: Position,
        include_declaration: bool,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ScanProgress),
    ) -> Result<Vec<Location>, SourceError> {
        let Some(cursor) = self.cursor(source, file, position) else {
            return Ok(Vec::new());
        };
        self.scan(source, file, &cursor.token, include_declaration, cancel, progress)
    }

    /// Declarations of the word at `position`, or links to its occurrences
    /// when it has none.
    pub fn goto_definition(
        &self,
        source: &dyn DocumentSource,
        file: &FileUri,
        position: Position,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ScanProgress),
    ) -> Option<DefinitionResult> {
        let cursor = self.cursor(source, file, position)?;
        let declarations = self.resolve_token(file, cursor.offset, &cursor.token);

        resolve_or_fallback(declarations, cursor.origin, || {
            self.scan(source, file, &cursor.token, true, cancel, progress)
        })
    }

    /// Outline of the current text of `file`; empty if it does not parse.
    pub fn document_symbols(&self, source: &dyn DocumentSource, file: &FileUri) -> Vec<DocumentSymbol> {
        let text = match source.open_document(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %file, error = %e, "Cannot outline document");
                return Vec::new();
            }
        };
        match self.engine.parse(&text) {
            Ok(tree) => self.engine.document_symbols(&tree, &LineIndex::new(&text)),
            Err(e) => {
                tracing::debug!(file = %file, error = %e, "No outline for unparsable document");
                Vec::new()
            }
        }
    }

    fn scan(
        &self,
        source: &dyn DocumentSource,
        file: &FileUri,
        token: &str,
        include_declaration: bool,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ScanProgress),
    ) -> Result<Vec<Location>, SourceError> {
        let request = ScanRequest {
            file,
            token,
            include_declaration,
        };
        scanner::scan(&*self.engine, source, &self.cache, request, cancel, progress)
    }

    fn cursor(&self, source: &dyn DocumentSource, file: &FileUri, position: Position) -> Option<Cursor> {
        let text = match source.open_document(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %file, error = %e, "Cannot read document under cursor");
                return None;
            }
        };

        let line_index = LineIndex::new(&text);
        let offset = line_index.position_to_offset(position)?;
        let (token, range) = word_at(&text, offset)?;

        Some(Cursor {
            offset,
            token: token.to_string(),
            origin: line_index.offset_range_to_range(range),
        })
    }
}
