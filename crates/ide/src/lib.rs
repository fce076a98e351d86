//! # querynav-ide
//!
//! Definition and reference navigation for GraphQL and SQL documents. This
//! crate is the API boundary between the language engines and the LSP layer.
//!
//! ## Architecture
//!
//! ```text
//! LSP Layer (tower-lsp-server)
//!     ↓
//! querynav-ide (this crate) ← AnalysisHost / Analysis, editor coordinates
//!     ↓
//! Navigator<E> ← index, resolver, scanner, fallback (written once)
//!     ↓
//! GraphQLEngine / SqlEngine ← LanguageEngine implementations
//!     ↓
//! querynav-syntax ← Parsing
//! ```
//!
//! ## Main Types
//!
//! - [`AnalysisHost`] - Owns the indexes and the open documents; all mutation goes here
//! - [`Analysis`] - Immutable snapshot for answering requests
//! - [`LanguageEngine`] - What one document family supplies to navigation
//!
//! A request takes a snapshot and runs without touching the host, so a
//! long reference scan never holds up document updates, and a snapshot taken
//! after an update always observes it.

mod engine;
mod fallback;
mod index;
mod navigator;
mod resolver;
mod scanner;
mod source;
mod types;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use querynav_config::NavConfig;

pub use engine::{DeclarationSite, GraphQLEngine, LanguageEngine, ReferenceScope, SqlEngine};
pub use fallback::{into_links, resolve_or_fallback};
pub use index::{Declaration, DeclarationTables, DocumentIndex, DocumentSlot, TokenClass};
pub use navigator::Navigator;
pub use scanner::{ReferenceCache, ScanRequest};
pub use tokio_util::sync::CancellationToken;
pub use source::{
    discover_files, DiscoveredFile, DocumentSource, FsDocumentSource, OpenDocument, SourceError,
};
pub use types::{
    DefinitionResult, DocumentSymbol, FileUri, Language, Location, LocationLink, OffsetRange,
    Position, Range, ScanProgress, SymbolKind,
};

/// Owns every index and the editor's open documents.
///
/// Mutating methods take `&mut self`; the LSP layer keeps the host behind a
/// single async mutex. Snapshots are copy-on-write, so an [`Analysis`] taken
/// before a mutation keeps answering from the state it was taken in.
#[derive(Debug)]
pub struct AnalysisHost {
    config: NavConfig,
    roots: Vec<PathBuf>,
    overlay: Arc<HashMap<FileUri, OpenDocument>>,
    graphql: Navigator<GraphQLEngine>,
    sql: Navigator<SqlEngine>,
}

impl AnalysisHost {
    /// Create a host with the default configuration and no workspace roots
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(NavConfig::default(), Vec::new())
    }

    #[must_use]
    pub fn with_config(config: NavConfig, roots: Vec<PathBuf>) -> Self {
        Self {
            graphql: Navigator::new(GraphQLEngine::new(&config.graphql)),
            sql: Navigator::new(SqlEngine::new(&config.sql)),
            config,
            roots,
            overlay: Arc::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Replace the configuration.
    ///
    /// The indexes are rebuilt from the open documents only; workspace files
    /// have to be discovered again with the new globs.
    #[tracing::instrument(skip_all)]
    pub fn set_config(&mut self, config: NavConfig, roots: Vec<PathBuf>) {
        self.graphql = Navigator::new(GraphQLEngine::new(&config.graphql));
        self.sql = Navigator::new(SqlEngine::new(&config.sql));
        self.config = config;
        self.roots = roots;

        let overlay = Arc::clone(&self.overlay);
        for (uri, document) in overlay.iter() {
            self.index(uri, &document.text, document.language);
        }
        tracing::info!(open_documents = overlay.len(), "Configuration applied");
    }

    /// Register a document the editor opened.
    ///
    /// Returns `false` if the text did not parse.
    pub fn open_document(&mut self, uri: &FileUri, text: &str, language: Language) -> bool {
        Arc::make_mut(&mut self.overlay).insert(
            uri.clone(),
            OpenDocument {
                text: Arc::from(text),
                language,
            },
        );
        self.index(uri, text, language)
    }

    /// Replace the full text of an open document.
    ///
    /// Unknown documents are classified by extension. Returns `false` if the
    /// text did not parse or the document belongs to no language.
    pub fn change_document(&mut self, uri: &FileUri, text: &str) -> bool {
        let Some(language) = self.language_of(uri) else {
            tracing::debug!(file = %uri, "Ignoring change to unrecognized document");
            return false;
        };
        self.open_document(uri, text, language)
    }

    /// Forget the open buffer for `uri`. Its declarations stay indexed.
    pub fn close_document(&mut self, uri: &FileUri) {
        if Arc::make_mut(&mut self.overlay).remove(uri).is_some() {
            tracing::debug!(file = %uri, "Closed document");
        }
    }

    /// Index a document without opening it in the editor overlay.
    pub fn update_file(&mut self, uri: &FileUri, text: &str, language: Language) -> bool {
        self.index(uri, text, language)
    }

    /// Batch-register files read by [`discover_files`].
    ///
    /// Documents already open in the editor are skipped, their buffer is newer
    /// than the disk. Returns how many files were indexed.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub fn add_discovered_files(&mut self, files: &[DiscoveredFile]) -> usize {
        let mut indexed = 0;
        for file in files {
            if self.overlay.contains_key(&file.uri) {
                continue;
            }
            if self.index(&file.uri, &file.text, file.language) {
                indexed += 1;
            }
        }
        tracing::info!(indexed, not_indexed = files.len() - indexed, "Registered workspace files");
        indexed
    }

    /// Every document with an index slot, ordered by URI.
    #[must_use]
    pub fn files(&self) -> Vec<FileUri> {
        let mut files: Vec<_> = self
            .graphql
            .index()
            .slots()
            .map(|(uri, _)| uri.clone())
            .chain(self.sql.index().slots().map(|(uri, _)| uri.clone()))
            .collect();
        files.sort();
        files
    }

    /// Get an immutable snapshot for answering requests.
    ///
    /// Cheap to create and clone; it can be moved to another thread.
    #[must_use]
    pub fn snapshot(&self) -> Analysis {
        Analysis {
            source: FsDocumentSource::new(self.roots.clone(), Arc::clone(&self.overlay)),
            graphql: self.graphql.clone(),
            sql: self.sql.clone(),
        }
    }

    fn index(&mut self, uri: &FileUri, text: &str, language: Language) -> bool {
        match language {
            Language::GraphQL => self.graphql.update(uri, text),
            Language::Sql => self.sql.update(uri, text),
        }
    }

    fn language_of(&self, uri: &FileUri) -> Option<Language> {
        language_of(&self.overlay, uri)
    }
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of the navigation state
///
/// Can be cheaply cloned and used from multiple threads.
/// All navigation requests go through this.
#[derive(Debug, Clone)]
pub struct Analysis {
    source: FsDocumentSource,
    graphql: Navigator<GraphQLEngine>,
    sql: Navigator<SqlEngine>,
}

impl Analysis {
    /// Go to the declaration of the word at `position`.
    ///
    /// Falls back to every occurrence of the word, as links, when nothing
    /// declares it. `None` means neither produced anything.
    pub fn goto_definition(&self, file: &FileUri, position: Position) -> Option<DefinitionResult> {
        self.goto_definition_with(file, position, &CancellationToken::new(), &mut |_| {})
    }

    /// [`Analysis::goto_definition`] with cancellation and per-file progress
    /// for the fallback scan.
    pub fn goto_definition_with(
        &self,
        file: &FileUri,
        position: Position,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ScanProgress),
    ) -> Option<DefinitionResult> {
        let result = match self.language_of(file)? {
            Language::GraphQL => self.graphql.goto_definition(&self.source, file, position, cancel, progress),
            Language::Sql => self.sql.goto_definition(&self.source, file, position, cancel, progress),
        };
        tracing::debug!(
            file = %file,
            line = position.line,
            character = position.character,
            results = result.as_ref().map_or(0, DefinitionResult::len),
            "goto_definition"
        );
        result
    }

    /// Every occurrence of the word at `position`.
    ///
    /// `include_declaration` is accepted but currently has no effect: the
    /// scan is textual and always includes the declaring occurrence.
    pub fn find_references(
        &self,
        file: &FileUri,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        self.find_references_with(
            file,
            position,
            include_declaration,
            &CancellationToken::new(),
            &mut |_| {},
        )
    }

    /// [`Analysis::find_references`] with cancellation and per-file progress.
    ///
    /// A cancelled scan returns the occurrences found before cancellation.
    pub fn find_references_with(
        &self,
        file: &FileUri,
        position: Position,
        include_declaration: bool,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ScanProgress),
    ) -> Vec<Location> {
        let Some(language) = self.language_of(file) else {
            return Vec::new();
        };
        let result = match language {
            Language::GraphQL => self.graphql.find_references(
                &self.source,
                file,
                position,
                include_declaration,
                cancel,
                progress,
            ),
            Language::Sql => self.sql.find_references(
                &self.source,
                file,
                position,
                include_declaration,
                cancel,
                progress,
            ),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(file = %file, error = %e, "Reference search failed");
            Vec::new()
        })
    }

    /// Declarations of the word at `position`, without the reference fallback.
    pub fn declarations_at(&self, file: &FileUri, position: Position) -> Vec<Location> {
        match self.language_of(file) {
            Some(Language::GraphQL) => self.graphql.resolve(&self.source, file, position),
            Some(Language::Sql) => self.sql.resolve(&self.source, file, position),
            None => Vec::new(),
        }
    }

    /// Outline of a document.
    pub fn document_symbols(&self, file: &FileUri) -> Vec<DocumentSymbol> {
        match self.language_of(file) {
            Some(Language::GraphQL) => self.graphql.document_symbols(&self.source, file),
            Some(Language::Sql) => self.sql.document_symbols(&self.source, file),
            None => Vec::new(),
        }
    }

    /// The declaration tables indexed for a document, if it has a slot.
    pub fn file_declarations(&self, file: &FileUri) -> Option<DeclarationTables> {
        match self.language_of(file)? {
            Language::GraphQL => self.graphql.declarations(file).cloned(),
            Language::Sql => self.sql.declarations(file).cloned(),
        }
    }

    /// Text of a document as the scanner sees it.
    pub fn file_content(&self, file: &FileUri) -> Option<Arc<str>> {
        self.source.open_document(file).ok()
    }

    fn language_of(&self, file: &FileUri) -> Option<Language> {
        language_of(self.source.open_documents(), file)
    }
}

fn language_of(overlay: &HashMap<FileUri, OpenDocument>, file: &FileUri) -> Option<Language> {
    overlay
        .get(file)
        .map(|document| document.language)
        .or_else(|| file.to_path().and_then(|path| Language::from_path(&path)))
}
