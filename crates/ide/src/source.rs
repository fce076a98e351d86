//! Workspace file enumeration and document loading.
//!
//! [`DocumentSource`] is what the reference scanner and the fallback read
//! text through. [`FsDocumentSource`] answers from the editor's open buffers
//! first and the file system second, so unsaved edits are what gets scanned.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use querynav_config::NavConfig;
use querynav_types::{FileUri, Language};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a file URI: {0}")]
    NotAFile(FileUri),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// The workspace as seen by the reference scanner.
pub trait DocumentSource: Send + Sync {
    /// Every document matching one of `include` and none of `exclude`,
    /// sorted and without duplicates.
    fn find_files(&self, include: &[String], exclude: &[String]) -> Result<Vec<FileUri>, SourceError>;

    /// Current text of a document.
    fn open_document(&self, file: &FileUri) -> Result<Arc<str>, SourceError>;
}

/// A document the editor has open.
#[derive(Debug, Clone)]
pub struct OpenDocument {
    pub text: Arc<str>,
    pub language: Language,
}

/// Workspace roots on disk overlaid with the editor's open documents.
#[derive(Debug, Clone, Default)]
pub struct FsDocumentSource {
    roots: Vec<PathBuf>,
    overlay: Arc<HashMap<FileUri, OpenDocument>>,
}

impl FsDocumentSource {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, overlay: Arc<HashMap<FileUri, OpenDocument>>) -> Self {
        Self { roots, overlay }
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    #[must_use]
    pub fn open_documents(&self) -> &HashMap<FileUri, OpenDocument> {
        &self.overlay
    }

    /// Whether an open document at `path` is part of the workspace.
    ///
    /// Under a root the patterns apply to the root-relative path. A document
    /// outside every root is matched by its file name alone.
    fn overlay_matches(&self, path: &Path, includes: &[glob::Pattern], excludes: &[glob::Pattern]) -> bool {
        let mut under_root = false;
        for root in &self.roots {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            under_root = true;
            if includes.iter().any(|p| p.matches_path(relative)) && !is_excluded(root, path, excludes) {
                return true;
            }
        }
        if under_root {
            return false;
        }

        let Some(name) = path.file_name().map(Path::new) else {
            return false;
        };
        includes.iter().any(|p| p.matches_path(name))
            && !excludes.iter().any(|p| p.matches_path(name))
    }
}

impl DocumentSource for FsDocumentSource {
    fn find_files(&self, include: &[String], exclude: &[String]) -> Result<Vec<FileUri>, SourceError> {
        let excludes = compile_patterns(exclude)?;
        let includes = compile_patterns(include)?;
        let mut files = BTreeSet::new();

        for root in &self.roots {
            for path in glob_files(root, include)? {
                if !is_excluded(root, &path, &excludes) {
                    files.insert(FileUri::from_path(&path));
                }
            }
        }

        // Open buffers that were never saved still belong to the workspace
        for file in self.overlay.keys() {
            let Some(path) = file.to_path() else {
                continue;
            };
            if self.overlay_matches(&path, &includes, &excludes) {
                files.insert(file.clone());
            }
        }

        Ok(files.into_iter().collect())
    }

    fn open_document(&self, file: &FileUri) -> Result<Arc<str>, SourceError> {
        if let Some(document) = self.overlay.get(file) {
            return Ok(document.text.clone());
        }

        let path = file
            .to_path()
            .ok_or_else(|| SourceError::NotAFile(file.clone()))?;
        std::fs::read_to_string(&path)
            .map(Arc::from)
            .map_err(|source| SourceError::Read { path, source })
    }
}

/// A file read from disk but not yet registered with the host.
///
/// Discovery does all of its I/O before the host lock is taken.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub uri: FileUri,
    pub text: String,
    pub language: Language,
}

/// Find and read every configured file under `roots`.
///
/// Unreadable files and invalid patterns are logged and skipped.
#[tracing::instrument(skip(config), fields(roots = roots.len()))]
pub fn discover_files(roots: &[PathBuf], config: &NavConfig) -> Vec<DiscoveredFile> {
    let families = [
        (
            Language::GraphQL,
            config.graphql.include_patterns(),
            config.graphql.exclude_patterns(),
        ),
        (
            Language::Sql,
            config.sql.include_patterns(),
            config.sql.exclude_patterns(),
        ),
    ];

    let source = FsDocumentSource::new(roots.to_vec(), Arc::default());
    let mut discovered = Vec::new();
    let mut seen = BTreeSet::new();

    for (language, include, exclude) in families {
        let files = match source.find_files(&include, &exclude) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(language = language.as_str(), error = %e, "Skipping file discovery");
                continue;
            }
        };

        for uri in files {
            if !seen.insert(uri.clone()) {
                continue;
            }
            match source.open_document(&uri) {
                Ok(text) => discovered.push(DiscoveredFile {
                    uri,
                    text: text.to_string(),
                    language,
                }),
                Err(e) => tracing::warn!(error = %e, "Failed to read workspace file"),
            }
        }
    }

    tracing::info!(files = discovered.len(), "Discovered workspace files");
    discovered
}

/// Expand brace patterns like `{graphql,gql}` into multiple patterns.
///
/// The glob crate has no brace support, so `**/*.{graphql,gql}` becomes
/// `["**/*.graphql", "**/*.gql"]`. Nested groups are expanded recursively.
pub(crate) fn expand_braces(pattern: &str) -> Vec<String> {
    if let Some(start) = pattern.find('{') {
        if let Some(len) = pattern[start..].find('}') {
            let end = start + len;
            let before = &pattern[..start];
            let after = &pattern[end + 1..];
            let options = &pattern[start + 1..end];

            return options
                .split(',')
                .flat_map(|opt| expand_braces(&format!("{before}{opt}{after}")))
                .collect();
        }
    }

    vec![pattern.to_string()]
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>, SourceError> {
    patterns
        .iter()
        .flat_map(|pattern| expand_braces(pattern))
        .map(|pattern| {
            glob::Pattern::new(&pattern).map_err(|e| SourceError::Pattern {
                message: e.msg.to_string(),
                pattern,
            })
        })
        .collect()
}

fn glob_files(root: &Path, include: &[String]) -> Result<Vec<PathBuf>, SourceError> {
    let mut paths = Vec::new();

    for pattern in include.iter().flat_map(|pattern| expand_braces(pattern)) {
        let full_pattern = root.join(&pattern);
        let entries = glob::glob(&full_pattern.display().to_string()).map_err(|e| {
            SourceError::Pattern {
                message: e.msg.to_string(),
                pattern: pattern.clone(),
            }
        })?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    // Skip node_modules
                    if path.components().any(|c| c.as_os_str() == "node_modules") {
                        continue;
                    }
                    paths.push(path);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Glob entry error: {}", e),
            }
        }
    }

    Ok(paths)
}

fn is_excluded(root: &Path, path: &Path, excludes: &[glob::Pattern]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    excludes.iter().any(|pattern| pattern.matches_path(relative))
}
