//! File-related types: [`FileUri`], [`Language`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A URI string identifying a document.
///
/// This is the stable key of the cross-document index. Local files are
/// always stored in the canonical form produced by [`FileUri::from_path`]
/// (`file://` followed by the unescaped absolute path), so the same file
/// reached through a workspace scan and through an editor event maps to the
/// same slot. Other schemes (e.g. `untitled:`) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileUri(Arc<str>);

impl FileUri {
    /// Create a new `FileUri` from a string that is already a URI.
    #[must_use]
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    /// Create a `FileUri` from a filesystem path, converting to a `file://` URI.
    ///
    /// This handles:
    /// - Already-URI strings (anything containing `://`) - passed through unchanged
    /// - Unix absolute paths (`/home/user/file.graphql`) - `file:///home/user/file.graphql`
    /// - Other paths (Windows drives, relative) - prefixed with `file:///`
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy();

        if path_str.contains("://") {
            return Self::new(path_str.as_ref());
        }

        if path_str.starts_with('/') {
            return Self::new(format!("file://{path_str}"));
        }

        Self::new(format!("file:///{}", path_str.replace('\\', "/")))
    }

    /// Convert a `file://` URI back into a filesystem path.
    ///
    /// Returns `None` for non-file schemes.
    #[must_use]
    pub fn to_path(&self) -> Option<PathBuf> {
        let rest = self.0.strip_prefix("file://")?;
        // Windows drive paths are written as file:///C:/...
        let rest = match rest.strip_prefix('/') {
            Some(drive) if drive.as_bytes().get(1) == Some(&b':') => drive,
            _ => rest,
        };
        Some(PathBuf::from(rest))
    }

    /// Get the URI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileUri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Source language family of a document (determines which engine indexes it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// GraphQL schema and query documents (.graphql, .gql, .graphqls)
    GraphQL,
    /// SQL scripts (.sql)
    Sql,
}

impl Language {
    /// Detect language from a file path based on its extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;

        match extension.to_ascii_lowercase().as_str() {
            "graphql" | "gql" | "graphqls" => Some(Self::GraphQL),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    /// Detect language from an editor language identifier (`languageId`).
    #[must_use]
    pub fn from_language_id(id: &str) -> Option<Self> {
        match id {
            "graphql" | "graphqls" => Some(Self::GraphQL),
            "sql" | "postgres" | "pgsql" | "mysql" | "sqlite" => Some(Self::Sql),
            _ => None,
        }
    }

    /// The canonical lowercase name of this language.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GraphQL => "graphql",
            Self::Sql => "sql",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
