//! Editor-facing result types.
//!
//! Plain data with public fields, in editor coordinates. Nothing here knows
//! about syntax trees, so the LSP layer converts these without touching any
//! language-specific code.

pub use querynav_types::{
    FileUri, Language, Location, LocationLink, OffsetRange, Position, Range,
};

/// Outcome of a "go to definition" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionResult {
    /// Declarations of the name under the cursor
    Locations(Vec<Location>),
    /// No declaration exists: every textual occurrence of the name, linked
    /// from the span under the cursor
    Links(Vec<LocationLink>),
}

impl DefinitionResult {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Locations(locations) => locations.len(),
            Self::Links(links) => links.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of symbol in a document outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Object type definition
    Type,
    Interface,
    Input,
    Enum,
    Union,
    Scalar,
    /// Field of a type, interface or input
    Field,
    EnumValue,
    Query,
    Mutation,
    Subscription,
    Fragment,
    Directive,
    /// SQL table
    Table,
    /// SQL view or materialized view
    View,
    /// SQL table column
    Column,
    Function,
    Procedure,
    Trigger,
    Index,
    Sequence,
    Schema,
}

/// A node in a document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Optional detail (e.g., a field's type)
    pub detail: Option<String>,
    /// Full range of the symbol (entire definition)
    pub range: Range,
    /// Selection range (just the name)
    pub selection_range: Range,
    pub children: Vec<DocumentSymbol>,
}

impl DocumentSymbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        range: Range,
        selection_range: Range,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            detail: None,
            range,
            selection_range,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }
}

/// Per-file progress of a workspace reference scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// Files scanned so far, including `file`
    pub scanned: usize,
    pub total: usize,
    pub file: FileUri,
}

impl ScanProgress {
    /// Completion percentage in `0..=100`.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((self.scanned * 100) / self.total) as u32
    }
}
