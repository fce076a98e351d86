//! Navigation results: [`Location`] and [`LocationLink`].

use crate::{FileUri, Range};

/// A span in a specific document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: FileUri,
    pub range: Range,
}

impl Location {
    #[must_use]
    pub const fn new(file: FileUri, range: Range) -> Self {
        Self { file, range }
    }
}

/// A navigable link from the span under the cursor to a target span.
///
/// Editors render a list of links as a peek/disambiguation view instead of
/// jumping straight to a single target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationLink {
    /// The span under the cursor that triggered navigation
    pub origin: Range,
    /// Where the link points
    pub target: Location,
}

impl LocationLink {
    #[must_use]
    pub const fn new(origin: Range, target: Location) -> Self {
        Self { origin, target }
    }
}
