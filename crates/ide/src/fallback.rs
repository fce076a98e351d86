//! Fallback Orchestrator: declarations first, references otherwise.

use querynav_types::{Location, LocationLink, Range};

use crate::source::SourceError;
use crate::types::DefinitionResult;

/// Combine a resolver answer with a deferred reference scan.
///
/// Non-empty `declarations` are returned unchanged and `references` is never
/// run. Otherwise each reference becomes a link from `origin`, the span of
/// the word under the cursor. No references, or a scan that failed, is `None`;
/// the failure is logged and not passed on.
pub fn resolve_or_fallback<F>(
    declarations: Vec<Location>,
    origin: Range,
    references: F,
) -> Option<DefinitionResult>
where
    F: FnOnce() -> Result<Vec<Location>, SourceError>,
{
    if !declarations.is_empty() {
        return Some(DefinitionResult::Locations(declarations));
    }

    match references() {
        Ok(references) if references.is_empty() => None,
        Ok(references) => Some(DefinitionResult::Links(into_links(origin, references))),
        Err(e) => {
            tracing::warn!(error = %e, "Reference fallback failed");
            None
        }
    }
}

/// Reshape references into links that all start from `origin`.
#[must_use]
pub fn into_links(origin: Range, references: Vec<Location>) -> Vec<LocationLink> {
    references
        .into_iter()
        .map(|target| LocationLink::new(origin, target))
        .collect()
}
