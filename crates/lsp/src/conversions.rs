//! Type conversion functions between LSP types and querynav-ide types
//!
//! These conversions are stateless and can be used from any LSP handler.
//!
//! ```rust,ignore
//! use crate::conversions::{IntoIde, IntoLsp};
//!
//! let ide_position = lsp_position.into_ide();
//! let lsp_range = ide_range.into_lsp();
//! ```

use lsp_types::{GotoDefinitionResponse, Location, LocationLink, Position, Range, Uri};
use querynav_ide::FileUri;
use tower_lsp_server::UriExt;

/// Extension trait for converting querynav-ide types to LSP types.
pub trait IntoLsp {
    type Output;
    fn into_lsp(self) -> Self::Output;
}

/// Extension trait for converting LSP types to querynav-ide types.
pub trait IntoIde {
    type Output;
    fn into_ide(self) -> Self::Output;
}

impl IntoIde for Position {
    type Output = querynav_ide::Position;
    fn into_ide(self) -> querynav_ide::Position {
        convert_lsp_position(self)
    }
}

impl IntoLsp for querynav_ide::Range {
    type Output = Range;
    fn into_lsp(self) -> Range {
        convert_ide_range(self)
    }
}

impl IntoLsp for querynav_ide::DocumentSymbol {
    type Output = lsp_types::DocumentSymbol;
    fn into_lsp(self) -> lsp_types::DocumentSymbol {
        convert_ide_document_symbol(self)
    }
}

/// Convert LSP Position to querynav-ide Position
pub const fn convert_lsp_position(pos: Position) -> querynav_ide::Position {
    querynav_ide::Position::new(pos.line, pos.character)
}

/// Convert querynav-ide Position to LSP Position
pub const fn convert_ide_position(pos: querynav_ide::Position) -> Position {
    Position {
        line: pos.line,
        character: pos.character,
    }
}

/// Convert querynav-ide Range to LSP Range
pub const fn convert_ide_range(range: querynav_ide::Range) -> Range {
    Range {
        start: convert_ide_position(range.start),
        end: convert_ide_position(range.end),
    }
}

/// Canonical index key for a document URI.
///
/// `file:` URIs go through the file system path so percent-encoding
/// differences between the client and the workspace scan collapse to one key.
pub fn uri_to_file(uri: &Uri) -> FileUri {
    match uri.to_file_path() {
        Some(path) => FileUri::from_path(&path),
        None => FileUri::new(uri.as_str()),
    }
}

/// Convert an index key back to a URI the client understands.
pub fn file_to_uri(file: &FileUri) -> Option<Uri> {
    if let Some(uri) = file.to_path().and_then(|path| Uri::from_file_path(&path)) {
        return Some(uri);
    }
    match file.as_str().parse() {
        Ok(uri) => Some(uri),
        Err(e) => {
            tracing::warn!(file = %file, error = ?e, "Dropping location with invalid URI");
            None
        }
    }
}

/// Convert querynav-ide Location to LSP Location
pub fn convert_ide_location(loc: &querynav_ide::Location) -> Option<Location> {
    Some(Location {
        uri: file_to_uri(&loc.file)?,
        range: convert_ide_range(loc.range),
    })
}

/// Convert querynav-ide `LocationLink` to LSP `LocationLink`
pub fn convert_ide_location_link(link: &querynav_ide::LocationLink) -> Option<LocationLink> {
    let target_range = convert_ide_range(link.target.range);
    Some(LocationLink {
        origin_selection_range: Some(convert_ide_range(link.origin)),
        target_uri: file_to_uri(&link.target.file)?,
        target_range,
        target_selection_range: target_range,
    })
}

/// Convert a definition result; `None` when nothing survives conversion.
pub fn convert_definition_result(
    result: querynav_ide::DefinitionResult,
) -> Option<GotoDefinitionResponse> {
    let response = match result {
        querynav_ide::DefinitionResult::Locations(locations) => {
            let locations: Vec<_> = locations.iter().filter_map(convert_ide_location).collect();
            if locations.is_empty() {
                return None;
            }
            GotoDefinitionResponse::Array(locations)
        }
        querynav_ide::DefinitionResult::Links(links) => {
            let links: Vec<_> = links.iter().filter_map(convert_ide_location_link).collect();
            if links.is_empty() {
                return None;
            }
            GotoDefinitionResponse::Link(links)
        }
    };
    Some(response)
}

/// Convert querynav-ide `SymbolKind` to LSP `SymbolKind`
pub const fn convert_ide_symbol_kind(kind: querynav_ide::SymbolKind) -> lsp_types::SymbolKind {
    use querynav_ide::SymbolKind as Ide;
    use lsp_types::SymbolKind as Lsp;

    match kind {
        Ide::Type | Ide::Fragment | Ide::Table | Ide::View => Lsp::CLASS,
        Ide::Field | Ide::Column => Lsp::FIELD,
        Ide::Query | Ide::Mutation | Ide::Subscription | Ide::Function | Ide::Procedure => {
            Lsp::FUNCTION
        }
        Ide::EnumValue => Lsp::ENUM_MEMBER,
        Ide::Scalar => Lsp::TYPE_PARAMETER,
        Ide::Input => Lsp::STRUCT,
        Ide::Interface => Lsp::INTERFACE,
        Ide::Union | Ide::Enum => Lsp::ENUM,
        Ide::Directive | Ide::Trigger => Lsp::EVENT,
        Ide::Index => Lsp::KEY,
        Ide::Sequence => Lsp::NUMBER,
        Ide::Schema => Lsp::NAMESPACE,
    }
}

/// Convert querynav-ide `DocumentSymbol` to LSP `DocumentSymbol`
#[allow(deprecated)] // LSP requires deprecated field
pub fn convert_ide_document_symbol(
    symbol: querynav_ide::DocumentSymbol,
) -> lsp_types::DocumentSymbol {
    lsp_types::DocumentSymbol {
        name: symbol.name,
        kind: convert_ide_symbol_kind(symbol.kind),
        detail: symbol.detail,
        range: convert_ide_range(symbol.range),
        selection_range: convert_ide_range(symbol.selection_range),
        children: if symbol.children.is_empty() {
            None
        } else {
            Some(
                symbol
                    .children
                    .into_iter()
                    .map(convert_ide_document_symbol)
                    .collect(),
            )
        },
        tags: None,
        deprecated: None,
    }
}
