//! Shared test helpers: cursor markers and fixture URIs.
//!
//! Fixtures mark cursor positions inline with `$0`, or `$1` through `$9`
//! when a test needs several. `$` followed by anything else is left alone,
//! so SQL such as `SELECT * FROM t` or dollar quoting reads naturally.
//!
//! ```ignore
//! let (text, pos) = extract_cursor("type Query { user: Us$0er }");
//! assert_eq!(text, "type Query { user: User }");
//! assert_eq!(pos, Position::new(0, 21));
//! ```

use querynav_types::{FileUri, Position};

/// Strip the `$0` marker, returning the clean text and the marker's position.
///
/// # Panics
///
/// Panics if the input has no `$0` marker.
#[must_use]
pub fn extract_cursor(input: &str) -> (String, Position) {
    let (text, markers) = strip_markers(input);
    let position = markers
        .iter()
        .find(|(n, _)| *n == 0)
        .map(|(_, position)| *position);
    match position {
        Some(position) => (text, position),
        None => panic!("fixture has no $0 cursor marker: {input:?}"),
    }
}

/// Strip `$1`..`$9` markers, returning positions ordered by marker number.
#[must_use]
pub fn extract_cursors(input: &str) -> (String, Vec<Position>) {
    let (text, mut markers) = strip_markers(input);
    markers.retain(|(n, _)| *n > 0);
    markers.sort_by_key(|(n, _)| *n);
    (text, markers.into_iter().map(|(_, position)| position).collect())
}

/// A `file://` URI for a fixture file under a fake workspace root.
#[must_use]
pub fn fixture_uri(name: &str) -> FileUri {
    FileUri::new(format!("file:///querynav-fixture/{name}"))
}

/// Position of the `nth` (0-based) occurrence of `needle` in `text`.
///
/// # Panics
///
/// Panics if `needle` occurs fewer than `nth + 1` times.
#[must_use]
pub fn position_of(text: &str, needle: &str, nth: usize) -> Position {
    let offset = text
        .match_indices(needle)
        .nth(nth)
        .map(|(offset, _)| offset);
    match offset {
        Some(offset) => position_at(text, offset),
        None => panic!("{needle:?} does not occur {} time(s) in fixture", nth + 1),
    }
}

fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let character: usize = text[line_start..offset].chars().map(char::len_utf16).sum();
    Position::new(line as u32, character as u32)
}

fn strip_markers(input: &str) -> (String, Vec<(u32, Position)>) {
    let mut text = String::with_capacity(input.len());
    let mut markers = Vec::new();
    let mut line = 0u32;
    let mut character = 0u32;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            if let Some(n) = chars.peek().and_then(|next| next.to_digit(10)) {
                chars.next();
                markers.push((n, Position::new(line, character)));
                continue;
            }
        }

        text.push(ch);
        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += ch.len_utf16() as u32;
        }
    }

    (text, markers)
}
