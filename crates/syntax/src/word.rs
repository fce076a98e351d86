use querynav_types::OffsetRange;

/// Characters that make up a navigable name in both languages.
#[must_use]
pub const fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Find the span of the word under the cursor.
///
/// A cursor touching either end of a word counts as being on it, so a caret
/// placed right after `User` still selects `User`. Returns `None` when the
/// cursor is between two non-word characters.
#[must_use]
pub fn word_range_at(text: &str, offset: usize) -> Option<OffsetRange> {
    let bytes = text.as_bytes();
    if offset > bytes.len() {
        return None;
    }

    let mut start = offset;
    while start > 0 && is_word_byte(bytes[start - 1]) {
        start -= 1;
    }

    let mut end = offset;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }

    (start < end).then_some(OffsetRange::new(start, end))
}

/// The word under the cursor together with its span.
#[must_use]
pub fn word_at(text: &str, offset: usize) -> Option<(&str, OffsetRange)> {
    let range = word_range_at(text, offset)?;
    Some((range.slice(text)?, range))
}
