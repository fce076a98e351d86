use querynav_types::{OffsetRange, Position, Range};

/// Maps byte offsets to editor positions and back.
///
/// Columns are counted in UTF-16 code units. Lines containing only ASCII pay
/// nothing extra; for other lines the multi-byte characters are recorded so
/// conversions stay exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<usize>,
    /// Multi-byte characters per line, in order
    wide_chars: Vec<Vec<WideChar>>,
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WideChar {
    /// Byte offset from the start of the line
    start: usize,
    len_utf8: usize,
    len_utf16: usize,
}

impl WideChar {
    const fn end(self) -> usize {
        self.start + self.len_utf8
    }
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut wide_chars = vec![Vec::new()];
        let mut line_start = 0;

        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_start = i + 1;
                line_starts.push(line_start);
                wide_chars.push(Vec::new());
                continue;
            }
            if !c.is_ascii() {
                if let Some(line) = wide_chars.last_mut() {
                    line.push(WideChar {
                        start: i - line_start,
                        len_utf8: c.len_utf8(),
                        len_utf16: c.len_utf16(),
                    });
                }
            }
        }

        Self {
            line_starts,
            wide_chars,
            len: text.len(),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of a line
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Byte length of a line's content, excluding the line terminator.
    fn line_len(&self, line: usize, text_end: usize) -> usize {
        let start = self.line_starts[line];
        match self.line_starts.get(line + 1) {
            Some(next) => next - 1 - start,
            None => text_end - start,
        }
    }

    /// Convert a byte offset to a line/UTF-16 column position.
    ///
    /// Offsets past the end of the text clamp to the end.
    #[must_use]
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1));

        let col = offset - self.line_starts[line];
        let mut col16 = col;
        for wide in &self.wide_chars[line] {
            if wide.end() <= col {
                col16 -= wide.len_utf8 - wide.len_utf16;
            } else {
                break;
            }
        }

        Position::new(line as u32, col16 as u32)
    }

    /// Convert a line/UTF-16 column position to a byte offset.
    ///
    /// Returns `None` when the line does not exist. Columns past the end of the
    /// line clamp to the end of that line.
    #[must_use]
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        let line_start = self.line_start(line)?;

        let mut col = position.character as usize;
        for wide in &self.wide_chars[line] {
            if wide.start < col {
                col += wide.len_utf8 - wide.len_utf16;
            } else {
                break;
            }
        }

        Some(line_start + col.min(self.line_len(line, self.len)))
    }

    #[must_use]
    pub fn offset_range_to_range(&self, range: OffsetRange) -> Range {
        Range::new(
            self.offset_to_position(range.start),
            self.offset_to_position(range.end),
        )
    }
}
