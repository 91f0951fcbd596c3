//! Byte offset <-> LSP position conversion.
//!
//! Everything inside jsdoc-deco addresses text by UTF-8 byte offset (what
//! tree-sitter and oxc hand out). Editors speak LSP positions, where the
//! character is counted in UTF-16 code units. `LineIndex` bridges the two.

use lsp_types::{Position, Range};

/// Line table for one document version.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    /// Byte offset at which each line starts; always begins with 0
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            text: text.to_string(),
            line_starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset into a position.
    ///
    /// Offsets past the end clamp to the end of the text, offsets inside a
    /// multi-byte character snap back to its first byte.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = self.floor_char_boundary(offset.min(self.text.len()));
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character = self.text[line_start..offset].encode_utf16().count();
        Position::new(line as u32, character as u32)
    }

    /// Convert a position into a byte offset.
    ///
    /// Lines past the end clamp to the end of the text, characters past the
    /// end of a line clamp to the line end (before its newline).
    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return self.text.len();
        }
        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line_text = &self.text[line_start..line_end];
        let line_text = line_text.strip_suffix('\r').unwrap_or(line_text);

        let mut utf16 = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if utf16 >= position.character {
                return line_start + byte_idx;
            }
            utf16 += ch.len_utf16() as u32;
        }
        line_start + line_text.len()
    }

    pub fn range_of(&self, start: usize, end: usize) -> Range {
        Range::new(self.position_at(start), self.position_at(end))
    }

    fn floor_char_boundary(&self, mut offset: usize) -> usize {
        while offset > 0 && !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
