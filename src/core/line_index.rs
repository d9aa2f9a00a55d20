//! Byte offset to line/character translation.
//!
//! Line start offsets are computed once per document and retained; lookups
//! are O(log n) binary searches. Characters are byte columns within the
//! line, which coincides with display columns for ASCII documents.

use crate::diagnostics::{Position, Range};

/// An index of line start byte offsets for a document.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Translate a byte offset to a 0-based position. Offsets past the end
    /// of the document clamp to the last position.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };
        Position {
            line: line as u32,
            character: (offset - self.line_starts[line]) as u32,
        }
    }

    /// Translate a byte offset pair to a range.
    pub fn range(&self, start: usize, end: usize) -> Range {
        Range {
            start: self.position(start),
            end: self.position(end.max(start)),
        }
    }
}
