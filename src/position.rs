use tower_lsp::lsp_types::{Position, Range};

/// Lines of a document with LSP (UTF-16) column conversion
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        LineIndex {
            lines: split_lines(text).collect(),
        }
    }

    /// Line text without its terminator; lines past the end read as empty
    pub fn line(&self, line: u32) -> &'a str {
        self.lines.get(line as usize).copied().unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Byte offset inside the line for an LSP position, clamped to the line end
    pub fn byte_column(&self, position: Position) -> usize {
        byte_column(self.line(position.line), position.character)
    }
}

/// Split on `\n`, dropping a trailing `\r` from each line
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// UTF-16 column of a byte offset within `line`
pub fn utf16_column(line: &str, byte: usize) -> u32 {
    let byte = byte.min(line.len());
    line.char_indices()
        .take_while(|(i, _)| *i < byte)
        .map(|(_, c)| c.len_utf16() as u32)
        .sum()
}

/// Byte offset of a UTF-16 column within `line`, clamped to the line end
pub fn byte_column(line: &str, character: u32) -> usize {
    let mut units = 0u32;
    for (i, c) in line.char_indices() {
        if units >= character {
            return i;
        }
        units += c.len_utf16() as u32;
    }
    line.len()
}

/// Range on one line from byte offsets
pub fn line_range(line_number: u32, line: &str, start: usize, end: usize) -> Range {
    Range {
        start: Position {
            line: line_number,
            character: utf16_column(line, start),
        },
        end: Position {
            line: line_number,
            character: utf16_column(line, end),
        },
    }
}

/// Range covering the whole line
pub fn full_line_range(line_number: u32, line: &str) -> Range {
    line_range(line_number, line, 0, line.len())
}
