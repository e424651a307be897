use tower_lsp::lsp_types::{Position, Range};

use crate::lexer::Token;

/// Convert byte offset to LSP Position
pub fn position_at(text: &str, byte_offset: usize) -> Position {
    let byte_offset = byte_offset.min(text.len());
    let mut line = 0u32;
    let mut col_utf16 = 0u32;
    for (i, ch) in text.char_indices() {
        if i >= byte_offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col_utf16 = 0;
        } else {
            col_utf16 += ch.len_utf16() as u32;
        }
    }
    Position::new(line, col_utf16)
}

/// Convert LSP Position to byte offset. A column past the end of its line
/// is clamped to the line end; a line past the end of the text is `None`.
pub fn byte_offset_at(text: &str, position: Position) -> Option<usize> {
    let mut line = 0u32;
    let mut col = 0u32;

    for (i, ch) in text.char_indices() {
        if line == position.line && col >= position.character {
            return Some(i);
        }
        if ch == '\n' {
            if line == position.line {
                return Some(i);
            }
            line += 1;
            col = 0;
        } else {
            col += ch.len_utf16() as u32;
        }
    }

    (line == position.line).then_some(text.len())
}

pub fn range_of(text: &str, bytes: std::ops::Range<usize>) -> Range {
    Range::new(position_at(text, bytes.start), position_at(text, bytes.end))
}

/// Text between the start of the line and `byte_offset`.
pub fn line_prefix(text: &str, byte_offset: usize) -> &str {
    let end = byte_offset.min(text.len());
    let Some(prefix) = text.get(..end) else {
        return "";
    };
    let start = prefix.rfind('\n').map_or(0, |i| i + 1);
    &prefix[start..]
}

/// Maps token positions (1-based line, char column) onto LSP positions.
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .collect(),
        }
    }

    fn utf16_col(&self, line: usize, char_col: u32) -> u32 {
        self.lines.get(line).map_or(char_col, |text| {
            text.chars()
                .take(char_col as usize)
                .map(|c| c.len_utf16() as u32)
                .sum()
        })
    }

    /// LSP range covered by `token`.
    pub fn token_range(&self, token: &Token) -> Range {
        let line = token.line.saturating_sub(1) as usize;
        let start = self.utf16_col(line, token.col);
        let width: u32 = token.text.chars().map(|c| c.len_utf16() as u32).sum();
        Range::new(
            Position::new(line as u32, start),
            Position::new(line as u32, start + width),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_position_round_trip() {
        let text = "wait 0\n€x = 1\n";
        let pos = position_at(text, text.find('x').unwrap());
        assert_eq!(pos, Position::new(1, 1));
        assert_eq!(byte_offset_at(text, pos), text.find('x'));
    }

    #[test]
    fn test_offset_clamps_to_line_end() {
        let text = "ab\ncd";
        assert_eq!(byte_offset_at(text, Position::new(0, 10)), Some(2));
        assert_eq!(byte_offset_at(text, Position::new(1, 2)), Some(5));
        assert_eq!(byte_offset_at(text, Position::new(4, 0)), None);
    }

    #[test]
    fn test_line_prefix() {
        let text = "first\n  Car.Cr";
        assert_eq!(line_prefix(text, text.len()), "  Car.Cr");
        assert_eq!(line_prefix(text, 3), "fir");
    }

    #[test]
    fn test_token_range_counts_utf16() {
        let text = "s = \"😀\" @end";
        let tokens = tokenize(text);
        let label = tokens.iter().find(|t| t.text == "@end").unwrap();
        let range = LineIndex::new(text).token_range(label);
        assert_eq!(range.start, Position::new(0, 9));
        assert_eq!(range.end, Position::new(0, 13));
    }
}
