//! Source positions.

use std::fmt;

use nom_locate::LocatedSpan;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lexer input: the remaining source plus its location.
pub type Span<'a> = LocatedSpan<&'a str>;

/// A location in a source file.
///
/// `line` and `line_rune` are 1-based, `byte` is a 0-based offset. The
/// column counts characters, not bytes. The default value (line 0) marks
/// a position that never came from a source file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub line: usize,
    pub line_rune: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, line_rune: usize, byte: usize) -> Self {
        Self {
            line,
            line_rune,
            byte,
        }
    }

    /// Position of the first character of `span`.
    pub fn of(span: &Span) -> Self {
        Self {
            line: span.location_line() as usize,
            line_rune: span.get_utf8_column(),
            byte: span.location_offset(),
        }
    }

    /// Whether the position came from a source file.
    pub fn is_valid(&self) -> bool {
        self.line > 0
    }

    /// Position just past `text`, assuming `text` starts here.
    pub fn add(self, text: &str) -> Self {
        let mut pos = self;
        for c in text.chars() {
            if c == '\n' {
                pos.line += 1;
                pos.line_rune = 1;
            } else {
                pos.line_rune += 1;
            }
        }
        pos.byte += text.len();
        pos
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.line_rune)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        let start = Position::new(1, 1, 0);
        assert_eq!(start.add("abc"), Position::new(1, 4, 3));
        assert_eq!(start.add("a\nbc"), Position::new(2, 3, 4));
        // columns count characters, offsets count bytes
        assert_eq!(start.add("é"), Position::new(1, 2, 2));
    }

    #[test]
    fn test_of_span() {
        use nom::Parser;

        let span = Span::new("ab\ncd");
        let (rest, _) = nom::bytes::complete::take::<usize, Span, nom::error::Error<Span>>(4)
            .parse(span)
            .unwrap();
        assert_eq!(Position::of(&rest), Position::new(2, 2, 4));
    }
}
