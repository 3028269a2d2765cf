use thiserror::Error;

use crate::position::Position;
use crate::quote::QuoteError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{path}:{pos}: {message}")]
    Lex {
        path: String,
        pos: Position,
        message: String,
    },
    #[error("{path}:{pos}: syntax error: unexpected {found}{}", expecting(.expected))]
    Parse {
        path: String,
        pos: Position,
        found: String,
        expected: Vec<String>,
    },
    #[error("{path}:{pos}: {source}")]
    Quote {
        path: String,
        pos: Position,
        source: QuoteError,
    },
    #[error("invalid string literal: {0}")]
    InvalidString(#[from] QuoteError),
    #[error("{path}:{pos}: invalid UTF-8 in source")]
    InvalidUtf8 { path: String, pos: Position },
}

impl Error {
    /// Where in the source the error happened, if it came from a file.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Lex { pos, .. }
            | Error::Parse { pos, .. }
            | Error::Quote { pos, .. }
            | Error::InvalidUtf8 { pos, .. } => Some(*pos),
            Error::InvalidString(_) => None,
        }
    }
}

fn expecting(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expecting {}", expected.join(" or "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = Error::Parse {
            path: "BUILD".to_string(),
            pos: Position::new(3, 7, 20),
            found: "')'".to_string(),
            expected: vec!["identifier".to_string(), "'*'".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "BUILD:3:7: syntax error: unexpected ')', expecting identifier or '*'"
        );
        assert_eq!(err.position(), Some(Position::new(3, 7, 20)));
    }

    #[test]
    fn test_lex_error_message() {
        let err = Error::Lex {
            path: "x.bzl".to_string(),
            pos: Position::new(1, 5, 4),
            message: "unexpected EOF in string".to_string(),
        };
        assert_eq!(err.to_string(), "x.bzl:1:5: unexpected EOF in string");
    }
}
