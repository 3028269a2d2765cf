//! Decoding and encoding of string literal tokens.
//!
//! Values are Rust strings. `\xHH` and octal escapes name the code point
//! `U+00HH`, so every decoded value has exactly one canonical spelling.

use nom::bytes::complete::take_while_m_n;
use nom::Parser;
use thiserror::Error;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("string literal too short")]
    TooShort,
    #[error("string literal is not quoted")]
    MissingQuote,
    #[error("truncated escape sequence")]
    TruncatedEscape { offset: usize },
    #[error("invalid escape sequence {escape}: octal value out of range")]
    OctalOutOfRange { offset: usize, escape: String },
    #[error("invalid escape sequence {escape}: expected two hex digits")]
    InvalidHex { offset: usize, escape: String },
    #[error("invalid escape sequence {escape}: expected {digits} hex digits")]
    InvalidUnicode {
        offset: usize,
        escape: String,
        digits: usize,
    },
    #[error("invalid escape sequence {escape}: surrogate code point")]
    Surrogate { offset: usize, escape: String },
    #[error("invalid escape sequence {escape}: code point out of range")]
    OutOfRange { offset: usize, escape: String },
}

impl QuoteError {
    /// Byte offset of the failing escape inside the token.
    pub fn offset(&self) -> usize {
        match self {
            QuoteError::TooShort | QuoteError::MissingQuote => 0,
            QuoteError::TruncatedEscape { offset }
            | QuoteError::OctalOutOfRange { offset, .. }
            | QuoteError::InvalidHex { offset, .. }
            | QuoteError::InvalidUnicode { offset, .. }
            | QuoteError::Surrogate { offset, .. }
            | QuoteError::OutOfRange { offset, .. } => *offset,
        }
    }
}

/// Decodes a string literal token, returning its value and whether it
/// was triple-quoted.
pub fn unquote(token: &str) -> Result<(String, bool)> {
    Ok(decode(token)?)
}

pub(crate) fn decode(token: &str) -> Result<(String, bool), QuoteError> {
    let (raw, quoted) = match token.strip_prefix(['r', 'R']) {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let prefix = token.len() - quoted.len();

    let quote = match quoted.chars().next() {
        Some(c @ ('"' | '\'')) => c,
        Some(_) => return Err(QuoteError::MissingQuote),
        None => return Err(QuoteError::TooShort),
    };
    if quoted.len() < 2 {
        return Err(QuoteError::TooShort);
    }
    if !quoted.ends_with(quote) {
        return Err(QuoteError::MissingQuote);
    }

    let marker = if quote == '"' { "\"\"\"" } else { "'''" };
    let triple = quoted.len() >= 6 && quoted.starts_with(marker) && quoted.ends_with(marker);
    let delimiter = if triple { 3 } else { 1 };
    let body = &quoted[delimiter..quoted.len() - delimiter];

    if raw || !body.contains('\\') {
        return Ok((body.to_string(), triple));
    }

    let body_offset = prefix + delimiter;
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(i) = rest.find('\\') {
        out.push_str(&rest[..i]);
        let escape = &rest[i..];
        let offset = body_offset + (body.len() - rest.len()) + i;
        let consumed = unescape(escape, offset, &mut out)?;
        rest = &escape[consumed..];
    }
    out.push_str(rest);

    Ok((out, triple))
}

/// Decodes the escape sequence at the start of `escape` into `out` and
/// returns how many bytes it used.
fn unescape(escape: &str, offset: usize, out: &mut String) -> Result<usize, QuoteError> {
    let Some(c) = escape[1..].chars().next() else {
        return Err(QuoteError::TruncatedEscape { offset });
    };

    let simple = match c {
        // line continuation inside the literal
        '\n' => return Ok(2),
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0c'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0b'),
        '\\' | '\'' | '"' => Some(c),
        _ => None,
    };
    if let Some(decoded) = simple {
        out.push(decoded);
        return Ok(2);
    }

    match c {
        '0'..='7' => {
            let digits = digits(&escape[1..], 1, 3, |c| ('0'..='7').contains(&c)).unwrap_or("");
            let value = digits
                .bytes()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            let byte = u8::try_from(value).map_err(|_| QuoteError::OctalOutOfRange {
                offset,
                escape: escape[..1 + digits.len()].to_string(),
            })?;
            out.push(char::from(byte));
            Ok(1 + digits.len())
        }
        'x' => {
            let invalid = || QuoteError::InvalidHex {
                offset,
                escape: escape.chars().take(4).collect(),
            };
            let hex = digits(&escape[2..], 2, 2, |c| c.is_ascii_hexdigit()).ok_or_else(invalid)?;
            let byte = u8::from_str_radix(hex, 16).map_err(|_| invalid())?;
            out.push(char::from(byte));
            Ok(4)
        }
        'u' => unicode(escape, offset, 4, out),
        'U' => unicode(escape, offset, 8, out),
        other => {
            // Unknown escapes stay in the value verbatim.
            out.push('\\');
            out.push(other);
            Ok(1 + other.len_utf8())
        }
    }
}

fn unicode(escape: &str, offset: usize, count: usize, out: &mut String) -> Result<usize, QuoteError> {
    let hex = digits(&escape[2..], count, count, |c| c.is_ascii_hexdigit());
    let text = &escape[..2 + hex.map_or(0, str::len)];
    let Some(value) = hex.and_then(|hex| u32::from_str_radix(hex, 16).ok()) else {
        return Err(QuoteError::InvalidUnicode {
            offset,
            escape: text.to_string(),
            digits: count,
        });
    };
    if (0xD800..=0xDFFF).contains(&value) {
        return Err(QuoteError::Surrogate {
            offset,
            escape: text.to_string(),
        });
    }
    let decoded = char::from_u32(value).ok_or_else(|| QuoteError::OutOfRange {
        offset,
        escape: text.to_string(),
    })?;
    out.push(decoded);
    Ok(2 + count)
}

/// Between `min` and `max` leading characters of `input` matching `accept`.
fn digits(input: &str, min: usize, max: usize, accept: fn(char) -> bool) -> Option<&str> {
    take_while_m_n::<_, &str, nom::error::Error<&str>>(min, max, accept)
        .parse(input)
        .ok()
        .map(|(_, digits)| digits)
}

/// Encodes `value` as a double-quoted literal with minimal escaping.
pub fn quote(value: &str, triple: bool) -> String {
    let delimiter = if triple { "\"\"\"" } else { "\"" };
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 2 * delimiter.len());
    out.push_str(delimiter);

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '"' if triple => match (chars.get(i + 1), chars.get(i + 2)) {
                // one or two quotes may stand unescaped before another character
                (Some(&next), _) if next != '"' => out.push('"'),
                (Some('"'), Some(&after)) if after != '"' => {
                    out.push_str("\"\"");
                    i += 1;
                }
                _ => out.push_str("\\\""),
            },
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' if triple => out.push('\n'),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\{:03o}", u32::from(c))),
            c => out.push(c),
        }
        i += 1;
    }

    out.push_str(delimiter);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (quoted, value, whether `quoted` is the canonical form of `value`)
    const QUOTE_TESTS: &[(&str, &str, bool)] = &[
        (r#""""#, "", true),
        ("''", "", false),
        (r#""hello""#, "hello", true),
        ("'hello'", "hello", false),
        (r#""quote\"here""#, "quote\"here", true),
        (r#"'quote\"here'"#, "quote\"here", false),
        (r#"'quote"here'"#, "quote\"here", false),
        (r#""quote'here""#, "quote'here", true),
        (r#""quote\'here""#, "quote'here", false),
        (r#"'quote\'here'"#, "quote'here", false),
        (
            r#""""hello " ' world "" asdf ''' foo""""#,
            "hello \" ' world \"\" asdf ''' foo",
            true,
        ),
        (r#""foo\\(bar""#, "foo\\(bar", true),
        ("\"\"\"hello\nworld\"\"\"", "hello\nworld", true),
        (r#""\\a\\b\\f\n\r\t\\v\000""#, "\\a\\b\\f\n\r\t\\v\0", true),
        (r#""\\a\\b\\f\n\r\t\\v\x00""#, "\\a\\b\\f\n\r\t\\v\0", false),
        (r#""\\a\\b\\f\n\r\t\\v\000\377""#, "\\a\\b\\f\n\r\t\\v\0\u{ff}", false),
        (r#""\\a\\b\\f\n\r\t\\v\000\xFF""#, "\\a\\b\\f\n\r\t\\v\0\u{ff}", false),
        (
            r#""\\a\\b\\f\n\r\t\\v\000\"'\\\003\200""#,
            "\\a\\b\\f\n\r\t\\v\0\"'\\\x03\u{80}",
            true,
        ),
        (
            r#""\\a\\b\\f\n\r\t\\v\x00\"'\\\x03\x80""#,
            "\\a\\b\\f\n\r\t\\v\0\"'\\\x03\u{80}",
            false,
        ),
        (
            r#""\\a\\b\\f\n\r\t\\v\000\"\'\\\x03\x80""#,
            "\\a\\b\\f\n\r\t\\v\0\"'\\\x03\u{80}",
            false,
        ),
        (
            r#""cat $(SRCS) | grep '\s*ip_block:' | sed -e 's/\s*ip_block: \"\([^ ]*\)\"/    \x27\\1\x27,/g' >> $@; ""#,
            r#"cat $(SRCS) | grep '\s*ip_block:' | sed -e 's/\s*ip_block: "\([^ ]*\)"/    '\1',/g' >> $@; "#,
            false,
        ),
        (
            r#""cat $(SRCS) | grep '\\s*ip_block:' | sed -e 's/\\s*ip_block: \"\\([^ ]*\\)\"/    \x27\\1\x27,/g' >> $@; ""#,
            r#"cat $(SRCS) | grep '\s*ip_block:' | sed -e 's/\s*ip_block: "\([^ ]*\)"/    '\1',/g' >> $@; "#,
            false,
        ),
        (
            r#""cat $(SRCS) | grep '\\s*ip_block:' | sed -e 's/\\s*ip_block: \"\\([^ ]*\\)\"/    '\\1',/g' >> $@; ""#,
            r#"cat $(SRCS) | grep '\s*ip_block:' | sed -e 's/\s*ip_block: "\([^ ]*\)"/    '\1',/g' >> $@; "#,
            true,
        ),
    ];

    /// (quoted, decoded value or None when decoding must fail)
    const UNQUOTE_ERROR_TESTS: &[(&str, Option<&str>)] = &[
        (r#""\1""#, Some("\u{1}")),
        (r#""\12""#, Some("\n")),
        (r#""\123""#, Some("S")),
        (r#""\400""#, None),
        (r#""\x""#, None),
        (r#""\x1""#, None),
        (r#""\x12""#, Some("\u{12}")),
        (r#""\u""#, None),
        (r#""\u1""#, None),
        (r#""\u12""#, None),
        (r#""\u123""#, None),
        (r#""\u1234""#, Some("\u{1234}")),
        (r#""\uD7FF""#, Some("\u{d7ff}")),
        (r#""\uD800""#, None),
        (r#""\uDFFF""#, None),
        (r#""\uE000""#, Some("\u{e000}")),
        (r#""\uFFFF""#, Some("\u{ffff}")),
        (r#""\u0000""#, Some("\0")),
        (r#""\U""#, None),
        (r#""\U1""#, None),
        (r#""\U12""#, None),
        (r#""\U123""#, None),
        (r#""\U1234""#, None),
        (r#""\U12345""#, None),
        (r#""\U123456""#, None),
        (r#""\U1234567""#, None),
        (r#""\U00012345""#, Some("\u{12345}")),
        (r#""\U0000D7FF""#, Some("\u{d7ff}")),
        (r#""\U0000D800""#, None),
        (r#""\U0000DFFF""#, None),
        (r#""\U0000E000""#, Some("\u{e000}")),
        (r#""\U0000FFFF""#, Some("\u{ffff}")),
        (r#""\U00000000""#, Some("\0")),
        (r#""\U0010FFFF""#, Some("\u{10ffff}")),
        (r#""\U00110000""#, None),
        (r#""\UFFFFFFFF""#, None),
    ];

    #[test]
    fn test_quote() {
        for &(quoted, value, canonical) in QUOTE_TESTS {
            if !canonical {
                continue;
            }
            assert_eq!(quote(value, quoted.starts_with("\"\"\"")), quoted, "quote({:?})", value);
        }
    }

    #[test]
    fn test_unquote() {
        for &(quoted, value, _) in QUOTE_TESTS {
            let triple = quoted.starts_with("\"\"\"") || quoted.starts_with("'''");
            assert_eq!(
                unquote(quoted).unwrap(),
                (value.to_string(), triple),
                "unquote({})",
                quoted
            );
        }
    }

    #[test]
    fn test_unquote_errors() {
        for &(quoted, expected) in UNQUOTE_ERROR_TESTS {
            match expected {
                Some(value) => assert_eq!(decode(quoted), Ok((value.to_string(), false)), "{}", quoted),
                None => assert!(decode(quoted).is_err(), "{} should fail", quoted),
            }
        }
    }

    #[test]
    fn test_error_kinds_and_offsets() {
        assert_eq!(
            decode(r#""ab\x1""#),
            Err(QuoteError::InvalidHex {
                offset: 3,
                escape: r"\x1".to_string()
            })
        );
        assert!(matches!(
            decode(r#""\uD800""#),
            Err(QuoteError::Surrogate { offset: 1, .. })
        ));
        assert!(matches!(
            decode(r#""\U00110000""#),
            Err(QuoteError::OutOfRange { .. })
        ));
        assert!(matches!(
            decode(r#""\400""#),
            Err(QuoteError::OctalOutOfRange { .. })
        ));
        assert!(matches!(
            decode(r#""""x\u12""""#),
            Err(QuoteError::InvalidUnicode { offset: 4, digits: 4, .. })
        ));
        assert_eq!(decode("\""), Err(QuoteError::TooShort));
        assert_eq!(decode("abc"), Err(QuoteError::MissingQuote));
    }

    #[test]
    fn test_raw_and_unknown_escapes() {
        assert_eq!(decode(r#"r"a\nb""#), Ok((r"a\nb".to_string(), false)));
        assert_eq!(decode(r#""\d+""#), Ok((r"\d+".to_string(), false)));
        assert_eq!(decode("\"a\\\nb\""), Ok(("ab".to_string(), false)));
    }

    #[test]
    fn test_round_trip_values() {
        let values = [
            "",
            "plain",
            "tab\tand\nnewline",
            "\"\"\"",
            "ends with quote\"",
            "bell\x07 and del\x7f",
            "ünïcödé ✓",
            "back\\slash",
        ];
        for value in values {
            for triple in [false, true] {
                let quoted = quote(value, triple);
                assert_eq!(decode(&quoted), Ok((value.to_string(), triple)), "{}", quoted);
            }
        }
    }

    #[test]
    fn test_triple_quote_escapes_closing_runs() {
        assert_eq!(quote("a\"", true), r#""""a\"""""#);
        assert_eq!(quote("\"\"\"", true), r#""""\"\"\"""""#);
    }
}
