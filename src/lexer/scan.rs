//! Recognizers for single tokens.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_till1, take_while};
use nom::character::complete::{anychar, char, one_of, satisfy};
use nom::combinator::{not, opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom::Parser;

use crate::position::Span;
use crate::result::ParseResult;

/// Letters, digits, `_` and every character outside ASCII.
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

pub fn identifier(input: Span) -> ParseResult<Span, Span> {
    recognize(pair(
        satisfy(|c: char| is_identifier_char(c) && !c.is_ascii_digit()),
        take_while(is_identifier_char),
    ))
    .parse(input)
}

/// Spaces, tabs and carriage returns.
pub fn blanks(input: Span) -> ParseResult<Span, Span> {
    take_while(|c: char| c == ' ' || c == '\t' || c == '\r').parse(input)
}

/// A `#` comment up to, not including, the end of the line.
pub fn comment(input: Span) -> ParseResult<Span, Span> {
    recognize(pair(char('#'), take_till(|c: char| c == '\n'))).parse(input)
}

pub fn number(input: Span) -> ParseResult<Span, Span> {
    let digit = || satisfy(|c: char| c.is_ascii_digit());
    recognize(pair(
        alt((recognize(digit()), recognize(pair(char('.'), digit())))),
        many0(alt((
            recognize(pair(one_of("eE"), one_of("+-"))),
            recognize(satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')),
        ))),
    ))
    .parse(input)
}

/// Operators and punctuation, longest match first.
pub fn operator(input: Span) -> ParseResult<Span, Span> {
    alt((
        alt((
            tag("//="),
            tag("<<="),
            tag(">>="),
            tag("**"),
            tag("//"),
            tag("<<"),
            tag(">>"),
            tag("<="),
            tag(">="),
            tag("=="),
            tag("!="),
            tag("+="),
            tag("-="),
            tag("*="),
            tag("/="),
            tag("%="),
            tag("&="),
            tag("|="),
            tag("^="),
        )),
        recognize(one_of("+-*/%~|&^<>=()[]{},:;.")),
    ))
    .parse(input)
}

/// Length in bytes of the string literal at the start of `text`.
///
/// The literal may carry an `r`/`R` prefix. Escapes are skipped, not decoded.
pub fn string_length(text: &str) -> Result<usize, &'static str> {
    const EOF: &str = "unexpected EOF in string";

    let (rest, quote) = string_open(text).map_err(|_| EOF)?;
    let body = if quote.len() == 3 {
        long_string_body(rest, quote)
    } else {
        short_string_body(rest, quote)
    };
    let (rest, _) = body.map_err(|_| EOF)?;

    let closed: ParseResult<&str, &str> = tag(quote).parse(rest);
    match closed {
        Ok((rest, _)) => Ok(text.len() - rest.len()),
        Err(_) if rest.starts_with('\n') => Err("unexpected newline in string"),
        Err(_) => Err(EOF),
    }
}

/// The optional raw prefix and the opening quote, which is returned.
fn string_open(input: &str) -> ParseResult<&str, &str> {
    preceded(
        opt(one_of("rR")),
        alt((tag(r#"""""#), tag("'''"), tag("\""), tag("'"))),
    )
    .parse(input)
}

/// A backslash and the character it escapes.
fn string_escape(input: &str) -> ParseResult<&str, &str> {
    recognize(pair(char('\\'), anychar)).parse(input)
}

/// Everything up to the closing `quote` or the end of the line.
fn short_string_body<'a>(input: &'a str, quote: &str) -> ParseResult<&'a str, &'a str> {
    recognize(many0(alt((
        string_escape,
        take_till1(move |c: char| quote.starts_with(c) || c == '\\' || c == '\n'),
    ))))
    .parse(input)
}

/// Everything up to the closing triple `quote`, line breaks included.
fn long_string_body<'a>(input: &'a str, quote: &str) -> ParseResult<&'a str, &'a str> {
    recognize(many0(alt((string_escape, recognize(pair(not(tag(quote)), anychar)))))).parse(input)
}
