//! Turns source text into tokens.
//!
//! Indentation becomes `Indent`/`Unindent` tokens and every line end at
//! bracket depth zero becomes a `Newline`. Comments that stand on their own
//! line outside brackets are tokens; all other comments are collected on the
//! side and attached to the tree after parsing.

mod scan;
mod token;

use log::trace;
use nom::Input;

use crate::error::{Error, Result};
use crate::position::{Position, Span};
use crate::syntax::Comment;

pub use token::{Token, TokenKind};

#[derive(Debug, Default)]
pub struct Tokens<'a> {
    pub tokens: Vec<Token<'a>>,
    /// Comments alone on their line inside brackets, or after an opening bracket.
    pub line_comments: Vec<Comment>,
    /// Comments that follow code on their line.
    pub suffix_comments: Vec<Comment>,
}

pub fn tokenize<'a>(path: &str, source: &'a str) -> Result<Tokens<'a>> {
    let mut lexer = Lexer::new(path, source);
    lexer.run()?;
    trace!(
        "{}: {} tokens, {} line comments, {} suffix comments",
        path,
        lexer.out.tokens.len(),
        lexer.out.line_comments.len(),
        lexer.out.suffix_comments.len()
    );
    Ok(lexer.out)
}

struct Lexer<'a> {
    path: String,
    source: &'a str,
    input: Span<'a>,
    indents: Vec<usize>,
    depth: usize,
    line_start: bool,
    out: Tokens<'a>,
}

impl<'a> Lexer<'a> {
    fn new(path: &str, source: &'a str) -> Self {
        Self {
            path: path.to_string(),
            source,
            input: Span::new(source),
            indents: vec![0],
            depth: 0,
            line_start: true,
            out: Tokens::default(),
        }
    }

    fn run(&mut self) -> Result<()> {
        loop {
            if self.line_start {
                self.line_start = false;
                self.indentation()?;
            }
            self.skip_blanks();

            let rest = *self.input.fragment();
            let Some(c) = rest.chars().next() else {
                break;
            };
            let next = &rest[c.len_utf8()..];

            match c {
                '\n' => {
                    let newline = self.advance(1);
                    if self.depth == 0 {
                        self.emit(TokenKind::Newline, newline);
                        self.line_start = true;
                    }
                }
                '\\' if next.starts_with('\n') || next.starts_with("\r\n") => {
                    // continuation: the next line belongs to this one
                    let len = if next.starts_with('\n') { 2 } else { 3 };
                    self.advance(len);
                }
                '#' => self.comment(),
                '"' | '\'' => self.string()?,
                'r' | 'R' if next.starts_with(['"', '\'']) => self.string()?,
                '0'..='9' => self.number()?,
                '.' if next.starts_with(|c: char| c.is_ascii_digit()) => self.number()?,
                c if scan::is_identifier_char(c) => self.word()?,
                c => self.operator(c)?,
            }
        }

        let eof = self.input;
        if !matches!(self.out.tokens.last(), Some(token) if token.is(TokenKind::Newline)) {
            self.emit(TokenKind::Newline, eof);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.emit(TokenKind::Unindent, eof);
        }
        self.emit(TokenKind::Eof, eof);
        Ok(())
    }

    fn error(&self, pos: Position, message: impl Into<String>) -> Error {
        Error::Lex {
            path: self.path.clone(),
            pos,
            message: message.into(),
        }
    }

    fn pos(&self) -> Position {
        Position::of(&self.input)
    }

    fn advance(&mut self, len: usize) -> Span<'a> {
        let (rest, taken) = self.input.take_split(len);
        self.input = rest;
        taken
    }

    fn emit(&mut self, kind: TokenKind, text: Span<'a>) {
        let pos = Position::of(&text);
        let text = *text.fragment();
        self.out.tokens.push(Token {
            kind,
            text,
            pos,
            end: pos.add(text),
        });
    }

    fn skip_blanks(&mut self) {
        if let Ok((rest, _)) = scan::blanks(self.input) {
            self.input = rest;
        }
    }

    /// Compares the indentation of a new line with the open blocks.
    fn indentation(&mut self) -> Result<()> {
        self.skip_blanks();
        let rest = *self.input.fragment();
        if rest.is_empty() || rest.starts_with(['\n', '#']) {
            // blank and comment-only lines do not count
            return Ok(());
        }

        let pos = self.pos();
        let width = pos.line_rune - 1;
        let here = self.input.take(0);
        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            self.emit(TokenKind::Indent, here);
        } else if width < top {
            while self.indents.last().is_some_and(|&level| level > width) {
                self.indents.pop();
                self.emit(TokenKind::Unindent, here);
            }
            if self.indents.last() != Some(&width) {
                return Err(self.error(pos, "unexpected indentation"));
            }
        }
        Ok(())
    }

    fn comment(&mut self) {
        let pos = self.pos();
        let Ok((rest, text)) = scan::comment(self.input) else {
            return;
        };
        self.input = rest;
        let text: &'a str = *text.fragment();
        let text = text.trim_end();

        let line_start = self.source[..pos.byte].rfind('\n').map_or(0, |i| i + 1);
        let prefix: String = self.source[line_start..pos.byte]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let suffix = !(prefix.is_empty() || prefix == "):" || prefix.ends_with(['(', '[', '{']));

        if !suffix && self.depth == 0 {
            self.out.tokens.push(Token {
                kind: TokenKind::Comment,
                text,
                pos,
                end: pos.add(text),
            });
            return;
        }

        let comment = Comment {
            start: pos,
            token: text.to_string(),
        };
        if suffix {
            self.out.suffix_comments.push(comment);
        } else {
            self.out.line_comments.push(comment);
        }
    }

    fn string(&mut self) -> Result<()> {
        let pos = self.pos();
        let len = scan::string_length(self.input.fragment()).map_err(|message| self.error(pos, message))?;
        let text = self.advance(len);
        self.emit(TokenKind::String, text);
        Ok(())
    }

    fn number(&mut self) -> Result<()> {
        let pos = self.pos();
        let (rest, text) = scan::number(self.input).map_err(|_| self.error(pos, "invalid number"))?;
        self.input = rest;
        self.emit(TokenKind::Number, text);
        Ok(())
    }

    fn word(&mut self) -> Result<()> {
        let pos = self.pos();
        let (rest, text) = scan::identifier(self.input).map_err(|_| self.error(pos, "invalid identifier"))?;
        self.input = rest;

        let kind = match TokenKind::keyword(text.fragment()) {
            // `load` is only a keyword when it is called
            Some(TokenKind::Load) if !rest.fragment().trim_start_matches([' ', '\t']).starts_with('(') => {
                TokenKind::Ident
            }
            Some(kind) => kind,
            None => TokenKind::Ident,
        };
        self.emit(kind, text);
        Ok(())
    }

    fn operator(&mut self, c: char) -> Result<()> {
        let pos = self.pos();
        let (rest, text) = scan::operator(self.input)
            .map_err(|_| self.error(pos, format!("unexpected input character {:?}", c)))?;
        self.input = rest;

        let Some(kind) = TokenKind::operator(text.fragment()) else {
            return Err(self.error(pos, format!("unexpected input character {:?}", c)));
        };
        match kind {
            TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => self.depth += 1,
            TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                self.depth = self.depth.saturating_sub(1)
            }
            _ => {}
        }
        self.emit(kind, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Error, Position, TokenKind};

    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize("test", source)
            .unwrap()
            .tokens
            .iter()
            .map(|token| token.kind)
            .collect()
    }

    fn lex_error(source: &str) -> std::string::String {
        match tokenize("test", source) {
            Err(Error::Lex { message, .. }) => message,
            other => panic!("expected a lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_statement() {
        assert_eq!(kinds("x = 1\n"), vec![Ident, Eq, Number, Newline, Eof]);
        assert_eq!(kinds("x"), vec![Ident, Newline, Eof]);
        assert_eq!(kinds(""), vec![Newline, Eof]);
    }

    #[test]
    fn test_indentation() {
        assert_eq!(
            kinds("def f():\n    pass\n"),
            vec![Def, Ident, LParen, RParen, Colon, Newline, Indent, Pass, Newline, Unindent, Eof]
        );
        assert_eq!(
            kinds("if a:\n    if b:\n        c\nd\n"),
            vec![
                If, Ident, Colon, Newline, Indent, If, Ident, Colon, Newline, Indent, Ident, Newline, Unindent,
                Unindent, Ident, Newline, Eof
            ]
        );
        assert_eq!(lex_error("if x:\n    a\n  b\n"), "unexpected indentation");
    }

    #[test]
    fn test_brackets_suppress_newlines() {
        assert_eq!(
            kinds("f(\n  a,\n)\n"),
            vec![Ident, LParen, Ident, Comma, RParen, Newline, Eof]
        );
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(
            kinds("x = 1 + \\\n    2\n"),
            vec![Ident, Eq, Number, Plus, Number, Newline, Eof]
        );
    }

    #[test]
    fn test_comments() {
        let source = "# top\nx = 1  # suffix\nf(  # open\n    # inside\n    a,\n)\n";
        let tokens = tokenize("test", source).unwrap();
        let kinds: Vec<_> = tokens.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Comment, Newline, Ident, Eq, Number, Newline, Ident, LParen, Ident, Comma, RParen, Newline, Eof
            ]
        );
        assert_eq!(tokens.tokens[0].text, "# top");
        let suffix: Vec<_> = tokens.suffix_comments.iter().map(|c| c.token.as_str()).collect();
        assert_eq!(suffix, vec!["# suffix"]);
        let line: Vec<_> = tokens.line_comments.iter().map(|c| c.token.as_str()).collect();
        assert_eq!(line, vec!["# open", "# inside"]);
    }

    #[test]
    fn test_comment_after_block_header_paren() {
        let tokens = tokenize("test", "def f(\n    a,\n):  # c\n    pass\n").unwrap();
        assert!(tokens.tokens.iter().any(|t| t.kind == Comment && t.text == "# c"));
        assert!(tokens.suffix_comments.is_empty());
    }

    #[test]
    fn test_strings() {
        let source = "'a' \"b\" \"\"\"c\nd\"\"\" r'\\d' \"e\\\"f\"\n";
        let tokens = tokenize("test", source).unwrap();
        let texts: Vec<_> = tokens
            .tokens
            .iter()
            .filter(|t| t.kind == String)
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["'a'", "\"b\"", "\"\"\"c\nd\"\"\"", "r'\\d'", "\"e\\\"f\""]);
        assert_eq!(lex_error("x = 'abc"), "unexpected EOF in string");
        assert_eq!(lex_error("x = 'a\nb'"), "unexpected newline in string");
    }

    #[test]
    fn test_numbers_and_operators() {
        let tokens = tokenize("test", "a //= 1e+5 ** .5 != 0x1F\n").unwrap();
        let texts: Vec<_> = tokens.tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["a", "//=", "1e+5", "**", ".5", "!=", "0x1F", "\n", ""]);
        assert_eq!(tokens.tokens[1].kind, AugAssign);
        assert_eq!(lex_error("a ? b"), "unexpected input character '?'");
    }

    #[test]
    fn test_load_keyword() {
        assert_eq!(
            kinds("load(\"a\")\nload = 1\n"),
            vec![Load, LParen, String, RParen, Newline, Ident, Eq, Number, Newline, Eof]
        );
    }

    #[test]
    fn test_non_ascii_identifiers() {
        let tokens = tokenize("test", "été = \"x\"\n").unwrap();
        assert_eq!(tokens.tokens[0].kind, Ident);
        assert_eq!(tokens.tokens[0].text, "été");
        assert_eq!(tokens.tokens[1].pos, Position::new(1, 5, 6));
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("test", "x\nyy = 1").unwrap();
        let eq = tokens.tokens.iter().find(|t| t.kind == Eq).unwrap();
        assert_eq!(eq.pos, Position::new(2, 4, 5));
        assert_eq!(eq.end, Position::new(2, 5, 6));
    }
}
