//! Formatting of syntax trees back into source text.
//!
//! The output does not depend on the positions recorded in the tree except
//! for line gaps between statements, so edited trees print sensibly. Layout
//! inside brackets follows the `force_compact`/`force_multi_line` hints set
//! by the parser.

mod expr;
mod seq;

use crate::syntax::{Comment, Expr, File};
use crate::utils::is_call;

use expr::Prec;

/// Indentation of nested blocks.
const NESTED_INDENTATION: usize = 4;
/// Indentation of multi-line expressions.
const LIST_INDENTATION: usize = 4;

/// How top-level statements are separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// BUILD-like files: every pair of top-level statements apart from
    /// consecutive loads is separated by a blank line.
    Build,
    /// Everything else: statements keep their grouping from the source.
    Default,
}

/// Formats files and expressions.
#[derive(Debug, Default, Clone)]
pub struct Formatter {
    mode: Option<FormatMode>,
}

impl Formatter {
    /// A formatter that picks the mode from the type of each file.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: FormatMode) -> Self {
        Self { mode: Some(mode) }
    }

    pub fn format(&self, file: &File) -> Vec<u8> {
        let mode = self.mode.unwrap_or(if file.file_type.is_build_like() {
            FormatMode::Build
        } else {
            FormatMode::Default
        });
        let mut printer = Printer::new(mode);
        printer.file(file);
        printer.out.into_bytes()
    }

    pub fn format_expr(&self, x: &Expr) -> String {
        let mut printer = Printer::new(self.mode.unwrap_or(FormatMode::Default));
        printer.expr(x, Prec::Low);
        printer.out
    }
}

/// Formats `file` in the mode its type calls for.
pub fn format(file: &File) -> Vec<u8> {
    Formatter::new().format(file)
}

/// Formats a single expression or statement, without a final newline.
pub fn format_expr(x: &Expr) -> String {
    Formatter::new().format_expr(x)
}

/// Output state while printing one file or expression.
struct Printer {
    out: String,
    /// End-of-line comments waiting for the next line break.
    comments: Vec<Comment>,
    /// Left margin in spaces.
    margin: usize,
    /// Nesting depth inside brackets.
    depth: usize,
    /// A statement ended and the next one has to start on a new line.
    needs_newline: bool,
    mode: FormatMode,
}

impl Printer {
    fn new(mode: FormatMode) -> Self {
        Self {
            out: String::new(),
            comments: Vec::new(),
            margin: 0,
            depth: 0,
            needs_newline: false,
            mode,
        }
    }

    /// Column of the end of the output, in characters.
    fn indent(&self) -> usize {
        let line_start = self.out.rfind('\n').map_or(0, |i| i + 1);
        self.out[line_start..].chars().count()
    }

    fn pad(&mut self, width: usize) {
        self.out.extend(std::iter::repeat(' ').take(width));
    }

    fn comment(&mut self, comment: &Comment) {
        self.out.push_str(comment.token.trim());
    }

    /// Removes trailing spaces from the current line.
    fn trim(&mut self) {
        let len = self.out.trim_end_matches(' ').len();
        self.out.truncate(len);
    }

    /// Ends the current line, printing the pending end-of-line comments.
    /// Only safe at statement level or inside brackets; see `breakline`.
    fn newline(&mut self) {
        self.needs_newline = false;
        if !self.comments.is_empty() {
            self.out.push_str("  ");
            let comments = std::mem::take(&mut self.comments);
            for (i, comment) in comments.iter().enumerate() {
                if i > 0 {
                    self.trim();
                    self.out.push('\n');
                    self.pad(self.margin);
                }
                self.comment(comment);
            }
        }

        self.trim();
        self.out.push('\n');
        self.pad(self.margin);
    }

    /// Postpones a line break until the next `newline_if_needed`, so that
    /// several blocks ending together produce one line break.
    fn soft_newline(&mut self) {
        self.needs_newline = true;
    }

    fn newline_if_needed(&mut self) {
        if self.needs_newline {
            self.newline();
        }
    }

    /// Breaks the line inside an expression, with a `\` continuation when
    /// no bracket is open.
    fn breakline(&mut self) {
        if self.depth == 0 {
            // a continuation line cannot carry comments
            self.out.push_str(" \\\n");
            self.pad(self.margin);
            return;
        }
        self.newline();
    }

    fn file(&mut self, file: &File) {
        for comment in &file.comments.before {
            self.comment(comment);
            self.newline();
        }

        self.statements(&file.stmt);

        for comment in &file.comments.after {
            self.comment(comment);
            self.newline();
        }

        self.newline_if_needed();
    }

    fn statements(&mut self, stmts: &[Expr]) {
        for (i, stmt) in stmts.iter().enumerate() {
            match stmt {
                // printed with the comments below
                Expr::CommentBlock(_) => {}
                Expr::PythonBlock(block) => {
                    for comment in &block.comments.before {
                        self.comment(comment);
                        self.newline();
                    }
                    self.out.push_str(&block.token);
                }
                _ => self.expr(stmt, Prec::Low),
            }

            if !matches!(stmt, Expr::CommentBlock(_)) {
                self.soft_newline();
            }

            for comment in &stmt.comments().after {
                self.newline_if_needed();
                self.comment(comment);
                self.soft_newline();
            }

            // The last statement leaves its line break to the enclosing block.
            if i + 1 < stmts.len() {
                self.newline();
                if !self.compact_stmt(stmt, &stmts[i + 1]) {
                    self.newline();
                }
            }
        }
    }

    /// Whether `s1` and `s2` may follow each other without a blank line.
    fn compact_stmt(&self, s1: &Expr, s2: &Expr) -> bool {
        if !s2.comments().before.is_empty() {
            return false;
        }
        if is_load(s1) && is_load(s2) {
            return true;
        }
        if self.mode == FormatMode::Build && self.margin == 0 {
            return false;
        }
        if matches!(s1, Expr::Def(_)) || matches!(s2, Expr::Def(_)) {
            return false;
        }
        s2.start().line.saturating_sub(s1.end().line) <= 1
    }
}

fn is_load(x: &Expr) -> bool {
    matches!(x, Expr::Load(_)) || is_call(x, "load")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_file, ParseOptions};
    use crate::syntax::FileType;

    fn reformat(source: &str, file_type: FileType) -> String {
        let file = parse_file("test", source, &ParseOptions::new(file_type)).unwrap();
        String::from_utf8(format(&file)).unwrap()
    }

    #[test]
    fn test_build_mode_separates_top_level_statements() {
        let source = "load(\":a.bzl\", \"a\")\nload(\":b.bzl\", \"b\")\nx = 1\ny = 2\n";
        assert_eq!(
            reformat(source, FileType::Build),
            "load(\":a.bzl\", \"a\")\nload(\":b.bzl\", \"b\")\n\nx = 1\n\ny = 2\n"
        );
        assert_eq!(reformat(source, FileType::Bzl), source);
    }

    #[test]
    fn test_blank_lines_collapse() {
        assert_eq!(reformat("x = 1\n\n\n\ny = 2\n", FileType::Bzl), "x = 1\n\ny = 2\n");
    }

    #[test]
    fn test_blocks_are_separated() {
        let source = "x = 1\ndef f():\n    pass\ny = 2\n";
        assert_eq!(
            reformat(source, FileType::Bzl),
            "x = 1\n\ndef f():\n    pass\n\ny = 2\n"
        );
    }

    #[test]
    fn test_nested_blocks_end_with_one_newline() {
        let source = "if a:\n    for b in c:\n        pass\nfoo()\n";
        assert_eq!(reformat(source, FileType::Bzl), source);
    }

    #[test]
    fn test_file_comments() {
        let source = "# header\n\nx = 1  # one\n# after x\n\n# footer\n";
        assert_eq!(reformat(source, FileType::Bzl), source);
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(reformat("", FileType::Build), "");
    }

    #[test]
    fn test_explicit_mode() {
        let file = parse_file("test", "x = 1\ny = 2\n", &ParseOptions::new(FileType::Bzl)).unwrap();
        let out = Formatter::with_mode(FormatMode::Build).format(&file);
        assert_eq!(out, b"x = 1\n\ny = 2\n");
    }
}
