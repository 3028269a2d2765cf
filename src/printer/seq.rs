use super::{Prec, Printer, LIST_INDENTATION};
use crate::syntax::{Comprehension, End, Expr};

/// What kind of bracketed sequence is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    /// `f(x)`
    Call,
    /// `[x]`
    List,
    /// `(x,)`
    Tuple,
    /// `(x)`
    Paren,
    /// `{x: y}`
    Dict,
    /// `x, y` without brackets
    Seq,
}

/// Whether a sequence goes on one line.
fn use_compact_mode(
    list: &[Expr],
    end: Option<&End>,
    mode: Mode,
    force_compact: bool,
    force_multi_line: bool,
) -> bool {
    // Line comments can only be printed in the multi-line form.
    if list.iter().any(|x| !x.comments().before.is_empty()) {
        return false;
    }
    if end.is_some_and(|end| !end.comments.before.is_empty()) {
        return false;
    }

    if mode == Mode::Seq {
        return true;
    }
    if force_multi_line {
        return false;
    }
    if force_compact {
        return true;
    }
    list.len() <= 1
}

impl Printer {
    /// Prints `list` inside the bracket pair `brack`. Comments before the
    /// closing bracket are kept in `end`.
    pub(super) fn seq(
        &mut self,
        brack: &str,
        list: &[Expr],
        end: Option<&End>,
        mode: Mode,
        force_compact: bool,
        force_multi_line: bool,
    ) {
        let (open, close) = brack.split_at(1);
        if mode != Mode::Seq {
            self.out.push_str(open);
        }
        self.depth += 1;

        if use_compact_mode(list, end, mode, force_compact, force_multi_line) {
            for (i, x) in list.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.expr(x, Prec::Low);
            }
            if list.len() == 1 && mode == Mode::Tuple {
                self.out.push(',');
            }
        } else {
            self.margin += LIST_INDENTATION;
            for (i, x) in list.iter().enumerate() {
                // End-of-line comments waiting before the first element move
                // to a line of their own, aligned with the elements.
                if i == 0 && !self.comments.is_empty() {
                    self.out.push('\n');
                    self.pad(self.margin.saturating_sub(2));
                }

                self.newline();
                self.expr(x, Prec::Low);
                if mode != Mode::Paren || i + 1 < list.len() {
                    self.out.push(',');
                }
            }
            if let Some(end) = end {
                for comment in &end.comments.before {
                    self.newline();
                    self.comment(comment);
                }
            }
            self.margin -= LIST_INDENTATION;
            self.newline();
        }

        self.depth -= 1;
        if mode != Mode::Seq {
            self.out.push_str(close);
        }
    }

    /// Prints a comprehension on one line, or with the body and every
    /// clause on a line of its own.
    pub(super) fn comprehension(&mut self, comp: &Comprehension) {
        let multi_line = comp.force_multi_line || !comp.end.comments.before.is_empty();
        let (open, close) = if comp.curly { ('{', '}') } else { ('[', ']') };

        self.depth += 1;
        self.out.push(open);
        if multi_line {
            self.margin += LIST_INDENTATION;
            self.newline();
        }

        self.expr(&comp.body, Prec::Low);
        for clause in &comp.clauses {
            if multi_line {
                self.breakline();
            } else {
                self.out.push(' ');
            }
            self.expr(clause, Prec::Low);
        }

        if multi_line {
            for comment in &comp.end.comments.before {
                self.newline();
                self.comment(comment);
            }
            self.margin -= LIST_INDENTATION;
            self.newline();
        }
        self.out.push(close);
        self.depth -= 1;
    }
}
