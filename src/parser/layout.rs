//! Layout hints recorded at parse time.
//!
//! Positions go stale once a tree is edited, so the printer relies on these
//! flags instead of comparing lines.

use crate::position::Position;
use crate::syntax::Expr;

/// Whether `expr` may sit in a sequence printed on one line: a literal,
/// an identifier, a unary operator applied to one of those, or an empty
/// bracketed sequence.
pub fn is_simple_expression(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::String(_) | Expr::Ident(_) => true,
        Expr::Unary(unary) => matches!(unary.x, Some(Expr::Literal(_)) | Some(Expr::Ident(_))),
        Expr::List(list) => list.list.is_empty(),
        Expr::Tuple(tuple) => tuple.list.is_empty(),
        Expr::Dict(dict) => dict.list.is_empty(),
        Expr::Set(set) => set.list.is_empty(),
        _ => false,
    }
}

/// A call or tuple with several simple elements, each starting on the line
/// where the previous one ended, stays on one line.
///
/// Only line breaks between elements count. A nested list may span lines
/// and still leave its parent compact, which keeps the decision stable
/// when the nested list is reformatted.
pub fn force_compact(start: Position, list: &[Expr], end: Position) -> bool {
    if list.len() <= 1 {
        return false;
    }

    let mut line = start.line;
    for x in list {
        let (x_start, x_end) = x.span();
        if x_start.line != line || !is_simple_expression(x) {
            return false;
        }
        line = x_end.line;
    }
    end.line == line
}

/// An empty or single-element sequence whose brackets were on separate
/// lines from its content stays multi-line.
pub fn force_multi_line(start: Position, list: &[Expr], end: Position) -> bool {
    match list {
        [] => start.line != end.line,
        [single] => {
            let (x_start, x_end) = single.span();
            start.line != x_start.line || end.line != x_end.line
        }
        _ => false,
    }
}

/// A comprehension is multi-line if any line break separates the opening
/// bracket, the body, the clauses and the closing bracket.
pub fn force_multi_line_comprehension(
    start: Position,
    body: &Expr,
    clauses: &[Expr],
    end: Position,
) -> bool {
    let (body_start, body_end) = body.span();
    if start.line != body_start.line {
        return true;
    }
    let mut previous_end = body_end;
    for clause in clauses {
        let (clause_start, clause_end) = clause.span();
        if previous_end.line != clause_start.line {
            return true;
        }
        previous_end = clause_end;
    }
    previous_end.line != end.line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Ident, LiteralExpr, ListExpr, UnaryExpr};

    fn ident_at(name: &str, line: usize) -> Expr {
        Expr::Ident(Ident {
            name_pos: Position::new(line, 1, 0),
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn line(line: usize) -> Position {
        Position::new(line, 1, 0)
    }

    #[test]
    fn test_is_simple_expression() {
        assert!(is_simple_expression(&Expr::literal("1")));
        assert!(is_simple_expression(&Expr::string("a")));
        assert!(is_simple_expression(&Expr::Unary(Box::new(UnaryExpr {
            op_start: Position::default(),
            op: "-".to_string(),
            x: Some(Expr::Literal(LiteralExpr::new("1"))),
            comments: Default::default(),
        }))));
        assert!(is_simple_expression(&Expr::List(Box::default())));
        let list = ListExpr {
            list: vec![Expr::literal("1")],
            ..Default::default()
        };
        assert!(!is_simple_expression(&Expr::List(Box::new(list))));
        let star = UnaryExpr {
            op_start: Position::default(),
            op: "*".to_string(),
            x: None,
            comments: Default::default(),
        };
        assert!(!is_simple_expression(&Expr::Unary(Box::new(star))));
    }

    #[test]
    fn test_force_compact() {
        let same_line = [ident_at("a", 1), ident_at("b", 1)];
        assert!(force_compact(line(1), &same_line, line(1)));
        assert!(!force_compact(line(1), &same_line, line(2)));
        let split = [ident_at("a", 1), ident_at("b", 2)];
        assert!(!force_compact(line(1), &split, line(2)));
        assert!(!force_compact(line(1), &[ident_at("a", 1)], line(1)));
    }

    #[test]
    fn test_force_multi_line() {
        assert!(force_multi_line(line(1), &[], line(2)));
        assert!(!force_multi_line(line(1), &[], line(1)));
        assert!(force_multi_line(line(1), &[ident_at("a", 1)], line(2)));
        assert!(force_multi_line(line(1), &[ident_at("a", 2)], line(2)));
        assert!(!force_multi_line(line(1), &[ident_at("a", 1)], line(1)));
        assert!(!force_multi_line(line(1), &[ident_at("a", 2), ident_at("b", 3)], line(4)));
    }

    #[test]
    fn test_force_multi_line_comprehension() {
        let body = ident_at("x", 1);
        let clause = ident_at("c", 1);
        assert!(!force_multi_line_comprehension(line(1), &body, &[clause.clone()], line(1)));
        assert!(force_multi_line_comprehension(line(1), &body, &[ident_at("c", 2)], line(2)));
        assert!(force_multi_line_comprehension(line(1), &body, &[clause], line(2)));
    }
}
