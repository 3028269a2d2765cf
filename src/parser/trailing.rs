//! Comments at the end of an indented block that are indented less than
//! the block belong after the block, not inside it.

use crate::syntax::{CommentBlock, Comments, Expr};

/// Removes the trailing comments of `stmt`'s last body, starting with the
/// first comment line indented less than the body, and returns them as
/// comment blocks to follow `stmt`.
pub fn extract_trailing_comments(stmt: &mut Expr) -> Vec<Expr> {
    let Some(body) = last_body_mut(stmt) else {
        return Vec::new();
    };
    let Some(indentation) = body.first().map(|first| first.start().line_rune) else {
        return Vec::new();
    };
    let Some(last_statement) = body
        .iter()
        .rposition(|stmt| !matches!(stmt, Expr::CommentBlock(_)))
    else {
        return Vec::new();
    };

    for i in last_statement..body.len() {
        if let Some(block) = extract_dedented_comment(&mut body[i], indentation) {
            let mut extracted = vec![block];
            extracted.extend(body.drain(i + 1..));
            // a comment block left without lines goes away
            if i > last_statement && body[i].comments().after.is_empty() {
                body.truncate(i);
            }
            return extracted;
        }
    }
    Vec::new()
}

/// Splits off the first `after` comment of `stmt` indented less than
/// `indentation`, together with every comment after it.
fn extract_dedented_comment(stmt: &mut Expr, indentation: usize) -> Option<Expr> {
    let after = &mut stmt.comments_mut().after;
    // a zero column marks a comment added by an edit
    let i = after
        .iter()
        .position(|line| line.start.line_rune > 0 && line.start.line_rune < indentation)?;
    let lines = after.split_off(i);
    let start = lines.first().map(|line| line.start).unwrap_or_default();
    Some(Expr::CommentBlock(CommentBlock {
        start,
        comments: Comments {
            after: lines,
            ..Default::default()
        },
    }))
}

/// The body that closes `stmt`: the only body of a `def` or `for`, the last
/// branch of an `if` chain.
pub fn last_body_mut(stmt: &mut Expr) -> Option<&mut Vec<Expr>> {
    match stmt {
        Expr::Def(def) => Some(&mut def.body),
        Expr::For(stmt) => Some(&mut stmt.body),
        Expr::If(stmt) => {
            if stmt.false_body.is_empty() {
                Some(&mut stmt.true_body)
            } else if stmt.false_body.len() == 1 && matches!(stmt.false_body[0], Expr::If(_)) {
                last_body_mut(&mut stmt.false_body[0])
            } else {
                Some(&mut stmt.false_body)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_file, ParseOptions};

    fn parse(source: &str) -> Vec<Expr> {
        parse_file("test.bzl", source, &ParseOptions::default()).unwrap().stmt
    }

    #[test]
    fn test_dedented_comments_leave_the_block() {
        let stmts = parse("def f():\n    x = 1\n    # kept\n# moved\n  # moved too\ny = 2\n");
        assert_eq!(stmts.len(), 2);
        let Expr::Def(def) = &stmts[0] else {
            panic!("expected a def, got {}", stmts[0].kind());
        };
        let kept: Vec<_> = def.body[0].comments().after.iter().map(|c| c.token.as_str()).collect();
        assert_eq!(kept, vec!["# kept"]);
        let moved: Vec<_> = stmts[1].comments().before.iter().map(|c| c.token.as_str()).collect();
        assert_eq!(moved, vec!["# moved", "# moved too"]);
    }

    #[test]
    fn test_last_body_of_if_chain() {
        let mut stmts = parse("if a:\n    x\nelif b:\n    y\nelse:\n    z\n");
        let body = last_body_mut(&mut stmts[0]).unwrap();
        assert_eq!(body.len(), 1);
        assert!(matches!(&body[0], Expr::Ident(ident) if ident.name == "z"));
    }
}
