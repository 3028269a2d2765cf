//! Attaches the comments the lexer set aside.
//!
//! A line comment goes to `before` of the first node, in preorder, that
//! starts after it. A suffix comment goes to `suffix` of the last node, in
//! postorder, that ends before it. Block statements and comment blocks never
//! take suffix comments, except that a `def` takes the comment after the `:`
//! of its header.

use crate::position::Position;
use crate::syntax::{
    AssignExpr, BinaryExpr, CallExpr, Comment, Comments, Comprehension, ConditionalExpr, DefStmt, DictExpr, DotExpr,
    End, Expr, File, ForClause, ForStmt, Ident, IfClause, IfStmt, IndexExpr, KeyValueExpr, LambdaExpr, ListExpr,
    LoadStmt, ParenExpr, SetExpr, SliceExpr, StringExpr, TupleExpr, TypedIdent, UnaryExpr,
};

pub(super) fn attach(file: &mut File, line: Vec<Comment>, mut suffix: Vec<Comment>) {
    let mut entries = Vec::new();
    let mut rank = 0;
    for stmt in &mut file.stmt {
        collect(Node::Expr(stmt), &mut entries, &mut rank);
    }

    let mut line = line.into_iter().peekable();
    for entry in entries.iter_mut() {
        while let Some(comment) = line.next_if(|comment| entry.start.byte >= comment.start.byte) {
            entry.comments.before.push(comment);
        }
    }

    entries.sort_by_key(|entry| entry.rank);
    for entry in entries.iter_mut().rev() {
        let added = entry.comments.suffix.len();
        while let Some(comment) = suffix.last() {
            let takes = match entry.suffix {
                Suffix::End => entry.end.byte <= comment.start.byte,
                Suffix::Header { colon, .. } => colon.line == comment.start.line && colon.byte < comment.start.byte,
                Suffix::Never => false,
            };
            if !takes {
                break;
            }
            if let Some(comment) = suffix.pop() {
                entry.comments.suffix.push(comment);
            }
        }
        entry.comments.suffix[added..].reverse();
    }

    file.comments.after.extend(line);
    file.comments.before.extend(suffix);
}

/// Which suffix comments a node may take.
#[derive(Debug, Clone, Copy)]
enum Suffix {
    /// Comments after the end of the node.
    End,
    /// Comments on the line of a `def` header; `params` is the number of
    /// children before the body.
    Header { colon: Position, params: usize },
    Never,
}

struct Entry<'a> {
    start: Position,
    end: Position,
    /// Place in postorder.
    rank: usize,
    suffix: Suffix,
    comments: &'a mut Comments,
}

/// Anything that carries comments.
enum Node<'a> {
    Expr(&'a mut Expr),
    Ident(&'a mut Ident),
    Str(&'a mut StringExpr),
    End(&'a mut End),
}

fn collect<'a>(node: Node<'a>, entries: &mut Vec<Entry<'a>>, rank: &mut usize) {
    let (start, end) = node.span();
    let (comments, children, suffix) = node.into_parts();
    let index = entries.len();
    entries.push(Entry {
        start,
        end,
        rank: 0,
        suffix,
        comments,
    });

    let header = match suffix {
        Suffix::Header { params, .. } => Some(params),
        _ => None,
    };
    let mut own = None;
    for (i, child) in children.into_iter().enumerate() {
        if header == Some(i) {
            own = Some(next(rank));
        }
        collect(child, entries, rank);
    }
    entries[index].rank = own.unwrap_or_else(|| next(rank));
}

fn next(rank: &mut usize) -> usize {
    let current = *rank;
    *rank += 1;
    current
}

impl<'a> Node<'a> {
    fn span(&self) -> (Position, Position) {
        match self {
            Node::Expr(x) => x.span(),
            Node::Ident(ident) => ident.span(),
            Node::Str(s) => (s.start, s.end),
            Node::End(end) => end.span(),
        }
    }

    /// Splits the node into its own comments and its children, in source
    /// order.
    fn into_parts(self) -> (&'a mut Comments, Vec<Node<'a>>, Suffix) {
        let x = match self {
            Node::Expr(x) => x,
            Node::Ident(ident) => return (&mut ident.comments, Vec::new(), Suffix::End),
            Node::Str(s) => return (&mut s.comments, Vec::new(), Suffix::End),
            Node::End(end) => return (&mut end.comments, Vec::new(), Suffix::End),
        };

        let mut children = Vec::new();
        let exprs = |list: &'a mut Vec<Expr>| list.iter_mut().map(Node::Expr);
        let comments = match x {
            Expr::Ident(ident) => &mut ident.comments,
            Expr::Literal(lit) => &mut lit.comments,
            Expr::String(s) => &mut s.comments,
            Expr::Branch(branch) => &mut branch.comments,
            Expr::CommentBlock(block) => return (&mut block.comments, children, Suffix::Never),
            Expr::PythonBlock(block) => &mut block.comments,
            Expr::Dot(dot) => {
                let DotExpr { x, comments, .. } = &mut **dot;
                children.push(Node::Expr(x));
                comments
            }
            Expr::Index(index) => {
                let IndexExpr { x, y, comments, .. } = &mut **index;
                children.extend([Node::Expr(x), Node::Expr(y)]);
                comments
            }
            Expr::Slice(slice) => {
                let SliceExpr {
                    x,
                    from,
                    to,
                    step,
                    comments,
                    ..
                } = &mut **slice;
                children.push(Node::Expr(x));
                children.extend([from, to, step].into_iter().filter_map(Option::as_mut).map(Node::Expr));
                comments
            }
            Expr::Unary(unary) => {
                let UnaryExpr { x, comments, .. } = &mut **unary;
                children.extend(x.as_mut().map(Node::Expr));
                comments
            }
            Expr::Binary(binary) => {
                let BinaryExpr { x, y, comments, .. } = &mut **binary;
                children.extend([Node::Expr(x), Node::Expr(y)]);
                comments
            }
            Expr::Assign(assign) => {
                let AssignExpr { lhs, rhs, comments, .. } = &mut **assign;
                children.extend([Node::Expr(lhs), Node::Expr(rhs)]);
                comments
            }
            Expr::Conditional(cond) => {
                let ConditionalExpr {
                    then,
                    test,
                    otherwise,
                    comments,
                    ..
                } = &mut **cond;
                children.extend([Node::Expr(then), Node::Expr(test), Node::Expr(otherwise)]);
                comments
            }
            Expr::Lambda(lambda) => {
                let LambdaExpr {
                    params, body, comments, ..
                } = &mut **lambda;
                children.extend(exprs(params));
                children.push(Node::Expr(body));
                comments
            }
            Expr::Call(call) => {
                let CallExpr {
                    x, list, end, comments, ..
                } = &mut **call;
                children.push(Node::Expr(x));
                children.extend(exprs(list));
                children.push(Node::End(end));
                comments
            }
            Expr::List(list) => {
                let ListExpr {
                    list, end, comments, ..
                } = &mut **list;
                children.extend(exprs(list));
                children.push(Node::End(end));
                comments
            }
            Expr::Set(set) => {
                let SetExpr {
                    list, end, comments, ..
                } = &mut **set;
                children.extend(exprs(list));
                children.push(Node::End(end));
                comments
            }
            Expr::Dict(dict) => {
                let DictExpr {
                    list, end, comments, ..
                } = &mut **dict;
                children.extend(exprs(list));
                children.push(Node::End(end));
                comments
            }
            Expr::Tuple(tuple) => {
                let TupleExpr {
                    no_brackets,
                    list,
                    end,
                    comments,
                    ..
                } = &mut **tuple;
                children.extend(exprs(list));
                if !*no_brackets {
                    children.push(Node::End(end));
                }
                comments
            }
            Expr::KeyValue(kv) => {
                let KeyValueExpr {
                    key, value, comments, ..
                } = &mut **kv;
                children.extend([Node::Expr(key), Node::Expr(value)]);
                comments
            }
            Expr::Comprehension(comp) => {
                let Comprehension {
                    body,
                    clauses,
                    end,
                    comments,
                    ..
                } = &mut **comp;
                children.push(Node::Expr(body));
                children.extend(exprs(clauses));
                children.push(Node::End(end));
                comments
            }
            Expr::ForClause(clause) => {
                let ForClause { vars, x, comments, .. } = &mut **clause;
                children.extend([Node::Expr(vars), Node::Expr(x)]);
                comments
            }
            Expr::IfClause(clause) => {
                let IfClause { cond, comments, .. } = &mut **clause;
                children.push(Node::Expr(cond));
                comments
            }
            Expr::Paren(paren) => {
                let ParenExpr { x, end, comments, .. } = &mut **paren;
                children.extend([Node::Expr(x), Node::End(end)]);
                comments
            }
            Expr::Def(def) => {
                let DefStmt {
                    params,
                    colon_pos,
                    body,
                    comments,
                    ..
                } = &mut **def;
                let suffix = Suffix::Header {
                    colon: *colon_pos,
                    params: params.len(),
                };
                children.extend(exprs(params));
                children.extend(exprs(body));
                return (comments, children, suffix);
            }
            Expr::For(stmt) => {
                let ForStmt {
                    vars,
                    x,
                    body,
                    comments,
                    ..
                } = &mut **stmt;
                children.extend([Node::Expr(vars), Node::Expr(x)]);
                children.extend(exprs(body));
                return (comments, children, Suffix::Never);
            }
            Expr::If(stmt) => {
                let IfStmt {
                    cond,
                    true_body,
                    else_pos,
                    false_body,
                    comments,
                    ..
                } = &mut **stmt;
                children.push(Node::Expr(cond));
                children.extend(exprs(true_body));
                if else_pos.pos.is_valid() {
                    children.push(Node::End(else_pos));
                }
                children.extend(exprs(false_body));
                return (comments, children, Suffix::Never);
            }
            Expr::Return(ret) => {
                children.extend(ret.result.as_mut().map(Node::Expr));
                &mut ret.comments
            }
            Expr::Load(load) => {
                let LoadStmt {
                    module,
                    from,
                    to,
                    rparen,
                    comments,
                    ..
                } = &mut **load;
                children.push(Node::Str(module));
                for (to, from) in to.iter_mut().zip(from.iter_mut()) {
                    children.extend([Node::Ident(to), Node::Ident(from)]);
                }
                children.push(Node::End(rparen));
                comments
            }
            Expr::TypedIdent(typed) => {
                let TypedIdent {
                    ident, ty, comments, ..
                } = &mut **typed;
                children.extend([Node::Ident(ident), Node::Expr(ty)]);
                comments
            }
        };
        (comments, children, Suffix::End)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{parse_file, ParseOptions};
    use crate::syntax::{Comment, Expr, File};

    fn parse(source: &str) -> File {
        parse_file("test.bzl", source, &ParseOptions::default()).unwrap()
    }

    fn tokens(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.token.as_str()).collect()
    }

    #[test]
    fn test_suffix_goes_to_statement() {
        let file = parse("x = 1  # one\ny = 2\n");
        assert_eq!(tokens(&file.stmt[0].comments().suffix), vec!["# one"]);
        assert!(file.stmt[1].comments().suffix.is_empty());
    }

    #[test]
    fn test_line_comments_in_brackets() {
        let file = parse("x = [\n    # first\n    1,\n    # last\n]\n");
        let Expr::Assign(assign) = &file.stmt[0] else {
            panic!("expected an assignment");
        };
        let Expr::List(list) = &assign.rhs else {
            panic!("expected a list");
        };
        assert_eq!(tokens(&list.list[0].comments().before), vec!["# first"]);
        assert_eq!(tokens(&list.end.comments.before), vec!["# last"]);
    }

    #[test]
    fn test_suffix_inside_call() {
        let file = parse("f(\n    a,  # why a\n    b,\n)\n");
        let Expr::Call(call) = &file.stmt[0] else {
            panic!("expected a call");
        };
        assert_eq!(tokens(&call.list[0].comments().suffix), vec!["# why a"]);
        assert!(call.comments.suffix.is_empty());
    }

    #[test]
    fn test_def_header_suffix() {
        let file = parse("def f():  # header\n    pass\n");
        let Expr::Def(def) = &file.stmt[0] else {
            panic!("expected a def");
        };
        assert_eq!(tokens(&def.comments.suffix), vec!["# header"]);

        let file = parse("def g(a):  # header\n    pass\n");
        let Expr::Def(def) = &file.stmt[0] else {
            panic!("expected a def");
        };
        assert_eq!(tokens(&def.comments.suffix), vec!["# header"]);
        assert!(def.params[0].comments().suffix.is_empty());
    }

    #[test]
    fn test_else_suffix() {
        let file = parse("if a:\n    x\nelse:  # otherwise\n    y\n");
        let Expr::If(stmt) = &file.stmt[0] else {
            panic!("expected an if statement");
        };
        assert_eq!(tokens(&stmt.else_pos.comments.suffix), vec!["# otherwise"]);
    }

    #[test]
    fn test_load_symbol_comments() {
        let file = parse("load(\n    \":m.bzl\",\n    # about a\n    \"a\",  # why\n)\n");
        let Expr::Load(load) = &file.stmt[0] else {
            panic!("expected a load");
        };
        assert_eq!(tokens(&load.to[0].comments.before), vec!["# about a"]);
        assert_eq!(tokens(&load.from[0].comments.suffix), vec!["# why"]);
    }
}
