//! Preorder traversal and rewriting of syntax trees.
//!
//! Children are visited in source order. The identifier lists of a
//! `LoadStmt` and the name of a `TypedIdent` are plain fields rather than
//! child expressions; callers reach them through the node itself.

use std::cmp::Ordering;
use std::mem;

use log::trace;

use crate::syntax::{Expr, File};

/// Calls `f` on `v` and every expression below it, parents first. The second
/// argument of `f` lists the ancestors of the visited node, outermost first.
pub fn walk<'a, F>(v: &'a Expr, f: &mut F)
where
    F: FnMut(&'a Expr, &[&'a Expr]),
{
    let mut stack = Vec::new();
    walk1(v, &mut stack, f);
}

fn walk1<'a, F>(v: &'a Expr, stack: &mut Vec<&'a Expr>, f: &mut F)
where
    F: FnMut(&'a Expr, &[&'a Expr]),
{
    f(v, stack.as_slice());
    stack.push(v);
    for child in children(v) {
        walk1(child, stack, f);
    }
    stack.pop();
}

/// Like `walk`, but `f` may return a replacement for the visited node. The
/// replacement takes the node's place before its children are visited, so
/// traversal continues into the replacement.
///
/// While a node is visited, the ancestors are passed by reference and the
/// slot of the parent that held the node is empty.
pub fn edit<F>(v: Expr, f: &mut F) -> Expr
where
    F: FnMut(&Expr, &[Expr]) -> Option<Expr>,
{
    let mut stack = Vec::new();
    edit1(v, &mut stack, f)
}

fn edit1<F>(v: Expr, stack: &mut Vec<Expr>, f: &mut F) -> Expr
where
    F: FnMut(&Expr, &[Expr]) -> Option<Expr>,
{
    let v = match f(&v, stack.as_slice()) {
        Some(replacement) => {
            trace!("edit: {} replaced by {}", v.kind(), replacement.kind());
            replacement
        }
        None => v,
    };

    stack.push(v);
    let mut i = 0;
    loop {
        let Some(slot) = stack.last_mut().and_then(|parent| child_mut(parent, i)) else {
            break;
        };
        let child = mem::take(slot);
        let child = edit1(child, stack, f);
        if let Some(slot) = stack.last_mut().and_then(|parent| child_mut(parent, i)) {
            *slot = child;
        }
        i += 1;
    }
    stack.pop().unwrap_or_default()
}

/// Calls `f` on each direct child of `v`.
pub fn walk_once<'a>(v: &'a Expr, mut f: impl FnMut(&'a Expr)) {
    for child in children(v) {
        f(child);
    }
}

/// Calls `f` on each direct child of `v`, which it may modify.
pub fn walk_once_mut(v: &mut Expr, mut f: impl FnMut(&mut Expr)) {
    for child in children_mut(v) {
        f(child);
    }
}

/// The direct children of `v` in source order.
pub fn children(v: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    match v {
        Expr::Ident(_)
        | Expr::Literal(_)
        | Expr::String(_)
        | Expr::Branch(_)
        | Expr::Load(_)
        | Expr::CommentBlock(_)
        | Expr::PythonBlock(_) => {}
        Expr::Dot(dot) => out.push(&dot.x),
        Expr::Index(index) => out.extend([&index.x, &index.y]),
        Expr::KeyValue(kv) => out.extend([&kv.key, &kv.value]),
        Expr::Slice(slice) => {
            out.push(&slice.x);
            out.extend(slice.from.iter());
            out.extend(slice.to.iter());
            out.extend(slice.step.iter());
        }
        Expr::Paren(paren) => out.push(&paren.x),
        Expr::Unary(unary) => out.extend(unary.x.iter()),
        Expr::Binary(binary) => out.extend([&binary.x, &binary.y]),
        Expr::Assign(assign) => out.extend([&assign.lhs, &assign.rhs]),
        Expr::Lambda(lambda) => {
            out.extend(lambda.params.iter());
            out.push(&lambda.body);
        }
        Expr::Call(call) => {
            out.push(&call.x);
            out.extend(call.list.iter());
        }
        Expr::List(list) => out.extend(list.list.iter()),
        Expr::Set(set) => out.extend(set.list.iter()),
        Expr::Tuple(tuple) => out.extend(tuple.list.iter()),
        Expr::Dict(dict) => out.extend(dict.list.iter()),
        Expr::Comprehension(comp) => {
            out.push(&comp.body);
            out.extend(comp.clauses.iter());
        }
        Expr::IfClause(clause) => out.push(&clause.cond),
        Expr::ForClause(clause) => out.extend([&clause.vars, &clause.x]),
        Expr::Conditional(cond) => out.extend([&cond.then, &cond.test, &cond.otherwise]),
        Expr::Def(def) => {
            out.extend(def.params.iter());
            out.extend(def.body.iter());
        }
        Expr::If(stmt) => {
            out.push(&stmt.cond);
            out.extend(stmt.true_body.iter());
            out.extend(stmt.false_body.iter());
        }
        Expr::For(stmt) => {
            out.extend([&stmt.vars, &stmt.x]);
            out.extend(stmt.body.iter());
        }
        Expr::Return(ret) => out.extend(ret.result.iter()),
        Expr::TypedIdent(typed) => out.push(&typed.ty),
    }
    out
}

/// Mutable counterpart of `children`, in the same order.
pub fn children_mut(v: &mut Expr) -> Vec<&mut Expr> {
    let mut out = Vec::new();
    match v {
        Expr::Ident(_)
        | Expr::Literal(_)
        | Expr::String(_)
        | Expr::Branch(_)
        | Expr::Load(_)
        | Expr::CommentBlock(_)
        | Expr::PythonBlock(_) => {}
        Expr::Dot(dot) => out.push(&mut dot.x),
        Expr::Index(index) => out.extend([&mut index.x, &mut index.y]),
        Expr::KeyValue(kv) => out.extend([&mut kv.key, &mut kv.value]),
        Expr::Slice(slice) => {
            out.push(&mut slice.x);
            out.extend(slice.from.iter_mut());
            out.extend(slice.to.iter_mut());
            out.extend(slice.step.iter_mut());
        }
        Expr::Paren(paren) => out.push(&mut paren.x),
        Expr::Unary(unary) => out.extend(unary.x.iter_mut()),
        Expr::Binary(binary) => out.extend([&mut binary.x, &mut binary.y]),
        Expr::Assign(assign) => out.extend([&mut assign.lhs, &mut assign.rhs]),
        Expr::Lambda(lambda) => {
            out.extend(lambda.params.iter_mut());
            out.push(&mut lambda.body);
        }
        Expr::Call(call) => {
            out.push(&mut call.x);
            out.extend(call.list.iter_mut());
        }
        Expr::List(list) => out.extend(list.list.iter_mut()),
        Expr::Set(set) => out.extend(set.list.iter_mut()),
        Expr::Tuple(tuple) => out.extend(tuple.list.iter_mut()),
        Expr::Dict(dict) => out.extend(dict.list.iter_mut()),
        Expr::Comprehension(comp) => {
            out.push(&mut comp.body);
            out.extend(comp.clauses.iter_mut());
        }
        Expr::IfClause(clause) => out.push(&mut clause.cond),
        Expr::ForClause(clause) => out.extend([&mut clause.vars, &mut clause.x]),
        Expr::Conditional(cond) => out.extend([&mut cond.then, &mut cond.test, &mut cond.otherwise]),
        Expr::Def(def) => {
            out.extend(def.params.iter_mut());
            out.extend(def.body.iter_mut());
        }
        Expr::If(stmt) => {
            out.push(&mut stmt.cond);
            out.extend(stmt.true_body.iter_mut());
            out.extend(stmt.false_body.iter_mut());
        }
        Expr::For(stmt) => {
            out.extend([&mut stmt.vars, &mut stmt.x]);
            out.extend(stmt.body.iter_mut());
        }
        Expr::Return(ret) => out.extend(ret.result.iter_mut()),
        Expr::TypedIdent(typed) => out.push(&mut typed.ty),
    }
    out
}

/// The `i`th entry of `children_mut(v)`, found without collecting the
/// others so that `edit` stays linear in the size of long lists.
fn child_mut(v: &mut Expr, i: usize) -> Option<&mut Expr> {
    match v {
        Expr::Call(call) => match i {
            0 => Some(&mut call.x),
            _ => call.list.get_mut(i - 1),
        },
        Expr::List(list) => list.list.get_mut(i),
        Expr::Set(set) => set.list.get_mut(i),
        Expr::Tuple(tuple) => tuple.list.get_mut(i),
        Expr::Dict(dict) => dict.list.get_mut(i),
        Expr::Comprehension(comp) => match i {
            0 => Some(&mut comp.body),
            _ => comp.clauses.get_mut(i - 1),
        },
        Expr::Lambda(lambda) => {
            let n = lambda.params.len();
            match i.cmp(&n) {
                Ordering::Less => lambda.params.get_mut(i),
                Ordering::Equal => Some(&mut lambda.body),
                Ordering::Greater => None,
            }
        }
        Expr::Def(def) => {
            let n = def.params.len();
            if i < n {
                def.params.get_mut(i)
            } else {
                def.body.get_mut(i - n)
            }
        }
        Expr::If(stmt) => {
            let n = stmt.true_body.len();
            match i {
                0 => Some(&mut stmt.cond),
                i if i <= n => stmt.true_body.get_mut(i - 1),
                i => stmt.false_body.get_mut(i - 1 - n),
            }
        }
        Expr::For(stmt) => match i {
            0 => Some(&mut stmt.vars),
            1 => Some(&mut stmt.x),
            _ => stmt.body.get_mut(i - 2),
        },
        // at most four children
        _ => children_mut(v).into_iter().nth(i),
    }
}

impl File {
    /// Walks every top-level statement.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr, &[&'a Expr]),
    {
        for stmt in &self.stmt {
            walk(stmt, f);
        }
    }

    /// Edits every top-level statement in place.
    pub fn edit<F>(&mut self, f: &mut F)
    where
        F: FnMut(&Expr, &[Expr]) -> Option<Expr>,
    {
        for stmt in &mut self.stmt {
            let taken = mem::take(stmt);
            *stmt = edit(taken, f);
        }
    }
}
