//! Rules: calls such as `cc_library(name = "x", srcs = [...])` seen as a
//! kind plus keyword attributes.
//!
//! A call nested inside another call's arguments is an attribute value, not
//! a rule. Calls anywhere else, including inside lists and block bodies, are
//! rules.

use std::ops::Deref;
use std::path::Path;

use crate::syntax::{AssignExpr, CallExpr, DotExpr, Expr, File};
use crate::walk::{children, children_mut};

/// A rule call and the name it is known by when it has no `name` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<'a> {
    pub call: &'a CallExpr,
    /// The package directory name, when this is the only unnamed rule of a
    /// file below the root.
    pub implicit_name: Option<String>,
}

impl Rule<'_> {
    /// The `name` attribute, or the implicit name.
    pub fn name(&self) -> Option<&str> {
        self.call.attr_string("name").or(self.implicit_name.as_deref())
    }
}

impl Deref for Rule<'_> {
    type Target = CallExpr;

    fn deref(&self) -> &CallExpr {
        self.call
    }
}

impl CallExpr {
    /// The dotted name being called, such as `java_library` or
    /// `foo.bar.baz`. `None` when the callee is not a plain name.
    pub fn kind(&self) -> Option<String> {
        let mut names = Vec::new();
        let mut x = &self.x;
        while let Expr::Dot(dot) = x {
            names.push(dot.name.as_str());
            x = &dot.x;
        }
        let Expr::Ident(ident) = x else {
            return None;
        };
        names.push(&ident.name);
        names.reverse();
        Some(names.join("."))
    }

    /// Replaces the callee with the dotted name `kind`.
    pub fn set_kind(&mut self, kind: &str) {
        let mut names = kind.split('.');
        let mut x = Expr::ident(names.next().unwrap_or_default());
        for name in names {
            x = Expr::Dot(Box::new(DotExpr {
                x,
                dot: Default::default(),
                name_pos: Default::default(),
                name: name.to_string(),
                comments: Default::default(),
            }));
        }
        self.x = x;
    }

    /// Names of the keyword arguments, in order.
    pub fn attr_keys(&self) -> Vec<&str> {
        self.list.iter().filter_map(attr_key).collect()
    }

    /// The value of the keyword argument `key`.
    pub fn attr(&self, key: &str) -> Option<&Expr> {
        self.list.iter().find_map(|arg| match arg {
            Expr::Assign(assign) if attr_key(arg) == Some(key) => Some(&assign.rhs),
            _ => None,
        })
    }

    pub fn attr_mut(&mut self, key: &str) -> Option<&mut Expr> {
        let i = self.attr_index(key)?;
        match &mut self.list[i] {
            Expr::Assign(assign) => Some(&mut assign.rhs),
            _ => None,
        }
    }

    /// The value of `key` when it is a string literal.
    pub fn attr_string(&self, key: &str) -> Option<&str> {
        match self.attr(key)? {
            Expr::String(s) => Some(&s.value),
            _ => None,
        }
    }

    /// Sets `key` to `value`, adding the argument at the end if it is new.
    pub fn set_attr(&mut self, key: &str, value: Expr) {
        if let Some(x) = self.attr_mut(key) {
            *x = value;
            return;
        }
        self.list.push(Expr::Assign(Box::new(AssignExpr {
            lhs: Expr::ident(key),
            op_pos: Default::default(),
            op: "=".to_string(),
            line_break: false,
            rhs: value,
            comments: Default::default(),
        })));
    }

    /// Removes the keyword argument `key` and returns its value.
    pub fn del_attr(&mut self, key: &str) -> Option<Expr> {
        let i = self.attr_index(key)?;
        match self.list.remove(i) {
            Expr::Assign(assign) => Some(assign.rhs),
            _ => None,
        }
    }

    fn attr_index(&self, key: &str) -> Option<usize> {
        self.list.iter().position(|arg| attr_key(arg) == Some(key))
    }
}

/// The keyword of a `key = value` argument.
fn attr_key(arg: &Expr) -> Option<&str> {
    match arg {
        Expr::Assign(assign) if assign.op == "=" => match &assign.lhs {
            Expr::Ident(ident) => Some(&ident.name),
            _ => None,
        },
        _ => None,
    }
}

fn collect_calls<'a>(x: &'a Expr, out: &mut Vec<&'a CallExpr>) {
    match x {
        Expr::Call(call) => out.push(call),
        _ => {
            for child in children(x) {
                collect_calls(child, out);
            }
        }
    }
}

fn collect_calls_mut<'a>(x: &'a mut Expr, out: &mut Vec<&'a mut CallExpr>) {
    match x {
        Expr::Call(call) => out.push(call),
        x => {
            for child in children_mut(x) {
                collect_calls_mut(child, out);
            }
        }
    }
}

fn matches_kind(call: &CallExpr, kind: Option<&str>) -> bool {
    match kind {
        Some(kind) => call.kind().as_deref() == Some(kind),
        None => true,
    }
}

impl File {
    /// The rules of the file, or only those of the given kind.
    pub fn rules(&self, kind: Option<&str>) -> Vec<Rule<'_>> {
        let mut calls = Vec::new();
        for stmt in &self.stmt {
            collect_calls(stmt, &mut calls);
        }

        let implicit_name = self.implicit_rule_name();
        calls
            .into_iter()
            .filter(|call| matches_kind(call, kind))
            .map(|call| Rule {
                call,
                implicit_name: match call.attr("name") {
                    Some(_) => None,
                    None => implicit_name.clone(),
                },
            })
            .collect()
    }

    /// The rule calls of the file, for editing.
    pub fn rules_mut(&mut self, kind: Option<&str>) -> Vec<&mut CallExpr> {
        let mut calls = Vec::new();
        for stmt in &mut self.stmt {
            collect_calls_mut(stmt, &mut calls);
        }
        calls.retain(|call| matches_kind(call, kind));
        calls
    }

    /// The name an unnamed rule takes from its package directory. There is
    /// one only if exactly one rule lacks a `name` and the file is not at
    /// the root.
    pub fn implicit_rule_name(&self) -> Option<String> {
        let dir = Path::new(&self.path).parent()?.file_name()?;

        let mut calls = Vec::new();
        for stmt in &self.stmt {
            collect_calls(stmt, &mut calls);
        }
        let unnamed = calls
            .iter()
            .filter(|call| matches!(call.kind().as_deref(), Some(kind) if kind != "load"))
            .filter(|call| call.attr_string("name").is_none())
            .count();
        (unnamed == 1).then(|| dir.to_string_lossy().into_owned())
    }
}
