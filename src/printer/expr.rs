use log::trace;

use super::seq::Mode;
use super::{Printer, LIST_INDENTATION, NESTED_INDENTATION};
use crate::quote::{decode, quote};
use crate::syntax::{AssignExpr, Comment, Expr, IfStmt, LoadStmt, StringExpr};

/// Binding strength of expressions, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Prec {
    Low,
    Assign,
    Comma,
    Colon,
    IfElse,
    Or,
    And,
    Cmp,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Add,
    Multiply,
    Unary,
    Suffix,
}

impl Prec {
    /// The next stronger level, used for right operands.
    pub(crate) fn next(self) -> Prec {
        use Prec::*;
        match self {
            Low => Assign,
            Assign => Comma,
            Comma => Colon,
            Colon => IfElse,
            IfElse => Or,
            Or => And,
            And => Cmp,
            Cmp => BitOr,
            BitOr => BitXor,
            BitXor => BitAnd,
            BitAnd => Shift,
            Shift => Add,
            Add => Multiply,
            Multiply => Unary,
            Unary | Suffix => Suffix,
        }
    }

    pub(crate) fn of_op(op: &str) -> Prec {
        match op {
            "=" | "+=" | "-=" | "*=" | "/=" | "//=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => {
                Prec::Assign
            }
            "or" => Prec::Or,
            "and" => Prec::And,
            "in" | "not in" | "is" | "is not" | "<" | ">" | "==" | "!=" | "<=" | ">=" => Prec::Cmp,
            "|" => Prec::BitOr,
            "^" => Prec::BitXor,
            "&" => Prec::BitAnd,
            "<<" | ">>" => Prec::Shift,
            "+" | "-" => Prec::Add,
            "*" | "/" | "//" | "%" => Prec::Multiply,
            _ => Prec::Low,
        }
    }
}

impl Printer {
    /// Prints `v` in a context of precedence `outer`, adding parentheses
    /// when `v` binds more loosely.
    pub(super) fn expr(&mut self, v: &Expr, outer: Prec) {
        // A statement that ends a block or has comments after it is
        // followed by a line break we have not printed yet.
        self.newline_if_needed();

        let before = &v.comments().before;
        if !before.is_empty() {
            self.trim();
            if self.indent() > 0 {
                self.out.push('\n');
            }
            self.pad(self.margin);
            for comment in before {
                self.comment(comment);
                self.newline();
            }
        }

        let prec = match v {
            Expr::Dot(_) | Expr::Index(_) | Expr::Slice(_) | Expr::Call(_) => Prec::Suffix,
            Expr::Unary(_) => Prec::Unary,
            Expr::Binary(binary) => Prec::of_op(&binary.op),
            Expr::Assign(_) => Prec::Assign,
            Expr::Lambda(_) => Prec::Colon,
            Expr::Conditional(_) => Prec::IfElse,
            _ => outer,
        };
        let paren = prec < outer;
        if paren {
            self.out.push('(');
            self.depth += 1;
        }

        match v {
            Expr::CommentBlock(_) => {}
            Expr::PythonBlock(block) => self.out.push_str(&block.token),
            Expr::Ident(ident) => self.out.push_str(&ident.name),
            Expr::Literal(lit) => self.out.push_str(&lit.token),
            Expr::String(s) => self.string(s),
            Expr::TypedIdent(typed) => {
                self.out.push_str(&typed.ident.name);
                self.out.push_str(": ");
                self.expr(&typed.ty, Prec::Low);
            }
            Expr::Dot(dot) => {
                self.expr(&dot.x, Prec::Suffix);
                self.out.push('.');
                self.out.push_str(&dot.name);
            }
            Expr::Index(index) => {
                self.expr(&index.x, Prec::Suffix);
                self.out.push('[');
                self.expr(&index.y, Prec::Low);
                self.out.push(']');
            }
            Expr::Slice(slice) => {
                self.expr(&slice.x, Prec::Suffix);
                self.out.push('[');
                if let Some(from) = &slice.from {
                    self.expr(from, Prec::Low);
                }
                self.out.push(':');
                if let Some(to) = &slice.to {
                    self.expr(to, Prec::Low);
                }
                if slice.second_colon.is_some() {
                    self.out.push(':');
                    if let Some(step) = &slice.step {
                        self.expr(step, Prec::Low);
                    }
                }
                self.out.push(']');
            }
            Expr::KeyValue(kv) => {
                self.expr(&kv.key, Prec::Low);
                self.out.push_str(": ");
                self.expr(&kv.value, Prec::Low);
            }
            Expr::Unary(unary) => {
                self.out.push_str(&unary.op);
                if unary.op == "not" {
                    self.out.push(' ');
                }
                if let Some(x) = &unary.x {
                    self.expr(x, Prec::Unary);
                }
            }
            Expr::Lambda(lambda) => {
                self.out.push_str("lambda");
                for (i, param) in lambda.params.iter().enumerate() {
                    self.out.push_str(if i == 0 { " " } else { ", " });
                    self.expr(param, Prec::Low);
                }
                self.out.push_str(": ");
                self.expr(&lambda.body, Prec::Low);
            }
            Expr::Binary(binary) => {
                self.infix(&binary.x, &binary.op, binary.line_break, &binary.y, prec, 0);
            }
            Expr::Assign(assign) => self.assign(assign),
            Expr::Paren(paren) => {
                let list = std::slice::from_ref(&paren.x);
                self.seq("()", list, Some(&paren.end), Mode::Paren, false, paren.force_multi_line);
            }
            Expr::Call(call) => {
                self.expr(&call.x, Prec::Suffix);
                self.seq(
                    "()",
                    &call.list,
                    Some(&call.end),
                    Mode::Call,
                    call.force_compact,
                    call.force_multi_line,
                );
            }
            Expr::List(list) => {
                let (compact, multi_line) = (list.force_compact, list.force_multi_line);
                self.seq("[]", &list.list, Some(&list.end), Mode::List, compact, multi_line);
            }
            Expr::Set(set) => {
                let (compact, multi_line) = (set.force_compact, set.force_multi_line);
                self.seq("{}", &set.list, Some(&set.end), Mode::List, compact, multi_line);
            }
            Expr::Tuple(tuple) => {
                let mode = if tuple.no_brackets { Mode::Seq } else { Mode::Tuple };
                self.seq(
                    "()",
                    &tuple.list,
                    Some(&tuple.end),
                    mode,
                    tuple.force_compact,
                    tuple.force_multi_line,
                );
            }
            Expr::Dict(dict) => {
                let (compact, multi_line) = (dict.force_compact, dict.force_multi_line);
                self.seq("{}", &dict.list, Some(&dict.end), Mode::Dict, compact, multi_line);
            }
            Expr::Comprehension(comp) => self.comprehension(comp),
            Expr::ForClause(clause) => {
                self.out.push_str("for ");
                self.expr(&clause.vars, Prec::Low);
                self.out.push_str(" in ");
                self.expr(&clause.x, Prec::Or);
            }
            Expr::IfClause(clause) => {
                self.out.push_str("if ");
                self.expr(&clause.cond, Prec::Or);
            }
            Expr::Conditional(cond) => {
                self.expr(&cond.then, Prec::IfElse.next());
                self.out.push_str(" if ");
                self.expr(&cond.test, Prec::IfElse.next());
                self.out.push_str(" else ");
                self.expr(&cond.otherwise, Prec::IfElse);
            }
            Expr::Return(ret) => {
                self.out.push_str("return");
                if let Some(result) = &ret.result {
                    self.out.push(' ');
                    self.expr(result, Prec::Low);
                }
            }
            Expr::Branch(branch) => self.out.push_str(&branch.token),
            Expr::Load(load) => self.load(load),
            Expr::Def(def) => {
                self.out.push_str("def ");
                self.out.push_str(&def.name);
                let (compact, multi_line) = (def.force_compact, def.force_multi_line);
                self.seq("()", &def.params, None, Mode::Call, compact, multi_line);
                self.out.push(':');
                self.comments.extend(def.comments.suffix.iter().cloned());
                self.block(&def.body);
            }
            Expr::For(stmt) => {
                self.out.push_str("for ");
                self.expr(&stmt.vars, Prec::Low);
                self.out.push_str(" in ");
                self.expr(&stmt.x, Prec::Low);
                self.out.push(':');
                self.comments.extend(stmt.comments.suffix.iter().cloned());
                self.block(&stmt.body);
            }
            Expr::If(stmt) => self.if_stmt(stmt),
        }

        if paren {
            self.depth -= 1;
            self.out.push(')');
        }

        // Blocks queue theirs after the header.
        if !v.is_block() {
            self.comments.extend(v.comments().suffix.iter().cloned());
        }
    }

    /// Reuses the source spelling when it is already the canonical
    /// double-quoted form of the value.
    fn string(&mut self, s: &StringExpr) {
        if s.token.starts_with('"') {
            if let Ok((value, triple)) = decode(&s.token) {
                if value == s.value && triple == s.triple_quote {
                    self.out.push_str(&s.token);
                    return;
                }
            }
        }
        if !s.token.is_empty() {
            trace!("requoting string literal {}", s.token);
        }
        self.out.push_str(&quote(&s.value, s.triple_quote));
    }

    /// Prints `x op y` with `x` at `prec` and `y` one level stronger. A
    /// line break from the source is kept and the continuation lines up
    /// with the left operand, plus `extra` columns.
    fn infix(&mut self, x: &Expr, op: &str, line_break: bool, y: &Expr, prec: Prec, extra: usize) {
        let margin = self.margin;
        if line_break {
            self.margin = self.indent() + extra;
        }

        self.expr(x, prec);
        self.out.push(' ');
        self.out.push_str(op);
        if line_break {
            self.breakline();
        } else {
            self.out.push(' ');
        }
        self.expr(y, prec.next());

        self.margin = margin;
    }

    fn assign(&mut self, assign: &AssignExpr) {
        let extra = if assign.op == "=" { LIST_INDENTATION } else { 0 };
        self.infix(&assign.lhs, &assign.op, assign.line_break, &assign.rhs, Prec::Assign, extra);
    }

    /// An indented statement list after a block header.
    fn block(&mut self, body: &[Expr]) {
        self.margin += NESTED_INDENTATION;
        self.newline();
        self.statements(body);
        self.margin -= NESTED_INDENTATION;
    }

    /// Prints an `if` statement, folding an `else` branch that holds only
    /// another `if` into `elif`.
    fn if_stmt(&mut self, stmt: &IfStmt) {
        let mut block = stmt;
        let mut first = true;
        loop {
            self.newline_if_needed();
            if !first {
                self.out.push_str("el");
            }
            self.out.push_str("if ");
            self.expr(&block.cond, Prec::Low);
            self.out.push(':');
            self.comments.extend(block.comments.suffix.iter().cloned());
            self.block(&block.true_body);
            first = false;

            let else_line = block.else_pos.pos.line;
            let needs_empty_line = block
                .true_body
                .last()
                .is_some_and(|last| else_line > 0 && else_line.saturating_sub(last.end().line) > 1);

            match block.false_body.as_slice() {
                [Expr::If(next)] => {
                    self.else_header(block, needs_empty_line);
                    block = next.as_ref();
                }
                [] => return,
                false_body => {
                    self.else_header(block, needs_empty_line);
                    self.out.push_str("else:");
                    self.comments.extend(block.else_pos.comments.suffix.iter().cloned());
                    self.block(false_body);
                    return;
                }
            }
        }
    }

    /// Line break and comments in front of an `elif` or `else`.
    fn else_header(&mut self, block: &IfStmt, needs_empty_line: bool) {
        self.newline_if_needed();
        if needs_empty_line {
            self.newline();
        }
        for comment in &block.else_pos.comments.before {
            self.comment(comment);
            self.newline();
        }
        // An `elif` header has no comments of its own; the `else` it came
        // from may still carry one.
        if let [Expr::If(_)] = block.false_body.as_slice() {
            self.comments.extend(block.else_pos.comments.suffix.iter().cloned());
        }
    }

    /// A load statement prints like a call with a string argument per
    /// loaded symbol, or `alias = "symbol"` when it is renamed.
    fn load(&mut self, load: &LoadStmt) {
        let mut args = Vec::with_capacity(load.to.len() + 1);
        args.push(Expr::String(load.module.clone()));
        for (to, from) in load.to.iter().zip(&load.from) {
            let mut symbol = StringExpr::new(from.name.clone());
            symbol.comments = from.comments.clone();
            if to.name == from.name {
                let comments = &mut symbol.comments;
                prepend(&mut comments.before, &to.comments.before);
                prepend(&mut comments.suffix, &to.comments.suffix);
                prepend(&mut comments.after, &to.comments.after);
                args.push(Expr::String(symbol));
            } else {
                args.push(Expr::Assign(Box::new(AssignExpr {
                    lhs: Expr::Ident(to.clone()),
                    op_pos: Default::default(),
                    op: "=".to_string(),
                    line_break: false,
                    rhs: Expr::String(symbol),
                    comments: Default::default(),
                })));
            }
        }

        self.out.push_str("load");
        self.seq(
            "()",
            &args,
            Some(&load.rparen),
            Mode::Call,
            load.force_compact,
            !load.force_compact,
        );
    }
}

fn prepend(comments: &mut Vec<Comment>, front: &[Comment]) {
    let rest = std::mem::replace(comments, front.to_vec());
    comments.extend(rest);
}
