//! Expressions, by precedence climbing.

use std::slice;

use super::{binary, layout, Parser};
use crate::error::Result;
use crate::lexer::{Token, TokenKind};
use crate::syntax::{
    CallExpr, Comprehension, ConditionalExpr, DictExpr, DotExpr, End, Expr, ForClause, Ident, IfClause, IndexExpr,
    KeyValueExpr, LambdaExpr, ListExpr, LiteralExpr, ParenExpr, SetExpr, SliceExpr, TupleExpr, TypedIdent,
    UnaryExpr,
};

/// Binding strength of the binary operator `kind`, loosest first.
fn precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind::*;
    let level = match kind {
        Or => 1,
        And => 2,
        Lt | Gt | Le | Ge | EqEq | Ne | In | Not | Is => 3,
        Pipe => 4,
        Caret => 5,
        Amp => 6,
        Shl | Shr => 7,
        Plus | Minus => 8,
        Star | Slash | SlashSlash | Percent => 9,
        _ => return None,
    };
    Some(level)
}

const OR: u8 = 1;

impl<'t, 'a> Parser<'t, 'a> {
    /// One or more tests separated by commas. Several of them form a tuple
    /// without brackets.
    pub(super) fn expr(&mut self) -> Result<Expr> {
        let first = self.test()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }

        let mut list = vec![first];
        while self.eat(TokenKind::Comma).is_some() {
            if !self.starts_test() {
                break;
            }
            list.push(self.test()?);
        }
        Ok(Expr::Tuple(Box::new(TupleExpr {
            no_brackets: true,
            list,
            force_compact: true,
            ..Default::default()
        })))
    }

    fn starts_test(&self) -> bool {
        use TokenKind::*;
        matches!(
            self.peek().kind,
            Ident | Load | Number | String | LParen | LBrack | LBrace | Minus | Plus | Tilde | Not | Lambda
        )
    }

    pub(super) fn test(&mut self) -> Result<Expr> {
        if self.at(TokenKind::Lambda) {
            return self.lambda();
        }

        let then = self.binary_expr(OR)?;
        let Some(if_token) = self.eat(TokenKind::If) else {
            return Ok(then);
        };
        let test = self.binary_expr(OR)?;
        let else_token = self.expect(TokenKind::Else)?;
        let otherwise = self.test()?;
        Ok(Expr::Conditional(Box::new(ConditionalExpr {
            then,
            if_start: if_token.pos,
            test,
            else_start: else_token.pos,
            otherwise,
            comments: Default::default(),
        })))
    }

    fn lambda(&mut self) -> Result<Expr> {
        let lambda = self.expect(TokenKind::Lambda)?;
        let params = self.params(TokenKind::Colon, false)?;
        let colon = self.expect(TokenKind::Colon)?;
        let body = self.test()?;
        Ok(Expr::Lambda(Box::new(LambdaExpr {
            lambda: lambda.pos,
            params,
            colon: colon.pos,
            body,
            comments: Default::default(),
        })))
    }

    /// Binary operators binding at least as tight as `min`, grouped to the
    /// left.
    fn binary_expr(&mut self, min: u8) -> Result<Expr> {
        let mut x = self.unary_expr()?;
        loop {
            let token = self.peek();
            let Some(level) = precedence(token.kind) else {
                break;
            };
            if level < min {
                break;
            }
            // `not` continues an expression only as `not in`
            if token.is(TokenKind::Not) && !self.peek_at(1).is(TokenKind::In) {
                break;
            }

            self.bump();
            let op = match token.kind {
                TokenKind::Not => {
                    self.bump();
                    "not in"
                }
                TokenKind::Is if self.at(TokenKind::Not) => {
                    self.bump();
                    "is not"
                }
                _ => token.text,
            };
            let y = self.binary_expr(level + 1)?;
            x = binary(x, token.pos, op, y);
        }
        Ok(x)
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Minus | TokenKind::Plus | TokenKind::Tilde | TokenKind::Not => {
                self.bump();
                let x = self.unary_expr()?;
                Ok(unary(token, Some(x)))
            }
            _ => self.postfix_expr(),
        }
    }

    /// A primary expression followed by any number of `.name`, calls and
    /// subscripts.
    fn postfix_expr(&mut self) -> Result<Expr> {
        let mut x = self.primary()?;
        loop {
            x = match self.peek().kind {
                TokenKind::Dot => {
                    let dot = self.bump();
                    let name = self.expect_name()?;
                    Expr::Dot(Box::new(DotExpr {
                        x,
                        dot: dot.pos,
                        name_pos: name.pos,
                        name: name.text.to_string(),
                        comments: Default::default(),
                    }))
                }
                TokenKind::LParen => self.call(x)?,
                TokenKind::LBrack => self.subscript(x)?,
                _ => return Ok(x),
            };
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Ident | TokenKind::Load => {
                self.bump();
                Ok(Expr::Ident(ident(token)))
            }
            TokenKind::Number => {
                self.bump();
                Ok(Expr::Literal(LiteralExpr {
                    start: token.pos,
                    token: token.text.to_string(),
                    comments: Default::default(),
                }))
            }
            TokenKind::String => self.strings(),
            TokenKind::LParen => self.paren(),
            TokenKind::LBrack => self.list(),
            TokenKind::LBrace => self.brace(),
            _ => Err(self.unexpected(&["identifier", "number", "string", "'('"])),
        }
    }

    /// Adjacent string literals, joined by `+`.
    fn strings(&mut self) -> Result<Expr> {
        let first = self.expect(TokenKind::String)?;
        let mut x = Expr::String(self.string_expr(first)?);
        while self.at(TokenKind::String) {
            let token = self.bump();
            let y = Expr::String(self.string_expr(token)?);
            x = binary(x, token.pos, "+", y);
        }
        Ok(x)
    }

    /// `(x)`, or a tuple when empty or when a comma follows the first element.
    fn paren(&mut self) -> Result<Expr> {
        let lparen = self.expect(TokenKind::LParen)?;
        if let Some(rparen) = self.eat(TokenKind::RParen) {
            return Ok(tuple(lparen, Vec::new(), rparen));
        }

        let x = self.test()?;
        if let Some(rparen) = self.eat(TokenKind::RParen) {
            return Ok(Expr::Paren(Box::new(ParenExpr {
                start: lparen.pos,
                force_multi_line: layout::force_multi_line(lparen.pos, slice::from_ref(&x), rparen.pos),
                x,
                end: End::new(rparen.pos),
                comments: Default::default(),
            })));
        }

        let (list, rparen) = self.comma_separated(TokenKind::RParen, vec![x], Self::test)?;
        Ok(tuple(lparen, list, rparen))
    }

    fn list(&mut self) -> Result<Expr> {
        let lbrack = self.expect(TokenKind::LBrack)?;
        let mut list = Vec::new();
        if !self.at(TokenKind::RBrack) {
            let first = self.test()?;
            if self.at(TokenKind::For) {
                return self.comprehension(lbrack, first, TokenKind::RBrack);
            }
            list.push(first);
        }

        let (list, rbrack) = self.comma_separated(TokenKind::RBrack, list, Self::test)?;
        Ok(Expr::List(Box::new(ListExpr {
            start: lbrack.pos,
            force_compact: layout::force_compact(lbrack.pos, &list, rbrack.pos),
            force_multi_line: layout::force_multi_line(lbrack.pos, &list, rbrack.pos),
            list,
            end: End::new(rbrack.pos),
            comments: Default::default(),
        })))
    }

    /// A dict, a set, or a comprehension of either.
    fn brace(&mut self) -> Result<Expr> {
        let lbrace = self.expect(TokenKind::LBrace)?;
        if let Some(rbrace) = self.eat(TokenKind::RBrace) {
            return Ok(Expr::Dict(Box::new(DictExpr {
                start: lbrace.pos,
                list: Vec::new(),
                end: End::new(rbrace.pos),
                force_compact: false,
                force_multi_line: lbrace.pos.line != rbrace.pos.line,
                comments: Default::default(),
            })));
        }

        let first = self.test()?;
        if let Some(colon) = self.eat(TokenKind::Colon) {
            let value = self.test()?;
            let entry = key_value(first, colon, value);
            if self.at(TokenKind::For) {
                return self.comprehension(lbrace, entry, TokenKind::RBrace);
            }
            let (list, rbrace) = self.comma_separated(TokenKind::RBrace, vec![entry], Self::key_value)?;
            return Ok(Expr::Dict(Box::new(DictExpr {
                start: lbrace.pos,
                force_compact: layout::force_compact(lbrace.pos, &list, rbrace.pos),
                force_multi_line: layout::force_multi_line(lbrace.pos, &list, rbrace.pos),
                list,
                end: End::new(rbrace.pos),
                comments: Default::default(),
            })));
        }

        if self.at(TokenKind::For) {
            return self.comprehension(lbrace, first, TokenKind::RBrace);
        }
        let (list, rbrace) = self.comma_separated(TokenKind::RBrace, vec![first], Self::test)?;
        Ok(Expr::Set(Box::new(SetExpr {
            start: lbrace.pos,
            force_compact: layout::force_compact(lbrace.pos, &list, rbrace.pos),
            force_multi_line: layout::force_multi_line(lbrace.pos, &list, rbrace.pos),
            list,
            end: End::new(rbrace.pos),
            comments: Default::default(),
        })))
    }

    fn key_value(&mut self) -> Result<Expr> {
        let key = self.test()?;
        let colon = self.expect(TokenKind::Colon)?;
        let value = self.test()?;
        Ok(key_value(key, colon, value))
    }

    /// The `for` and `if` clauses after a comprehension body, up to the
    /// closing bracket.
    fn comprehension(&mut self, open: Token<'a>, body: Expr, close: TokenKind) -> Result<Expr> {
        let mut clauses = Vec::new();
        loop {
            let token = self.peek();
            let clause = match token.kind {
                TokenKind::For => {
                    self.bump();
                    let vars = self.loop_vars()?;
                    let in_token = self.expect(TokenKind::In)?;
                    let x = self.binary_expr(OR)?;
                    Expr::ForClause(Box::new(ForClause {
                        for_pos: token.pos,
                        vars,
                        in_pos: in_token.pos,
                        x,
                        comments: Default::default(),
                    }))
                }
                TokenKind::If => {
                    self.bump();
                    let cond = self.binary_expr(OR)?;
                    Expr::IfClause(Box::new(IfClause {
                        if_pos: token.pos,
                        cond,
                        comments: Default::default(),
                    }))
                }
                _ => break,
            };
            clauses.push(clause);
        }

        if !self.at(close) {
            return Err(self.unexpected(&["'for'", "'if'", close.describe()]));
        }
        let end = self.bump();
        Ok(Expr::Comprehension(Box::new(Comprehension {
            curly: close == TokenKind::RBrace,
            lbrack: open.pos,
            force_multi_line: layout::force_multi_line_comprehension(open.pos, &body, &clauses, end.pos),
            body,
            clauses,
            end: End::new(end.pos),
            comments: Default::default(),
        })))
    }

    /// The targets of a `for`: primaries separated by commas.
    pub(super) fn loop_vars(&mut self) -> Result<Expr> {
        let first = self.postfix_expr()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }

        let mut list = vec![first];
        while self.eat(TokenKind::Comma).is_some() {
            if self.at(TokenKind::In) {
                break;
            }
            list.push(self.postfix_expr()?);
        }
        Ok(Expr::Tuple(Box::new(TupleExpr {
            no_brackets: true,
            list,
            force_compact: true,
            ..Default::default()
        })))
    }

    /// `f(args)`. Arguments are `*x`, `**x`, `name = x` or `x`.
    fn call(&mut self, x: Expr) -> Result<Expr> {
        let lparen = self.expect(TokenKind::LParen)?;
        let (list, rparen) = self.comma_separated(TokenKind::RParen, Vec::new(), Self::argument)?;
        Ok(Expr::Call(Box::new(CallExpr {
            x,
            list_start: lparen.pos,
            force_compact: layout::force_compact(lparen.pos, &list, rparen.pos),
            force_multi_line: layout::force_multi_line(lparen.pos, &list, rparen.pos),
            list,
            end: End::new(rparen.pos),
            comments: Default::default(),
        })))
    }

    fn argument(&mut self) -> Result<Expr> {
        let token = self.peek();
        if token.is(TokenKind::Star) || token.is(TokenKind::StarStar) {
            self.bump();
            let x = self.test()?;
            return Ok(unary(token, Some(x)));
        }

        let x = self.test()?;
        match self.eat(TokenKind::Eq) {
            Some(eq) => {
                let value = self.test()?;
                Ok(binary(x, eq.pos, eq.text, value))
            }
            None => Ok(x),
        }
    }

    /// `x[i]` or a slice `x[from:to:step]` with every part optional.
    fn subscript(&mut self, x: Expr) -> Result<Expr> {
        let lbrack = self.expect(TokenKind::LBrack)?;

        let mut from = None;
        if !self.at(TokenKind::Colon) {
            let y = self.expr()?;
            if let Some(rbrack) = self.eat(TokenKind::RBrack) {
                return Ok(Expr::Index(Box::new(IndexExpr {
                    x,
                    index_start: lbrack.pos,
                    y,
                    end: rbrack.pos,
                    comments: Default::default(),
                })));
            }
            from = Some(y);
        }

        if !self.at(TokenKind::Colon) {
            return Err(self.unexpected(&["':'", "']'"]));
        }
        let first_colon = self.bump();
        let to = if self.at(TokenKind::Colon) || self.at(TokenKind::RBrack) {
            None
        } else {
            Some(self.test()?)
        };

        let mut second_colon = None;
        let mut step = None;
        if let Some(colon) = self.eat(TokenKind::Colon) {
            second_colon = Some(colon.pos);
            if !self.at(TokenKind::RBrack) {
                step = Some(self.test()?);
            }
        }
        let rbrack = self.expect(TokenKind::RBrack)?;

        Ok(Expr::Slice(Box::new(SliceExpr {
            x,
            slice_start: lbrack.pos,
            from,
            first_colon: first_colon.pos,
            to,
            second_colon,
            step,
            end: rbrack.pos,
            comments: Default::default(),
        })))
    }

    /// Parameters of a `def` or `lambda`, up to but not including `close`.
    pub(super) fn params(&mut self, close: TokenKind, allow_types: bool) -> Result<Vec<Expr>> {
        let mut params = Vec::new();
        while !self.at(close) {
            params.push(self.param(close, allow_types)?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        if !self.at(close) {
            return Err(self.unexpected(&["','", close.describe()]));
        }
        Ok(params)
    }

    fn param(&mut self, close: TokenKind, allow_types: bool) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::StarStar => {
                self.bump();
                let name = self.expect_name()?;
                Ok(unary(token, Some(Expr::Ident(ident(name)))))
            }
            TokenKind::Star => {
                self.bump();
                // a bare `*` ends the positional parameters
                let x = match self.peek().kind {
                    TokenKind::Ident | TokenKind::Load => Some(Expr::Ident(ident(self.bump()))),
                    _ => None,
                };
                Ok(unary(token, x))
            }
            TokenKind::Ident | TokenKind::Load => {
                self.bump();
                let mut x = Expr::Ident(ident(token));
                if allow_types {
                    if let Some(colon) = self.eat(TokenKind::Colon) {
                        let ty = self.test()?;
                        x = Expr::TypedIdent(Box::new(TypedIdent {
                            ident: ident(token),
                            colon: colon.pos,
                            ty,
                            comments: Default::default(),
                        }));
                    }
                }
                if let Some(eq) = self.eat(TokenKind::Eq) {
                    let default = self.test()?;
                    x = binary(x, eq.pos, eq.text, default);
                }
                Ok(x)
            }
            _ => Err(self.unexpected(&["identifier", "'*'", "'**'", close.describe()])),
        }
    }

    /// Items separated by commas up to `close`, which is consumed. A
    /// trailing comma is allowed. `list` holds items already parsed.
    fn comma_separated(
        &mut self,
        close: TokenKind,
        mut list: Vec<Expr>,
        item: fn(&mut Self) -> Result<Expr>,
    ) -> Result<(Vec<Expr>, Token<'a>)> {
        while !self.at(close) {
            if !list.is_empty() {
                if self.eat(TokenKind::Comma).is_none() {
                    return Err(self.unexpected(&["','", close.describe()]));
                }
                if self.at(close) {
                    break;
                }
            }
            list.push(item(self)?);
        }
        Ok((list, self.bump()))
    }
}

fn ident(token: Token) -> Ident {
    Ident {
        name_pos: token.pos,
        name: token.text.to_string(),
        comments: Default::default(),
    }
}

fn unary(op: Token, x: Option<Expr>) -> Expr {
    Expr::Unary(Box::new(UnaryExpr {
        op_start: op.pos,
        op: op.text.to_string(),
        x,
        comments: Default::default(),
    }))
}

fn key_value(key: Expr, colon: Token, value: Expr) -> Expr {
    Expr::KeyValue(Box::new(KeyValueExpr {
        key,
        colon: colon.pos,
        value,
        comments: Default::default(),
    }))
}

fn tuple(lparen: Token, list: Vec<Expr>, rparen: Token) -> Expr {
    Expr::Tuple(Box::new(TupleExpr {
        no_brackets: false,
        start: lparen.pos,
        force_compact: layout::force_compact(lparen.pos, &list, rparen.pos),
        force_multi_line: layout::force_multi_line(lparen.pos, &list, rparen.pos),
        list,
        end: End::new(rparen.pos),
        comments: Default::default(),
    }))
}
