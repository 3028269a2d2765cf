//! Builds the syntax tree from tokens.
//!
//! Statements follow the indentation tokens produced by the lexer;
//! expressions are parsed by precedence climbing (see `expr.rs`). Comments
//! standing on their own line arrive as tokens and are attached while the
//! statement lists are built. The remaining comments are attached by
//! position once the tree is complete.

mod comments;
mod expr;
pub mod layout;
mod trailing;

use log::debug;

use crate::error::{Error, Result};
use crate::lexer::{self, Token, TokenKind};
use crate::position::Position;
use crate::quote;
use crate::syntax::{
    AssignExpr, BinaryExpr, BranchStmt, Comment, CommentBlock, Comments, DefStmt, End, Expr, File, FileType, ForStmt,
    Ident, IfStmt, LoadStmt, ReturnStmt, StringExpr,
};

pub use trailing::{extract_trailing_comments, last_body_mut};

/// Settings for one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recorded on the resulting `File`; the grammar does not depend on it.
    pub file_type: FileType,
    /// Accept `name: Type` parameters in `def` statements.
    pub type_annotations: bool,
}

impl ParseOptions {
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            ..Default::default()
        }
    }

    pub fn with_type_annotations(mut self, enabled: bool) -> Self {
        self.type_annotations = enabled;
        self
    }
}

pub fn parse_file(path: &str, source: &str, options: &ParseOptions) -> Result<File> {
    let tokens = lexer::tokenize(path, source)?;
    let mut parser = Parser::new(path, &tokens.tokens, options);
    let stmt = parser.file()?;

    let mut file = File {
        path: path.to_string(),
        file_type: options.file_type,
        stmt,
        ..Default::default()
    };
    comments::attach(&mut file, tokens.line_comments, tokens.suffix_comments);
    debug!("parsed {}: {} statements", path, file.stmt.len());
    Ok(file)
}

pub(crate) struct Parser<'t, 'a> {
    path: &'t str,
    tokens: &'t [Token<'a>],
    pos: usize,
    type_annotations: bool,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn new(path: &'t str, tokens: &'t [Token<'a>], options: &ParseOptions) -> Self {
        Self {
            path,
            tokens,
            pos: 0,
            type_annotations: options.type_annotations,
        }
    }

    fn peek(&self) -> Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Token<'a> {
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                text: "",
                pos: Position::default(),
                end: Position::default(),
            })
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    fn bump(&mut self) -> Token<'a> {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>> {
        self.eat(kind).ok_or_else(|| self.unexpected(&[kind.describe()]))
    }

    /// An identifier, including `load` where it names something.
    fn expect_name(&mut self) -> Result<Token<'a>> {
        if self.at(TokenKind::Ident) || self.at(TokenKind::Load) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&[TokenKind::Ident.describe()]))
        }
    }

    fn unexpected(&self, expected: &[&str]) -> Error {
        let token = self.peek();
        let expected = if expected.len() <= 4 {
            expected.iter().map(|name| name.to_string()).collect()
        } else {
            Vec::new()
        };
        Error::Parse {
            path: self.path.to_string(),
            pos: token.pos,
            found: token.kind.describe().to_string(),
            expected,
        }
    }

    fn file(&mut self) -> Result<Vec<Expr>> {
        let (stmts, _) = self.statements(TokenKind::Eof)?;
        self.expect(TokenKind::Eof)?;
        Ok(stmts)
    }

    /// Statements up to `until`, which is not consumed.
    ///
    /// Returns whether the last statement is still open to comments on the
    /// following lines, which is the case unless a blank line ended it.
    fn statements(&mut self, until: TokenKind) -> Result<(Vec<Expr>, bool)> {
        let mut stmts: Vec<Expr> = Vec::new();
        let mut attached = false;
        loop {
            let token = self.peek();
            match token.kind {
                kind if kind == until => break,
                TokenKind::Newline => {
                    // blank line
                    self.bump();
                    attached = false;
                }
                TokenKind::Comment => {
                    let comment = self.comment_line()?;
                    match stmts.last_mut() {
                        Some(last) if attached => last.comments_mut().after.push(comment),
                        _ => {
                            stmts.push(comment_block(comment));
                            attached = true;
                        }
                    }
                }
                _ => {
                    let (new, still_attached) = self.stmt()?;
                    append_statements(&mut stmts, attached, new);
                    attached = still_attached;
                }
            }
        }
        Ok((stmts, attached))
    }

    /// A comment token and the newline after it.
    fn comment_line(&mut self) -> Result<Comment> {
        let token = self.expect(TokenKind::Comment)?;
        self.expect(TokenKind::Newline)?;
        Ok(Comment {
            start: token.pos,
            token: token.text.to_string(),
        })
    }

    /// One statement. A block statement may be followed by the comment
    /// blocks peeled off its end.
    fn stmt(&mut self) -> Result<(Vec<Expr>, bool)> {
        let (mut block, attached) = match self.peek().kind {
            TokenKind::Def => self.def_stmt()?,
            TokenKind::For => self.for_stmt()?,
            TokenKind::If => self.if_stmt()?,
            _ => return Ok((self.simple_stmt()?, true)),
        };

        let trailing = extract_trailing_comments(&mut block);
        if trailing.is_empty() {
            return Ok((vec![block], true));
        }
        let mut stmts = vec![block];
        stmts.extend(trailing);
        Ok((stmts, attached))
    }

    fn def_stmt(&mut self) -> Result<(Expr, bool)> {
        let def = self.expect(TokenKind::Def)?;
        let name = self.expect_name()?;
        let lparen = self.expect(TokenKind::LParen)?;
        let params = self.params(TokenKind::RParen, self.type_annotations)?;
        let rparen = self.expect(TokenKind::RParen)?;
        let colon = self.expect(TokenKind::Colon)?;
        let mut header = Vec::new();
        let (body, attached) = self.suite(&mut header)?;

        let stmt = DefStmt {
            def_pos: def.pos,
            name: name.text.to_string(),
            lparen: lparen.pos,
            force_compact: layout::force_compact(lparen.pos, &params, rparen.pos),
            force_multi_line: layout::force_multi_line(lparen.pos, &params, rparen.pos),
            params,
            rparen: rparen.pos,
            colon_pos: colon.pos,
            body,
            comments: header_comments(header),
        };
        Ok((Expr::Def(Box::new(stmt)), attached))
    }

    fn for_stmt(&mut self) -> Result<(Expr, bool)> {
        let for_token = self.expect(TokenKind::For)?;
        let vars = self.loop_vars()?;
        self.expect(TokenKind::In)?;
        let x = self.expr()?;
        self.expect(TokenKind::Colon)?;
        let mut header = Vec::new();
        let (body, attached) = self.suite(&mut header)?;

        let stmt = ForStmt {
            for_pos: for_token.pos,
            vars,
            x,
            body,
            comments: header_comments(header),
        };
        Ok((Expr::For(Box::new(stmt)), attached))
    }

    /// `if`, any number of `elif` and an optional `else`. Each `elif` becomes
    /// an `IfStmt` nested in the `false_body` of the previous branch.
    fn if_stmt(&mut self) -> Result<(Expr, bool)> {
        let if_token = self.expect(TokenKind::If)?;
        let cond = self.expr()?;
        self.expect(TokenKind::Colon)?;
        let mut header = Vec::new();
        let (true_body, mut attached) = self.suite(&mut header)?;

        let mut elifs = Vec::new();
        while let Some(elif) = self.eat(TokenKind::Elif) {
            let cond = self.expr()?;
            self.expect(TokenKind::Colon)?;
            let mut elif_header = Vec::new();
            let (body, elif_attached) = self.suite(&mut elif_header)?;
            attached = elif_attached;
            elifs.push((elif.pos, cond, body, elif_header));
        }

        let mut else_pos = End::default();
        let mut false_body = Vec::new();
        if let Some(else_token) = self.eat(TokenKind::Else) {
            self.expect(TokenKind::Colon)?;
            let mut else_header = Vec::new();
            let (body, else_attached) = self.suite(&mut else_header)?;
            attached = else_attached;
            else_pos = End::new(else_token.pos);
            else_pos.comments = header_comments(else_header);
            false_body = body;
        }

        for (elif_pos, cond, body, elif_header) in elifs.into_iter().rev() {
            let nested = IfStmt {
                if_pos: elif_pos,
                cond,
                true_body: body,
                else_pos,
                false_body,
                comments: header_comments(elif_header),
            };
            false_body = vec![Expr::If(Box::new(nested))];
            else_pos = End::new(elif_pos);
        }

        let stmt = IfStmt {
            if_pos: if_token.pos,
            cond,
            true_body,
            else_pos,
            false_body,
            comments: header_comments(header),
        };
        Ok((Expr::If(Box::new(stmt)), attached))
    }

    /// The body after a block header's `:`, either a simple statement on the
    /// same line or an indented block. A comment left on the header line
    /// after a multi-line `(...)` goes to `header`.
    fn suite(&mut self, header: &mut Vec<Comment>) -> Result<(Vec<Expr>, bool)> {
        if !self.at(TokenKind::Newline) && !self.at(TokenKind::Comment) {
            return Ok((self.simple_stmt()?, true));
        }

        // Comment lines between the header and the first statement.
        let mut leading: Vec<Expr> = Vec::new();
        let mut attached = false;
        if self.at(TokenKind::Comment) {
            header.push(self.comment_line()?);
        } else {
            self.expect(TokenKind::Newline)?;
        }
        loop {
            match self.peek().kind {
                TokenKind::Comment => {
                    let comment = self.comment_line()?;
                    match leading.last_mut() {
                        Some(last) if attached => last.comments_mut().after.push(comment),
                        _ => {
                            leading.push(comment_block(comment));
                            attached = true;
                        }
                    }
                }
                TokenKind::Newline => {
                    self.bump();
                    attached = false;
                }
                _ => break,
            }
        }

        self.expect(TokenKind::Indent)?;
        let (mut body, attached) = self.statements(TokenKind::Unindent)?;
        self.expect(TokenKind::Unindent)?;

        // The last comment block sticks to the first statement if no blank
        // line separates them.
        let last_comment_line = match leading.last() {
            Some(Expr::CommentBlock(block)) => block.comments.after.last().map(|c| c.start.line),
            _ => None,
        };
        if let (Some(line), Some(first)) = (last_comment_line, body.first_mut()) {
            if first.start().line == line + 1 {
                if let Some(Expr::CommentBlock(block)) = leading.pop() {
                    first.comments_mut().before = block.comments.after;
                }
            }
        }

        leading.append(&mut body);
        Ok((leading, attached))
    }

    /// Small statements separated by `;`, ending the line.
    fn simple_stmt(&mut self) -> Result<Vec<Expr>> {
        let mut stmts = vec![self.small_stmt()?];
        while self.eat(TokenKind::Semi).is_some() {
            if self.at(TokenKind::Newline) {
                break;
            }
            stmts.push(self.small_stmt()?);
        }
        if !self.at(TokenKind::Newline) {
            return Err(self.unexpected(&["newline", "';'"]));
        }
        self.bump();
        Ok(stmts)
    }

    fn small_stmt(&mut self) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Return => {
                self.bump();
                let result = if self.at(TokenKind::Newline) || self.at(TokenKind::Semi) {
                    None
                } else {
                    Some(self.expr()?)
                };
                Ok(Expr::Return(Box::new(ReturnStmt {
                    return_pos: token.pos,
                    result,
                    comments: Default::default(),
                })))
            }
            TokenKind::Pass | TokenKind::Break | TokenKind::Continue => {
                self.bump();
                Ok(Expr::Branch(BranchStmt {
                    token: token.text.to_string(),
                    token_pos: token.pos,
                    comments: Default::default(),
                }))
            }
            TokenKind::Load => self.load_stmt(),
            _ => {
                let x = self.expr()?;
                if self.at(TokenKind::Eq) || self.at(TokenKind::AugAssign) {
                    let op = self.bump();
                    let y = self.expr()?;
                    return Ok(binary(x, op.pos, op.text, y));
                }
                Ok(x)
            }
        }
    }

    /// `load(module, "sym", local = "sym", ...)`.
    fn load_stmt(&mut self) -> Result<Expr> {
        let load = self.expect(TokenKind::Load)?;
        self.expect(TokenKind::LParen)?;
        let module_token = self.expect(TokenKind::String)?;
        let module = self.string_expr(module_token)?;

        let mut from = Vec::new();
        let mut to = Vec::new();
        while self.eat(TokenKind::Comma).is_some() {
            match self.peek().kind {
                TokenKind::RParen => break,
                TokenKind::String => {
                    let token = self.bump();
                    let symbol = self.load_symbol(token)?;
                    to.push(symbol.clone());
                    from.push(symbol);
                }
                TokenKind::Ident | TokenKind::Load => {
                    let name = self.bump();
                    self.expect(TokenKind::Eq)?;
                    let token = self.expect(TokenKind::String)?;
                    from.push(self.load_symbol(token)?);
                    to.push(Ident {
                        name_pos: name.pos,
                        name: name.text.to_string(),
                        comments: Default::default(),
                    });
                }
                _ => return Err(self.unexpected(&["string", "identifier", "')'"])),
            }
        }
        if !self.at(TokenKind::RParen) {
            return Err(self.unexpected(&["','", "')'"]));
        }
        let rparen = self.bump();

        Ok(Expr::Load(Box::new(LoadStmt {
            load_pos: load.pos,
            module,
            from,
            to,
            rparen: End::new(rparen.pos),
            force_compact: load.pos.line == rparen.pos.line,
            comments: Default::default(),
        })))
    }

    /// The symbol named by a string argument of `load`, positioned at the
    /// first character inside the quotes.
    fn load_symbol(&self, token: Token<'a>) -> Result<Ident> {
        let string = self.string_expr(token)?;
        let mut name_pos = string.start;
        if token.text.starts_with(['r', 'R']) {
            name_pos = name_pos.add("r");
        }
        name_pos = name_pos.add(if string.triple_quote { "\"\"\"" } else { "\"" });
        Ok(Ident {
            name_pos,
            name: string.value,
            comments: Default::default(),
        })
    }

    fn string_expr(&self, token: Token<'a>) -> Result<StringExpr> {
        let (value, triple_quote) = quote::decode(token.text).map_err(|source| {
            let offset = source.offset();
            Error::Quote {
                path: self.path.to_string(),
                pos: token.pos.add(token.text.get(..offset).unwrap_or("")),
                source,
            }
        })?;
        Ok(StringExpr {
            start: token.pos,
            value,
            triple_quote,
            end: token.end,
            token: token.text.to_string(),
            comments: Default::default(),
        })
    }
}

fn header_comments(suffix: Vec<Comment>) -> Comments {
    Comments {
        suffix,
        ..Default::default()
    }
}

fn comment_block(comment: Comment) -> Expr {
    Expr::CommentBlock(CommentBlock {
        start: comment.start,
        comments: Comments {
            after: vec![comment],
            ..Default::default()
        },
    })
}

/// Adds freshly parsed statements to a statement list. Comments that were
/// waiting after the previous statement move to the first new one.
fn append_statements(stmts: &mut Vec<Expr>, attached: bool, mut new: Vec<Expr>) {
    if attached {
        let waiting = match stmts.last_mut() {
            Some(Expr::CommentBlock(_)) => match stmts.pop() {
                Some(Expr::CommentBlock(block)) => block.comments.after,
                _ => Vec::new(),
            },
            Some(last) => std::mem::take(&mut last.comments_mut().after),
            None => Vec::new(),
        };
        if let Some(first) = new.first_mut() {
            first.comments_mut().before = waiting;
        }
    }
    stmts.append(&mut new);
}

const ASSIGN_OPS: [&str; 12] = ["=", "+=", "-=", "*=", "/=", "//=", "%=", "&=", "|=", "^=", "<<=", ">>="];

/// Combines two operands into an `AssignExpr` for assignment operators and
/// a `BinaryExpr` for everything else.
pub(crate) fn binary(x: Expr, op_pos: Position, op: &str, y: Expr) -> Expr {
    let line_break = x.end().line < y.start().line;
    if ASSIGN_OPS.contains(&op) {
        return Expr::Assign(Box::new(AssignExpr {
            lhs: x,
            op_pos,
            op: op.to_string(),
            line_break,
            rhs: y,
            comments: Default::default(),
        }));
    }
    Expr::Binary(Box::new(BinaryExpr {
        x,
        op_start: op_pos,
        op: op.to_string(),
        line_break,
        y,
        comments: Default::default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> File {
        parse_file("test.bzl", source, &ParseOptions::default()).unwrap()
    }

    fn parse_error(source: &str) -> String {
        parse_file("test.bzl", source, &ParseOptions::default())
            .unwrap_err()
            .to_string()
    }

    fn tokens(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.token.as_str()).collect()
    }

    #[test]
    fn test_simple_statements() {
        let file = parse("a = 1; b += 2;\nreturn\npass\n");
        let kinds: Vec<_> = file.stmt.iter().map(Expr::kind).collect();
        assert_eq!(kinds, vec!["AssignExpr", "AssignExpr", "ReturnStmt", "BranchStmt"]);
        assert!(matches!(&file.stmt[1], Expr::Assign(assign) if assign.op == "+="));
    }

    #[test]
    fn test_comment_blocks_and_attachment() {
        let file = parse("# header\n\nfoo()\n# about bar\nbar()\n\n# trailing\n");
        let kinds: Vec<_> = file.stmt.iter().map(Expr::kind).collect();
        assert_eq!(kinds, vec!["CommentBlock", "CallExpr", "CallExpr", "CommentBlock"]);
        assert_eq!(tokens(&file.stmt[0].comments().after), vec!["# header"]);
        assert_eq!(tokens(&file.stmt[2].comments().before), vec!["# about bar"]);
        assert!(file.stmt[1].comments().after.is_empty());
        assert_eq!(tokens(&file.stmt[3].comments().after), vec!["# trailing"]);
    }

    #[test]
    fn test_comment_block_becomes_before() {
        let file = parse("# one\n# two\nx = 1\n");
        assert_eq!(file.stmt.len(), 1);
        assert_eq!(tokens(&file.stmt[0].comments().before), vec!["# one", "# two"]);
    }

    #[test]
    fn test_if_chain() {
        let file = parse("if a:\n    x\nelif b:\n    y\nelse:\n    z\n");
        let Expr::If(stmt) = &file.stmt[0] else {
            panic!("expected an if statement");
        };
        assert_eq!(stmt.else_pos.pos.line, 3);
        let Expr::If(elif) = &stmt.false_body[0] else {
            panic!("expected a nested if statement");
        };
        assert_eq!(elif.if_pos.line, 3);
        assert_eq!(elif.else_pos.pos.line, 5);
        assert_eq!(elif.false_body.len(), 1);
    }

    #[test]
    fn test_suite_on_header_line() {
        let file = parse("def f(): return 1\nfor x in y: pass\n");
        let Expr::Def(def) = &file.stmt[0] else {
            panic!("expected a def");
        };
        assert_eq!(def.body[0].kind(), "ReturnStmt");
        assert_eq!(file.stmt[1].kind(), "ForStmt");
    }

    #[test]
    fn test_comment_after_multi_line_header() {
        let file = parse("def f(\n    a,\n):  # hdr\n    pass\n");
        let Expr::Def(def) = &file.stmt[0] else {
            panic!("expected a def");
        };
        assert_eq!(tokens(&def.comments.suffix), vec!["# hdr"]);
        let kinds: Vec<_> = def.body.iter().map(Expr::kind).collect();
        assert_eq!(kinds, vec!["BranchStmt"]);

        let file = parse("if (\n    a\n):  # then\n    x\nelif (\n    b\n):  # other\n    y\n");
        let Expr::If(stmt) = &file.stmt[0] else {
            panic!("expected an if statement");
        };
        assert_eq!(tokens(&stmt.comments.suffix), vec!["# then"]);
        let Expr::If(elif) = &stmt.false_body[0] else {
            panic!("expected a nested if statement");
        };
        assert_eq!(tokens(&elif.comments.suffix), vec!["# other"]);

        let file = parse("for x in f(\n    a,\n):  # loop\n    pass\n");
        assert_eq!(tokens(&file.stmt[0].comments().suffix), vec!["# loop"]);
    }

    #[test]
    fn test_leading_comments_in_block() {
        let file = parse("def f():\n    # lonely\n\n    # first\n    x = 1\n");
        let Expr::Def(def) = &file.stmt[0] else {
            panic!("expected a def");
        };
        assert_eq!(def.body.len(), 2);
        assert_eq!(tokens(&def.body[0].comments().after), vec!["# lonely"]);
        assert_eq!(tokens(&def.body[1].comments().before), vec!["# first"]);
    }

    #[test]
    fn test_load_arguments() {
        let file = parse("load(\":m.bzl\", \"a\", b = \"c\")\n");
        let Expr::Load(load) = &file.stmt[0] else {
            panic!("expected a load");
        };
        assert_eq!(load.module.value, ":m.bzl");
        let from: Vec<_> = load.from.iter().map(|i| i.name.as_str()).collect();
        let to: Vec<_> = load.to.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(from, vec!["a", "c"]);
        assert_eq!(to, vec!["a", "b"]);
        assert!(load.force_compact);
        assert_eq!(load.from[0].name_pos, Position::new(1, 17, 16));
    }

    #[test]
    fn test_type_annotations_need_the_option() {
        let source = "def f(a: int, b = 1):\n    pass\n";
        assert!(parse_file("t.bzl", source, &ParseOptions::default()).is_err());
        let options = ParseOptions::default().with_type_annotations(true);
        let file = parse_file("t.bzl", source, &options).unwrap();
        let Expr::Def(def) = &file.stmt[0] else {
            panic!("expected a def");
        };
        assert_eq!(def.params[0].kind(), "TypedIdent");
        assert_eq!(def.params[1].kind(), "AssignExpr");
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            parse_error("x = )\n"),
            "test.bzl:1:5: syntax error: unexpected ')', expecting identifier or number or string or '('"
        );
        assert_eq!(
            parse_error("def f(:\n"),
            "test.bzl:1:7: syntax error: unexpected ':', expecting identifier or '*' or '**' or ')'"
        );
        assert_eq!(parse_error("f(a b)\n"), "test.bzl:1:5: syntax error: unexpected identifier, expecting ',' or ')'");
    }

    #[test]
    fn test_invalid_escape_is_positioned() {
        let err = parse_file("t.bzl", "x = \"ab\\x1\"\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Quote { pos, .. } if pos == Position::new(1, 8, 7)));
    }
}
