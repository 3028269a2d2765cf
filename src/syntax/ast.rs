//! Syntax tree for BUILD and .bzl files.
//!
//! Every node keeps the positions of its tokens and the comments attached to
//! it, so that the printer can reproduce the file. Nodes are owned by their
//! parent; `Expr` closes the set of node kinds.

use crate::position::Position;
use crate::syntax::FileType;

/// A single `#` comment line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comment {
    pub start: Position,
    /// The comment text including the leading `#`.
    pub token: String,
}

impl Comment {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            start: Position::default(),
            token: token.into(),
        }
    }
}

/// Comments attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comments {
    /// Whole-line comments just above the node.
    pub before: Vec<Comment>,
    /// The end-of-line comment after the node.
    pub suffix: Vec<Comment>,
    /// Whole-line comments just below the node.
    pub after: Vec<Comment>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.suffix.is_empty() && self.after.is_empty()
    }
}

/// A closing token, which can carry the comments that precede it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct End {
    pub pos: Position,
    pub comments: Comments,
}

impl End {
    pub fn new(pos: Position) -> Self {
        Self {
            pos,
            comments: Comments::default(),
        }
    }

    pub fn span(&self) -> (Position, Position) {
        let mut end = self.pos;
        end.line_rune += 1;
        end.byte += 1;
        (self.pos, end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ident {
    pub name_pos: Position,
    pub name: String,
    pub comments: Comments,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn span(&self) -> (Position, Position) {
        (self.name_pos, self.name_pos.add(&self.name))
    }
}

/// A number or any other token printed verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiteralExpr {
    pub start: Position,
    pub token: String,
    pub comments: Comments,
}

impl LiteralExpr {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }
}

/// A string literal. `token` is the source spelling of `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringExpr {
    pub start: Position,
    pub value: String,
    pub triple_quote: bool,
    pub end: Position,
    pub token: String,
    pub comments: Comments,
}

impl StringExpr {
    /// A string with no source spelling; the printer quotes it.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DotExpr {
    pub x: Expr,
    pub dot: Position,
    pub name_pos: Position,
    pub name: String,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexExpr {
    pub x: Expr,
    pub index_start: Position,
    pub y: Expr,
    /// Position of the closing `]`.
    pub end: Position,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceExpr {
    pub x: Expr,
    pub slice_start: Position,
    pub from: Option<Expr>,
    pub first_colon: Position,
    pub to: Option<Expr>,
    pub second_colon: Option<Position>,
    pub step: Option<Expr>,
    pub end: Position,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnaryExpr {
    pub op_start: Position,
    pub op: String,
    /// Missing for the bare `*` parameter separator.
    pub x: Option<Expr>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinaryExpr {
    pub x: Expr,
    pub op_start: Position,
    pub op: String,
    /// The right operand started on a new line.
    pub line_break: bool,
    pub y: Expr,
    pub comments: Comments,
}

/// `lhs op rhs` where `op` is `=` or an augmented assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssignExpr {
    pub lhs: Expr,
    pub op_pos: Position,
    pub op: String,
    pub line_break: bool,
    pub rhs: Expr,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionalExpr {
    pub then: Expr,
    pub if_start: Position,
    pub test: Expr,
    pub else_start: Position,
    pub otherwise: Expr,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LambdaExpr {
    pub lambda: Position,
    pub params: Vec<Expr>,
    pub colon: Position,
    pub body: Expr,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallExpr {
    pub x: Expr,
    pub list_start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_compact: bool,
    pub force_multi_line: bool,
    pub comments: Comments,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListExpr {
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_compact: bool,
    pub force_multi_line: bool,
    pub comments: Comments,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetExpr {
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_compact: bool,
    pub force_multi_line: bool,
    pub comments: Comments,
}

/// A tuple, with or without parentheses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TupleExpr {
    pub no_brackets: bool,
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_compact: bool,
    pub force_multi_line: bool,
    pub comments: Comments,
}

/// A dict literal. Every element of `list` is a `KeyValue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DictExpr {
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_compact: bool,
    pub force_multi_line: bool,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyValueExpr {
    pub key: Expr,
    pub colon: Position,
    pub value: Expr,
    pub comments: Comments,
}

/// `[body for ... if ...]`, or the `{...}` form when `curly` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comprehension {
    pub curly: bool,
    pub lbrack: Position,
    pub body: Expr,
    /// `ForClause` and `IfClause` nodes.
    pub clauses: Vec<Expr>,
    pub end: End,
    pub force_multi_line: bool,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForClause {
    pub for_pos: Position,
    pub vars: Expr,
    pub in_pos: Position,
    pub x: Expr,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IfClause {
    pub if_pos: Position,
    pub cond: Expr,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParenExpr {
    pub start: Position,
    pub x: Expr,
    pub end: End,
    pub force_multi_line: bool,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefStmt {
    pub def_pos: Position,
    pub name: String,
    pub lparen: Position,
    pub params: Vec<Expr>,
    pub rparen: Position,
    pub colon_pos: Position,
    pub body: Vec<Expr>,
    pub force_compact: bool,
    pub force_multi_line: bool,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForStmt {
    pub for_pos: Position,
    pub vars: Expr,
    pub x: Expr,
    pub body: Vec<Expr>,
    pub comments: Comments,
}

/// `if` statement. An `elif` is a single nested `IfStmt` in `false_body`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IfStmt {
    pub if_pos: Position,
    pub cond: Expr,
    pub true_body: Vec<Expr>,
    /// The `elif` or `else` keyword; invalid when there is none.
    pub else_pos: End,
    pub false_body: Vec<Expr>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReturnStmt {
    pub return_pos: Position,
    pub result: Option<Expr>,
    pub comments: Comments,
}

/// `pass`, `break` or `continue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchStmt {
    pub token: String,
    pub token_pos: Position,
    pub comments: Comments,
}

/// `load(module, ...)`. `from[i]` is the loaded symbol, bound locally as `to[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadStmt {
    pub load_pos: Position,
    pub module: StringExpr,
    pub from: Vec<Ident>,
    pub to: Vec<Ident>,
    pub rparen: End,
    pub force_compact: bool,
    pub comments: Comments,
}

/// A statement made only of comments, kept in `comments.after`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommentBlock {
    pub start: Position,
    pub comments: Comments,
}

/// Opaque text printed verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PythonBlock {
    pub start: Position,
    pub token: String,
    pub comments: Comments,
}

/// `name: Type`, accepted as a parameter when type annotations are enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypedIdent {
    pub ident: Ident,
    pub colon: Position,
    pub ty: Expr,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    Ident(Ident),
    Literal(LiteralExpr),
    String(StringExpr),
    Dot(Box<DotExpr>),
    Index(Box<IndexExpr>),
    Slice(Box<SliceExpr>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Assign(Box<AssignExpr>),
    Conditional(Box<ConditionalExpr>),
    Lambda(Box<LambdaExpr>),
    Call(Box<CallExpr>),
    List(Box<ListExpr>),
    Tuple(Box<TupleExpr>),
    Set(Box<SetExpr>),
    Dict(Box<DictExpr>),
    KeyValue(Box<KeyValueExpr>),
    Comprehension(Box<Comprehension>),
    ForClause(Box<ForClause>),
    IfClause(Box<IfClause>),
    Paren(Box<ParenExpr>),
    Def(Box<DefStmt>),
    For(Box<ForStmt>),
    If(Box<IfStmt>),
    Return(Box<ReturnStmt>),
    Branch(BranchStmt),
    Load(Box<LoadStmt>),
    CommentBlock(CommentBlock),
    PythonBlock(PythonBlock),
    TypedIdent(Box<TypedIdent>),
}

impl Default for Expr {
    fn default() -> Self {
        Self::Literal(LiteralExpr::default())
    }
}

macro_rules! each_node {
    ($value:expr, $node:ident => $body:expr) => {
        match $value {
            Expr::Ident($node) => $body,
            Expr::Literal($node) => $body,
            Expr::String($node) => $body,
            Expr::Dot($node) => $body,
            Expr::Index($node) => $body,
            Expr::Slice($node) => $body,
            Expr::Unary($node) => $body,
            Expr::Binary($node) => $body,
            Expr::Assign($node) => $body,
            Expr::Conditional($node) => $body,
            Expr::Lambda($node) => $body,
            Expr::Call($node) => $body,
            Expr::List($node) => $body,
            Expr::Tuple($node) => $body,
            Expr::Set($node) => $body,
            Expr::Dict($node) => $body,
            Expr::KeyValue($node) => $body,
            Expr::Comprehension($node) => $body,
            Expr::ForClause($node) => $body,
            Expr::IfClause($node) => $body,
            Expr::Paren($node) => $body,
            Expr::Def($node) => $body,
            Expr::For($node) => $body,
            Expr::If($node) => $body,
            Expr::Return($node) => $body,
            Expr::Branch($node) => $body,
            Expr::Load($node) => $body,
            Expr::CommentBlock($node) => $body,
            Expr::PythonBlock($node) => $body,
            Expr::TypedIdent($node) => $body,
        }
    };
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(Ident::new(name))
    }

    pub fn literal(token: impl Into<String>) -> Self {
        Self::Literal(LiteralExpr::new(token))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(StringExpr::new(value))
    }

    pub fn comments(&self) -> &Comments {
        each_node!(self, node => &node.comments)
    }

    pub fn comments_mut(&mut self) -> &mut Comments {
        each_node!(self, node => &mut node.comments)
    }

    /// Start and end of the node's own text, comments excluded.
    pub fn span(&self) -> (Position, Position) {
        match self {
            Self::Ident(ident) => ident.span(),
            Self::Literal(lit) => (lit.start, lit.start.add(&lit.token)),
            Self::String(s) => (s.start, s.end),
            Self::Dot(dot) => (dot.x.start(), dot.name_pos.add(&dot.name)),
            Self::Index(index) => (index.x.start(), index.end.add("]")),
            Self::Slice(slice) => (slice.x.start(), slice.end.add("]")),
            Self::Unary(unary) => {
                let end = match &unary.x {
                    Some(x) => x.end(),
                    None => unary.op_start.add(&unary.op),
                };
                (unary.op_start, end)
            }
            Self::Binary(binary) => (binary.x.start(), binary.y.end()),
            Self::Assign(assign) => (assign.lhs.start(), assign.rhs.end()),
            Self::Conditional(cond) => (cond.then.start(), cond.otherwise.end()),
            Self::Lambda(lambda) => (lambda.lambda, lambda.body.end()),
            Self::Call(call) => (call.x.start(), call.end.pos.add(")")),
            Self::List(list) => (list.start, list.end.pos.add("]")),
            Self::Tuple(tuple) => {
                if tuple.no_brackets {
                    match (tuple.list.first(), tuple.list.last()) {
                        (Some(first), Some(last)) => (first.start(), last.end()),
                        _ => (tuple.start, tuple.start),
                    }
                } else {
                    (tuple.start, tuple.end.pos.add(")"))
                }
            }
            Self::Set(set) => (set.start, set.end.pos.add("}")),
            Self::Dict(dict) => (dict.start, dict.end.pos.add("}")),
            Self::KeyValue(kv) => (kv.key.start(), kv.value.end()),
            Self::Comprehension(comp) => {
                let close = if comp.curly { "}" } else { "]" };
                (comp.lbrack, comp.end.pos.add(close))
            }
            Self::ForClause(clause) => (clause.for_pos, clause.x.end()),
            Self::IfClause(clause) => (clause.if_pos, clause.cond.end()),
            Self::Paren(paren) => (paren.start, paren.end.pos.add(")")),
            Self::Def(def) => {
                let end = def
                    .body
                    .last()
                    .map_or_else(|| def.colon_pos.add(":"), Expr::end);
                (def.def_pos, end)
            }
            Self::For(stmt) => {
                let end = stmt.body.last().map_or_else(|| stmt.x.end(), Expr::end);
                (stmt.for_pos, end)
            }
            Self::If(stmt) => {
                let last = stmt.false_body.last().or(stmt.true_body.last());
                (stmt.if_pos, last.map_or_else(|| stmt.cond.end(), Expr::end))
            }
            Self::Return(ret) => {
                let end = match &ret.result {
                    Some(result) => result.end(),
                    None => ret.return_pos.add("return"),
                };
                (ret.return_pos, end)
            }
            Self::Branch(branch) => (branch.token_pos, branch.token_pos.add(&branch.token)),
            Self::Load(load) => (load.load_pos, load.rparen.pos.add(")")),
            Self::CommentBlock(block) => (block.start, block.start),
            Self::PythonBlock(block) => (block.start, block.start.add(&block.token)),
            Self::TypedIdent(typed) => (typed.ident.name_pos, typed.ty.end()),
        }
    }

    pub fn start(&self) -> Position {
        self.span().0
    }

    pub fn end(&self) -> Position {
        self.span().1
    }

    /// Name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ident(_) => "Ident",
            Self::Literal(_) => "LiteralExpr",
            Self::String(_) => "StringExpr",
            Self::Dot(_) => "DotExpr",
            Self::Index(_) => "IndexExpr",
            Self::Slice(_) => "SliceExpr",
            Self::Unary(_) => "UnaryExpr",
            Self::Binary(_) => "BinaryExpr",
            Self::Assign(_) => "AssignExpr",
            Self::Conditional(_) => "ConditionalExpr",
            Self::Lambda(_) => "LambdaExpr",
            Self::Call(_) => "CallExpr",
            Self::List(_) => "ListExpr",
            Self::Tuple(_) => "TupleExpr",
            Self::Set(_) => "SetExpr",
            Self::Dict(_) => "DictExpr",
            Self::KeyValue(_) => "KeyValueExpr",
            Self::Comprehension(_) => "Comprehension",
            Self::ForClause(_) => "ForClause",
            Self::IfClause(_) => "IfClause",
            Self::Paren(_) => "ParenExpr",
            Self::Def(_) => "DefStmt",
            Self::For(_) => "ForStmt",
            Self::If(_) => "IfStmt",
            Self::Return(_) => "ReturnStmt",
            Self::Branch(_) => "BranchStmt",
            Self::Load(_) => "LoadStmt",
            Self::CommentBlock(_) => "CommentBlock",
            Self::PythonBlock(_) => "PythonBlock",
            Self::TypedIdent(_) => "TypedIdent",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Def(_) | Self::For(_) | Self::If(_))
    }
}

/// A parsed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct File {
    pub path: String,
    pub file_type: FileType,
    pub stmt: Vec<Expr>,
    /// `before` holds comments that could not be attached anywhere else,
    /// `after` the comments at the end of the file.
    pub comments: Comments,
}

impl File {
    pub fn new(path: impl Into<String>, file_type: FileType) -> Self {
        Self {
            path: path.into(),
            file_type,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize, line_rune: usize, byte: usize) -> Position {
        Position::new(line, line_rune, byte)
    }

    #[test]
    fn test_call_span_covers_closing_paren() {
        let call = Expr::Call(Box::new(CallExpr {
            x: Expr::Ident(Ident {
                name_pos: pos(1, 1, 0),
                name: "f".to_string(),
                comments: Comments::default(),
            }),
            list_start: pos(1, 2, 1),
            list: vec![],
            end: End::new(pos(1, 3, 2)),
            force_compact: false,
            force_multi_line: false,
            comments: Comments::default(),
        }));
        assert_eq!(call.span(), (pos(1, 1, 0), pos(1, 4, 3)));
        assert_eq!(call.kind(), "CallExpr");
    }

    #[test]
    fn test_implicit_tuple_span() {
        let a = Expr::Ident(Ident {
            name_pos: pos(1, 1, 0),
            name: "a".to_string(),
            comments: Comments::default(),
        });
        let bc = Expr::Ident(Ident {
            name_pos: pos(1, 4, 3),
            name: "bc".to_string(),
            comments: Comments::default(),
        });
        let tuple = Expr::Tuple(Box::new(TupleExpr {
            no_brackets: true,
            list: vec![a, bc],
            ..Default::default()
        }));
        assert_eq!(tuple.span(), (pos(1, 1, 0), pos(1, 6, 5)));
    }

    #[test]
    fn test_comments_mut() {
        let mut expr = Expr::literal("1");
        expr.comments_mut().suffix.push(Comment::new("# one"));
        assert_eq!(expr.comments().suffix[0].token, "# one");
        assert!(!expr.comments().is_empty());
        assert_eq!(End::new(pos(2, 5, 9)).span().1, pos(2, 6, 10));
    }
}
