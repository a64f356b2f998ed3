//! Abstract Syntax Tree for Tiny Pascal.
//!
//! Every node that stems from a source token carries a [`Span`]. The tree
//! is built once by the parser and read-only afterward: the analyzer and
//! the IR generator both walk it by shared reference.

use std::fmt;

use crate::token::Span;

/// The two primitive types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Boolean,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Boolean => write!(f, "boolean"),
        }
    }
}

/// A complete program: global declarations followed by the main block.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub declarations: Vec<Decl>,
    pub main: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Procedure(ProcDecl),
    Function(FuncDecl),
}

/// An identifier occurrence: a name and where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// `a, b, c: integer;`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub names: Vec<Ident>,
    pub ty: Type,
    pub span: Span,
}

/// One parameter group: `a, b: integer`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub names: Vec<Ident>,
    pub ty: Type,
    pub span: Span,
}

/// `procedure name(params); begin ... end;`
#[derive(Debug, Clone, PartialEq)]
pub struct ProcDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// `function name(params): type; begin ... end;`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub body: Block,
    pub span: Span,
}

/// Flatten parameter groups into `(name, type)` pairs in declaration order.
pub fn flatten_params(params: &[Param]) -> impl Iterator<Item = (&Ident, Type)> + '_ {
    params
        .iter()
        .flat_map(|group| group.names.iter().map(move |name| (name, group.ty)))
}

/// `begin stmt; stmt; ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

// ── Statements ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `x := expr`
    Assign { target: Ident, value: Expr },

    /// `name(args)` used as a statement.
    Call(Call),

    /// `return` or `return expr`
    Return(Option<Expr>),

    /// `if cond then begin ... end [else begin ... end]`
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },

    /// `while cond do begin ... end`
    While { cond: Expr, body: Block },

    Break,

    Continue,

    /// `writeln(args)`
    Write(Vec<Expr>),
}

/// A call site, shared by call statements and call expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Ident,
    pub args: Vec<Expr>,
}

// ── Expressions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit(i64),

    BoolLit(bool),

    /// Variable or parameter reference.
    Ident(String),

    /// `( expr )`
    Paren(Box<Expr>),

    /// `not expr`
    Not(Box<Expr>),

    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Call(Call),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl BinOp {
    /// The operator as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Eq => "=",
            BinOp::Neq => "<>",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
