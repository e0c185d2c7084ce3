//! The untyped tree handed over by the parser. Nothing here is resolved: names are plain
//! strings and every node carries the span it was parsed from.

use crate::source::{HasSpan, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// The identifier other modules see it as, and the prefix of its declared type names.
    pub name: String,
    /// The path importers use to refer to it, e.g. `"std/io"`.
    pub path: String,
    pub stmts: Vec<Stmt>
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Import(Import),
    Fn(FnDecl),
    Struct(RecordDecl),
    Union(RecordDecl),
    Enum(EnumDecl),
    Let(Let),
    Expr(Expr),
    Block(Block),
    If { cond: Expr, then_do: Block, else_do: Option<Box<Stmt>>, span: Span },
    While { cond: Expr, body: Block, span: Span },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Expr>, body: Block, span: Span },
    Break(Span),
    Continue(Span),
    Return { value: Option<Expr>, span: Span },
    Defer { stmt: Box<Stmt>, span: Span },
    Delete { value: Expr, span: Span }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    pub items: Vec<(String, Span)>,
    pub span: Span
}

impl Import {
    /// The name the module is bound to in the importing scope.
    pub fn binding(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    /// The `Type` in `def Type.name(...)`.
    pub receiver: Option<TypeExpr>,
    pub params: Vec<Param>,
    pub variadic: bool,
    pub ret: Option<TypeExpr>,
    /// `None` for `extern` declarations.
    pub body: Option<Block>,
    pub is_public: bool,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    /// `None` for a forward declaration.
    pub fields: Option<Vec<Field>>,
    pub is_public: bool,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub start: Option<Expr>,
    pub entries: Option<Vec<(String, Span)>>,
    pub is_public: bool,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
    pub mutable: bool,
    pub is_public: bool,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
    Undefined,
    Ident(String),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Assign { target: Box<Expr>, value: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Init { ty: TypeExpr, fields: Vec<FieldInit> },
    Access { left: Box<Expr>, right: Box<Expr> },
    As { value: Box<Expr>, ty: TypeExpr },
    New(TypeExpr),
    Sizeof(TypeExpr),
    Index { base: Box<Expr>, index: Box<Expr> }
}

impl ExprKind {
    pub fn is_numeric_literal(&self) -> bool {
        matches!(self, ExprKind::Int(_) | ExprKind::Float(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
    pub span: Span
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add, Sub, Mul, Div, Mod,
    Lt, Le, Gt, Ge, Eq, Ne,
    And, Or
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Ref,
    Deref,
    Not,
    Neg
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Ref => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TypeExpr {
    Named { path: Vec<String>, span: Span },
    Pointer { inner: Box<TypeExpr>, span: Span },
    Array { elem: Box<TypeExpr>, len: u64, span: Span },
    Function { params: Vec<TypeExpr>, ret: Option<Box<TypeExpr>>, variadic: bool, span: Span }
}

impl HasSpan for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

impl HasSpan for TypeExpr {
    fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. } => *span,
            TypeExpr::Pointer { span, .. } => *span,
            TypeExpr::Array { span, .. } => *span,
            TypeExpr::Function { span, .. } => *span,
        }
    }
}

impl HasSpan for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Import(import) => import.span,
            Stmt::Fn(decl) => decl.span,
            Stmt::Struct(decl) | Stmt::Union(decl) => decl.span,
            Stmt::Enum(decl) => decl.span,
            Stmt::Let(decl) => decl.span,
            Stmt::Expr(expr) => expr.span,
            Stmt::Block(block) => block.span,
            Stmt::If { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::For { span, .. } => *span,
            Stmt::Break(span) => *span,
            Stmt::Continue(span) => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::Defer { span, .. } => *span,
            Stmt::Delete { span, .. } => *span,
        }
    }
}
