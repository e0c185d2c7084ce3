//! The checked tree. Every expression carries its resolved type, every name is replaced by
//! the key of what it refers to, and operators are already resolved to their typed forms.

use slotmap::{new_key_type, SlotMap};
use crate::lowering::scope::{FunctionKey, GlobalKey};
use crate::lowering::types::{CastKind, FloatType, IntType, ModuleKey, Type};
use crate::source::Span;

new_key_type! {
    pub struct LocalKey;
}

#[derive(Debug)]
pub struct Module {
    pub key: ModuleKey,
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalInit>
}

#[derive(Debug)]
pub struct GlobalInit {
    pub global: GlobalKey,
    pub value: Option<Expr>
}

#[derive(Debug)]
pub struct Function {
    pub key: FunctionKey,
    pub params: Vec<LocalKey>,
    pub ret: Type,
    pub locals: SlotMap<LocalKey, LocalInfo>,
    pub body: Block
}

#[derive(Clone, Debug)]
pub struct LocalInfo {
    pub name: String,
    pub ty: Type,
    pub mutable: bool
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let { local: LocalKey, value: Option<Expr>, span: Span },
    Expr(Expr),
    Block(Block),
    If { cond: Expr, then_do: Block, else_do: Option<Box<Stmt>>, span: Span },
    While { cond: Expr, body: Block, span: Span },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Expr>, body: Block, span: Span },
    Break(Span),
    Continue(Span),
    Return { value: Option<Expr>, span: Span },
    Defer { stmt: Box<Stmt>, span: Span },
    Delete { value: Expr, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// The two's-complement bits of the value, so `u64` values above `i64::MAX` are negative here.
    Int(i64, IntType),
    Float(f64, FloatType),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
    Undefined,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add, Sub, Mul, Div, Mod,
    Lt, Le, Gt, Ge, Eq, Ne,
    /// `pointer + integer`, scaled by the pointee size.
    AddScalar,
    SubScalar,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LogicalOp {
    And,
    Or
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Error,
    Const(Constant),
    Local(LocalKey),
    Global(GlobalKey),
    Function(FunctionKey),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Logical { op: LogicalOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Deref(Box<Expr>),
    Ref(Box<Expr>),
    Assign { target: Box<Expr>, value: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `through_ptr` is set when `base` is a pointer to the record rather than the record itself.
    Field { base: Box<Expr>, index: u32, through_ptr: bool },
    Index { base: Box<Expr>, index: Box<Expr>, through_ptr: bool },
    Init { fields: Vec<(u32, Expr)> },
    New(Type),
    Sizeof(Type),
    Cast { kind: CastKind, value: Box<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> Expr {
        Expr { kind, ty, span }
    }

    pub fn error(span: Span) -> Expr {
        Expr { kind: ExprKind::Error, ty: Type::Error, span }
    }

    /// Whether the expression names a storage location.
    pub fn is_place(&self) -> bool {
        match &self.kind {
            ExprKind::Local(_) | ExprKind::Global(_) | ExprKind::Deref(_) => true,
            ExprKind::Field { base, through_ptr, .. } | ExprKind::Index { base, through_ptr, .. } => {
                *through_ptr || base.is_place()
            }
            _ => false
        }
    }
}
