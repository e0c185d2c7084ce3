//! Builders for syntax trees in tests. Every node gets an empty span unless `at` moves it.

use crate::ast::*;
use crate::source::Span;


pub fn module(name: &str, stmts: Vec<Stmt>) -> Module {
    Module { name: name.into(), path: name.into(), stmts }
}

pub fn pub_(mut stmt: Stmt) -> Stmt {
    match &mut stmt {
        Stmt::Fn(decl) => decl.is_public = true,
        Stmt::Struct(decl) | Stmt::Union(decl) => decl.is_public = true,
        Stmt::Enum(decl) => decl.is_public = true,
        Stmt::Let(decl) => decl.is_public = true,
        _ => {}
    }
    stmt
}

pub fn at(line: u32, col: u32, mut stmt: Stmt) -> Stmt {
    let moved = Span::new(line, col, 1);
    match &mut stmt {
        Stmt::Import(import) => import.span = moved,
        Stmt::Fn(decl) => decl.span = moved,
        Stmt::Struct(decl) | Stmt::Union(decl) => decl.span = moved,
        Stmt::Enum(decl) => decl.span = moved,
        Stmt::Let(decl) => decl.span = moved,
        Stmt::Expr(expr) => expr.span = moved,
        Stmt::Block(block) => block.span = moved,
        Stmt::If { span, .. }
        | Stmt::While { span, .. }
        | Stmt::For { span, .. }
        | Stmt::Return { span, .. }
        | Stmt::Defer { span, .. }
        | Stmt::Delete { span, .. }
        | Stmt::Break(span)
        | Stmt::Continue(span) => *span = moved,
    }
    stmt
}

// declarations

fn record(name: &str, fields: Option<Vec<Field>>) -> RecordDecl {
    RecordDecl { name: name.into(), fields, is_public: false, span: Span::default() }
}

pub fn struct_(name: &str, fields: Vec<Field>) -> Stmt {
    Stmt::Struct(record(name, Some(fields)))
}

pub fn union_(name: &str, fields: Vec<Field>) -> Stmt {
    Stmt::Union(record(name, Some(fields)))
}

pub fn struct_decl(name: &str) -> Stmt {
    Stmt::Struct(record(name, None))
}

pub fn enum_(name: &str, start: Option<Expr>, entries: Vec<&str>) -> Stmt {
    let entries = entries.into_iter().map(|entry| (entry.to_owned(), Span::default())).collect();
    Stmt::Enum(EnumDecl { name: name.into(), start, entries: Some(entries), is_public: false, span: Span::default() })
}

pub fn field(name: &str, ty: TypeExpr) -> Field {
    Field { name: name.into(), ty, span: Span::default() }
}

pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param { name: name.into(), ty, span: Span::default() }
}

fn fn_decl(name: &str, params: Vec<Param>, ret: Option<TypeExpr>, body: Option<Vec<Stmt>>) -> FnDecl {
    FnDecl {
        name: name.into(),
        receiver: None,
        params,
        variadic: false,
        ret,
        body: body.map(body_block),
        is_public: false,
        span: Span::default()
    }
}

pub fn func(name: &str, params: Vec<Param>, ret: Option<TypeExpr>, body: Vec<Stmt>) -> Stmt {
    Stmt::Fn(fn_decl(name, params, ret, Some(body)))
}

pub fn extern_func(name: &str, params: Vec<Param>, ret: Option<TypeExpr>) -> Stmt {
    Stmt::Fn(fn_decl(name, params, ret, None))
}

pub fn method(receiver: &str, name: &str, params: Vec<Param>, ret: Option<TypeExpr>, body: Vec<Stmt>) -> Stmt {
    let mut decl = fn_decl(name, params, ret, Some(body));
    decl.receiver = Some(ty(receiver));
    Stmt::Fn(decl)
}

pub fn import(path: &str, alias: Option<&str>) -> Stmt {
    Stmt::Import(Import { path: path.into(), alias: alias.map(Into::into), items: vec![], span: Span::default() })
}

pub fn import_items(path: &str, items: &[&str]) -> Stmt {
    let items = items.iter().map(|item| (item.to_string(), Span::default())).collect();
    Stmt::Import(Import { path: path.into(), alias: None, items, span: Span::default() })
}

// types

pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::Named { path: name.split('.').map(Into::into).collect(), span: Span::default() }
}

pub fn ptr(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Pointer { inner: Box::new(inner), span: Span::default() }
}

pub fn array(elem: TypeExpr, len: u64) -> TypeExpr {
    TypeExpr::Array { elem: Box::new(elem), len, span: Span::default() }
}

// statements

fn body_block(stmts: Vec<Stmt>) -> Block {
    Block { stmts, span: Span::default() }
}

fn binding(name: &str, ty: Option<TypeExpr>, value: Option<Expr>, mutable: bool) -> Stmt {
    Stmt::Let(Let { name: name.into(), ty, value, mutable, is_public: false, span: Span::default() })
}

pub fn let_(name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
    binding(name, ty, value, false)
}

pub fn let_mut(name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
    binding(name, ty, value, true)
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return { value, span: Span::default() }
}

pub fn expr(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    Stmt::Block(body_block(stmts))
}

pub fn if_(cond: Expr, then_do: Vec<Stmt>, else_do: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If {
        cond,
        then_do: body_block(then_do),
        else_do: else_do.map(|stmts| Box::new(block(stmts))),
        span: Span::default()
    }
}

pub fn while_(cond: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While { cond, body: body_block(body), span: Span::default() }
}

pub fn for_(init: Option<Stmt>, cond: Option<Expr>, step: Option<Expr>, body: Vec<Stmt>) -> Stmt {
    Stmt::For { init: init.map(Box::new), cond, step, body: body_block(body), span: Span::default() }
}

pub fn brk() -> Stmt {
    Stmt::Break(Span::default())
}

pub fn cont() -> Stmt {
    Stmt::Continue(Span::default())
}

pub fn delete(value: Expr) -> Stmt {
    Stmt::Delete { value, span: Span::default() }
}

pub fn defer(stmt: Stmt) -> Stmt {
    Stmt::Defer { stmt: Box::new(stmt), span: Span::default() }
}

// expressions

fn node(kind: ExprKind) -> Expr {
    Expr { kind, span: Span::default() }
}

pub fn ident(name: &str) -> Expr {
    node(ExprKind::Ident(name.into()))
}

pub fn int(value: u64) -> Expr {
    node(ExprKind::Int(value))
}

pub fn float(value: f64) -> Expr {
    node(ExprKind::Float(value))
}

pub fn boolean(value: bool) -> Expr {
    node(ExprKind::Bool(value))
}

pub fn string(value: &str) -> Expr {
    node(ExprKind::Str(value.into()))
}

pub fn null() -> Expr {
    node(ExprKind::Null)
}

pub fn undefined() -> Expr {
    node(ExprKind::Undefined)
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    node(ExprKind::Call { callee: Box::new(callee), args })
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    node(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    node(ExprKind::Unary { op, operand: Box::new(operand) })
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    node(ExprKind::Assign { target: Box::new(target), value: Box::new(value) })
}

pub fn access(left: Expr, right: Expr) -> Expr {
    node(ExprKind::Access { left: Box::new(left), right: Box::new(right) })
}

pub fn init(ty: TypeExpr, fields: Vec<(&str, Expr)>) -> Expr {
    let fields = fields.into_iter()
        .map(|(name, value)| FieldInit { name: name.into(), value, span: Span::default() })
        .collect();
    node(ExprKind::Init { ty, fields })
}

pub fn cast(value: Expr, ty: TypeExpr) -> Expr {
    node(ExprKind::As { value: Box::new(value), ty })
}

pub fn new_(ty: TypeExpr) -> Expr {
    node(ExprKind::New(ty))
}

pub fn sizeof(ty: TypeExpr) -> Expr {
    node(ExprKind::Sizeof(ty))
}

pub fn index(base: Expr, index: Expr) -> Expr {
    node(ExprKind::Index { base: Box::new(base), index: Box::new(index) })
}
