use slotmap::SlotMap;
use tracing::debug;
use crate::ast;
use crate::error::{Diagnostic, Error};
use crate::lowering::hir::{self, LocalKey};
use crate::lowering::scope::{FunctionKey, ScopeKey, Storage, Symbol};
use crate::lowering::types::{assignable, CastKind, Type};
use crate::lowering::type_check as tc;
use crate::lowering::type_check::collect_functions::CollectedFunctions;
use crate::source::HasSpan;


pub(super) fn check_bodies(mut checker: tc::TypeCheck, collected: CollectedFunctions) -> Result<hir::Module, Vec<Diagnostic>> {
    let CollectedFunctions { ast, functions, globals } = collected;

    let mut checked = Vec::new();
    for (index, stmt) in ast.stmts.iter().enumerate() {
        match stmt {
            ast::Stmt::Fn(decl) => {
                if let Some(key) = functions.get(&index) {
                    if let Some(function) = check_function(&mut checker, *key, decl) {
                        checked.push(function);
                    }
                }
            }
            ast::Stmt::Import(_) | ast::Stmt::Struct(_) | ast::Stmt::Union(_) | ast::Stmt::Enum(_) | ast::Stmt::Let(_) => {}
            ast::Stmt::Return { span, .. } => checker.push_error(Error::ReturnOutsideOfFunc, *span),
            ast::Stmt::Break(span) => checker.push_error(Error::OutsideOfLoop { what: "Break" }, *span),
            ast::Stmt::Continue(span) => checker.push_error(Error::OutsideOfLoop { what: "Continue" }, *span),
            other => checker.push_error(Error::NotAllowedInGlobalScope, other.span()),
        }
    }

    let key = checker.module;
    let name = checker.module_name.clone();
    let errors = checker.finalize();
    debug!(module = %name, diagnostics = errors.len(), "checked module");
    if errors.is_empty() {
        Ok(hir::Module { key, name, functions: checked, globals })
    } else {
        Err(errors)
    }
}

fn check_function(checker: &mut tc::TypeCheck, key: FunctionKey, decl: &ast::FnDecl) -> Option<hir::Function> {
    let body = decl.body.as_ref()?;
    let fn_type = checker.universe.functions[key].ty.clone();
    let ret = (*fn_type.ret).clone();

    let root = checker.root();
    let scope = checker.scopes.push(root);
    let mut ctx = ResolveContext::new(checker, scope, Some(ret.clone()));

    let mut params = Vec::new();
    for (param, ty) in decl.params.iter().zip(&fn_type.params) {
        params.push(ctx.declare_local(&param.name, ty.clone(), true, param.span));
    }
    let stmts = body.stmts.iter().filter_map(|stmt| ctx.check_stmt(stmt)).collect();
    let body = hir::Block { stmts, span: body.span };
    let locals = ctx.locals;

    if ret != Type::Void && !ret.is_error() && !always_returns(&body.stmts) {
        checker.push_error(Error::MissingReturn { function: decl.name.clone() }, decl.span);
    }
    checker.scopes.pop(scope);

    Some(hir::Function { key, params, ret, locals, body })
}

fn always_returns(stmts: &[hir::Stmt]) -> bool {
    stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &hir::Stmt) -> bool {
    match stmt {
        hir::Stmt::Return { .. } => true,
        hir::Stmt::Block(block) => always_returns(&block.stmts),
        hir::Stmt::If { then_do, else_do: Some(else_do), .. } => always_returns(&then_do.stmts) && stmt_returns(else_do),
        hir::Stmt::While { cond, body, .. } => is_const_true(cond) && !breaks_out(&body.stmts),
        hir::Stmt::For { cond: None, body, .. } => !breaks_out(&body.stmts),
        hir::Stmt::For { cond: Some(cond), body, .. } => is_const_true(cond) && !breaks_out(&body.stmts),
        _ => false
    }
}

fn is_const_true(expr: &hir::Expr) -> bool {
    matches!(expr.kind, hir::ExprKind::Const(hir::Constant::Bool(true)))
}

/// Whether a `break` in `stmts` leaves the loop that directly contains them.
fn breaks_out(stmts: &[hir::Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        hir::Stmt::Break(_) => true,
        hir::Stmt::Block(block) => breaks_out(&block.stmts),
        hir::Stmt::If { then_do, else_do, .. } => {
            breaks_out(&then_do.stmts) || else_do.as_ref().is_some_and(|s| breaks_out(std::slice::from_ref(s.as_ref())))
        }
        _ => false
    })
}


pub(super) struct ResolveContext<'c, 'u> {
    pub checker: &'c mut tc::TypeCheck<'u>,
    pub scope: ScopeKey,
    /// The declared return type, or `None` when checking a global initializer.
    pub ret: Option<Type>,
    pub locals: SlotMap<LocalKey, hir::LocalInfo>,
    loops: usize,
    /// The loop depth at the innermost `defer`, if inside one.
    defer_depth: Option<usize>,
}

impl<'c, 'u> ResolveContext<'c, 'u> {
    pub fn new(checker: &'c mut tc::TypeCheck<'u>, scope: ScopeKey, ret: Option<Type>) -> ResolveContext<'c, 'u> {
        ResolveContext {
            checker, scope, ret,
            locals: SlotMap::with_key(),
            loops: 0,
            defer_depth: None
        }
    }

    pub fn push_error(&mut self, error: Error, span: crate::source::Span) {
        self.checker.push_error(error, span)
    }

    pub fn display(&self, ty: &Type) -> String {
        self.checker.display(ty)
    }

    pub fn declare_local(&mut self, name: &str, ty: Type, mutable: bool, span: crate::source::Span) -> LocalKey {
        let key = self.locals.insert(hir::LocalInfo { name: name.to_owned(), ty: ty.clone(), mutable });
        let symbol = Symbol::Variable { ty, mutable, storage: Storage::Local(key), is_public: false };
        self.checker.declare(self.scope, name, symbol, span);
        key
    }

    /// Inserts an implicit pointer conversion when `value` is assignable to `to` but not equal.
    pub fn coerce(&self, value: hir::Expr, to: &Type) -> hir::Expr {
        if value.ty == *to || value.ty.is_error() || to.is_error() {
            return value;
        }
        if value.ty.pointee().is_some() && to.pointee().is_some() {
            let span = value.span;
            return hir::Expr::new(hir::ExprKind::Cast { kind: CastKind::Bitcast, value: Box::new(value) }, to.clone(), span);
        }
        value
    }

    /// The type and checked initializer of a `let`, shared by locals and globals.
    pub fn check_binding(&mut self, decl: &ast::Let) -> (Type, Option<hir::Expr>) {
        let declared = decl.ty.as_ref()
            .map(|ty| self.checker.resolve_sized_type(self.scope, ty, |ty| Error::UnsizedVariable { ty }));
        self.check_initializer(decl, declared)
    }

    /// Checks the initializer of `decl` against its already resolved annotation, if any.
    pub fn check_initializer(&mut self, decl: &ast::Let, declared: Option<Type>) -> (Type, Option<hir::Expr>) {
        let value = decl.value.as_ref().map(|value| self.check_expr(value, declared.as_ref()));

        match (declared, value) {
            (Some(declared), Some(value)) => {
                if !assignable(&value.ty, &declared) {
                    let error = Error::VarDeclTypeMismatch { declared: self.display(&declared), init: self.display(&value.ty) };
                    self.push_error(error, value.span);
                    return (declared, None);
                }
                let value = self.coerce(value, &declared);
                (declared, Some(value))
            }
            (Some(declared), None) => (declared, None),
            (None, Some(value)) => {
                if !value.ty.is_error() && !self.checker.universe.is_complete(&value.ty) {
                    let ty = self.display(&value.ty);
                    self.push_error(Error::UnsizedVariable { ty }, value.span);
                    return (Type::Error, None);
                }
                (value.ty.clone(), Some(value))
            }
            (None, None) => {
                self.push_error(Error::CouldNotInferType { name: decl.name.clone() }, decl.span);
                (Type::Error, None)
            }
        }
    }

    pub fn check_block(&mut self, block: &ast::Block) -> hir::Block {
        let outer = self.scope;
        self.scope = self.checker.scopes.push(outer);
        let stmts = block.stmts.iter().filter_map(|stmt| self.check_stmt(stmt)).collect();
        self.checker.scopes.pop(self.scope);
        self.scope = outer;
        hir::Block { stmts, span: block.span }
    }

    fn check_condition(&mut self, cond: &ast::Expr) -> hir::Expr {
        let cond = self.check_expr(cond, Some(&Type::Bool));
        if cond.ty != Type::Bool && !cond.ty.is_error() {
            let got = self.display(&cond.ty);
            self.push_error(Error::InvalidCondition { got }, cond.span);
        }
        cond
    }

    fn check_loop_body(&mut self, body: &ast::Block) -> hir::Block {
        self.loops += 1;
        let body = self.check_block(body);
        self.loops -= 1;
        body
    }

    pub fn check_stmt(&mut self, stmt: &ast::Stmt) -> Option<hir::Stmt> {
        match stmt {
            ast::Stmt::Let(decl) => {
                let (ty, value) = self.check_binding(decl);
                let local = self.declare_local(&decl.name, ty, decl.mutable, decl.span);
                Some(hir::Stmt::Let { local, value, span: decl.span })
            }
            ast::Stmt::Expr(expr) => Some(hir::Stmt::Expr(self.check_expr(expr, None))),
            ast::Stmt::Block(block) => Some(hir::Stmt::Block(self.check_block(block))),
            ast::Stmt::If { cond, then_do, else_do, span } => {
                let cond = self.check_condition(cond);
                let then_do = self.check_block(then_do);
                let else_do = match else_do {
                    Some(else_do) => self.check_stmt(else_do).map(Box::new),
                    None => None
                };
                Some(hir::Stmt::If { cond, then_do, else_do, span: *span })
            }
            ast::Stmt::While { cond, body, span } => {
                let cond = self.check_condition(cond);
                let body = self.check_loop_body(body);
                Some(hir::Stmt::While { cond, body, span: *span })
            }
            ast::Stmt::For { init, cond, step, body, span } => {
                let outer = self.scope;
                self.scope = self.checker.scopes.push(outer);

                let init = match init {
                    Some(init) => self.check_stmt(init).map(Box::new),
                    None => None
                };
                let cond = cond.as_ref().map(|cond| self.check_condition(cond));
                let step = step.as_ref().map(|step| self.check_expr(step, None));
                let body = self.check_loop_body(body);

                self.checker.scopes.pop(self.scope);
                self.scope = outer;
                Some(hir::Stmt::For { init, cond, step, body, span: *span })
            }
            ast::Stmt::Break(span) => self.check_loop_control("Break", *span).then_some(hir::Stmt::Break(*span)),
            ast::Stmt::Continue(span) => self.check_loop_control("Continue", *span).then_some(hir::Stmt::Continue(*span)),
            ast::Stmt::Return { value, span } => self.check_return(value.as_ref(), *span),
            ast::Stmt::Defer { stmt, span } => {
                let outer = self.defer_depth.replace(self.loops);
                let stmt = self.check_stmt(stmt);
                self.defer_depth = outer;
                Some(hir::Stmt::Defer { stmt: Box::new(stmt?), span: *span })
            }
            ast::Stmt::Delete { value, span } => {
                let value = self.check_expr(value, None);
                if value.ty.pointee().is_none() && !value.ty.is_error() {
                    let ty = self.display(&value.ty);
                    self.push_error(Error::DeleteNonPtr { ty }, value.span);
                }
                Some(hir::Stmt::Delete { value, span: *span })
            }
            ast::Stmt::Import(import) => {
                self.push_error(Error::NotAllowedInLocalScope { what: "Importing" }, import.span);
                None
            }
            ast::Stmt::Fn(decl) => {
                self.push_error(Error::NotAllowedInLocalScope { what: "Declaring Functions" }, decl.span);
                None
            }
            ast::Stmt::Struct(decl) => {
                self.push_error(Error::NotAllowedInLocalScope { what: "Declaring Structs" }, decl.span);
                None
            }
            ast::Stmt::Union(decl) => {
                self.push_error(Error::NotAllowedInLocalScope { what: "Declaring Unions" }, decl.span);
                None
            }
            ast::Stmt::Enum(decl) => {
                self.push_error(Error::NotAllowedInLocalScope { what: "Declaring Enums" }, decl.span);
                None
            }
        }
    }

    fn check_loop_control(&mut self, what: &'static str, span: crate::source::Span) -> bool {
        if self.defer_depth == Some(self.loops) {
            self.push_error(Error::ControlFlowInDefer { what }, span);
            false
        } else if self.loops == 0 {
            self.push_error(Error::OutsideOfLoop { what }, span);
            false
        } else {
            true
        }
    }

    fn check_return(&mut self, value: Option<&ast::Expr>, span: crate::source::Span) -> Option<hir::Stmt> {
        if self.defer_depth.is_some() {
            self.push_error(Error::ControlFlowInDefer { what: "Return" }, span);
            return None;
        }
        let Some(ret) = self.ret.clone() else {
            self.push_error(Error::ReturnOutsideOfFunc, span);
            return None;
        };

        // A rejected value still ends the path, so no missing-return error follows it.
        let value = match (value, &ret) {
            (Some(value), Type::Void) => {
                self.check_expr(value, None);
                self.push_error(Error::ReturnValueInVoid, span);
                None
            }
            (Some(value), _) => {
                let value = self.check_expr(value, Some(&ret));
                if !assignable(&value.ty, &ret) {
                    let error = Error::WrongReturnType { expected: self.display(&ret), got: self.display(&value.ty) };
                    self.push_error(error, value.span);
                    None
                } else {
                    Some(self.coerce(value, &ret))
                }
            }
            (None, Type::Void) => None,
            (None, _) => {
                if !ret.is_error() {
                    let expected = self.display(&ret);
                    self.push_error(Error::MissingReturnValue { expected }, span);
                }
                None
            }
        };
        Some(hir::Stmt::Return { value, span })
    }
}
