mod collect_types;
mod collect_functions;
mod check_bodies;
mod check_expr;

use tracing::debug;
use crate::ast;
use crate::compiler::Options;
use crate::error::{Diagnostic, Error};
use crate::lowering::hir;
use crate::lowering::scope::{Member, Scopes, ScopeKey, Symbol};
use crate::lowering::types::{self, FunctionType, ModuleKey, Type, Universe};
use crate::source::{HasSpan, Span};


/// Checks one module whose imports have all been checked already, registering its
/// declarations in `universe` and freezing its top-level symbols there.
pub fn check_module(universe: &mut Universe, options: &Options, module: ModuleKey, ast: &ast::Module) -> Result<hir::Module, Vec<Diagnostic>> {
    debug!(module = %ast.name, statements = ast.stmts.len(), "checking module");
    let mut checker = TypeCheck::new(universe, options, module, &ast.name);

    let collected_types = collect_types::collect_types(&mut checker, ast);
    debug!(module = %ast.name, types = collected_types.decls.len(), "collected types");
    let collected_functions = collect_functions::collect_functions(&mut checker, collected_types);
    debug!(module = %ast.name, functions = collected_functions.functions.len(), "collected functions");
    check_bodies::check_bodies(checker, collected_functions)
}


pub(crate) struct TypeCheck<'u> {
    universe: &'u mut Universe,
    options: &'u Options,
    module: ModuleKey,
    module_name: String,
    scopes: Scopes,

    errors: Vec<Diagnostic>,
}

impl<'u> TypeCheck<'u> {
    fn new(universe: &'u mut Universe, options: &'u Options, module: ModuleKey, module_name: &str) -> TypeCheck<'u> {
        TypeCheck {
            universe, options, module,
            module_name: module_name.to_owned(),
            scopes: Scopes::new(),
            errors: Vec::new()
        }
    }

    fn root(&self) -> ScopeKey {
        self.scopes.root()
    }

    fn push_error(&mut self, error: Error, span: Span) {
        if let Some(max) = self.options.max_diagnostics {
            if self.errors.len() >= max {
                return;
            }
        }
        self.errors.push(Diagnostic::new(error, span));
    }

    fn display(&self, ty: &Type) -> String {
        self.universe.display(ty)
    }

    fn declare(&mut self, scope: ScopeKey, name: &str, symbol: Symbol, span: Span) -> bool {
        match self.scopes.declare(scope, name, symbol) {
            Ok(()) => true,
            Err(error) => {
                self.push_error(error, span);
                false
            }
        }
    }

    fn resolve_type(&mut self, scope: ScopeKey, ty: &ast::TypeExpr) -> Type {
        match ty {
            ast::TypeExpr::Named { path, span } => {
                if let [name] = path.as_slice() {
                    if let Some(primitive) = types::primitive(name) {
                        return primitive;
                    }
                }
                let resolved = self.scopes.resolve_qualified(self.universe, self.module, scope, path);
                match resolved {
                    Ok(Member::Symbol(Symbol::TypeDecl { ty, .. })) => ty,
                    Ok(_) => {
                        self.push_error(Error::NotAType { name: path.join(".") }, *span);
                        Type::Error
                    }
                    Err(error) => {
                        self.push_error(error, *span);
                        Type::Error
                    }
                }
            }
            ast::TypeExpr::Pointer { inner, .. } => Type::ptr(self.resolve_type(scope, inner)),
            ast::TypeExpr::Array { elem, len, .. } => {
                let elem = self.resolve_type(scope, elem);
                if elem.is_error() {
                    return Type::Error;
                }
                let array = Type::Array(Box::new(elem), *len);
                self.check_size(array, ty.span())
            }
            ast::TypeExpr::Function { params, ret, variadic, .. } => {
                let params = params.iter().map(|p| self.resolve_type(scope, p)).collect();
                let ret = match ret {
                    Some(ret) => self.resolve_type(scope, ret),
                    None => Type::Void
                };
                Type::Function(FunctionType { params, ret: Box::new(ret), variadic: *variadic })
            }
        }
    }

    /// Resolves a type that must have a known size, reporting `make_error` otherwise.
    fn resolve_sized_type(&mut self, scope: ScopeKey, ty: &ast::TypeExpr, make_error: impl FnOnce(String) -> Error) -> Type {
        let resolved = self.resolve_type(scope, ty);
        if !resolved.is_error() && !self.universe.is_complete(&resolved) {
            let rendered = self.display(&resolved);
            self.push_error(make_error(rendered), ty.span());
            return Type::Error;
        }
        resolved
    }

    /// Rejects a type whose parts all have a layout but whose total size overflows.
    fn check_size(&mut self, ty: Type, span: Span) -> Type {
        let parts_sized = match &ty {
            Type::Array(elem, _) => self.universe.size_of(elem).is_some(),
            Type::Struct(key) | Type::Union(key) => match self.universe.decls[*key].body.fields() {
                Some(fields) => fields.values().all(|field| self.universe.size_of(field).is_some()),
                None => false
            },
            _ => false
        };
        if parts_sized && self.universe.size_of(&ty).is_none() {
            let rendered = self.display(&ty);
            self.push_error(Error::TypeTooLarge { ty: rendered }, span);
            return Type::Error;
        }
        ty
    }

    fn finalize(self) -> Vec<Diagnostic> {
        let TypeCheck { universe, module, scopes, mut errors, .. } = self;
        let info = &mut universe.modules[module];
        info.symbols = scopes.into_root_symbols();
        info.checked = true;

        errors.sort_by_key(|diag| (diag.span.line, diag.span.col));
        errors
    }
}
