use indexmap::IndexMap;
use crate::ast;
use crate::error::Error;
use crate::lowering::hir;
use crate::lowering::scope::{FunctionInfo, FunctionKey, GlobalInfo, GlobalKey, Storage, Symbol};
use crate::lowering::types::{FunctionType, Type};
use crate::lowering::type_check as tc;
use crate::lowering::type_check::check_bodies::ResolveContext;
use crate::lowering::type_check::collect_types::CollectedTypes;
use crate::source::HasSpan;


pub(super) struct CollectedFunctions<'a> {
    pub ast: &'a ast::Module,
    /// Statement index of each accepted function declaration.
    pub functions: IndexMap<usize, FunctionKey>,
    pub globals: Vec<hir::GlobalInit>,
}

/// Registers function and method signatures, then globals. Globals with a declared type are
/// registered before any initializer is checked; the rest as their initializer is reached.
pub(super) fn collect_functions<'a>(checker: &mut tc::TypeCheck, collected: CollectedTypes<'a>) -> CollectedFunctions<'a> {
    let CollectedTypes { ast, .. } = collected;

    let mut functions = IndexMap::new();
    for (index, stmt) in ast.stmts.iter().enumerate() {
        if let ast::Stmt::Fn(decl) = stmt {
            if let Some(key) = collect_function(checker, decl) {
                functions.insert(index, key);
            }
        }
    }

    let lets: Vec<&ast::Let> = ast.stmts.iter()
        .filter_map(|stmt| match stmt {
            ast::Stmt::Let(decl) => Some(decl),
            _ => None
        })
        .collect();
    let root = checker.root();
    let typed: Vec<Option<(GlobalKey, Type)>> = lets.iter()
        .map(|decl| {
            let ty = decl.ty.as_ref()?;
            let ty = checker.resolve_sized_type(root, ty, |ty| Error::UnsizedVariable { ty });
            Some((declare_global(checker, decl, ty.clone()), ty))
        })
        .collect();

    let mut globals = Vec::new();
    for (decl, typed) in lets.into_iter().zip(typed) {
        let mut ctx = ResolveContext::new(checker, root, None);
        let init = match typed {
            Some((global, ty)) => hir::GlobalInit { global, value: ctx.check_initializer(decl, Some(ty)).1 },
            None => {
                let (ty, value) = ctx.check_initializer(decl, None);
                hir::GlobalInit { global: declare_global(checker, decl, ty), value }
            }
        };
        globals.push(init);
    }

    CollectedFunctions { ast, functions, globals }
}

fn collect_function(checker: &mut tc::TypeCheck, decl: &ast::FnDecl) -> Option<FunctionKey> {
    let root = checker.root();
    let params: Vec<Type> = decl.params.iter()
        .map(|param| checker.resolve_sized_type(root, &param.ty, |_| Error::UnsizedParam))
        .collect();
    let ret = match &decl.ret {
        Some(ret) => {
            let resolved = checker.resolve_type(root, ret);
            if resolved != Type::Void && !resolved.is_error() && !checker.universe.is_complete(&resolved) {
                let ty = checker.display(&resolved);
                checker.push_error(Error::IncompleteType { ty }, ret.span());
                Type::Error
            } else {
                resolved
            }
        }
        None => Type::Void
    };
    let ty = FunctionType { params, ret: Box::new(ret), variadic: decl.variadic };

    let Some(receiver) = &decl.receiver else {
        let key = checker.universe.functions.insert(FunctionInfo {
            name: decl.name.clone(),
            module: checker.module,
            ty,
            receiver: None,
            is_public: decl.is_public,
            is_extern: decl.body.is_none(),
            span: decl.span
        });
        return checker.declare(root, &decl.name, Symbol::Function(key), decl.span).then_some(key);
    };

    let receiver_ty = checker.resolve_type(root, receiver);
    if receiver_ty.is_error() {
        return None;
    }
    let Some(decl_key) = receiver_ty.decl() else {
        let ty = checker.display(&receiver_ty);
        checker.push_error(Error::InvalidReceiver { method: decl.name.clone(), ty }, receiver.span());
        return None;
    };

    let type_decl = &checker.universe.decls[decl_key];
    if type_decl.module != checker.module {
        let error = Error::MethodOutsideTypeModule { ty: type_decl.qualified_name(), module: type_decl.module_name.clone() };
        checker.push_error(error, decl.span);
        return None;
    }

    let takes_self = match (decl.params.first(), ty.params.first()) {
        (Some(first), Some(first_ty)) => {
            first.name == "self" && (*first_ty == receiver_ty || first_ty.pointee() == Some(&receiver_ty))
        }
        _ => false
    };
    if !takes_self {
        let ty = checker.display(&receiver_ty);
        checker.push_error(Error::InvalidReceiver { method: decl.name.clone(), ty }, decl.span);
        return None;
    }

    let type_decl = &checker.universe.decls[decl_key];
    if type_decl.methods.contains_key(&decl.name) {
        let name = format!("{}.{}", type_decl.name, decl.name);
        checker.push_error(Error::DuplicateDefinition { name }, decl.span);
        return None;
    }

    let key = checker.universe.functions.insert(FunctionInfo {
        name: decl.name.clone(),
        module: checker.module,
        ty,
        receiver: Some(decl_key),
        is_public: decl.is_public,
        is_extern: decl.body.is_none(),
        span: decl.span
    });
    checker.universe.decls[decl_key].methods.insert(decl.name.clone(), key);
    Some(key)
}

fn declare_global(checker: &mut tc::TypeCheck, decl: &ast::Let, ty: Type) -> GlobalKey {
    let root = checker.root();
    let key = checker.universe.globals.insert(GlobalInfo {
        name: decl.name.clone(),
        module: checker.module,
        ty: ty.clone(),
        mutable: decl.mutable,
        is_public: decl.is_public
    });
    let symbol = Symbol::Variable { ty, mutable: decl.mutable, storage: Storage::Global(key), is_public: decl.is_public };
    checker.declare(root, &decl.name, symbol, decl.span);
    key
}
