use indexmap::IndexMap;
use crate::ast;
use crate::compiler::is_builtin_module;
use crate::error::Error;
use crate::lowering::scope::{self, Member, Symbol};
use crate::lowering::types::{DeclBody, DeclKey, EnumBody, IntType, Type, TypeDecl};
use crate::lowering::type_check as tc;
use crate::source::{HasSpan, Span};


pub(super) struct CollectedTypes<'a> {
    pub ast: &'a ast::Module,
    pub decls: Vec<DeclKey>,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum DeclKind {
    Struct,
    Union,
    Enum
}

impl DeclKind {
    fn empty_body(self) -> DeclBody {
        match self {
            DeclKind::Struct => DeclBody::Struct(None),
            DeclKind::Union => DeclBody::Union(None),
            DeclKind::Enum => DeclBody::Enum(None),
        }
    }

    fn of(body: &DeclBody) -> DeclKind {
        match body {
            DeclBody::Struct(_) => DeclKind::Struct,
            DeclBody::Union(_) => DeclKind::Union,
            DeclBody::Enum(_) => DeclKind::Enum,
        }
    }
}

/// Binds imports, registers every declared type name, and then fills in the bodies, so
/// fields may refer to types declared later in the module.
pub(super) fn collect_types<'a>(checker: &mut tc::TypeCheck, ast: &'a ast::Module) -> CollectedTypes<'a> {
    for stmt in &ast.stmts {
        if let ast::Stmt::Import(import) = stmt {
            collect_import(checker, import);
        }
    }

    let mut decls = Vec::new();
    let mut bodies: Vec<(DeclKey, &'a ast::Stmt)> = Vec::new();
    for stmt in &ast.stmts {
        let (kind, name, is_public, has_body, span) = match stmt {
            ast::Stmt::Struct(decl) => (DeclKind::Struct, &decl.name, decl.is_public, decl.fields.is_some(), decl.span),
            ast::Stmt::Union(decl) => (DeclKind::Union, &decl.name, decl.is_public, decl.fields.is_some(), decl.span),
            ast::Stmt::Enum(decl) => (DeclKind::Enum, &decl.name, decl.is_public, decl.entries.is_some(), decl.span),
            _ => continue
        };

        let Some(key) = declare_type(checker, kind, name, is_public, span) else {
            continue;
        };
        if !decls.contains(&key) {
            decls.push(key);
        }
        if has_body {
            bodies.push((key, stmt));
        }
    }

    let mut defined: Vec<DeclKey> = Vec::new();
    let mut fields: Vec<(Type, Span)> = Vec::new();
    for (key, stmt) in bodies {
        if defined.contains(&key) {
            let name = checker.universe.decls[key].name.clone();
            checker.push_error(Error::DuplicateDefinition { name }, stmt.span());
            continue;
        }
        defined.push(key);

        let body = match stmt {
            ast::Stmt::Struct(decl) => DeclBody::Struct(Some(collect_fields(checker, decl, &mut fields))),
            ast::Stmt::Union(decl) => DeclBody::Union(Some(collect_fields(checker, decl, &mut fields))),
            ast::Stmt::Enum(decl) => DeclBody::Enum(Some(collect_enum(checker, key, decl))),
            _ => continue
        };
        checker.universe.decls[key].body = body;
    }

    for (ty, span) in fields {
        if !ty.is_error() && !checker.universe.is_complete(&ty) {
            checker.push_error(Error::UnsizedField, span);
        }
    }
    for key in defined {
        let decl = &checker.universe.decls[key];
        let (ty, span) = (decl.as_type(key), decl.span);
        if checker.universe.is_recursive(key) {
            let error = Error::RecursiveType { ty: decl.qualified_name() };
            checker.push_error(error, span);
        } else {
            checker.check_size(ty, span);
        }
    }

    CollectedTypes { ast, decls }
}

fn collect_import(checker: &mut tc::TypeCheck, import: &ast::Import) {
    let root = checker.root();
    let found = checker.universe.module_by_path(&import.path)
        .filter(|key| checker.universe.modules[*key].checked);
    let Some(key) = found else {
        let builtin = is_builtin_module(&import.path);
        checker.push_error(Error::UnknownModule { path: import.path.clone(), builtin }, import.span);
        return;
    };

    let module = Symbol::Module { key, path: import.path.clone(), is_public: false };
    checker.declare(root, import.binding(), module.clone(), import.span);

    for (item, span) in &import.items {
        match scope::resolve_member(checker.universe, checker.module, &Member::Symbol(module.clone()), item) {
            Ok(Member::Symbol(symbol)) => {
                let symbol = match symbol {
                    Symbol::Variable { ty, mutable, storage, .. } => Symbol::Variable { ty, mutable, storage, is_public: false },
                    Symbol::TypeDecl { ty, .. } => Symbol::TypeDecl { ty, is_public: false },
                    Symbol::Module { key, path, .. } => Symbol::Module { key, path, is_public: false },
                    function @ Symbol::Function(_) => function,
                };
                checker.declare(root, item, symbol, *span);
            }
            Ok(Member::EnumEntry { .. }) => {}
            Err(error) => checker.push_error(error, *span)
        }
    }
}

/// Registers a type name, pairing a forward declaration with its later definition.
fn declare_type(checker: &mut tc::TypeCheck, kind: DeclKind, name: &str, is_public: bool, span: Span) -> Option<DeclKey> {
    let root = checker.root();
    if let Some(existing) = checker.scopes.get_local(root, name).cloned() {
        if let Symbol::TypeDecl { ty, .. } = existing {
            if let Some(key) = ty.decl() {
                let decl = &mut checker.universe.decls[key];
                if decl.module == checker.module && DeclKind::of(&decl.body) == kind {
                    decl.is_public |= is_public;
                    let symbol = Symbol::TypeDecl { ty, is_public: decl.is_public };
                    checker.scopes.redeclare(root, name, symbol);
                    return Some(key);
                }
            }
        }
        checker.push_error(Error::DuplicateDefinition { name: name.to_owned() }, span);
        return None;
    }

    let key = checker.universe.decls.insert(TypeDecl {
        name: name.to_owned(),
        module: checker.module,
        module_name: checker.module_name.clone(),
        is_public,
        body: kind.empty_body(),
        methods: IndexMap::new(),
        span
    });
    let ty = checker.universe.decls[key].as_type(key);
    checker.declare(root, name, Symbol::TypeDecl { ty, is_public }, span);
    Some(key)
}

fn collect_fields(checker: &mut tc::TypeCheck, decl: &ast::RecordDecl, seen: &mut Vec<(Type, Span)>) -> IndexMap<String, Type> {
    let root = checker.root();
    let mut fields = IndexMap::new();
    for field in decl.fields.iter().flatten() {
        let ty = checker.resolve_type(root, &field.ty);
        if fields.contains_key(&field.name) {
            checker.push_error(Error::DuplicateDefinition { name: field.name.clone() }, field.span);
            continue;
        }
        seen.push((ty.clone(), field.ty.span()));
        fields.insert(field.name.clone(), ty);
    }
    fields
}

fn collect_enum(checker: &mut tc::TypeCheck, key: DeclKey, decl: &ast::EnumDecl) -> EnumBody {
    let qualified = checker.universe.decls[key].qualified_name();
    let (backing, start) = match &decl.start {
        Some(start) => enum_start(checker, start, &qualified),
        None => (IntType::I32, 0)
    };

    let mut entries = IndexMap::new();
    let mut next = start;
    let mut reported = false;
    for (entry, span) in decl.entries.iter().flatten() {
        if entries.contains_key(entry) {
            checker.push_error(Error::DuplicateEnumEntry { entry: entry.clone(), ty: qualified.clone() }, *span);
            continue;
        }
        if !backing.contains(next) && !reported {
            let error = Error::EnumValueOutOfRange { value: next, ty: qualified.clone(), backing: checker.display(&Type::Int(backing)) };
            checker.push_error(error, *span);
            reported = true;
        }
        entries.insert(entry.clone(), next as i64);
        next += 1;
    }
    EnumBody { backing, entries }
}

/// The start value must be an integer literal, optionally negated or cast to the backing type.
fn enum_start(checker: &mut tc::TypeCheck, start: &ast::Expr, qualified: &str) -> (IntType, i128) {
    match &start.kind {
        ast::ExprKind::Int(value) => (IntType::I32, *value as i128),
        ast::ExprKind::Unary { op: ast::UnaryOp::Neg, operand } if matches!(operand.kind, ast::ExprKind::Int(_)) => {
            let (backing, value) = enum_start(checker, operand, qualified);
            (backing, -value)
        }
        ast::ExprKind::As { value, ty } => {
            let root = checker.root();
            let (_, start) = enum_start(checker, value, qualified);
            match checker.resolve_type(root, ty) {
                Type::Int(backing) => (backing, start),
                Type::Error => (IntType::I32, start),
                other => {
                    let got = checker.display(&other);
                    checker.push_error(Error::InvalidEnumStartType { got, ty: qualified.to_owned() }, ty.span());
                    (IntType::I32, start)
                }
            }
        }
        literal @ (ast::ExprKind::Float(_) | ast::ExprKind::Bool(_) | ast::ExprKind::Char(_) | ast::ExprKind::Str(_) | ast::ExprKind::Null) => {
            let got = match literal {
                ast::ExprKind::Float(_) => "f64",
                ast::ExprKind::Bool(_) => "bool",
                ast::ExprKind::Char(_) => "char",
                ast::ExprKind::Str(_) => "string",
                _ => "*void"
            };
            checker.push_error(Error::InvalidEnumStartType { got: got.to_owned(), ty: qualified.to_owned() }, start.span);
            (IntType::I32, 0)
        }
        _ => {
            checker.push_error(Error::EnumStartNotConstant { ty: qualified.to_owned() }, start.span);
            (IntType::I32, 0)
        }
    }
}
