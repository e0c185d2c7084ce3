use crate::ast;
use crate::error::Error;
use crate::lowering::hir::{self, Constant, ExprKind};
use crate::lowering::scope::{self, Member, Storage, Symbol};
use crate::lowering::types::{assignable, cast_kind, DeclKey, FloatType, IntType, Type};
use crate::lowering::type_check::check_bodies::ResolveContext;
use crate::source::Span;


/// An element of an access chain: either a value, or a type or module still being walked into.
enum Operand {
    Value(hir::Expr),
    Member(Member),
}

impl<'c, 'u> ResolveContext<'c, 'u> {
    /// Checks `expr`. `expected` only guides literals, it is never enforced here.
    pub fn check_expr(&mut self, expr: &ast::Expr, expected: Option<&Type>) -> hir::Expr {
        let span = expr.span;
        match &expr.kind {
            ast::ExprKind::Int(value) => self.int_literal(*value as i128, expected, span),
            ast::ExprKind::Float(value) => {
                let float = match expected {
                    Some(Type::Float(float)) => *float,
                    _ => FloatType { bits: 64 }
                };
                constant(Constant::Float(*value, float), Type::Float(float), span)
            }
            ast::ExprKind::Bool(value) => constant(Constant::Bool(*value), Type::Bool, span),
            ast::ExprKind::Char(value) => constant(Constant::Char(*value), Type::Char, span),
            ast::ExprKind::Str(value) => constant(Constant::Str(value.clone()), Type::String, span),
            ast::ExprKind::Null => constant(Constant::Null, Type::void_ptr(), span),
            ast::ExprKind::Undefined => match expected {
                Some(ty) => constant(Constant::Undefined, ty.clone(), span),
                None => {
                    self.push_error(Error::CouldNotInferType { name: "undefined".into() }, span);
                    hir::Expr::error(span)
                }
            },
            ast::ExprKind::Ident(name) => {
                match self.checker.scopes.resolve(self.scope, name).cloned() {
                    Ok(symbol) => self.symbol_value(name, symbol, span),
                    Err(error) => {
                        self.push_error(error, span);
                        hir::Expr::error(span)
                    }
                }
            }
            ast::ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, expected, span),
            ast::ExprKind::Unary { op, operand } => match (op, &operand.kind) {
                (ast::UnaryOp::Neg, ast::ExprKind::Int(value)) => self.int_literal(-(*value as i128), expected, span),
                _ => self.check_unary(*op, operand, expected, span)
            },
            ast::ExprKind::Assign { target, value } => self.check_assign(target, value, span),
            ast::ExprKind::Call { callee, args } => {
                let callee = self.check_expr(callee, None);
                self.check_call(callee, Vec::new(), args, span)
            }
            ast::ExprKind::Access { .. } => match self.check_chain(expr) {
                Some(Operand::Value(value)) => value,
                Some(Operand::Member(member)) => {
                    let name = match &member {
                        Member::Symbol(Symbol::Module { path, .. }) => path.clone(),
                        Member::Symbol(Symbol::TypeDecl { ty, .. }) => self.display(ty),
                        _ => String::new()
                    };
                    self.push_error(Error::UsingOpOnTyDecl { name }, span);
                    hir::Expr::error(span)
                }
                None => hir::Expr::error(span)
            },
            ast::ExprKind::Init { ty, fields } => self.check_init(ty, fields, span),
            ast::ExprKind::As { value, ty } => {
                let target = self.checker.resolve_type(self.scope, ty);
                let value = self.check_expr(value, Some(&target));
                if value.ty.is_error() || target.is_error() {
                    return hir::Expr::error(span);
                }
                if value.ty == target {
                    return hir::Expr { span, ..value };
                }
                match cast_kind(&value.ty, &target) {
                    Some(kind) => hir::Expr::new(ExprKind::Cast { kind, value: Box::new(value) }, target, span),
                    None => {
                        let error = Error::InvalidCast { from: self.display(&value.ty), to: self.display(&target) };
                        self.push_error(error, span);
                        hir::Expr::error(span)
                    }
                }
            }
            ast::ExprKind::New(ty) => {
                let ty = self.checker.resolve_type(self.scope, ty);
                if ty.is_error() {
                    return hir::Expr::error(span);
                }
                if !self.checker.universe.is_complete(&ty) {
                    let ty = self.display(&ty);
                    self.push_error(Error::IncompleteType { ty }, span);
                    return hir::Expr::error(span);
                }
                hir::Expr::new(ExprKind::New(ty.clone()), Type::ptr(ty), span)
            }
            ast::ExprKind::Sizeof(ty) => {
                let ty = self.checker.resolve_type(self.scope, ty);
                if ty.is_error() {
                    return hir::Expr::error(span);
                }
                if !self.checker.universe.is_complete(&ty) {
                    let ty = self.display(&ty);
                    self.push_error(Error::UnsizedSizeof { ty }, span);
                    return hir::Expr::error(span);
                }
                hir::Expr::new(ExprKind::Sizeof(ty), Type::Int(IntType::U64), span)
            }
            ast::ExprKind::Index { base, index } => self.check_index(base, index, span),
        }
    }

    /// Types an integer literal, folding in a leading minus sign. Without an integer
    /// expectation the literal is the first of `i32`, `i64` and `u64` that holds it.
    fn int_literal(&mut self, value: i128, expected: Option<&Type>, span: Span) -> hir::Expr {
        let int = match expected {
            Some(Type::Float(float)) => return constant(Constant::Float(value as f64, *float), Type::Float(*float), span),
            Some(Type::Int(int)) => *int,
            _ => [IntType::I32, IntType::I64, IntType::U64].into_iter()
                .find(|int| int.contains(value))
                .unwrap_or(IntType::I64)
        };
        if !int.contains(value) {
            let ty = self.display(&Type::Int(int));
            self.push_error(Error::IntLiteralOutOfRange { value, ty }, span);
            return hir::Expr::error(span);
        }
        constant(Constant::Int(value as i64, int), Type::Int(int), span)
    }

    fn symbol_value(&mut self, name: &str, symbol: Symbol, span: Span) -> hir::Expr {
        match symbol {
            Symbol::Variable { ty, storage: Storage::Local(key), .. } => hir::Expr::new(ExprKind::Local(key), ty, span),
            Symbol::Variable { ty, storage: Storage::Global(key), .. } => hir::Expr::new(ExprKind::Global(key), ty, span),
            Symbol::Function(key) => {
                let ty = Type::Function(self.checker.universe.functions[key].ty.clone());
                hir::Expr::new(ExprKind::Function(key), ty, span)
            }
            Symbol::TypeDecl { .. } | Symbol::Module { .. } => {
                self.push_error(Error::UsingOpOnTyDecl { name: name.to_owned() }, span);
                hir::Expr::error(span)
            }
        }
    }

    fn enum_entry(&self, decl: DeclKey, value: i64, span: Span) -> hir::Expr {
        let backing = self.checker.universe.enum_body(decl)
            .map(|body| body.backing)
            .unwrap_or(IntType::I32);
        constant(Constant::Int(value, backing), Type::Enum(decl), span)
    }

    fn check_binary(&mut self, op: ast::BinaryOp, lhs: &ast::Expr, rhs: &ast::Expr, expected: Option<&Type>, span: Span) -> hir::Expr {
        if let ast::BinaryOp::And | ast::BinaryOp::Or = op {
            let lhs = self.check_expr(lhs, Some(&Type::Bool));
            let rhs = self.check_expr(rhs, Some(&Type::Bool));
            if lhs.ty.is_error() || rhs.ty.is_error() {
                return hir::Expr::error(span);
            }
            if lhs.ty != Type::Bool || rhs.ty != Type::Bool {
                return self.invalid_operands(&lhs, &rhs, span);
            }
            let op = if op == ast::BinaryOp::And { hir::LogicalOp::And } else { hir::LogicalOp::Or };
            return hir::Expr::new(ExprKind::Logical { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, Type::Bool, span);
        }

        // A literal operand takes the type of the other side.
        let (lhs, rhs) = if lhs.kind.is_numeric_literal() && !rhs.kind.is_numeric_literal() {
            let rhs = self.check_expr(rhs, None);
            let lhs = self.check_expr(lhs, Some(&rhs.ty));
            (lhs, rhs)
        } else {
            let hint = expected.filter(|ty| ty.is_numeric() && is_arithmetic(op));
            let lhs = self.check_expr(lhs, hint);
            let rhs = self.check_expr(rhs, Some(&lhs.ty));
            (lhs, rhs)
        };
        if lhs.ty.is_error() || rhs.ty.is_error() {
            return hir::Expr::error(span);
        }

        if is_arithmetic(op) {
            self.check_arithmetic(op, lhs, rhs, span)
        } else {
            self.check_comparison(op, lhs, rhs, span)
        }
    }

    fn check_arithmetic(&mut self, op: ast::BinaryOp, lhs: hir::Expr, rhs: hir::Expr, span: Span) -> hir::Expr {
        match (&lhs.ty, &rhs.ty) {
            (Type::Pointer(pointee), Type::Int(_)) if matches!(op, ast::BinaryOp::Add | ast::BinaryOp::Sub) && self.checker.universe.is_complete(pointee) => {
                let op = if op == ast::BinaryOp::Add { hir::BinaryOp::AddScalar } else { hir::BinaryOp::SubScalar };
                let ty = lhs.ty.clone();
                binary(op, lhs, rhs, ty, span)
            }
            (Type::Int(_), Type::Pointer(pointee)) if op == ast::BinaryOp::Add && self.checker.universe.is_complete(pointee) => {
                let ty = rhs.ty.clone();
                binary(hir::BinaryOp::AddScalar, rhs, lhs, ty, span)
            }
            (Type::Pointer(_), Type::Pointer(_)) if op == ast::BinaryOp::Sub && lhs.ty == rhs.ty => {
                binary(hir::BinaryOp::Sub, lhs, rhs, Type::Int(IntType::I64), span)
            }
            (Type::Pointer(_), _) | (_, Type::Pointer(_)) => {
                let error = Error::BinPtrInvalid { op: op.symbol(), lhs: self.display(&lhs.ty), rhs: self.display(&rhs.ty) };
                self.push_error(error, span);
                hir::Expr::error(span)
            }
            (left, right) if left == right && left.is_numeric() && (op != ast::BinaryOp::Mod || matches!(left, Type::Int(_))) => {
                let ty = lhs.ty.clone();
                binary(arithmetic_op(op), lhs, rhs, ty, span)
            }
            _ => self.invalid_operands(&lhs, &rhs, span)
        }
    }

    fn check_comparison(&mut self, op: ast::BinaryOp, lhs: hir::Expr, rhs: hir::Expr, span: Span) -> hir::Expr {
        let equality = matches!(op, ast::BinaryOp::Eq | ast::BinaryOp::Ne);
        let comparable = match (&lhs.ty, &rhs.ty) {
            (Type::Pointer(_), Type::Pointer(_)) => assignable(&lhs.ty, &rhs.ty),
            (left, right) if left != right => false,
            (left, _) if left.is_numeric() || *left == Type::Char => true,
            (Type::Bool | Type::Enum(_), _) => equality,
            _ => false
        };
        if !comparable {
            return self.invalid_operands(&lhs, &rhs, span);
        }

        let (lhs, rhs) = if rhs.ty.is_void_ptr() {
            let ty = lhs.ty.clone();
            (lhs, self.coerce(rhs, &ty))
        } else {
            let ty = rhs.ty.clone();
            (self.coerce(lhs, &ty), rhs)
        };
        binary(comparison_op(op), lhs, rhs, Type::Bool, span)
    }

    fn invalid_operands(&mut self, lhs: &hir::Expr, rhs: &hir::Expr, span: Span) -> hir::Expr {
        let error = Error::BinInvalidTypes { lhs: self.display(&lhs.ty), rhs: self.display(&rhs.ty) };
        self.push_error(error, span);
        hir::Expr::error(span)
    }

    fn check_unary(&mut self, op: ast::UnaryOp, operand: &ast::Expr, expected: Option<&Type>, span: Span) -> hir::Expr {
        let boolean = Type::Bool;
        let hint = match op {
            ast::UnaryOp::Neg => expected,
            ast::UnaryOp::Not => Some(&boolean),
            _ => None
        };
        let operand = self.check_expr(operand, hint);
        if operand.ty.is_error() {
            return hir::Expr::error(span);
        }

        match op {
            ast::UnaryOp::Ref => {
                if !operand.is_place() {
                    self.push_error(Error::UnaryRefRvalue, span);
                    return hir::Expr::error(span);
                }
                let ty = Type::ptr(operand.ty.clone());
                hir::Expr::new(ExprKind::Ref(Box::new(operand)), ty, span)
            }
            ast::UnaryOp::Deref => self.deref(operand, span),
            ast::UnaryOp::Not if operand.ty == Type::Bool => {
                hir::Expr::new(ExprKind::Unary { op: hir::UnaryOp::Not, operand: Box::new(operand) }, Type::Bool, span)
            }
            ast::UnaryOp::Neg if operand.ty.is_numeric() => {
                let ty = operand.ty.clone();
                hir::Expr::new(ExprKind::Unary { op: hir::UnaryOp::Neg, operand: Box::new(operand) }, ty, span)
            }
            _ => {
                let ty = self.display(&operand.ty);
                self.push_error(Error::UnaryOpNotDefined { op: op.symbol(), ty }, span);
                hir::Expr::error(span)
            }
        }
    }

    fn deref(&mut self, operand: hir::Expr, span: Span) -> hir::Expr {
        let Some(pointee) = operand.ty.pointee().cloned() else {
            let ty = self.display(&operand.ty);
            self.push_error(Error::UnaryDerefNonPtr { ty }, span);
            return hir::Expr::error(span);
        };
        if !self.checker.universe.is_complete(&pointee) {
            let ty = self.display(&pointee);
            self.push_error(Error::UnsizedDeref { ty }, span);
            return hir::Expr::error(span);
        }
        hir::Expr::new(ExprKind::Deref(Box::new(operand)), pointee, span)
    }

    fn is_mutable_place(&self, expr: &hir::Expr) -> bool {
        match &expr.kind {
            ExprKind::Local(key) => self.locals[*key].mutable,
            ExprKind::Global(key) => self.checker.universe.globals[*key].mutable,
            ExprKind::Deref(_) => true,
            ExprKind::Field { base, through_ptr, .. } | ExprKind::Index { base, through_ptr, .. } => {
                *through_ptr || self.is_mutable_place(base)
            }
            _ => false
        }
    }

    fn check_assign(&mut self, target: &ast::Expr, value: &ast::Expr, span: Span) -> hir::Expr {
        let target = self.check_expr(target, None);
        let value = self.check_expr(value, Some(&target.ty));
        if target.ty.is_error() {
            return hir::Expr::error(span);
        }
        if !self.is_mutable_place(&target) {
            self.push_error(Error::NotAssignable, target.span);
            return hir::Expr::error(span);
        }
        if let Type::Array(..) = target.ty {
            let ty = self.display(&target.ty);
            self.push_error(Error::TypeNotAssignable { ty }, target.span);
            return hir::Expr::error(span);
        }
        if !assignable(&value.ty, &target.ty) {
            let error = Error::AssignTypeMismatch { target: self.display(&target.ty), value: self.display(&value.ty) };
            self.push_error(error, value.span);
            return hir::Expr::error(span);
        }

        let ty = target.ty.clone();
        let value = self.coerce(value, &ty);
        hir::Expr::new(ExprKind::Assign { target: Box::new(target), value: Box::new(value) }, ty, span)
    }

    /// Checks a call. `leading` holds the already checked receiver of a method call.
    fn check_call(&mut self, callee: hir::Expr, mut leading: Vec<hir::Expr>, args: &[ast::Expr], span: Span) -> hir::Expr {
        let fn_type = match &callee.ty {
            Type::Function(fn_type) => fn_type.clone(),
            Type::Error => {
                for arg in args {
                    self.check_expr(arg, None);
                }
                return hir::Expr::error(span);
            }
            other => {
                let ty = self.display(other);
                self.push_error(Error::CallingNonFunction { ty }, callee.span);
                return hir::Expr::error(span);
            }
        };

        let params = &fn_type.params[leading.len().min(fn_type.params.len())..];
        let arity_ok = if fn_type.variadic { args.len() >= params.len() } else { args.len() == params.len() };
        let mut failed = false;
        if !arity_ok {
            self.push_error(Error::WrongNumberOfArgs { expected: params.len(), got: args.len() }, span);
            failed = true;
        }

        for (index, arg) in args.iter().enumerate() {
            let Some(param) = params.get(index) else {
                leading.push(self.check_expr(arg, None));
                continue;
            };
            let arg = self.check_expr(arg, Some(param));
            if !assignable(&arg.ty, param) {
                let error = Error::WrongArgType { index: index + 1, expected: self.display(param), got: self.display(&arg.ty) };
                self.push_error(error, arg.span);
                failed = true;
                continue;
            }
            leading.push(self.coerce(arg, param));
        }
        if failed {
            return hir::Expr::error(span);
        }

        let ret = (*fn_type.ret).clone();
        hir::Expr::new(ExprKind::Call { callee: Box::new(callee), args: leading }, ret, span)
    }

    /// Walks `a.b.c`, where `a` must be a name and each later segment a name or a call.
    fn check_chain(&mut self, expr: &ast::Expr) -> Option<Operand> {
        match &expr.kind {
            ast::ExprKind::Ident(name) => {
                let symbol = match self.checker.scopes.resolve(self.scope, name).cloned() {
                    Ok(symbol) => symbol,
                    Err(error) => {
                        self.push_error(error, expr.span);
                        return None;
                    }
                };
                match symbol {
                    symbol @ (Symbol::TypeDecl { .. } | Symbol::Module { .. }) => Some(Operand::Member(Member::Symbol(symbol))),
                    symbol => Some(Operand::Value(self.symbol_value(name, symbol, expr.span)))
                }
            }
            ast::ExprKind::Access { left, right } => {
                let left = self.check_chain(left)?;
                self.check_member(left, right, expr.span)
            }
            _ => {
                self.push_error(Error::AccessFirstSegment, expr.span);
                None
            }
        }
    }

    fn check_member(&mut self, left: Operand, right: &ast::Expr, span: Span) -> Option<Operand> {
        let (name, args) = match &right.kind {
            ast::ExprKind::Ident(name) => (name, None),
            ast::ExprKind::Call { callee, args } => match &callee.kind {
                ast::ExprKind::Ident(name) => (name, Some(args)),
                _ => {
                    self.push_error(Error::AccessMemberNotIdent, right.span);
                    return None;
                }
            },
            _ => {
                self.push_error(Error::AccessMemberNotIdent, right.span);
                return None;
            }
        };

        match left {
            Operand::Member(owner) => {
                let member = match scope::resolve_member(self.checker.universe, self.checker.module, &owner, name) {
                    Ok(member) => member,
                    Err(error) => {
                        self.push_error(error, right.span);
                        return None;
                    }
                };
                let value = match member {
                    Member::EnumEntry { decl, value } => self.enum_entry(decl, value, span),
                    Member::Symbol(symbol @ (Symbol::TypeDecl { .. } | Symbol::Module { .. })) if args.is_none() => {
                        return Some(Operand::Member(Member::Symbol(symbol)));
                    }
                    Member::Symbol(symbol) => self.symbol_value(name, symbol, right.span)
                };
                Some(Operand::Value(match args {
                    Some(args) => self.check_call(value, Vec::new(), args, span),
                    None => value
                }))
            }
            Operand::Value(value) => Some(Operand::Value(self.check_value_member(value, name, args, right.span, span)))
        }
    }

    fn check_value_member(&mut self, value: hir::Expr, name: &str, args: Option<&Vec<ast::Expr>>, member_span: Span, span: Span) -> hir::Expr {
        if value.ty.is_error() {
            return hir::Expr::error(span);
        }
        let (decl_key, through_ptr) = match &value.ty {
            Type::Struct(key) | Type::Union(key) | Type::Enum(key) => (*key, false),
            Type::Pointer(inner) => match inner.decl() {
                Some(key) => (key, true),
                None => return self.not_accessible(&value, span)
            },
            _ => return self.not_accessible(&value, span)
        };

        if let Some(args) = args {
            return self.check_method_call(value, decl_key, through_ptr, name, args, member_span, span);
        }

        let decl = &self.checker.universe.decls[decl_key];
        if !decl.body.is_defined() {
            let ty = decl.qualified_name();
            self.push_error(Error::IncompleteType { ty }, span);
            return hir::Expr::error(span);
        }
        match self.checker.universe.field(decl_key, name) {
            Some((index, ty)) => {
                let ty = ty.clone();
                let kind = ExprKind::Field { base: Box::new(value), index: index as u32, through_ptr };
                hir::Expr::new(kind, ty, span)
            }
            None => {
                let owner = decl.qualified_name();
                self.push_error(Error::NoSuchMember { owner, member: name.to_owned() }, member_span);
                hir::Expr::error(span)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_method_call(&mut self, value: hir::Expr, decl_key: DeclKey, through_ptr: bool, name: &str, args: &[ast::Expr], member_span: Span, span: Span) -> hir::Expr {
        let decl = &self.checker.universe.decls[decl_key];
        let Some(method) = decl.methods.get(name).copied() else {
            let owner = decl.qualified_name();
            self.push_error(Error::NoSuchMember { owner, member: name.to_owned() }, member_span);
            return hir::Expr::error(span);
        };
        let info = &self.checker.universe.functions[method];
        if info.module != self.checker.module && !info.is_public {
            let module = self.checker.universe.modules[info.module].name.clone();
            self.push_error(Error::NotAccessible { name: name.to_owned(), module }, member_span);
            return hir::Expr::error(span);
        }
        let fn_type = info.ty.clone();

        let takes_pointer = fn_type.params.first().is_some_and(|param| param.pointee().is_some());
        let receiver = match (takes_pointer, through_ptr) {
            (true, true) | (false, false) => value,
            (true, false) => {
                if !value.is_place() {
                    self.push_error(Error::UnaryRefRvalue, value.span);
                    return hir::Expr::error(span);
                }
                let ty = Type::ptr(value.ty.clone());
                let value_span = value.span;
                hir::Expr::new(ExprKind::Ref(Box::new(value)), ty, value_span)
            }
            (false, true) => {
                let value_span = value.span;
                self.deref(value, value_span)
            }
        };
        if receiver.ty.is_error() {
            return hir::Expr::error(span);
        }

        let callee = hir::Expr::new(ExprKind::Function(method), Type::Function(fn_type), member_span);
        self.check_call(callee, vec![receiver], args, span)
    }

    fn not_accessible(&mut self, value: &hir::Expr, span: Span) -> hir::Expr {
        let ty = self.display(&value.ty);
        self.push_error(Error::NotAccessibleWithOp { ty, op: "." }, span);
        hir::Expr::error(span)
    }

    fn check_init(&mut self, ty: &ast::TypeExpr, fields: &[ast::FieldInit], span: Span) -> hir::Expr {
        let ty = self.checker.resolve_type(self.scope, ty);
        let decl_key = match &ty {
            Type::Struct(key) | Type::Union(key) => *key,
            Type::Error => return hir::Expr::error(span),
            other => {
                let ty = self.display(other);
                self.push_error(Error::InitNonStructType { ty }, span);
                return hir::Expr::error(span);
            }
        };
        let decl = &self.checker.universe.decls[decl_key];
        let qualified = decl.qualified_name();
        let Some(declared) = decl.body.fields().cloned() else {
            self.push_error(Error::IncompleteType { ty: qualified }, span);
            return hir::Expr::error(span);
        };

        let mut failed = false;
        let mut supplied: Vec<(u32, hir::Expr)> = Vec::new();
        for field in fields {
            let Some((index, _, field_ty)) = declared.get_full(&field.name) else {
                self.check_expr(&field.value, None);
                self.push_error(Error::WrongField { ty: qualified.clone(), field: field.name.clone() }, field.span);
                failed = true;
                continue;
            };
            let index = index as u32;
            let value = self.check_expr(&field.value, Some(field_ty));
            if supplied.iter().any(|(seen, _)| *seen == index) {
                self.push_error(Error::DuplicateDefinition { name: field.name.clone() }, field.span);
                failed = true;
                continue;
            }
            if !assignable(&value.ty, field_ty) {
                let error = Error::FieldTypeMismatch {
                    field: field.name.clone(),
                    expected: self.display(field_ty),
                    got: self.display(&value.ty)
                };
                self.push_error(error, value.span);
                failed = true;
                continue;
            }
            supplied.push((index, self.coerce(value, field_ty)));
        }

        match ty {
            Type::Union(_) if fields.len() != 1 => {
                self.push_error(Error::UnionInitArity { ty: qualified, got: fields.len() }, span);
                failed = true;
            }
            Type::Struct(_) if !failed => {
                let missing: Vec<String> = declared.keys().enumerate()
                    .filter(|(index, _)| !supplied.iter().any(|(seen, _)| *seen as usize == *index))
                    .map(|(_, name)| name.clone())
                    .collect();
                if !missing.is_empty() {
                    self.push_error(Error::MissingFields { ty: qualified, fields: missing }, span);
                    failed = true;
                }
            }
            _ => {}
        }
        if failed {
            return hir::Expr::error(span);
        }
        hir::Expr::new(ExprKind::Init { fields: supplied }, ty, span)
    }

    fn check_index(&mut self, base: &ast::Expr, index: &ast::Expr, span: Span) -> hir::Expr {
        let base = self.check_expr(base, None);
        let index = self.check_expr(index, None);
        if base.ty.is_error() || index.ty.is_error() {
            return hir::Expr::error(span);
        }

        let (elem, through_ptr) = match &base.ty {
            Type::Array(elem, _) => ((**elem).clone(), false),
            Type::Pointer(inner) if self.checker.universe.is_complete(inner) => ((**inner).clone(), true),
            Type::Pointer(inner) => {
                let ty = self.display(inner);
                self.push_error(Error::UnsizedDeref { ty }, span);
                return hir::Expr::error(span);
            }
            other => {
                let ty = self.display(other);
                self.push_error(Error::IndexNonIndexable { ty }, base.span);
                return hir::Expr::error(span);
            }
        };
        if !matches!(index.ty, Type::Int(_)) {
            let error = Error::IndexWrongType { ty: self.display(&base.ty), index: self.display(&index.ty) };
            self.push_error(error, index.span);
            return hir::Expr::error(span);
        }
        hir::Expr::new(ExprKind::Index { base: Box::new(base), index: Box::new(index), through_ptr }, elem, span)
    }
}

fn constant(value: Constant, ty: Type, span: Span) -> hir::Expr {
    hir::Expr::new(ExprKind::Const(value), ty, span)
}

fn binary(op: hir::BinaryOp, lhs: hir::Expr, rhs: hir::Expr, ty: Type, span: Span) -> hir::Expr {
    hir::Expr::new(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, ty, span)
}

fn is_arithmetic(op: ast::BinaryOp) -> bool {
    matches!(op, ast::BinaryOp::Add | ast::BinaryOp::Sub | ast::BinaryOp::Mul | ast::BinaryOp::Div | ast::BinaryOp::Mod)
}

fn arithmetic_op(op: ast::BinaryOp) -> hir::BinaryOp {
    match op {
        ast::BinaryOp::Sub => hir::BinaryOp::Sub,
        ast::BinaryOp::Mul => hir::BinaryOp::Mul,
        ast::BinaryOp::Div => hir::BinaryOp::Div,
        ast::BinaryOp::Mod => hir::BinaryOp::Mod,
        _ => hir::BinaryOp::Add
    }
}

fn comparison_op(op: ast::BinaryOp) -> hir::BinaryOp {
    match op {
        ast::BinaryOp::Lt => hir::BinaryOp::Lt,
        ast::BinaryOp::Le => hir::BinaryOp::Le,
        ast::BinaryOp::Gt => hir::BinaryOp::Gt,
        ast::BinaryOp::Ge => hir::BinaryOp::Ge,
        ast::BinaryOp::Ne => hir::BinaryOp::Ne,
        _ => hir::BinaryOp::Eq
    }
}
