use std::collections::HashSet;
use indexmap::IndexMap;
use slotmap::SlotMap;
use tracing::{debug, trace};
use crate::error::InternalError;
use crate::lowering::hir::{self, LocalKey};
use crate::lowering::mir::{self, Address, Expr, GlobalRef, Instruction, Label, LocalDef, Temp};
use crate::lowering::scope::FunctionKey;
use crate::lowering::types::{CastKind, Type, Universe};
use crate::util::Counter;


/// Lowers a checked module. The module must have come out of the checker without diagnostics.
pub fn lower(universe: &Universe, module: &hir::Module) -> Result<mir::Program, InternalError> {
    let functions = module.functions.iter()
        .map(|function| lower_function(universe, function))
        .collect::<Result<Vec<_>, _>>()?;

    let globals = module.globals.iter()
        .map(|init| {
            let info = &universe.globals[init.global];
            mir::GlobalDef { key: init.global, name: format!("{}.{}", module.name, info.name), ty: info.ty.clone() }
        })
        .collect();
    let init = lower_init(universe, module)?;

    debug!(module = %module.name, functions = functions.len(), "lowered module");
    Ok(mir::Program { module: module.key, name: module.name.clone(), functions, globals, init })
}

fn lower_function(universe: &Universe, function: &hir::Function) -> Result<mir::Function, InternalError> {
    let info = &universe.functions[function.key];
    let mut lowering = FunctionLowering::new(universe, info.qualified_name(universe), &function.locals);

    for (index, param) in function.params.iter().enumerate() {
        let ty = function.locals[*param].ty.clone();
        lowering.emit(Instruction::Decl(Address::Name(*param), ty));
        lowering.emit(Instruction::Assign(Address::Name(*param), Expr::Copy(Address::Arg(index as u32))));
    }
    lowering.lower_block(&function.body)?;
    if function.ret == Type::Void && !lowering.terminated {
        lowering.emit(Instruction::Return(None));
    }

    lowering.finish(Some(function.key), info.ty.params.clone(), function.ret.clone(), info.ty.variadic)
}

fn lower_init(universe: &Universe, module: &hir::Module) -> Result<Option<mir::Function>, InternalError> {
    if module.globals.iter().all(|init| init.value.is_none()) {
        return Ok(None);
    }

    let locals = SlotMap::with_key();
    let mut lowering = FunctionLowering::new(universe, format!("{}.init", module.name), &locals);
    for init in &module.globals {
        if let Some(value) = &init.value {
            let value = lowering.lower_expr(value)?;
            lowering.emit(Instruction::Assign(Address::Global(GlobalRef::Variable(init.global)), Expr::Copy(value)));
        }
    }
    lowering.emit(Instruction::Return(None));

    lowering.finish(None, Vec::new(), Type::Void, false).map(Some)
}


struct LoopLabels {
    /// Where `continue` goes.
    head: Label,
    /// Where `break` goes.
    end: Label,
    /// The number of defer frames open outside the loop body.
    depth: usize
}

struct FunctionLowering<'a> {
    universe: &'a Universe,
    name: String,
    locals: &'a SlotMap<LocalKey, hir::LocalInfo>,

    instructions: Vec<Instruction>,
    temps: Vec<Type>,
    labels: Counter,
    loops: Vec<LoopLabels>,
    /// Deferred statements of each open block, innermost last.
    defers: Vec<Vec<&'a hir::Stmt>>,
    /// Locals that already have a `Decl`. A deferred `let` is lowered once per exit path but
    /// declared once, where its `defer` appears.
    declared: HashSet<LocalKey>,
    /// Set after a jump or return, until the next label.
    terminated: bool
}

impl<'a> FunctionLowering<'a> {
    fn new(universe: &'a Universe, name: String, locals: &'a SlotMap<LocalKey, hir::LocalInfo>) -> FunctionLowering<'a> {
        FunctionLowering {
            universe, name, locals,
            instructions: Vec::new(),
            temps: Vec::new(),
            labels: Counter::new(0),
            loops: Vec::new(),
            defers: Vec::new(),
            declared: HashSet::new(),
            terminated: false
        }
    }

    fn finish(self, key: Option<FunctionKey>, params: Vec<Type>, ret: Type, variadic: bool) -> Result<mir::Function, InternalError> {
        trace!(
            function = %self.name,
            instructions = self.instructions.len(),
            temps = self.temps.len(),
            labels = self.labels.peek(),
            "lowered function"
        );
        let locals: IndexMap<LocalKey, LocalDef> = self.locals.iter()
            .map(|(key, info)| (key, LocalDef { name: info.name.clone(), ty: info.ty.clone() }))
            .collect();
        let function = mir::Function {
            key,
            name: self.name,
            params, ret, variadic, locals,
            temps: self.temps,
            body: self.instructions
        };
        function.validate_labels()?;
        Ok(function)
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn new_label(&mut self) -> Label {
        Label(self.labels.next())
    }

    fn place_label(&mut self, label: Label) {
        self.emit(Instruction::Label(label));
        self.terminated = false;
    }

    fn jump(&mut self, label: Label) {
        self.emit(Instruction::Jmp(label));
        self.terminated = true;
    }

    fn new_temp(&mut self, ty: Type) -> Address {
        let temp = Temp(self.temps.len() as u32);
        self.temps.push(ty);
        Address::Temp(temp)
    }

    fn assign_temp(&mut self, ty: Type, expr: Expr) -> Address {
        let temp = self.new_temp(ty);
        self.emit(Instruction::Assign(temp.clone(), expr));
        temp
    }

    fn lower_block(&mut self, block: &'a hir::Block) -> Result<(), InternalError> {
        self.defers.push(Vec::new());
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        let frame = self.defers.pop().unwrap_or_default();
        if !self.terminated {
            for stmt in frame.into_iter().rev() {
                self.lower_stmt(stmt)?;
            }
        }
        Ok(())
    }

    /// Re-emits the deferred statements of every frame from `depth` outward, innermost first.
    fn emit_defers(&mut self, depth: usize) -> Result<(), InternalError> {
        let pending: Vec<&'a hir::Stmt> = self.defers[depth.min(self.defers.len())..].iter()
            .rev()
            .flat_map(|frame| frame.iter().rev().copied())
            .collect();
        for stmt in pending {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &'a hir::Stmt) -> Result<(), InternalError> {
        match stmt {
            hir::Stmt::Let { local, value, .. } => {
                if self.declared.insert(*local) {
                    let ty = self.locals[*local].ty.clone();
                    self.emit(Instruction::Decl(Address::Name(*local), ty));
                }
                if let Some(value) = value {
                    let value = self.lower_expr(value)?;
                    self.emit(Instruction::Assign(Address::Name(*local), Expr::Copy(value)));
                }
            }
            hir::Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
            }
            hir::Stmt::Block(block) => self.lower_block(block)?,
            hir::Stmt::If { cond, then_do, else_do, .. } => {
                let cond = self.lower_expr(cond)?;
                let then_label = self.new_label();
                let end_label = self.new_label();
                let else_label = match else_do {
                    Some(_) => self.new_label(),
                    None => end_label
                };
                self.emit(Instruction::JmpIf(cond, then_label, else_label));

                self.place_label(then_label);
                self.lower_block(then_do)?;
                if !self.terminated {
                    self.jump(end_label);
                }
                if let Some(else_do) = else_do {
                    self.place_label(else_label);
                    self.lower_stmt(else_do)?;
                    if !self.terminated {
                        self.jump(end_label);
                    }
                }
                self.place_label(end_label);
            }
            hir::Stmt::While { cond, body, .. } => {
                let head = self.new_label();
                let body_label = self.new_label();
                let end = self.new_label();

                self.place_label(head);
                let cond = self.lower_expr(cond)?;
                self.emit(Instruction::JmpIf(cond, body_label, end));
                self.place_label(body_label);
                self.lower_loop_body(body, head, end)?;
                if !self.terminated {
                    self.jump(head);
                }
                self.place_label(end);
            }
            hir::Stmt::For { init, cond, step, body, .. } => {
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                let cond_label = self.new_label();
                let head = self.new_label();
                let body_label = self.new_label();
                let end = self.new_label();

                self.jump(cond_label);
                self.place_label(head);
                if let Some(step) = step {
                    self.lower_expr(step)?;
                }
                self.jump(cond_label);
                self.place_label(cond_label);
                match cond {
                    Some(cond) => {
                        let cond = self.lower_expr(cond)?;
                        self.emit(Instruction::JmpIf(cond, body_label, end));
                    }
                    None => self.jump(body_label)
                }
                self.place_label(body_label);
                self.lower_loop_body(body, head, end)?;
                if !self.terminated {
                    self.jump(head);
                }
                self.place_label(end);
            }
            hir::Stmt::Break(_) => {
                let (end, depth) = self.loops.last()
                    .map(|labels| (labels.end, labels.depth))
                    .ok_or(InternalError::NoEnclosingLoop("break"))?;
                self.emit_defers(depth)?;
                self.jump(end);
            }
            hir::Stmt::Continue(_) => {
                let (head, depth) = self.loops.last()
                    .map(|labels| (labels.head, labels.depth))
                    .ok_or(InternalError::NoEnclosingLoop("continue"))?;
                self.emit_defers(depth)?;
                self.jump(head);
            }
            hir::Stmt::Return { value, .. } => {
                let has_defers = self.defers.iter().any(|frame| !frame.is_empty());
                let value = match value {
                    Some(value) => {
                        let lowered = self.lower_expr(value)?;
                        // Deferred statements may still write to what the value reads.
                        if has_defers && !matches!(lowered, Address::Const(_) | Address::Temp(_)) {
                            Some(self.assign_temp(value.ty.clone(), Expr::Copy(lowered)))
                        } else {
                            Some(lowered)
                        }
                    }
                    None => None
                };
                self.emit_defers(0)?;
                self.emit(Instruction::Return(value));
                self.terminated = true;
            }
            hir::Stmt::Defer { stmt, .. } => {
                self.declare_deferred(stmt);
                if let Some(frame) = self.defers.last_mut() {
                    frame.push(stmt);
                }
            }
            hir::Stmt::Delete { value, .. } => {
                let value = self.lower_expr(value)?;
                self.emit(Instruction::Delete(value));
            }
        }
        Ok(())
    }

    /// Declares the locals of a deferred statement where the defer appears, ahead of every
    /// exit path that will run it.
    fn declare_deferred(&mut self, stmt: &'a hir::Stmt) {
        match stmt {
            hir::Stmt::Let { local, .. } => {
                if self.declared.insert(*local) {
                    let ty = self.locals[*local].ty.clone();
                    self.emit(Instruction::Decl(Address::Name(*local), ty));
                }
            }
            hir::Stmt::Block(block) | hir::Stmt::While { body: block, .. } => {
                block.stmts.iter().for_each(|stmt| self.declare_deferred(stmt));
            }
            hir::Stmt::If { then_do, else_do, .. } => {
                then_do.stmts.iter().for_each(|stmt| self.declare_deferred(stmt));
                if let Some(else_do) = else_do {
                    self.declare_deferred(else_do);
                }
            }
            hir::Stmt::For { init, body, .. } => {
                if let Some(init) = init {
                    self.declare_deferred(init);
                }
                body.stmts.iter().for_each(|stmt| self.declare_deferred(stmt));
            }
            hir::Stmt::Defer { stmt, .. } => self.declare_deferred(stmt),
            _ => {}
        }
    }

    fn lower_loop_body(&mut self, body: &'a hir::Block, head: Label, end: Label) -> Result<(), InternalError> {
        self.loops.push(LoopLabels { head, end, depth: self.defers.len() });
        let result = self.lower_block(body);
        self.loops.pop();
        result
    }

    fn lower_expr(&mut self, expr: &'a hir::Expr) -> Result<Address, InternalError> {
        let address = match &expr.kind {
            hir::ExprKind::Error => return Err(InternalError::ErrorNode),
            hir::ExprKind::Const(hir::Constant::Null) => Address::Null,
            hir::ExprKind::Const(hir::Constant::Undefined) => Address::Undefined,
            hir::ExprKind::Const(constant) => Address::Const(constant.clone()),
            hir::ExprKind::Local(key) => Address::Name(*key),
            hir::ExprKind::Global(key) => Address::Global(GlobalRef::Variable(*key)),
            hir::ExprKind::Function(key) => Address::Global(GlobalRef::Function(*key)),
            hir::ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                self.assign_temp(expr.ty.clone(), Expr::Binary(*op, lhs, rhs))
            }
            hir::ExprKind::Logical { op, lhs, rhs } => self.lower_logical(*op, lhs, rhs)?,
            hir::ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand)?;
                self.assign_temp(expr.ty.clone(), Expr::Unary(*op, operand))
            }
            hir::ExprKind::Deref(inner) => {
                let pointer = self.lower_expr(inner)?;
                self.assign_temp(expr.ty.clone(), Expr::Copy(Address::Deref(Box::new(pointer))))
            }
            hir::ExprKind::Ref(inner) => self.address_of(inner)?,
            hir::ExprKind::Assign { target, value } => {
                let target = self.lower_place(target)?;
                let value = self.lower_expr(value)?;
                self.emit(Instruction::Assign(target.clone(), Expr::Copy(value)));
                target
            }
            hir::ExprKind::Call { callee, args } => {
                let callee = self.lower_expr(callee)?;
                let args = args.iter()
                    .map(|arg| self.lower_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                if expr.ty == Type::Void {
                    self.emit(Instruction::Assign(Address::Empty, Expr::Call(callee, args)));
                    Address::Empty
                } else {
                    self.assign_temp(expr.ty.clone(), Expr::Call(callee, args))
                }
            }
            hir::ExprKind::Field { .. } => {
                let pointer = self.field_pointer(expr)?;
                self.assign_temp(expr.ty.clone(), Expr::Copy(Address::Deref(Box::new(pointer))))
            }
            hir::ExprKind::Index { .. } => {
                let pointer = self.element_pointer(expr)?;
                self.assign_temp(expr.ty.clone(), Expr::Copy(Address::Deref(Box::new(pointer))))
            }
            hir::ExprKind::Init { fields } => {
                let fields = fields.iter()
                    .map(|(index, value)| Ok((*index, self.lower_expr(value)?)))
                    .collect::<Result<Vec<_>, InternalError>>()?;
                self.assign_temp(expr.ty.clone(), Expr::StructInit(expr.ty.clone(), fields))
            }
            hir::ExprKind::New(ty) => {
                self.layout(ty)?;
                self.assign_temp(expr.ty.clone(), Expr::New(ty.clone()))
            }
            hir::ExprKind::Sizeof(ty) => {
                self.layout(ty)?;
                self.assign_temp(expr.ty.clone(), Expr::Sizeof(ty.clone()))
            }
            hir::ExprKind::Cast { kind, value } => {
                let value = self.lower_expr(value)?;
                self.assign_temp(expr.ty.clone(), Expr::Cast(*kind, value, expr.ty.clone()))
            }
        };
        Ok(address)
    }

    fn layout(&self, ty: &Type) -> Result<u64, InternalError> {
        self.universe.size_of(ty).ok_or_else(|| InternalError::NoLayout(self.universe.display(ty)))
    }

    /// `a && b` evaluates `b` only when `a` holds, and `a || b` only when it does not.
    fn lower_logical(&mut self, op: hir::LogicalOp, lhs: &'a hir::Expr, rhs: &'a hir::Expr) -> Result<Address, InternalError> {
        let lhs = self.lower_expr(lhs)?;
        let result = self.new_temp(Type::Bool);
        self.emit(Instruction::Assign(result.clone(), Expr::Copy(lhs.clone())));

        let rhs_label = self.new_label();
        let end = self.new_label();
        match op {
            hir::LogicalOp::And => self.emit(Instruction::JmpIf(lhs, rhs_label, end)),
            hir::LogicalOp::Or => self.emit(Instruction::JmpIf(lhs, end, rhs_label)),
        }

        self.place_label(rhs_label);
        let rhs = self.lower_expr(rhs)?;
        self.emit(Instruction::Assign(result.clone(), Expr::Copy(rhs)));
        self.jump(end);
        self.place_label(end);
        Ok(result)
    }

    fn lower_place(&mut self, expr: &'a hir::Expr) -> Result<Address, InternalError> {
        match &expr.kind {
            hir::ExprKind::Local(key) => Ok(Address::Name(*key)),
            hir::ExprKind::Global(key) => Ok(Address::Global(GlobalRef::Variable(*key))),
            hir::ExprKind::Deref(inner) => Ok(Address::Deref(Box::new(self.lower_expr(inner)?))),
            hir::ExprKind::Field { .. } => Ok(Address::Deref(Box::new(self.field_pointer(expr)?))),
            hir::ExprKind::Index { .. } => Ok(Address::Deref(Box::new(self.element_pointer(expr)?))),
            hir::ExprKind::Error => Err(InternalError::ErrorNode),
            _ => Err(InternalError::NotAPlace)
        }
    }

    /// A pointer to the value of `expr`, spilling rvalues to a temporary first.
    fn address_of(&mut self, expr: &'a hir::Expr) -> Result<Address, InternalError> {
        if !expr.is_place() {
            let value = self.lower_expr(expr)?;
            let temp = match value {
                temp @ Address::Temp(_) => temp,
                other => self.assign_temp(expr.ty.clone(), Expr::Copy(other))
            };
            return Ok(Address::Ref(Box::new(temp)));
        }
        Ok(match self.lower_place(expr)? {
            Address::Deref(pointer) => *pointer,
            place => Address::Ref(Box::new(place))
        })
    }

    fn field_pointer(&mut self, expr: &'a hir::Expr) -> Result<Address, InternalError> {
        let hir::ExprKind::Field { base, index, through_ptr } = &expr.kind else {
            return Err(InternalError::NotAPlace);
        };
        let base = if *through_ptr { self.lower_expr(base)? } else { self.address_of(base)? };
        Ok(self.assign_temp(Type::ptr(expr.ty.clone()), Expr::Gep(base, *index)))
    }

    fn element_pointer(&mut self, expr: &'a hir::Expr) -> Result<Address, InternalError> {
        let hir::ExprKind::Index { base, index, through_ptr } = &expr.kind else {
            return Err(InternalError::NotAPlace);
        };
        let elem_ptr = Type::ptr(expr.ty.clone());
        let base = if *through_ptr {
            self.lower_expr(base)?
        } else {
            let array = self.address_of(base)?;
            self.assign_temp(elem_ptr.clone(), Expr::Cast(CastKind::Bitcast, array, elem_ptr.clone()))
        };
        let index = self.lower_expr(index)?;
        Ok(self.assign_temp(elem_ptr, Expr::Binary(hir::BinaryOp::AddScalar, base, index)))
    }
}


#[cfg(test)]
mod test {
    use crate::ast::{BinaryOp, Stmt};
    use crate::compiler::Compiler;
    use crate::lowering::hir::{self, Constant};
    use crate::lowering::mir::*;
    use crate::lowering::types::{IntType, Type};
    use crate::test_util::*;

    fn lower(stmts: Vec<Stmt>) -> (Compiler, Program) {
        let mut compiler = Compiler::new();
        let checked = match compiler.check_module(&module("main", stmts)) {
            Ok(checked) => checked,
            Err(errors) => panic!("unexpected diagnostics: {errors:?}")
        };
        let program = compiler.lower_module(&checked).unwrap();
        (compiler, program)
    }

    fn int(value: i64) -> Address {
        Address::Const(Constant::Int(value, IntType::I32))
    }

    fn int_lit(value: u64) -> crate::ast::Expr {
        crate::test_util::int(value)
    }

    fn yes() -> Address {
        Address::Const(Constant::Bool(true))
    }

    #[test]
    fn let_lowers_to_decl_then_copy() {
        let (_, program) = lower(vec![
            func("main", vec![], None, vec![
                let_("x", Some(ty("i32")), Some(bin(BinaryOp::Add, int_lit(1), int_lit(2)))),
            ]),
        ]);
        let main = program.function("main.main").unwrap();
        let x = *main.locals.keys().next().unwrap();
        assert_eq!(main.body, vec![
            Instruction::Decl(Address::Name(x), Type::Int(IntType::I32)),
            Instruction::Assign(Address::Temp(Temp(0)), Expr::Binary(hir::BinaryOp::Add, int(1), int(2))),
            Instruction::Assign(Address::Name(x), Expr::Copy(Address::Temp(Temp(0)))),
            Instruction::Return(None),
        ]);
        assert_eq!(main.temps, vec![Type::Int(IntType::I32)]);
    }

    #[test]
    fn defers_run_in_reverse_before_return() {
        let (compiler, program) = lower(vec![
            extern_func("log", vec![param("n", ty("i32"))], None),
            func("main", vec![], None, vec![
                defer(expr(call(ident("log"), vec![int_lit(1)]))),
                defer(expr(call(ident("log"), vec![int_lit(2)]))),
                ret(None),
            ]),
        ]);
        let log = compiler.universe().functions.iter().find(|(_, f)| f.name == "log").map(|(k, _)| k).unwrap();
        let call = |n| Instruction::Assign(Address::Empty, Expr::Call(Address::Global(GlobalRef::Function(log)), vec![int(n)]));

        let main = program.function("main.main").unwrap();
        assert_eq!(main.body, vec![call(2), call(1), Instruction::Return(None)]);
    }

    #[test]
    fn defers_run_at_block_exit_and_before_break() {
        let (_, program) = lower(vec![
            extern_func("log", vec![param("n", ty("i32"))], None),
            func("main", vec![], None, vec![
                block(vec![defer(expr(call(ident("log"), vec![int_lit(1)])))]),
                while_(boolean(true), vec![
                    defer(expr(call(ident("log"), vec![int_lit(2)]))),
                    brk(),
                ]),
            ]),
        ]);
        let main = program.function("main.main").unwrap();
        let calls: Vec<_> = main.body.iter().enumerate()
            .filter(|(_, i)| matches!(i, Instruction::Assign(Address::Empty, Expr::Call(..))))
            .map(|(index, _)| index)
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], 0);
        assert!(matches!(main.body[calls[1] + 1], Instruction::Jmp(_)));
    }

    #[test]
    fn break_and_continue_target_their_loop() {
        let (_, program) = lower(vec![
            func("main", vec![], None, vec![
                while_(boolean(true), vec![
                    while_(boolean(true), vec![brk()]),
                    cont(),
                ]),
            ]),
        ]);
        let main = program.function("main.main").unwrap();
        assert_eq!(main.body, vec![
            Instruction::Label(Label(0)),
            Instruction::JmpIf(yes(), Label(1), Label(2)),
            Instruction::Label(Label(1)),
            Instruction::Label(Label(3)),
            Instruction::JmpIf(yes(), Label(4), Label(5)),
            Instruction::Label(Label(4)),
            Instruction::Jmp(Label(5)),
            Instruction::Label(Label(5)),
            Instruction::Jmp(Label(0)),
            Instruction::Label(Label(2)),
            Instruction::Return(None),
        ]);
    }

    #[test]
    fn for_continue_runs_the_step() {
        let (_, program) = lower(vec![
            func("main", vec![], None, vec![
                for_(
                    Some(let_mut("i", None, Some(int_lit(0)))),
                    Some(bin(BinaryOp::Lt, ident("i"), int_lit(3))),
                    Some(assign(ident("i"), bin(BinaryOp::Add, ident("i"), int_lit(1)))),
                    vec![cont()]
                ),
            ]),
        ]);
        let main = program.function("main.main").unwrap();
        let i = *main.locals.keys().next().unwrap();
        let t = |n| Address::Temp(Temp(n));
        assert_eq!(main.body, vec![
            Instruction::Decl(Address::Name(i), Type::Int(IntType::I32)),
            Instruction::Assign(Address::Name(i), Expr::Copy(int(0))),
            Instruction::Jmp(Label(0)),
            Instruction::Label(Label(1)),
            Instruction::Assign(t(0), Expr::Binary(hir::BinaryOp::Add, Address::Name(i), int(1))),
            Instruction::Assign(Address::Name(i), Expr::Copy(t(0))),
            Instruction::Jmp(Label(0)),
            Instruction::Label(Label(0)),
            Instruction::Assign(t(1), Expr::Binary(hir::BinaryOp::Lt, Address::Name(i), int(3))),
            Instruction::JmpIf(t(1), Label(2), Label(3)),
            Instruction::Label(Label(2)),
            Instruction::Jmp(Label(1)),
            Instruction::Label(Label(3)),
            Instruction::Return(None),
        ]);
    }

    #[test]
    fn logical_and_short_circuits() {
        let (_, program) = lower(vec![
            func("both", vec![param("a", ty("bool")), param("b", ty("bool"))], Some(ty("bool")), vec![
                ret(Some(bin(BinaryOp::And, ident("a"), ident("b")))),
            ]),
        ]);
        let both = program.function("main.both").unwrap();
        let keys: Vec<_> = both.locals.keys().copied().collect();
        let (a, b) = (Address::Name(keys[0]), Address::Name(keys[1]));
        let result = Address::Temp(Temp(0));
        assert_eq!(both.body[4..], [
            Instruction::Assign(result.clone(), Expr::Copy(a.clone())),
            Instruction::JmpIf(a, Label(0), Label(1)),
            Instruction::Label(Label(0)),
            Instruction::Assign(result.clone(), Expr::Copy(b)),
            Instruction::Jmp(Label(1)),
            Instruction::Label(Label(1)),
            Instruction::Return(Some(result)),
        ]);
        assert_eq!(both.body[1], Instruction::Assign(Address::Name(keys[0]), Expr::Copy(Address::Arg(0))));
    }

    #[test]
    fn logical_or_skips_rhs_when_true() {
        let (_, program) = lower(vec![
            func("either", vec![param("a", ty("bool")), param("b", ty("bool"))], Some(ty("bool")), vec![
                ret(Some(bin(BinaryOp::Or, ident("a"), ident("b")))),
            ]),
        ]);
        let either = program.function("main.either").unwrap();
        let keys: Vec<_> = either.locals.keys().copied().collect();
        let (a, b) = (Address::Name(keys[0]), Address::Name(keys[1]));
        let result = Address::Temp(Temp(0));
        assert_eq!(either.body[4..], [
            Instruction::Assign(result.clone(), Expr::Copy(a.clone())),
            Instruction::JmpIf(a, Label(1), Label(0)),
            Instruction::Label(Label(0)),
            Instruction::Assign(result.clone(), Expr::Copy(b)),
            Instruction::Jmp(Label(1)),
            Instruction::Label(Label(1)),
            Instruction::Return(Some(result)),
        ]);
    }

    #[test]
    fn for_continue_runs_defers_then_step() {
        let (compiler, program) = lower(vec![
            extern_func("log", vec![param("n", ty("i32"))], None),
            func("main", vec![], None, vec![
                for_(
                    Some(let_mut("i", None, Some(int_lit(0)))),
                    Some(bin(BinaryOp::Lt, ident("i"), int_lit(3))),
                    Some(assign(ident("i"), bin(BinaryOp::Add, ident("i"), int_lit(1)))),
                    vec![defer(expr(call(ident("log"), vec![int_lit(7)]))), cont()]
                ),
            ]),
        ]);
        let log = compiler.universe().functions.iter().find(|(_, f)| f.name == "log").map(|(k, _)| k).unwrap();
        let call = Instruction::Assign(Address::Empty, Expr::Call(Address::Global(GlobalRef::Function(log)), vec![int(7)]));

        let main = program.function("main.main").unwrap();
        let at = main.body.iter().position(|i| *i == call).unwrap();
        assert_eq!(main.body[at + 1], Instruction::Jmp(Label(1)));
        assert_eq!(main.body[at - 1], Instruction::Label(Label(2)));
        assert_eq!(main.body.iter().filter(|i| **i == call).count(), 1);
    }

    #[test]
    fn deferred_let_is_declared_once() {
        let (_, program) = lower(vec![
            func("main", vec![], None, vec![
                defer(let_("x", Some(ty("i32")), Some(int_lit(1)))),
                if_(boolean(true), vec![ret(None)], None),
            ]),
        ]);
        let main = program.function("main.main").unwrap();
        let x = *main.locals.keys().next().unwrap();
        let decls = main.body.iter().filter(|i| matches!(i, Instruction::Decl(..))).count();
        let stores = main.body.iter()
            .filter(|i| matches!(i, Instruction::Assign(Address::Name(key), _) if *key == x))
            .count();
        assert_eq!(main.body[0], Instruction::Decl(Address::Name(x), Type::Int(IntType::I32)));
        assert_eq!(decls, 1);
        assert_eq!(stores, 2);
    }

    #[test]
    fn method_call_passes_receiver_address() {
        let (compiler, program) = lower(vec![
            struct_("Counter", vec![field("n", ty("i32"))]),
            method("Counter", "bump", vec![param("self", ptr(ty("Counter")))], None, vec![
                expr(assign(access(ident("self"), ident("n")), bin(BinaryOp::Add, access(ident("self"), ident("n")), int_lit(1)))),
            ]),
            func("main", vec![], None, vec![
                let_mut("c", None, Some(init(ty("Counter"), vec![("n", int_lit(0))]))),
                expr(access(ident("c"), call(ident("bump"), vec![]))),
            ]),
        ]);
        let bump = compiler.universe().functions.iter().find(|(_, f)| f.name == "bump").map(|(k, _)| k).unwrap();
        assert!(program.function("main.Counter.bump").is_some());

        let main = program.function("main.main").unwrap();
        let c = *main.locals.keys().next().unwrap();
        let call = Instruction::Assign(
            Address::Empty,
            Expr::Call(Address::Global(GlobalRef::Function(bump)), vec![Address::Ref(Box::new(Address::Name(c)))])
        );
        assert!(main.body.contains(&call));
    }

    #[test]
    fn field_reads_go_through_gep() {
        let (_, program) = lower(vec![
            struct_("P", vec![field("x", ty("i32")), field("y", ty("i32"))]),
            func("get", vec![param("p", ptr(ty("P")))], Some(ty("i32")), vec![
                ret(Some(access(ident("p"), ident("y")))),
            ]),
        ]);
        let get = program.function("main.get").unwrap();
        let p = *get.locals.keys().next().unwrap();
        assert_eq!(get.body[2..], [
            Instruction::Assign(Address::Temp(Temp(0)), Expr::Gep(Address::Name(p), 1)),
            Instruction::Assign(Address::Temp(Temp(1)), Expr::Copy(Address::Deref(Box::new(Address::Temp(Temp(0)))))),
            Instruction::Return(Some(Address::Temp(Temp(1)))),
        ]);
    }

    #[test]
    fn globals_are_initialized_by_init() {
        let (_, program) = lower(vec![
            let_("counter", Some(ty("i64")), Some(int_lit(5))),
            let_mut("unset", Some(ty("i32")), None),
        ]);
        assert_eq!(program.globals.len(), 2);
        assert_eq!(program.globals[0].name, "main.counter");

        let init = program.init.as_ref().unwrap();
        assert_eq!(init.name, "main.init");
        assert_eq!(init.body, vec![
            Instruction::Assign(
                Address::Global(GlobalRef::Variable(program.globals[0].key)),
                Expr::Copy(Address::Const(Constant::Int(5, IntType::I64)))
            ),
            Instruction::Return(None),
        ]);
    }

    #[test]
    fn extern_functions_have_no_body() {
        let (_, program) = lower(vec![
            extern_func("puts", vec![param("s", ty("string"))], Some(ty("i32"))),
        ]);
        assert!(program.functions.is_empty());
        assert!(program.init.is_none());
    }
}
