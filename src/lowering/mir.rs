//! The lowered form of a module: per function, a flat list of instructions over addresses,
//! with control flow made explicit through labels and jumps.

use indexmap::IndexMap;
use crate::error::InternalError;
use crate::lowering::hir::{BinaryOp, Constant, LocalKey, UnaryOp};
use crate::lowering::scope::{FunctionKey, GlobalKey};
use crate::lowering::types::{CastKind, ModuleKey, Type, Universe};
use crate::util::{join_with, map_join};


pub struct Program {
    pub module: ModuleKey,
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalDef>,
    /// Runs the global initializers, if any global has one.
    pub init: Option<Function>
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }
}

pub struct GlobalDef {
    pub key: GlobalKey,
    pub name: String,
    pub ty: Type
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalDef {
    pub name: String,
    pub ty: Type
}

pub struct Function {
    /// `None` for the synthesized module initializer.
    pub key: Option<FunctionKey>,
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub variadic: bool,
    pub locals: IndexMap<LocalKey, LocalDef>,
    /// The type of each temporary, indexed by its number.
    pub temps: Vec<Type>,
    pub body: Vec<Instruction>
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Temp(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GlobalRef {
    Function(FunctionKey),
    Variable(GlobalKey),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Address {
    /// The destination of a call whose result is discarded.
    Empty,
    Null,
    Undefined,
    Name(LocalKey),
    Const(Constant),
    Global(GlobalRef),
    Ref(Box<Address>),
    /// The memory the inner pointer points at.
    Deref(Box<Address>),
    Arg(u32),
    Temp(Temp),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Expr {
    Binary(BinaryOp, Address, Address),
    Unary(UnaryOp, Address),
    Copy(Address),
    Call(Address, Vec<Address>),
    /// A pointer to field `n` of the record the base pointer points at.
    Gep(Address, u32),
    StructInit(Type, Vec<(u32, Address)>),
    New(Type),
    Sizeof(Type),
    Cast(CastKind, Address, Type),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
    Decl(Address, Type),
    Assign(Address, Expr),
    Jmp(Label),
    JmpIf(Address, Label, Label),
    Return(Option<Address>),
    Label(Label),
    Delete(Address),
    Nop,
}

impl Function {
    /// Checks that labels are placed once and that every jump lands on one.
    pub fn validate_labels(&self) -> Result<(), InternalError> {
        let mut placed = Vec::new();
        for instruction in &self.body {
            if let Instruction::Label(label) = instruction {
                if placed.contains(label) {
                    return Err(InternalError::DuplicateLabel { function: self.name.clone(), label: label.0 });
                }
                placed.push(*label);
            }
        }

        for instruction in &self.body {
            let targets = match instruction {
                Instruction::Jmp(label) => vec![*label],
                Instruction::JmpIf(_, then_do, else_do) => vec![*then_do, *else_do],
                _ => continue
            };
            if let Some(missing) = targets.into_iter().find(|label| !placed.contains(label)) {
                return Err(InternalError::UnresolvedLabel { function: self.name.clone(), label: missing.0 });
            }
        }
        Ok(())
    }

    pub fn render(&self, universe: &Universe) -> String {
        let header = format!(
            "fn {}({}{}): {}",
            self.name,
            map_join(&self.params, |ty| universe.display(ty)),
            if self.variadic { ", ..." } else { "" },
            universe.display(&self.ret)
        );
        let lines = self.body.iter().map(|instruction| match instruction {
            Instruction::Label(_) => self.render_instruction(universe, instruction),
            _ => format!("    {}", self.render_instruction(universe, instruction))
        });
        join_with(std::iter::once(header).chain(lines), "\n")
    }

    fn render_instruction(&self, universe: &Universe, instruction: &Instruction) -> String {
        match instruction {
            Instruction::Decl(dest, ty) => format!("decl {}: {}", self.render_address(universe, dest), universe.display(ty)),
            Instruction::Assign(dest, expr) => format!("{} = {}", self.render_address(universe, dest), self.render_expr(universe, expr)),
            Instruction::Jmp(label) => format!("jmp L{}", label.0),
            Instruction::JmpIf(cond, then_do, else_do) => {
                format!("jmpif {}, L{}, L{}", self.render_address(universe, cond), then_do.0, else_do.0)
            }
            Instruction::Return(Some(value)) => format!("ret {}", self.render_address(universe, value)),
            Instruction::Return(None) => "ret".into(),
            Instruction::Label(label) => format!("L{}:", label.0),
            Instruction::Delete(value) => format!("delete {}", self.render_address(universe, value)),
            Instruction::Nop => "nop".into(),
        }
    }

    fn render_expr(&self, universe: &Universe, expr: &Expr) -> String {
        let addr = |address: &Address| self.render_address(universe, address);
        match expr {
            Expr::Binary(op, lhs, rhs) => format!("{} {} {}", addr(lhs), binary_symbol(*op), addr(rhs)),
            Expr::Unary(UnaryOp::Neg, operand) => format!("-{}", addr(operand)),
            Expr::Unary(UnaryOp::Not, operand) => format!("!{}", addr(operand)),
            Expr::Copy(value) => addr(value),
            Expr::Call(callee, args) => format!("call {}({})", addr(callee), map_join(args, addr)),
            Expr::Gep(base, field) => format!("gep {}, {}", addr(base), field),
            Expr::StructInit(ty, fields) => {
                let fields = map_join(fields, |(index, value)| format!("{index}: {}", addr(value)));
                format!("{} {{ {} }}", universe.display(ty), fields)
            }
            Expr::New(ty) => format!("new {}", universe.display(ty)),
            Expr::Sizeof(ty) => format!("sizeof {}", universe.display(ty)),
            Expr::Cast(CastKind::Bitcast, value, ty) => format!("bitcast {} to {}", addr(value), universe.display(ty)),
            Expr::Cast(CastKind::Numeric, value, ty) => format!("cast {} to {}", addr(value), universe.display(ty)),
        }
    }

    fn render_address(&self, universe: &Universe, address: &Address) -> String {
        match address {
            Address::Empty => "_".into(),
            Address::Null => "null".into(),
            Address::Undefined => "undefined".into(),
            Address::Name(key) => match self.locals.get(key) {
                Some(local) => local.name.clone(),
                None => "<local>".into()
            },
            Address::Const(constant) => match constant {
                Constant::Int(value, ty) if !ty.signed => (*value as u64).to_string(),
                Constant::Int(value, _) => value.to_string(),
                Constant::Float(value, _) => format!("{value:?}"),
                Constant::Bool(value) => value.to_string(),
                Constant::Char(value) => format!("{value:?}"),
                Constant::Str(value) => format!("{value:?}"),
                Constant::Null => "null".into(),
                Constant::Undefined => "undefined".into(),
            },
            Address::Global(GlobalRef::Function(key)) => universe.functions[*key].qualified_name(universe),
            Address::Global(GlobalRef::Variable(key)) => {
                let global = &universe.globals[*key];
                format!("{}.{}", universe.modules[global.module].name, global.name)
            }
            Address::Ref(inner) => format!("&{}", self.render_address(universe, inner)),
            Address::Deref(inner) => format!("*{}", self.render_address(universe, inner)),
            Address::Arg(index) => format!("arg{index}"),
            Address::Temp(temp) => format!("t{}", temp.0),
        }
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add | BinaryOp::AddScalar => "+",
        BinaryOp::Sub | BinaryOp::SubScalar => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
    }
}
