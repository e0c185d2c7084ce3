use indexmap::IndexMap;
use phf::phf_map;
use slotmap::{new_key_type, SlotMap};
use crate::lowering::scope::{FunctionInfo, FunctionKey, GlobalInfo, GlobalKey, ModuleInfo};
use crate::source::Span;
use crate::util::map_join;

new_key_type! {
    pub struct ModuleKey;
    pub struct DeclKey;
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct IntType {
    pub signed: bool,
    pub bits: u8
}

impl IntType {
    pub const I32: IntType = IntType { signed: true, bits: 32 };
    pub const I64: IntType = IntType { signed: true, bits: 64 };
    pub const U64: IntType = IntType { signed: false, bits: 64 };

    pub fn min(self) -> i128 {
        if self.signed { -(1i128 << (self.bits - 1)) } else { 0 }
    }

    pub fn max(self) -> i128 {
        if self.signed { (1i128 << (self.bits - 1)) - 1 } else { (1i128 << self.bits) - 1 }
    }

    pub fn contains(self, value: i128) -> bool {
        self.min() <= value && value <= self.max()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FloatType {
    pub bits: u8
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
    pub variadic: bool
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Error,
    Pointer(Box<Type>),
    Array(Box<Type>, u64),
    Bool,
    Int(IntType),
    Float(FloatType),
    Void,
    String,
    Char,
    Function(FunctionType),
    Module(ModuleKey),
    Struct(DeclKey),
    Enum(DeclKey),
    Union(DeclKey),
}

impl Type {
    pub fn ptr(to: Type) -> Type {
        Type::Pointer(Box::new(to))
    }

    pub fn void_ptr() -> Type {
        Type::ptr(Type::Void)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int(_) | Type::Float(_))
    }

    pub fn is_void_ptr(&self) -> bool {
        matches!(self, Type::Pointer(inner) if **inner == Type::Void)
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None
        }
    }

    pub fn decl(&self) -> Option<DeclKey> {
        match self {
            Type::Struct(key) | Type::Enum(key) | Type::Union(key) => Some(*key),
            _ => None
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Primitive {
    Bool,
    Char,
    String,
    Void,
    Int(IntType),
    Float(FloatType),
}

pub static PRIMITIVES: phf::Map<&'static str, Primitive> = phf_map! {
    "bool" => Primitive::Bool,
    "char" => Primitive::Char,
    "string" => Primitive::String,
    "void" => Primitive::Void,
    "i8" => Primitive::Int(IntType { signed: true, bits: 8 }),
    "i16" => Primitive::Int(IntType { signed: true, bits: 16 }),
    "i32" => Primitive::Int(IntType { signed: true, bits: 32 }),
    "i64" => Primitive::Int(IntType { signed: true, bits: 64 }),
    "u8" => Primitive::Int(IntType { signed: false, bits: 8 }),
    "u16" => Primitive::Int(IntType { signed: false, bits: 16 }),
    "u32" => Primitive::Int(IntType { signed: false, bits: 32 }),
    "u64" => Primitive::Int(IntType { signed: false, bits: 64 }),
    "f32" => Primitive::Float(FloatType { bits: 32 }),
    "f64" => Primitive::Float(FloatType { bits: 64 }),
};

impl Primitive {
    pub fn to_type(self) -> Type {
        match self {
            Primitive::Bool => Type::Bool,
            Primitive::Char => Type::Char,
            Primitive::String => Type::String,
            Primitive::Void => Type::Void,
            Primitive::Int(it) => Type::Int(it),
            Primitive::Float(ft) => Type::Float(ft),
        }
    }
}

pub fn primitive(name: &str) -> Option<Type> {
    PRIMITIVES.get(name).map(|p| p.to_type())
}

/// Structural equality, except that declared types compare by identity.
pub fn types_equal(a: &Type, b: &Type) -> bool {
    a == b
}

/// Whether a value of type `from` may be stored where a `to` is expected without a cast.
pub fn assignable(from: &Type, to: &Type) -> bool {
    if from.is_error() || to.is_error() {
        return true;
    }
    if types_equal(from, to) {
        return true;
    }
    matches!((from, to), (Type::Pointer(_), Type::Pointer(_))) && (from.is_void_ptr() || to.is_void_ptr())
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CastKind {
    Bitcast,
    Numeric
}

pub fn cast_kind(from: &Type, to: &Type) -> Option<CastKind> {
    match (from, to) {
        (Type::Pointer(_), Type::Pointer(_)) => Some(CastKind::Bitcast),
        (Type::Pointer(_), Type::Int(_)) | (Type::Int(_), Type::Pointer(_)) => Some(CastKind::Bitcast),

        (Type::Int(_) | Type::Float(_), Type::Int(_) | Type::Float(_)) => Some(CastKind::Numeric),
        (Type::Char, Type::Int(_)) | (Type::Int(_), Type::Char) => Some(CastKind::Numeric),
        (Type::Enum(_), Type::Int(_)) | (Type::Int(_), Type::Enum(_)) => Some(CastKind::Numeric),
        _ => None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumBody {
    pub backing: IntType,
    pub entries: IndexMap<String, i64>
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclBody {
    Struct(Option<IndexMap<String, Type>>),
    Union(Option<IndexMap<String, Type>>),
    Enum(Option<EnumBody>),
}

impl DeclBody {
    pub fn is_defined(&self) -> bool {
        match self {
            DeclBody::Struct(fields) | DeclBody::Union(fields) => fields.is_some(),
            DeclBody::Enum(body) => body.is_some(),
        }
    }

    pub fn fields(&self) -> Option<&IndexMap<String, Type>> {
        match self {
            DeclBody::Struct(fields) | DeclBody::Union(fields) => fields.as_ref(),
            DeclBody::Enum(_) => None
        }
    }
}

#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: String,
    pub module: ModuleKey,
    pub module_name: String,
    pub is_public: bool,
    pub body: DeclBody,
    pub methods: IndexMap<String, FunctionKey>,
    pub span: Span
}

impl TypeDecl {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module_name, self.name)
    }

    pub fn as_type(&self, key: DeclKey) -> Type {
        match self.body {
            DeclBody::Struct(_) => Type::Struct(key),
            DeclBody::Union(_) => Type::Union(key),
            DeclBody::Enum(_) => Type::Enum(key),
        }
    }
}

/// Every entity declared by the modules checked so far.
pub struct Universe {
    pub modules: SlotMap<ModuleKey, ModuleInfo>,
    pub decls: SlotMap<DeclKey, TypeDecl>,
    pub functions: SlotMap<FunctionKey, FunctionInfo>,
    pub globals: SlotMap<GlobalKey, GlobalInfo>,
    pub pointer_size: u64
}

impl Universe {
    pub fn new(pointer_size: u64) -> Universe {
        Universe {
            modules: SlotMap::with_key(),
            decls: SlotMap::with_key(),
            functions: SlotMap::with_key(),
            globals: SlotMap::with_key(),
            pointer_size
        }
    }

    pub fn module_by_path(&self, path: &str) -> Option<ModuleKey> {
        self.modules.iter()
            .find(|(_, info)| info.path == path)
            .map(|(key, _)| key)
    }

    pub fn display(&self, ty: &Type) -> String {
        match ty {
            Type::Error => "<error>".into(),
            Type::Pointer(inner) => format!("*{}", self.display(inner)),
            Type::Array(elem, len) => format!("[{len}]{}", self.display(elem)),
            Type::Bool => "bool".into(),
            Type::Int(IntType { signed, bits }) => if *signed { format!("i{bits}") } else { format!("u{bits}") },
            Type::Float(FloatType { bits }) => format!("f{bits}"),
            Type::Void => "void".into(),
            Type::String => "string".into(),
            Type::Char => "char".into(),
            Type::Function(FunctionType { params, ret, variadic }) => {
                let mut rendered = map_join(params, |p| self.display(p));
                if *variadic {
                    rendered.push_str(if params.is_empty() { "..." } else { ", ..." });
                }
                format!("fn({rendered}): {}", self.display(ret))
            }
            Type::Module(key) => format!("module {}", self.modules[*key].name),
            Type::Struct(key) | Type::Enum(key) | Type::Union(key) => self.decls[*key].qualified_name(),
        }
    }

    pub fn is_complete(&self, ty: &Type) -> bool {
        match ty {
            Type::Void | Type::Module(_) => false,
            Type::Struct(key) | Type::Enum(key) | Type::Union(key) => self.decls[*key].body.is_defined(),
            Type::Array(elem, _) => self.is_complete(elem),
            _ => true
        }
    }

    pub fn field(&self, key: DeclKey, name: &str) -> Option<(usize, &Type)> {
        let fields = self.decls[key].body.fields()?;
        fields.get_full(name).map(|(index, _, ty)| (index, ty))
    }

    pub fn enum_body(&self, key: DeclKey) -> Option<&EnumBody> {
        match &self.decls[key].body {
            DeclBody::Enum(body) => body.as_ref(),
            _ => None
        }
    }

    /// Whether `key` contains itself by value, directly or through other declared types.
    pub fn is_recursive(&self, key: DeclKey) -> bool {
        let mut visited = Vec::new();
        match self.decls[key].body.fields() {
            Some(fields) => fields.values().any(|ty| self.reaches_helper(ty, key, &mut visited)),
            None => false
        }
    }

    fn reaches_helper(&self, ty: &Type, target: DeclKey, visited: &mut Vec<DeclKey>) -> bool {
        match ty {
            Type::Array(elem, _) => self.reaches_helper(elem, target, visited),
            Type::Struct(key) | Type::Union(key) => {
                if *key == target {
                    return true;
                }
                if visited.contains(key) {
                    return false;
                }

                visited.push(*key);
                match self.decls[*key].body.fields() {
                    Some(fields) => fields.values().any(|ty| self.reaches_helper(ty, target, visited)),
                    None => false
                }
            }
            _ => false
        }
    }

    pub fn size_of(&self, ty: &Type) -> Option<u64> {
        self.layout_helper(ty, &mut Vec::new()).map(|(size, _)| size)
    }

    pub fn align_of(&self, ty: &Type) -> Option<u64> {
        self.layout_helper(ty, &mut Vec::new()).map(|(_, align)| align)
    }

    fn layout_helper(&self, ty: &Type, visited: &mut Vec<DeclKey>) -> Option<(u64, u64)> {
        match ty {
            Type::Error | Type::Void | Type::Module(_) => None,
            Type::Bool | Type::Char => Some((1, 1)),
            Type::Int(IntType { bits, .. }) | Type::Float(FloatType { bits }) => {
                let bytes = (*bits as u64) / 8;
                Some((bytes, bytes))
            }
            Type::Pointer(_) | Type::String | Type::Function(_) => Some((self.pointer_size, self.pointer_size)),
            Type::Array(elem, len) => {
                let (size, align) = self.layout_helper(elem, visited)?;
                Some((size.checked_mul(*len)?, align))
            }
            Type::Enum(key) => {
                let backing = self.enum_body(*key)?.backing;
                let bytes = (backing.bits as u64) / 8;
                Some((bytes, bytes))
            }
            Type::Struct(key) | Type::Union(key) => {
                if visited.contains(key) {
                    return None;
                }
                let fields = self.decls[*key].body.fields()?;

                visited.push(*key);
                let mut size = 0;
                let mut align = 1;
                for field in fields.values() {
                    let (field_size, field_align) = self.layout_helper(field, visited)?;
                    align = align.max(field_align);
                    if matches!(ty, Type::Union(_)) {
                        size = size.max(field_size);
                    } else {
                        size = round_up(size, field_align)?.checked_add(field_size)?;
                    }
                }
                visited.pop();
                Some((round_up(size, align)?, align))
            }
        }
    }
}

/// `None` when the rounded value does not fit in a `u64`.
fn round_up(value: u64, align: u64) -> Option<u64> {
    Some(value.checked_add(align - 1)? / align * align)
}
