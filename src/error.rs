use std::fmt::{self, Debug, Display, Formatter};
use thiserror::Error as ThisError;
use crate::source::{Source, Span};

/// The stable tag of a diagnostic. Codes 1 to 30 keep the numbering the driver and the
/// test runner already branch on; later kinds are appended and never renumbered.
#[repr(u16)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    Internal = 1,

    UnexpectedEof = 6,
    ExpectedButGot = 7,
    UnknownSymbol = 8,
    CharLitLen = 9,
    CouldNotParseStmt = 10,
    InvalidTypeIdent = 11,

    DuplicateDefinition = 12,
    NotDefined = 13,
    NotAccessibleWithOp = 14,
    IncompleteType = 15,
    BinInvalidTypes = 16,
    BinPtrInvalid = 17,
    UnaryRefRvalue = 18,
    UnaryDerefNonPtr = 19,
    UnaryOpNotDefined = 20,
    ReturnOutsideOfFunc = 21,
    WrongReturnType = 22,
    MissingReturn = 23,
    UsingOpOnTyDecl = 24,
    CallingNonFunction = 25,
    WrongNumberOfArgs = 26,
    WrongArgType = 27,
    InitNonStructType = 28,
    CouldNotInferType = 29,
    InvalidCast = 30,

    NotAccessible = 31,
    UnknownModule = 32,
    NoSuchMember = 33,
    AccessChain = 34,
    NotAssignable = 35,
    TypeNotAssignable = 36,
    AssignTypeMismatch = 37,
    VarDeclTypeMismatch = 38,
    WrongField = 39,
    FieldTypeMismatch = 40,
    MissingFields = 41,
    UnionInitArity = 42,
    IndexNonIndexable = 43,
    IndexWrongType = 44,
    DeleteNonPtr = 45,
    InvalidCondition = 46,
    OutsideOfLoop = 47,
    NotAllowedInLocalScope = 48,
    NotAllowedInGlobalScope = 49,
    ControlFlowInDefer = 50,
    DuplicateEnumEntry = 51,
    InvalidEnumStartType = 52,
    InvalidReceiver = 53,
    MethodOutsideTypeModule = 54,
    UnsizedField = 55,
    UnsizedParam = 56,
    UnsizedVariable = 57,
    UnsizedSizeof = 58,
    IntLiteralOutOfRange = 59,
    EnumValueOutOfRange = 60,
    TypeTooLarge = 61,
}

impl ErrorKind {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal",
            ErrorKind::UnexpectedEof => "UnexpectedEof",
            ErrorKind::ExpectedButGot => "ExpectedButGot",
            ErrorKind::UnknownSymbol => "UnknownSymbol",
            ErrorKind::CharLitLen => "CharLitLen",
            ErrorKind::CouldNotParseStmt => "CouldNotParseStmt",
            ErrorKind::InvalidTypeIdent => "InvalidTypeIdent",
            ErrorKind::DuplicateDefinition => "DuplicateDefinition",
            ErrorKind::NotDefined => "NotDefined",
            ErrorKind::NotAccessibleWithOp => "NotAccessibleWithOp",
            ErrorKind::IncompleteType => "IncompleteType",
            ErrorKind::BinInvalidTypes => "BinInvalidTypes",
            ErrorKind::BinPtrInvalid => "BinPtrInvalid",
            ErrorKind::UnaryRefRvalue => "UnaryRefRvalue",
            ErrorKind::UnaryDerefNonPtr => "UnaryDerefNonPtr",
            ErrorKind::UnaryOpNotDefined => "UnaryOpNotDefined",
            ErrorKind::ReturnOutsideOfFunc => "ReturnOutsideOfFunc",
            ErrorKind::WrongReturnType => "WrongReturnType",
            ErrorKind::MissingReturn => "MissingReturn",
            ErrorKind::UsingOpOnTyDecl => "UsingOpOnTyDecl",
            ErrorKind::CallingNonFunction => "CallingNonFunction",
            ErrorKind::WrongNumberOfArgs => "WrongNumberOfArgs",
            ErrorKind::WrongArgType => "WrongArgType",
            ErrorKind::InitNonStructType => "InitNonStructType",
            ErrorKind::CouldNotInferType => "CouldNotInferType",
            ErrorKind::InvalidCast => "InvalidCast",
            ErrorKind::NotAccessible => "NotAccessible",
            ErrorKind::UnknownModule => "UnknownModule",
            ErrorKind::NoSuchMember => "NoSuchMember",
            ErrorKind::AccessChain => "AccessChain",
            ErrorKind::NotAssignable => "NotAssignable",
            ErrorKind::TypeNotAssignable => "TypeNotAssignable",
            ErrorKind::AssignTypeMismatch => "AssignTypeMismatch",
            ErrorKind::VarDeclTypeMismatch => "VarDeclTypeMismatch",
            ErrorKind::WrongField => "WrongField",
            ErrorKind::FieldTypeMismatch => "FieldTypeMismatch",
            ErrorKind::MissingFields => "MissingFields",
            ErrorKind::UnionInitArity => "UnionInitArity",
            ErrorKind::IndexNonIndexable => "IndexNonIndexable",
            ErrorKind::IndexWrongType => "IndexWrongType",
            ErrorKind::DeleteNonPtr => "DeleteNonPtr",
            ErrorKind::InvalidCondition => "InvalidCondition",
            ErrorKind::OutsideOfLoop => "OutsideOfLoop",
            ErrorKind::NotAllowedInLocalScope => "NotAllowedInLocalScope",
            ErrorKind::NotAllowedInGlobalScope => "NotAllowedInGlobalScope",
            ErrorKind::ControlFlowInDefer => "ControlFlowInDefer",
            ErrorKind::DuplicateEnumEntry => "DuplicateEnumEntry",
            ErrorKind::InvalidEnumStartType => "InvalidEnumStartType",
            ErrorKind::InvalidReceiver => "InvalidReceiver",
            ErrorKind::MethodOutsideTypeModule => "MethodOutsideTypeModule",
            ErrorKind::UnsizedField => "UnsizedField",
            ErrorKind::UnsizedParam => "UnsizedParam",
            ErrorKind::UnsizedVariable => "UnsizedVariable",
            ErrorKind::UnsizedSizeof => "UnsizedSizeof",
            ErrorKind::IntLiteralOutOfRange => "IntLiteralOutOfRange",
            ErrorKind::EnumValueOutOfRange => "EnumValueOutOfRange",
            ErrorKind::TypeTooLarge => "TypeTooLarge",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A user-facing problem together with the names and rendered types it mentions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    UnexpectedEof,
    ExpectedButGot { expected: String, got: String },
    UnknownSymbol { symbol: String },
    CharLitLen,
    CouldNotParseStmt { text: String },
    InvalidTypeIdent { name: String },
    NotAType { name: String },

    DuplicateDefinition { name: String },
    NotDefined { name: String },
    NotAccessible { name: String, module: String },
    NotAccessibleWithOp { ty: String, op: &'static str },
    UnknownModule { path: String, builtin: bool },
    NoSuchMember { owner: String, member: String },
    AccessFirstSegment,
    AccessMemberNotIdent,

    IncompleteType { ty: String },
    RecursiveType { ty: String },
    UnsizedField,
    UnsizedParam,
    UnsizedVariable { ty: String },
    UnsizedSizeof { ty: String },
    UnsizedDeref { ty: String },
    TypeTooLarge { ty: String },

    BinInvalidTypes { lhs: String, rhs: String },
    BinPtrInvalid { op: &'static str, lhs: String, rhs: String },
    UnaryRefRvalue,
    UnaryDerefNonPtr { ty: String },
    UnaryOpNotDefined { op: &'static str, ty: String },

    NotAssignable,
    TypeNotAssignable { ty: String },
    AssignTypeMismatch { target: String, value: String },
    VarDeclTypeMismatch { declared: String, init: String },
    CouldNotInferType { name: String },
    UsingOpOnTyDecl { name: String },

    CallingNonFunction { ty: String },
    WrongNumberOfArgs { expected: usize, got: usize },
    WrongArgType { index: usize, expected: String, got: String },

    InitNonStructType { ty: String },
    WrongField { ty: String, field: String },
    FieldTypeMismatch { field: String, expected: String, got: String },
    MissingFields { ty: String, fields: Vec<String> },
    UnionInitArity { ty: String, got: usize },

    InvalidCast { from: String, to: String },
    IndexNonIndexable { ty: String },
    IndexWrongType { ty: String, index: String },
    DeleteNonPtr { ty: String },
    InvalidCondition { got: String },
    IntLiteralOutOfRange { value: i128, ty: String },

    ReturnOutsideOfFunc,
    WrongReturnType { expected: String, got: String },
    MissingReturnValue { expected: String },
    ReturnValueInVoid,
    MissingReturn { function: String },
    OutsideOfLoop { what: &'static str },
    NotAllowedInLocalScope { what: &'static str },
    NotAllowedInGlobalScope,
    ControlFlowInDefer { what: &'static str },

    DuplicateEnumEntry { entry: String, ty: String },
    InvalidEnumStartType { got: String, ty: String },
    EnumStartNotConstant { ty: String },
    EnumValueOutOfRange { value: i128, ty: String, backing: String },

    InvalidReceiver { method: String, ty: String },
    MethodOutsideTypeModule { ty: String, module: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedEof => ErrorKind::UnexpectedEof,
            Error::ExpectedButGot { .. } => ErrorKind::ExpectedButGot,
            Error::UnknownSymbol { .. } => ErrorKind::UnknownSymbol,
            Error::CharLitLen => ErrorKind::CharLitLen,
            Error::CouldNotParseStmt { .. } => ErrorKind::CouldNotParseStmt,
            Error::InvalidTypeIdent { .. } | Error::NotAType { .. } => ErrorKind::InvalidTypeIdent,
            Error::DuplicateDefinition { .. } => ErrorKind::DuplicateDefinition,
            Error::NotDefined { .. } => ErrorKind::NotDefined,
            Error::NotAccessible { .. } => ErrorKind::NotAccessible,
            Error::NotAccessibleWithOp { .. } => ErrorKind::NotAccessibleWithOp,
            Error::UnknownModule { .. } => ErrorKind::UnknownModule,
            Error::NoSuchMember { .. } => ErrorKind::NoSuchMember,
            Error::AccessFirstSegment | Error::AccessMemberNotIdent => ErrorKind::AccessChain,
            Error::IncompleteType { .. } | Error::RecursiveType { .. } | Error::UnsizedDeref { .. } => ErrorKind::IncompleteType,
            Error::UnsizedField => ErrorKind::UnsizedField,
            Error::UnsizedParam => ErrorKind::UnsizedParam,
            Error::UnsizedVariable { .. } => ErrorKind::UnsizedVariable,
            Error::UnsizedSizeof { .. } => ErrorKind::UnsizedSizeof,
            Error::TypeTooLarge { .. } => ErrorKind::TypeTooLarge,
            Error::IntLiteralOutOfRange { .. } => ErrorKind::IntLiteralOutOfRange,
            Error::EnumValueOutOfRange { .. } => ErrorKind::EnumValueOutOfRange,
            Error::BinInvalidTypes { .. } => ErrorKind::BinInvalidTypes,
            Error::BinPtrInvalid { .. } => ErrorKind::BinPtrInvalid,
            Error::UnaryRefRvalue => ErrorKind::UnaryRefRvalue,
            Error::UnaryDerefNonPtr { .. } => ErrorKind::UnaryDerefNonPtr,
            Error::UnaryOpNotDefined { .. } => ErrorKind::UnaryOpNotDefined,
            Error::NotAssignable => ErrorKind::NotAssignable,
            Error::TypeNotAssignable { .. } => ErrorKind::TypeNotAssignable,
            Error::AssignTypeMismatch { .. } => ErrorKind::AssignTypeMismatch,
            Error::VarDeclTypeMismatch { .. } => ErrorKind::VarDeclTypeMismatch,
            Error::CouldNotInferType { .. } => ErrorKind::CouldNotInferType,
            Error::UsingOpOnTyDecl { .. } => ErrorKind::UsingOpOnTyDecl,
            Error::CallingNonFunction { .. } => ErrorKind::CallingNonFunction,
            Error::WrongNumberOfArgs { .. } => ErrorKind::WrongNumberOfArgs,
            Error::WrongArgType { .. } => ErrorKind::WrongArgType,
            Error::InitNonStructType { .. } => ErrorKind::InitNonStructType,
            Error::WrongField { .. } => ErrorKind::WrongField,
            Error::FieldTypeMismatch { .. } => ErrorKind::FieldTypeMismatch,
            Error::MissingFields { .. } => ErrorKind::MissingFields,
            Error::UnionInitArity { .. } => ErrorKind::UnionInitArity,
            Error::InvalidCast { .. } => ErrorKind::InvalidCast,
            Error::IndexNonIndexable { .. } => ErrorKind::IndexNonIndexable,
            Error::IndexWrongType { .. } => ErrorKind::IndexWrongType,
            Error::DeleteNonPtr { .. } => ErrorKind::DeleteNonPtr,
            Error::InvalidCondition { .. } => ErrorKind::InvalidCondition,
            Error::ReturnOutsideOfFunc => ErrorKind::ReturnOutsideOfFunc,
            Error::WrongReturnType { .. } | Error::MissingReturnValue { .. } | Error::ReturnValueInVoid => ErrorKind::WrongReturnType,
            Error::MissingReturn { .. } => ErrorKind::MissingReturn,
            Error::OutsideOfLoop { .. } => ErrorKind::OutsideOfLoop,
            Error::NotAllowedInLocalScope { .. } => ErrorKind::NotAllowedInLocalScope,
            Error::NotAllowedInGlobalScope => ErrorKind::NotAllowedInGlobalScope,
            Error::ControlFlowInDefer { .. } => ErrorKind::ControlFlowInDefer,
            Error::DuplicateEnumEntry { .. } => ErrorKind::DuplicateEnumEntry,
            Error::InvalidEnumStartType { .. } | Error::EnumStartNotConstant { .. } => ErrorKind::InvalidEnumStartType,
            Error::InvalidReceiver { .. } => ErrorKind::InvalidReceiver,
            Error::MethodOutsideTypeModule { .. } => ErrorKind::MethodOutsideTypeModule,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEof => write!(f, "Unexpected end of file"),
            Error::ExpectedButGot { expected, got } => write!(f, "Expected '{expected}', but got '{got}'"),
            Error::UnknownSymbol { symbol } => write!(f, "Unknown symbol '{symbol}'"),
            Error::CharLitLen => write!(f, "Character literals must contain exactly one character"),
            Error::CouldNotParseStmt { text } => write!(f, "Could not parse statement: '{text}'"),
            Error::InvalidTypeIdent { name } => write!(f, "Invalid type identifier '{name}'"),
            Error::NotAType { name } => write!(f, "'{name}' does not name a type"),

            Error::DuplicateDefinition { name } => write!(f, "'{name}' is already defined in this scope"),
            Error::NotDefined { name } => write!(f, "'{name}' is not defined"),
            Error::NotAccessible { name, module } => write!(f, "Trying to access private symbol '{name}' from '{module}'"),
            Error::NotAccessibleWithOp { ty, op } => write!(f, "'{ty}' cannot be accessed with '{op}' operator"),
            Error::UnknownModule { path, builtin: false } => write!(f, "Could not find module '{path}'"),
            Error::UnknownModule { path, builtin: true } => write!(f, "Builtin module '{path}' was not checked before the modules importing it"),
            Error::NoSuchMember { owner, member } => write!(f, "'{owner}' has no member named '{member}'"),
            Error::AccessFirstSegment => write!(f, "The first element of an access chain must be an identifier"),
            Error::AccessMemberNotIdent => write!(f, "Expected a member name or method call after '.'"),

            Error::IncompleteType { ty } => write!(f, "The type '{ty}' is incomplete"),
            Error::RecursiveType { ty } => write!(f, "The type '{ty}' contains itself and can never be complete"),
            Error::UnsizedField => write!(f, "Fields may not be unsized"),
            Error::UnsizedParam => write!(f, "Function parameters may not be unsized"),
            Error::UnsizedVariable { ty } => write!(f, "Variables may not be of unsized type '{ty}'"),
            Error::UnsizedSizeof { ty } => write!(f, "Cannot take the size of unsized type '{ty}'"),
            Error::TypeTooLarge { ty } => write!(f, "The type '{ty}' is too large"),
            Error::UnsizedDeref { ty } => write!(f, "Cannot dereference a pointer to unsized type '{ty}'"),

            Error::BinInvalidTypes { lhs, rhs } => write!(f, "Invalid operator for types '{lhs}' and '{rhs}'"),
            Error::BinPtrInvalid { op, lhs, rhs } => write!(f, "Invalid pointer arithmetic '{op}' for types '{lhs}' and '{rhs}'"),
            Error::UnaryRefRvalue => write!(f, "Cannot take the address of an rvalue"),
            Error::UnaryDerefNonPtr { ty } => write!(f, "Cannot dereference non pointer type '{ty}'"),
            Error::UnaryOpNotDefined { op, ty } => write!(f, "Unary operator '{op}' is not defined for type '{ty}'"),

            Error::NotAssignable => write!(f, "The left hand side of an assignment must be a mutable lvalue"),
            Error::TypeNotAssignable { ty } => write!(f, "The type '{ty}' is not assignable"),
            Error::AssignTypeMismatch { target, value } => write!(f, "Cannot assign a value of type '{value}' to a target of type '{target}'"),
            Error::VarDeclTypeMismatch { declared, init } => write!(f, "Variable was declared with type '{declared}', but initialized with type '{init}'"),
            Error::CouldNotInferType { name } => write!(f, "Could not infer the type of '{name}'"),
            Error::UsingOpOnTyDecl { name } => write!(f, "'{name}' is a type or module and cannot be used as a value"),

            Error::CallingNonFunction { ty } => write!(f, "Calling non function type '{ty}'"),
            Error::WrongNumberOfArgs { expected, got } => write!(f, "Wrong number of arguments. Expected '{expected}', but got '{got}'"),
            Error::WrongArgType { index, expected, got } => write!(f, "Wrong type for argument {index}. Expected '{expected}', but got '{got}'"),

            Error::InitNonStructType { ty } => write!(f, "Cannot initialize non struct type '{ty}'"),
            Error::WrongField { ty, field } => write!(f, "'{ty}' has no field named '{field}'"),
            Error::FieldTypeMismatch { field, expected, got } => write!(f, "Wrong type for field '{field}'. Expected '{expected}', but got '{got}'"),
            Error::MissingFields { ty, fields } => {
                let rendered: Vec<_> = fields.iter().map(|f| format!("'{f}'")).collect();
                write!(f, "Fields {} were not supplied to initialize '{ty}'", rendered.join(", "))
            }
            Error::UnionInitArity { ty, got } => write!(f, "Union '{ty}' must be initialized with exactly one value, but got {got}"),

            Error::InvalidCast { from, to } => write!(f, "Cannot cast from '{from}' to '{to}'"),
            Error::IndexNonIndexable { ty } => write!(f, "Expression of type '{ty}' cannot be indexed"),
            Error::IndexWrongType { ty, index } => write!(f, "Expression of type '{ty}' cannot be indexed with type '{index}'"),
            Error::DeleteNonPtr { ty } => write!(f, "Trying to delete non pointer type: '{ty}'"),
            Error::InvalidCondition { got } => write!(f, "Invalid type for condition. Expected 'bool', but got '{got}'"),
            Error::IntLiteralOutOfRange { value, ty } => write!(f, "Integer literal '{value}' does not fit in '{ty}'"),

            Error::ReturnOutsideOfFunc => write!(f, "Return statements may not be used outside of functions"),
            Error::WrongReturnType { expected, got } => write!(f, "Wrong return type. Expected '{expected}', but got '{got}'"),
            Error::MissingReturnValue { expected } => write!(f, "Missing return value of type '{expected}'"),
            Error::ReturnValueInVoid => write!(f, "Trying to return a value inside a 'void' function"),
            Error::MissingReturn { function } => write!(f, "Function '{function}' does not return a value on every path"),
            Error::OutsideOfLoop { what } => write!(f, "{what} statements may not be used outside of loops"),
            Error::NotAllowedInLocalScope { what } => write!(f, "{what} outside the global scope is currently not allowed, this may change in a future release"),
            Error::NotAllowedInGlobalScope => write!(f, "Only declarations are allowed in the global scope"),
            Error::ControlFlowInDefer { what } => write!(f, "{what} statements may not be deferred"),

            Error::DuplicateEnumEntry { entry, ty } => write!(f, "Duplicate entry '{entry}' in enum '{ty}'"),
            Error::InvalidEnumStartType { got, ty } => write!(f, "Invalid enum start value type '{got}' in enum '{ty}'"),
            Error::EnumStartNotConstant { ty } => write!(f, "The start value of enum '{ty}' must be an integer literal"),
            Error::EnumValueOutOfRange { value, ty, backing } => write!(f, "Value '{value}' of enum '{ty}' does not fit in '{backing}'"),

            Error::InvalidReceiver { method, ty } => write!(f, "Method '{method}' must take 'self' of type '{ty}' or '*{ty}' as its first parameter"),
            Error::MethodOutsideTypeModule { ty, module } => write!(f, "Methods of '{ty}' may only be declared in module '{module}'"),
        }
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span
}

impl Diagnostic {
    pub fn new(error: Error, span: Span) -> Diagnostic {
        Diagnostic { kind: error.kind(), message: error.to_string(), span }
    }

    /// Renders the diagnostic, quoting the offending line when the source is at hand.
    pub fn render(&self, source: Option<&Source>) -> String {
        let mut rendered = format!("Error: {}\n", self.message);
        match source.and_then(|source| self.span.quote(source)) {
            Some((name, line)) => {
                rendered.push_str(&format!(" --> {}:{}\n", name, self.span));
                rendered.push_str(&format!("{: >4} | {}\n", self.span.line, line));
                let carets = "^".repeat(self.span.len.max(1) as usize);
                rendered.push_str(&format!("       {}{}\n", " ".repeat(self.span.col.saturating_sub(1) as usize), carets));
            }
            None => {
                rendered.push_str(&format!(" --> {}\n", self.span));
            }
        }
        rendered
    }
}

impl Span {
    fn quote<'s>(&self, source: &'s Source) -> Option<(&'s str, &'s str)> {
        source.line(self.line).map(|line| (source.name(), line))
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.span, self.message, self.kind)
    }
}

impl Debug for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Diagnostic({}, {:?}, {})", self.kind, self.message, self.span)
    }
}

/// A broken invariant between the checker and the MIR builder.
#[derive(ThisError, Debug, Clone, Eq, PartialEq)]
pub enum InternalError {
    #[error("lowered an expression that failed type checking")]
    ErrorNode,
    #[error("'{0}' used outside of a loop reached the MIR builder")]
    NoEnclosingLoop(&'static str),
    #[error("expression cannot be used as a place")]
    NotAPlace,
    #[error("jump to label {label} which was never placed in '{function}'")]
    UnresolvedLabel { function: String, label: u32 },
    #[error("label {label} placed twice in '{function}'")]
    DuplicateLabel { function: String, label: u32 },
    #[error("no type layout for '{0}'")]
    NoLayout(String),
}

impl InternalError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

#[derive(ThisError, Debug)]
pub enum CompileError {
    #[error("module '{module}' failed to check with {} error(s)", .diagnostics.len())]
    Diagnostics { module: String, diagnostics: Vec<Diagnostic> },
    #[error("internal compiler error: {0}")]
    Internal(#[from] InternalError),
}


#[cfg(test)]
mod test {
    use crate::error::{Diagnostic, Error, ErrorKind};
    use crate::source::{Source, Span};

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::Internal.code(), 1);
        assert_eq!(ErrorKind::DuplicateDefinition.code(), 12);
        assert_eq!(ErrorKind::WrongNumberOfArgs.code(), 26);
        assert_eq!(ErrorKind::InvalidCast.code(), 30);
        assert_eq!(ErrorKind::NotAccessible.code(), 31);
        assert_eq!(ErrorKind::TypeTooLarge.code(), 61);
    }

    #[test]
    fn messages_fill_templates() {
        let diag = Diagnostic::new(Error::WrongNumberOfArgs { expected: 1, got: 2 }, Span::new(1, 1, 1));
        assert_eq!(diag.kind, ErrorKind::WrongNumberOfArgs);
        assert_eq!(diag.message, "Wrong number of arguments. Expected '1', but got '2'");

        let diag = Diagnostic::new(Error::NotAccessibleWithOp { ty: "i32".into(), op: "." }, Span::default());
        assert_eq!(diag.message, "'i32' cannot be accessed with '.' operator");
    }

    #[test]
    fn several_errors_share_a_kind() {
        assert_eq!(Error::ReturnValueInVoid.kind(), ErrorKind::WrongReturnType);
        assert_eq!(Error::RecursiveType { ty: "a.A".into() }.kind(), ErrorKind::IncompleteType);
    }

    #[test]
    fn render_quotes_line() {
        let source = Source::from_text("main.kan", "def main() {\n    return 1;\n}");
        let diag = Diagnostic::new(Error::ReturnValueInVoid, Span::new(2, 5, 6));
        assert_eq!(
            diag.render(Some(&source)),
            "Error: Trying to return a value inside a 'void' function\n --> main.kan:2:5\n   2 |     return 1;\n           ^^^^^^\n"
        );
        assert_eq!(
            diag.render(None),
            "Error: Trying to return a value inside a 'void' function\n --> 2:5\n"
        );
    }
}
