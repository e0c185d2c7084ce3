use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::Error;
use crate::lowering::hir::LocalKey;
use crate::lowering::types::{DeclBody, DeclKey, FunctionType, ModuleKey, Type, Universe};
use crate::source::Span;

new_key_type! {
    pub struct FunctionKey;
    pub struct GlobalKey;
    pub struct ScopeKey;
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Storage {
    Local(LocalKey),
    Global(GlobalKey),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Symbol {
    Variable { ty: Type, mutable: bool, storage: Storage, is_public: bool },
    Function(FunctionKey),
    TypeDecl { ty: Type, is_public: bool },
    Module { key: ModuleKey, path: String, is_public: bool },
}

impl Symbol {
    pub fn is_public(&self, universe: &Universe) -> bool {
        match self {
            Symbol::Variable { is_public, .. } => *is_public,
            Symbol::Function(key) => universe.functions[*key].is_public,
            Symbol::TypeDecl { is_public, .. } => *is_public,
            Symbol::Module { is_public, .. } => *is_public,
        }
    }
}

/// What a qualified path can resolve to: a symbol, or an entry of an enum.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Member {
    Symbol(Symbol),
    EnumEntry { decl: DeclKey, value: i64 },
}

pub struct ModuleInfo {
    pub name: String,
    pub path: String,
    /// The module's top-level symbols. Frozen once the module has been checked.
    pub symbols: IndexMap<String, Symbol>,
    pub checked: bool
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> ModuleInfo {
        ModuleInfo { name: name.into(), path: path.into(), symbols: IndexMap::new(), checked: false }
    }
}

pub struct FunctionInfo {
    pub name: String,
    pub module: ModuleKey,
    pub ty: FunctionType,
    pub receiver: Option<DeclKey>,
    pub is_public: bool,
    pub is_extern: bool,
    pub span: Span
}

impl FunctionInfo {
    /// The name the function is emitted under: `module.name` or `module.Type.name`.
    pub fn qualified_name(&self, universe: &Universe) -> String {
        let module = &universe.modules[self.module].name;
        match self.receiver {
            Some(decl) => format!("{module}.{}.{}", universe.decls[decl].name, self.name),
            None if self.is_extern => self.name.clone(),
            None => format!("{module}.{}", self.name)
        }
    }
}

pub struct GlobalInfo {
    pub name: String,
    pub module: ModuleKey,
    pub ty: Type,
    pub mutable: bool,
    pub is_public: bool
}

struct Scope {
    parent: Option<ScopeKey>,
    symbols: IndexMap<String, Symbol>
}

/// The lexical scopes of one module, linked from innermost to the module scope.
pub struct Scopes {
    scopes: SlotMap<ScopeKey, Scope>,
    root: ScopeKey
}

impl Scopes {
    pub fn new() -> Scopes {
        let mut scopes = SlotMap::with_key();
        let root = scopes.insert(Scope { parent: None, symbols: IndexMap::new() });
        Scopes { scopes, root }
    }

    pub fn root(&self) -> ScopeKey {
        self.root
    }

    pub fn push(&mut self, parent: ScopeKey) -> ScopeKey {
        self.scopes.insert(Scope { parent: Some(parent), symbols: IndexMap::new() })
    }

    pub fn pop(&mut self, scope: ScopeKey) {
        self.scopes.remove(scope);
    }

    pub fn declare(&mut self, scope: ScopeKey, name: &str, symbol: Symbol) -> Result<(), Error> {
        let symbols = &mut self.scopes[scope].symbols;
        if symbols.contains_key(name) {
            return Err(Error::DuplicateDefinition { name: name.to_owned() });
        }
        symbols.insert(name.to_owned(), symbol);
        Ok(())
    }

    /// Replaces the symbol bound to `name` in this scope.
    pub fn redeclare(&mut self, scope: ScopeKey, name: &str, symbol: Symbol) {
        self.scopes[scope].symbols.insert(name.to_owned(), symbol);
    }

    /// Looks `name` up in this scope only.
    pub fn get_local(&self, scope: ScopeKey, name: &str) -> Option<&Symbol> {
        self.scopes[scope].symbols.get(name)
    }

    pub fn resolve(&self, scope: ScopeKey, name: &str) -> Result<&Symbol, Error> {
        let mut curr = Some(scope);
        while let Some(key) = curr {
            let scope = &self.scopes[key];
            if let Some(symbol) = scope.symbols.get(name) {
                return Ok(symbol);
            }
            curr = scope.parent;
        }
        Err(Error::NotDefined { name: name.to_owned() })
    }

    /// Resolves `path[0]` in the scope chain and each later segment as a member of the previous one.
    pub fn resolve_qualified(&self, universe: &Universe, from: ModuleKey, scope: ScopeKey, path: &[String]) -> Result<Member, Error> {
        let (first, rest) = path.split_first()
            .ok_or_else(|| Error::NotDefined { name: String::new() })?;
        let mut member = Member::Symbol(self.resolve(scope, first)?.clone());
        for name in rest {
            member = resolve_member(universe, from, &member, name)?;
        }
        Ok(member)
    }

    pub fn into_root_symbols(mut self) -> IndexMap<String, Symbol> {
        self.scopes.remove(self.root)
            .map(|scope| scope.symbols)
            .unwrap_or_default()
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes::new()
    }
}

/// Resolves `name` inside a module, or as a method or enum entry of a declared type.
pub fn resolve_member(universe: &Universe, from: ModuleKey, owner: &Member, name: &str) -> Result<Member, Error> {
    match owner {
        Member::Symbol(Symbol::Module { key, .. }) => {
            let module = &universe.modules[*key];
            let symbol = module.symbols.get(name)
                .ok_or_else(|| Error::NotDefined { name: format!("{}.{}", module.name, name) })?;
            if *key != from && !symbol.is_public(universe) {
                return Err(Error::NotAccessible { name: name.to_owned(), module: module.name.clone() });
            }
            Ok(Member::Symbol(symbol.clone()))
        }
        Member::Symbol(Symbol::TypeDecl { ty, .. }) => {
            let Some(decl_key) = ty.decl() else {
                return Err(Error::NotAccessibleWithOp { ty: universe.display(ty), op: "." });
            };
            let decl = &universe.decls[decl_key];
            if let DeclBody::Enum(Some(body)) = &decl.body {
                if let Some(value) = body.entries.get(name) {
                    return Ok(Member::EnumEntry { decl: decl_key, value: *value });
                }
            }
            if let Some(method) = decl.methods.get(name) {
                let info = &universe.functions[*method];
                if info.module != from && !info.is_public {
                    return Err(Error::NotAccessible { name: name.to_owned(), module: universe.modules[info.module].name.clone() });
                }
                return Ok(Member::Symbol(Symbol::Function(*method)));
            }
            Err(Error::NoSuchMember { owner: decl.qualified_name(), member: name.to_owned() })
        }
        Member::Symbol(Symbol::Variable { ty, .. }) => {
            Err(Error::NotAccessibleWithOp { ty: universe.display(ty), op: "." })
        }
        Member::Symbol(Symbol::Function(key)) => {
            let ty = Type::Function(universe.functions[*key].ty.clone());
            Err(Error::NotAccessibleWithOp { ty: universe.display(&ty), op: "." })
        }
        Member::EnumEntry { decl, .. } => {
            Err(Error::NotAccessibleWithOp { ty: universe.decls[*decl].qualified_name(), op: "." })
        }
    }
}


#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use crate::error::{Error, ErrorKind};
    use crate::lowering::scope::*;
    use crate::lowering::types::{DeclBody, EnumBody, IntType, TypeDecl};

    fn var(ty: Type, is_public: bool) -> Symbol {
        Symbol::Variable { ty, mutable: false, storage: Storage::Global(GlobalKey::default()), is_public }
    }

    #[test]
    fn duplicate_only_in_same_scope() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        assert!(scopes.declare(root, "x", var(Type::Bool, false)).is_ok());
        let err = scopes.declare(root, "x", var(Type::Bool, false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDefinition);

        let child = scopes.push(root);
        assert!(scopes.declare(child, "x", var(Type::Char, false)).is_ok());
        assert_eq!(scopes.resolve(child, "x").unwrap(), &var(Type::Char, false));
        scopes.pop(child);
        assert_eq!(scopes.resolve(root, "x").unwrap(), &var(Type::Bool, false));
    }

    #[test]
    fn resolve_walks_outward() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.declare(root, "outer", var(Type::Bool, false)).unwrap();
        let a = scopes.push(root);
        let b = scopes.push(a);
        assert!(scopes.resolve(b, "outer").is_ok());
        assert_eq!(scopes.resolve(b, "missing"), Err(Error::NotDefined { name: "missing".into() }));
        assert!(scopes.get_local(b, "outer").is_none());
    }

    #[test]
    fn qualified_respects_visibility() {
        let mut universe = Universe::new(8);
        let lib = universe.modules.insert(ModuleInfo::new("lib", "lib"));
        let main = universe.modules.insert(ModuleInfo::new("main", "main"));
        universe.modules[lib].symbols.insert("hidden".into(), var(Type::Bool, false));
        universe.modules[lib].symbols.insert("shown".into(), var(Type::Bool, true));
        let color = universe.decls.insert(TypeDecl {
            name: "Color".into(),
            module: lib,
            module_name: "lib".into(),
            is_public: true,
            body: DeclBody::Enum(Some(EnumBody {
                backing: IntType::I32,
                entries: IndexMap::from([("Red".to_owned(), 0), ("Green".to_owned(), 1)])
            })),
            methods: IndexMap::new(),
            span: Span::default()
        });
        universe.modules[lib].symbols.insert("Color".into(), Symbol::TypeDecl { ty: Type::Enum(color), is_public: true });

        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.declare(root, "lib", Symbol::Module { key: lib, path: "lib".into(), is_public: false }).unwrap();

        let path = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            scopes.resolve_qualified(&universe, main, root, &path(&["lib", "hidden"])),
            Err(Error::NotAccessible { name: "hidden".into(), module: "lib".into() })
        );
        assert_eq!(
            scopes.resolve_qualified(&universe, main, root, &path(&["lib", "shown"])),
            Ok(Member::Symbol(var(Type::Bool, true)))
        );
        assert_eq!(
            scopes.resolve_qualified(&universe, main, root, &path(&["lib", "Color", "Green"])),
            Ok(Member::EnumEntry { decl: color, value: 1 })
        );
        let err = scopes.resolve_qualified(&universe, main, root, &path(&["lib", "shown", "x"])).unwrap_err();
        assert_eq!(err, Error::NotAccessibleWithOp { ty: "bool".into(), op: "." });
        let err = scopes.resolve_qualified(&universe, main, root, &path(&["lib", "missing"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotDefined);
    }
}
