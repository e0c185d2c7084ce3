use phf::phf_set;
use tracing::debug;
use crate::ast;
use crate::error::{CompileError, Diagnostic, Error, InternalError};
use crate::lowering::{hir, lower, mir, type_check};
use crate::lowering::scope::ModuleInfo;
use crate::lowering::types::Universe;
use crate::source::Span;
use crate::util::pluralize;


#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    /// Size and alignment, in bytes, of pointers, strings and function values.
    pub pointer_size: u64,
    /// Stop recording diagnostics for a module after this many.
    pub max_diagnostics: Option<usize>
}

impl Default for Options {
    fn default() -> Self {
        Options { pointer_size: 8, max_diagnostics: None }
    }
}

static BUILTIN_MODULES: phf::Set<&'static str> = phf_set! {
    "io",
    "mem",
    "str",
    "math",
};

pub fn is_builtin_module(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    BUILTIN_MODULES.contains(path) || BUILTIN_MODULES.contains(name)
}


/// Checks and lowers modules one at a time, keeping every declaration seen so far so that
/// later modules can import earlier ones.
pub struct Compiler {
    universe: Universe,
    options: Options
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Compiler {
        Compiler { universe: Universe::new(options.pointer_size), options }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Checks a module whose imports have already been checked.
    pub fn check_module(&mut self, module: &ast::Module) -> Result<hir::Module, Vec<Diagnostic>> {
        if self.universe.module_by_path(&module.path).is_some() {
            let error = Error::DuplicateDefinition { name: module.path.clone() };
            return Err(vec![Diagnostic::new(error, Span::default())]);
        }
        let key = self.universe.modules.insert(ModuleInfo::new(&module.name, &module.path));
        type_check::check_module(&mut self.universe, &self.options, key, module)
    }

    pub fn lower_module(&self, module: &hir::Module) -> Result<mir::Program, InternalError> {
        lower::lower(&self.universe, module)
    }

    /// Checks and lowers `modules` in order, stopping at the first one with diagnostics.
    pub fn compile(&mut self, modules: &[ast::Module]) -> Result<Vec<mir::Program>, CompileError> {
        let mut programs = Vec::new();
        for module in modules {
            let checked = self.check_module(module)
                .map_err(|diagnostics| CompileError::Diagnostics { module: module.name.clone(), diagnostics })?;
            programs.push(self.lower_module(&checked)?);
        }
        debug!("compiled {}", pluralize("module", programs.len() as u64));
        Ok(programs)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}


#[cfg(test)]
mod test {
    use crate::compiler::*;
    use crate::error::ErrorKind;
    use crate::test_util::*;

    fn library() -> ast::Module {
        module("lib", vec![
            pub_(struct_("Point", vec![field("x", ty("i32")), field("y", ty("i32"))])),
            func("secret", vec![], Some(ty("i32")), vec![ret(Some(int(1)))]),
            pub_(func("shown", vec![], Some(ty("i32")), vec![ret(Some(int(2)))])),
        ])
    }

    #[test]
    fn builtin_modules() {
        assert!(is_builtin_module("io"));
        assert!(is_builtin_module("std/math"));
        assert!(!is_builtin_module("graphics"));
    }

    #[test]
    fn private_symbols_stay_private() {
        let mut compiler = Compiler::new();
        compiler.check_module(&library()).unwrap();
        let errors = compiler.check_module(&module("b", vec![
            import("lib", None),
            func("main", vec![], Some(ty("i32")), vec![
                ret(Some(access(ident("lib"), call(ident("secret"), vec![])))),
            ]),
        ])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NotAccessible);
        assert_eq!(errors[0].message, "Trying to access private symbol 'secret' from 'lib'");
    }

    #[test]
    fn imports_bind_public_symbols() {
        let mut compiler = Compiler::new();
        compiler.check_module(&library()).unwrap();
        let checked = compiler.check_module(&module("b", vec![
            import_items("lib", &["shown", "Point"]),
            func("main", vec![], Some(ty("i32")), vec![
                let_("p", Some(ty("lib.Point")), Some(init(ty("Point"), vec![("x", int(1)), ("y", int(2))]))),
                ret(Some(call(ident("shown"), vec![]))),
            ]),
        ]));
        assert!(checked.is_ok());
    }

    #[test]
    fn unknown_and_duplicate_modules() {
        let mut compiler = Compiler::new();
        let errors = compiler.check_module(&module("b", vec![import("missing", None), import("io", None)])).unwrap_err();
        let kinds: Vec<_> = errors.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::UnknownModule, ErrorKind::UnknownModule]);
        assert_eq!(errors[0].message, "Could not find module 'missing'");

        compiler.check_module(&library()).unwrap();
        let errors = compiler.check_module(&library()).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn methods_stay_in_their_type_module() {
        let mut compiler = Compiler::new();
        compiler.check_module(&library()).unwrap();
        let errors = compiler.check_module(&module("b", vec![
            import("lib", None),
            method("lib.Point", "norm", vec![param("self", ty("lib.Point"))], None, vec![]),
        ])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MethodOutsideTypeModule);
    }

    #[test]
    fn compile_stops_at_diagnostics() {
        let mut compiler = Compiler::new();
        let programs = compiler.compile(&[library()]).unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].functions.len(), 2);

        let bad = module("bad", vec![func("main", vec![], None, vec![expr(ident("nope"))])]);
        match compiler.compile(&[bad]) {
            Err(CompileError::Diagnostics { module, diagnostics }) => {
                assert_eq!(module, "bad");
                assert_eq!(diagnostics[0].kind, ErrorKind::NotDefined);
            }
            _ => panic!("expected diagnostics")
        }
    }
}
