//! Semantic analysis and MIR construction for the Kan language.
//!
//! A parsed [`ast::Module`] is checked against the modules compiled before it, producing a typed
//! [`lowering::hir::Module`] or a list of diagnostics, and is then lowered to the flat
//! [`lowering::mir::Program`] form.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lowering;
pub mod source;
mod util;

#[cfg(test)]
mod test_util;

pub use compiler::{Compiler, Options};
