pub mod types;
pub mod scope;
pub mod hir;
pub mod type_check;
pub mod mir;
pub mod lower;
