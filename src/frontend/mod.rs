//! Frontend module - AST, type environment, semantic analysis

pub mod ast;
pub mod env;
pub mod semantic;
