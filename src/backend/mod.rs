//! Backend module - Code generation

pub mod codegen;

// WebAssembly text backend
pub mod wat;

pub use codegen::CodeGen;
pub use wat::WatCodeGen;
