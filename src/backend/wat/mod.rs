//! WebAssembly text backend
//!
//! Lowers the checked program to a `.wat` module for a JavaScript host.

pub mod instr;
pub mod module;
mod wat_codegen;

pub use module::{WatFunc, WatModule};
pub use wat_codegen::WatCodeGen;
