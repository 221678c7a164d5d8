//! pywat - compiler core for a statically typed Python subset
//!
//! Takes the syntax tree of a program (integers, booleans, `None`, flat
//! classes, methods, `if`/`elif`/`else`) and produces a WebAssembly text
//! module for a JavaScript host.
//!
//! Pipeline: [`frontend::semantic`] checks the tree, [`middle::layout`]
//! fixes object layouts, [`backend::wat`] emits the module.

pub mod backend;
pub mod feedback;
pub mod frontend;
pub mod middle;
pub mod stdlib;
pub mod types;
pub mod utils;

use log::info;

pub use backend::{CodeGen, WatCodeGen};
pub use frontend::ast::Program;
pub use frontend::env::Env;
pub use frontend::semantic::TypeChecker;
pub use middle::typed_ast::TypedProgram;
pub use types::Type;
pub use utils::{Error, ErrorKind, Result};

/// Type check a program. Returns the typed tree and the top-level environment.
pub fn type_check(program: &Program) -> Result<(TypedProgram, Env)> {
    TypeChecker::new().check_program(program)
}

/// Compile a program to WebAssembly text
pub fn compile(program: &Program) -> Result<String> {
    let (typed, env) = type_check(program)?;
    info!("type check passed, program type {}", typed.ty);

    let env = middle::layout::resolve_layouts(&typed, &env)?;

    let mut codegen = WatCodeGen::new();
    let text = codegen.generate(&typed, &env)?;
    info!("{} backend produced {} bytes", codegen.name(), text.len());
    Ok(text)
}
