//! Code Generation trait - Backend abstraction
//!
//! Backends consume the checked program together with the environment the
//! layout resolver produced.

use crate::frontend::env::Env;
use crate::middle::typed_ast::TypedProgram;
use crate::utils::Result;

/// Code generation backend trait
pub trait CodeGen {
    /// Generate the module text for a checked program
    fn generate(&mut self, program: &TypedProgram, env: &Env) -> Result<String>;

    /// Get the backend name
    fn name(&self) -> &str;
}
