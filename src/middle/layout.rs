//! Class layout resolver
//!
//! Objects are flat arrays of 4-byte slots. Field `i` (declaration order)
//! lives at byte offset `4 * i`. The order is fixed once here and read back by
//! field access, field assignment and constructor emission alike.

use log::debug;

use crate::frontend::env::Env;
use crate::middle::typed_ast::TypedProgram;
use crate::utils::{Error, Result};

/// Width of every value slot in linear memory
pub const SLOT_SIZE: u32 = 4;

/// Memory layout of one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLayout {
    fields: Vec<String>,
}

impl ClassLayout {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Byte offset of `field`, if the class has it
    pub fn offset_of(&self, field: &str) -> Option<u32> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| SLOT_SIZE * i as u32)
    }

    /// Bytes occupied by one instance
    pub fn size(&self) -> u32 {
        SLOT_SIZE * self.fields.len() as u32
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Attach a layout to every class of a checked program.
///
/// Returns a new environment; the one produced by the checker is left as is.
pub fn resolve_layouts(program: &TypedProgram, env: &Env) -> Result<Env> {
    let mut resolved = env.clone();
    for class in &program.classes {
        let sig = resolved
            .classes
            .get_mut(&class.name)
            .ok_or_else(|| Error::internal(format!("class {} missing from the environment", class.name)))?;
        let layout = ClassLayout::new(class.fields.iter().map(|f| f.name.clone()).collect());
        debug!("layout of {}: {:?} ({} bytes)", class.name, layout.fields(), layout.size());
        sig.layout = Some(layout);
    }
    Ok(resolved)
}
