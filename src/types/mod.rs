//! Type model shared by the checker and the code generator

pub mod type_system;

pub use type_system::{is_assignable, same_type, Type};
