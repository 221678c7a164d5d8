//! Standard library surface: built-ins and host imports

pub mod builtins;

pub use builtins::BuiltinRegistry;
