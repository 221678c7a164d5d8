//! Built-in Functions Registry
//!
//! Built-ins exist twice: as checker signatures (`print`, `abs`, `min`,
//! `max`, `pow`) and as host imports the generated module links against.

use std::collections::HashMap;

use crate::frontend::env::FuncSig;
use crate::types::Type;

/// Built-in function signature
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinFunc {
    pub name: &'static str,
    pub params: Vec<Type>,
    pub ret_type: Type,
}

/// A function the host must supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostImport {
    /// Function identifier inside the module
    pub name: &'static str,
    /// Import module namespace
    pub module: &'static str,
    /// Import field name
    pub field: &'static str,
    /// Number of `i32` parameters
    pub params: usize,
    /// Whether it returns an `i32`
    pub returns: bool,
}

/// Trap called when a `none` reference is dereferenced
pub const NONE_TRAP: &str = "noneClassException";

/// Host imports, in the order they are declared in every module
pub const HOST_IMPORTS: [HostImport; 9] = [
    HostImport { name: NONE_TRAP, module: "additionalImports", field: "noneClassException", params: 0, returns: false },
    HostImport { name: "print", module: "imports", field: "print", params: 1, returns: true },
    HostImport { name: "print_num", module: "imports", field: "print_num", params: 1, returns: true },
    HostImport { name: "print_bool", module: "imports", field: "print_bool", params: 1, returns: true },
    HostImport { name: "print_none", module: "imports", field: "print_none", params: 1, returns: true },
    HostImport { name: "min", module: "imports", field: "min", params: 2, returns: true },
    HostImport { name: "abs", module: "imports", field: "abs", params: 1, returns: true },
    HostImport { name: "max", module: "imports", field: "max", params: 2, returns: true },
    HostImport { name: "pow", module: "imports", field: "pow", params: 2, returns: true },
];

/// Look up a host import by its function identifier
pub fn host_import(name: &str) -> Option<&'static HostImport> {
    HOST_IMPORTS.iter().find(|i| i.name == name)
}

/// Host print variant for a statically known argument type.
///
/// The VM has no runtime type tags, so the choice is made at compile time.
pub fn print_variant(arg: &Type) -> &'static str {
    match arg {
        Type::Int => "print_num",
        Type::Bool => "print_bool",
        Type::None => "print_none",
        Type::Any | Type::Object(_) => "print",
    }
}

/// Registry of all built-in functions
pub struct BuiltinRegistry {
    functions: HashMap<&'static str, BuiltinFunc>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register_all();
        registry
    }

    fn register_all(&mut self) {
        self.register(BuiltinFunc {
            name: "print",
            params: vec![Type::Any],
            ret_type: Type::None,
        });

        // Math
        self.register(BuiltinFunc {
            name: "abs",
            params: vec![Type::Int],
            ret_type: Type::Int,
        });
        for name in ["min", "max", "pow"] {
            self.register(BuiltinFunc {
                name,
                params: vec![Type::Int, Type::Int],
                ret_type: Type::Int,
            });
        }
    }

    fn register(&mut self, func: BuiltinFunc) {
        self.functions.insert(func.name, func);
    }

    /// Signatures in the shape the environment stores them
    pub fn signatures(&self) -> HashMap<String, FuncSig> {
        self.functions
            .values()
            .map(|f| {
                (
                    f.name.to_string(),
                    FuncSig {
                        params: f.params.clone(),
                        ret: f.ret_type.clone(),
                    },
                )
            })
            .collect()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}
