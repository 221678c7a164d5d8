//! Type environment
//!
//! Every scope is a snapshot. Entering a class or a method clones the parent
//! and overlays the new bindings; nothing is ever written back to the parent,
//! so sibling methods never see each other's locals.

use std::collections::HashMap;

use crate::middle::layout::ClassLayout;
use crate::types::Type;
use crate::utils::{Error, Result};

/// A variable binding
#[derive(Debug, Clone, PartialEq)]
pub struct VarBinding {
    pub ty: Type,
    /// Bound by the current scope (top level, parameter or method local).
    /// Globals seen from inside a method have this cleared.
    pub assignable: bool,
}

/// Signature of a built-in function or a method (without `self`)
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Class signature collected by the shallow pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassSig {
    pub fields: HashMap<String, Type>,
    pub methods: HashMap<String, FuncSig>,
    /// Filled in by the layout resolver before code generation
    pub layout: Option<ClassLayout>,
}

impl ClassSig {
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&FuncSig> {
        self.methods.get(name)
    }

    pub fn has_constructor(&self) -> bool {
        self.methods.contains_key("__init__")
    }
}

/// Scoped symbol table threaded through checking and code generation
#[derive(Debug, Clone, PartialEq)]
pub struct Env {
    pub vars: HashMap<String, VarBinding>,
    pub classes: HashMap<String, ClassSig>,
    pub functions: HashMap<String, FuncSig>,
    /// Declared return type of the enclosing method (`none` at top level)
    pub return_type: Type,
    /// Enclosing class name; `None` at top level
    pub scope_name: Option<String>,
}

impl Env {
    /// Top-level environment
    pub fn new(
        vars: HashMap<String, VarBinding>,
        classes: HashMap<String, ClassSig>,
        functions: HashMap<String, FuncSig>,
    ) -> Self {
        Self {
            vars,
            classes,
            functions,
            return_type: Type::None,
            scope_name: None,
        }
    }

    pub fn var(&self, name: &str) -> Option<&VarBinding> {
        self.vars.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassSig> {
        self.classes.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FuncSig> {
        self.functions.get(name)
    }

    pub fn in_method(&self) -> bool {
        self.scope_name.is_some()
    }

    /// Scope for the body of class `name`: every inherited variable becomes
    /// read-only, and the scope is named after the class.
    pub fn enter_class(&self, name: &str) -> Env {
        let vars = self
            .vars
            .iter()
            .map(|(k, b)| {
                (
                    k.clone(),
                    VarBinding {
                        ty: b.ty.clone(),
                        assignable: false,
                    },
                )
            })
            .collect();
        Env {
            vars,
            classes: self.classes.clone(),
            functions: self.functions.clone(),
            return_type: Type::None,
            scope_name: Some(name.to_string()),
        }
    }

    /// Scope for a method body: parameters then locals are bound as
    /// assignable, and the declared return type becomes current.
    ///
    /// A name bound twice within the method is an error; shadowing a global is not.
    pub fn enter_method<'a, P, L>(&self, ret: &Type, params: P, locals: L) -> Result<Env>
    where
        P: IntoIterator<Item = (&'a str, &'a Type)>,
        L: IntoIterator<Item = (&'a str, &'a Type)>,
    {
        let mut env = self.clone();
        env.return_type = ret.clone();

        for (name, ty) in params {
            env.bind_local("parameter", name, ty)?;
        }
        for (name, ty) in locals {
            env.bind_local("variable", name, ty)?;
        }
        Ok(env)
    }

    fn bind_local(&mut self, what: &'static str, name: &str, ty: &Type) -> Result<()> {
        if self.vars.get(name).is_some_and(|b| b.assignable) {
            return Err(Error::DuplicateDefinition {
                what,
                name: name.to_string(),
                scope: None,
            });
        }
        self.vars.insert(
            name.to_string(),
            VarBinding {
                ty: ty.clone(),
                assignable: true,
            },
        );
        Ok(())
    }

    /// Whether `name` refers to module-level storage from this scope.
    ///
    /// At top level everything is global; inside a method a name is global
    /// unless a parameter or local shadows it.
    pub fn is_global(&self, name: &str) -> Result<bool> {
        if !self.in_method() {
            return Ok(true);
        }
        match self.vars.get(name) {
            Some(binding) => Ok(!binding.assignable),
            None => Err(Error::internal(format!("unbound variable {} reached code generation", name))),
        }
    }
}
