//! Type System for the Python subset
//!
//! Four primitive types plus user-defined classes. `any` only shows up as the
//! declared parameter type of built-ins; inference never produces it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Result};

/// A resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Bool,
    None,
    /// Top type for built-in parameters (e.g. `print`)
    Any,
    /// Instance of a declared class, compared by name
    Object(String),
}

impl Type {
    pub fn object(name: &str) -> Self {
        Self::Object(name.to_string())
    }

    /// Class name if this is an object type
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::None => write!(f, "none"),
            Self::Any => write!(f, "any"),
            Self::Object(name) => write!(f, "{}", name),
        }
    }
}

/// Check whether a value of type `from` may be stored into a slot declared `to`.
///
/// Directional: `none` flows into anything but `int`/`bool`, primitives only
/// into themselves or `any`, objects only into the same class or `any`.
/// A value typed `any` never exists, so `from == Any` is an internal error.
pub fn is_assignable(to: &Type, from: &Type) -> Result<bool> {
    let ok = match from {
        Type::None => !matches!(to, Type::Int | Type::Bool),
        Type::Int => matches!(to, Type::Int | Type::Any),
        Type::Bool => matches!(to, Type::Bool | Type::Any),
        Type::Any => {
            return Err(Error::Internal(
                "value of type any reached an assignability check".to_string(),
            ))
        }
        Type::Object(name) => match to {
            Type::Any => true,
            Type::Object(target) => target == name,
            Type::Int | Type::Bool | Type::None => false,
        },
    };
    Ok(ok)
}

/// Exact type equality for operand matching. `any` on either side is an internal error.
pub fn same_type(a: &Type, b: &Type) -> Result<bool> {
    if matches!(a, Type::Any) || matches!(b, Type::Any) {
        return Err(Error::Internal("any type detected on an expression".to_string()));
    }
    Ok(a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_concrete() -> Vec<Type> {
        vec![Type::Int, Type::Bool, Type::None, Type::object("A"), Type::object("B")]
    }

    #[test]
    fn test_reflexive_for_concrete_types() {
        for t in all_concrete() {
            assert!(is_assignable(&t, &t).unwrap(), "{} should accept itself", t);
        }
    }

    #[test]
    fn test_none_source() {
        assert!(!is_assignable(&Type::Int, &Type::None).unwrap());
        assert!(!is_assignable(&Type::Bool, &Type::None).unwrap());
        assert!(is_assignable(&Type::None, &Type::None).unwrap());
        assert!(is_assignable(&Type::Any, &Type::None).unwrap());
        assert!(is_assignable(&Type::object("A"), &Type::None).unwrap());
    }

    #[test]
    fn test_primitive_sources() {
        for to in [Type::Bool, Type::None, Type::object("A")] {
            assert!(!is_assignable(&to, &Type::Int).unwrap());
        }
        for to in [Type::Int, Type::None, Type::object("A")] {
            assert!(!is_assignable(&to, &Type::Bool).unwrap());
        }
        assert!(is_assignable(&Type::Any, &Type::Int).unwrap());
        assert!(is_assignable(&Type::Any, &Type::Bool).unwrap());
    }

    #[test]
    fn test_object_source() {
        let a = Type::object("A");
        assert!(is_assignable(&Type::Any, &a).unwrap());
        assert!(!is_assignable(&Type::object("B"), &a).unwrap());
        assert!(!is_assignable(&Type::Int, &a).unwrap());
        assert!(!is_assignable(&Type::Bool, &a).unwrap());
        assert!(!is_assignable(&Type::None, &a).unwrap());
    }

    #[test]
    fn test_any_source_is_internal_error() {
        let err = is_assignable(&Type::Int, &Type::Any).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(same_type(&Type::Any, &Type::Int).is_err());
    }

    #[test]
    fn test_serde_shape() {
        assert_eq!(serde_json::to_string(&Type::Int).unwrap(), "\"int\"");
        assert_eq!(serde_json::to_string(&Type::object("C")).unwrap(), "{\"object\":\"C\"}");
        let t: Type = serde_json::from_str("{\"object\":\"Rat\"}").unwrap();
        assert_eq!(t, Type::object("Rat"));
    }
}
