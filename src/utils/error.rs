//! Error handling for the compiler core

use thiserror::Error;

use crate::types::Type;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error family, used by callers to tell user mistakes from compiler bugs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input program is ill-typed
    Type,
    /// An invariant of the compiler itself was violated
    Internal,
}

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Name Resolution ====================

    #[error("TYPE ERROR: Variable {name} not defined")]
    UndefinedVariable { name: String },

    #[error("TYPE ERROR: Variable {name} is not defined in the scope")]
    NotAssignableHere { name: String },

    #[error("TYPE ERROR: Function {name} not defined")]
    UndefinedFunction { name: String },

    #[error("TYPE ERROR: class {name} does not exist")]
    UndefinedClass { name: String },

    #[error("TYPE ERROR: {class} does not have method {method}")]
    UnknownMethod { class: String, method: String },

    #[error("TYPE ERROR: Class {class} does not have a field {field}")]
    UnknownField { class: String, field: String },

    #[error("TYPE ERROR: Type {ty} cannot be used in a declaration")]
    InvalidDeclaredType { ty: Type },

    #[error("TYPE ERROR: Duplicate definition of {what} {name}{}", scope_suffix(.scope))]
    DuplicateDefinition {
        what: &'static str,
        name: String,
        scope: Option<String>,
    },

    // ==================== Typing ====================

    #[error("TYPE ERROR: Cannot assign type {got} to {expected}")]
    TypeMismatch { expected: Type, got: Type },

    #[error("TYPE ERROR: Expected argument of type {expected} for argument {index} of {callee}, got {got}")]
    ArgumentMismatch {
        callee: String,
        index: usize,
        expected: Type,
        got: Type,
    },

    #[error("TYPE ERROR: {callee} expected {expected} arguments, got {got}")]
    ArgCountMismatch {
        callee: String,
        expected: usize,
        got: usize,
    },

    #[error("TYPE ERROR: \"{op}\" operation is not defined on type {ty}")]
    InvalidUnaryOperand { op: String, ty: Type },

    #[error("TYPE ERROR: Cannot apply {op} on {lhs} and {rhs}")]
    InvalidBinaryOperands { op: String, lhs: Type, rhs: Type },

    #[error("TYPE ERROR: Cannot access {member} of non-object type {ty}")]
    NotAnObject { member: String, ty: Type },

    #[error("TYPE ERROR: If/Elif cannot be evaluated with an expression of type {got}")]
    NonBoolCondition { got: Type },

    #[error("TYPE ERROR: Invalid if statement: else branch without a condition")]
    MalformedIf,

    // ==================== Returns ====================

    #[error("TYPE ERROR: Returns cannot occur at the outermost level")]
    ReturnOutsideMethod,

    #[error("TYPE ERROR: Expected a return of type {expected}, but got {got}")]
    ReturnTypeMismatch { expected: Type, got: Type },

    #[error("TYPE ERROR: Method {method} does not have a return type")]
    UnexpectedReturnValue { method: String },

    #[error("TYPE ERROR: Method {method} should have a return at possible reachable code segments in the function")]
    MissingReturn { method: String },

    #[error("TYPE ERROR: Method {method} returns {expected}, but got {got}")]
    MethodReturnMismatch {
        method: String,
        expected: Type,
        got: Type,
    },

    // ==================== Classes ====================

    #[error("TYPE ERROR: First argument of method {method} in class {class} must be self and must have type {class}")]
    InvalidSelf { class: String, method: String },

    #[error("TYPE ERROR: Method {method} of class {class} expected at least 1 parameter (self), got 0 parameters")]
    MissingSelf { class: String, method: String },

    #[error("TYPE ERROR: Constructor of class {class} has {got} parameters, expected 1")]
    ConstructorArity { class: String, got: usize },

    #[error("TYPE ERROR: Constructor of class {class} returns {got}, expected None")]
    ConstructorReturnType { class: String, got: Type },

    #[error("TYPE ERROR: Constructor of class {class} is not expected to return a value")]
    ConstructorReturnsValue { class: String },

    #[error("TYPE ERROR: Cannot explicitly call constructor of class {class}")]
    ExplicitConstructorCall { class: String },

    #[error("TYPE ERROR: Constructor expected no arguments, got {got}")]
    ConstructorArgs { class: String, got: usize },

    // ==================== Compiler ====================

    #[error("Compiler error: {0}")]
    Internal(String),
}

fn scope_suffix(scope: &Option<String>) -> String {
    match scope {
        Some(s) => format!(" in {}", s),
        None => String::new(),
    }
}

impl Error {
    /// Which family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Internal(_) => ErrorKind::Internal,
            _ => ErrorKind::Type,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
