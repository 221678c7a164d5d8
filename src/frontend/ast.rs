//! Abstract Syntax Tree handed over by the front end
//!
//! This is the unresolved tree: no node carries a type yet. The checker turns
//! it into a [`crate::middle::typed_ast::TypedProgram`]. The tree deserializes
//! from JSON so any front end can feed the core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// A complete program (compilation unit)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub variables: Vec<VarDef>,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// Class definition. Single implicit base, no inheritance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<VarDef>,
    #[serde(default)]
    pub methods: Vec<FuncDef>,
}

/// Typed variable definition. The initializer must be a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub value: Literal,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// Method definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    /// Declared return type; a missing annotation means `none`
    #[serde(default = "none_type")]
    pub ret: Type,
    pub body: FuncBody,
}

fn none_type() -> Type {
    Type::None
}

/// Method body: local definitions first, then statements
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FuncBody {
    #[serde(default)]
    pub definitions: Vec<VarDef>,
    #[serde(default)]
    pub statements: Vec<Stmt>,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Stmt {
    Assign { lhs: LValue, value: Expr },
    Expr { expr: Expr },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    If(IfStmt),
    Pass,
}

/// One arm of an `if`/`elif`/`else` chain.
///
/// A plain `else` arm has no condition; an `elif` is an `else` arm that
/// carries a condition and possibly its own `else`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    #[serde(default)]
    pub condition: Option<Expr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default, rename = "else")]
    pub else_branch: Option<Box<IfStmt>>,
}

/// Assignment targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum LValue {
    Var { name: String },
    Field { obj: Box<LValue>, name: String },
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Expr {
    Literal { value: Literal },
    Id { name: String },
    Unary { op: UnOp, arg: Box<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Paren { arg: Box<Expr> },
    /// Built-in call, or a constructor call when `name` is a class
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    MethodCall {
        obj: Box<Expr>,
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    FieldAccess { obj: Box<Expr>, name: String },
}

/// Literals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "value", rename_all = "lowercase")]
pub enum Literal {
    None,
    Bool(bool),
    Int(i32),
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    #[serde(rename = "not")]
    Not,
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "+")]
    Plus,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "//")]
    FloorDiv,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "is")]
    Is,
}

impl BinOp {
    /// Arithmetic operators produce `int`; everything else produces `bool`
    pub fn returns_int(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::FloorDiv | Self::Mod)
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Not => "not",
            Self::Neg => "-",
            Self::Plus => "+",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Is => "is",
        };
        write!(f, "{}", s)
    }
}

// ==================== Builders ====================

impl Expr {
    pub fn int(n: i32) -> Self {
        Self::Literal { value: Literal::Int(n) }
    }

    pub fn bool(b: bool) -> Self {
        Self::Literal { value: Literal::Bool(b) }
    }

    pub fn none() -> Self {
        Self::Literal { value: Literal::None }
    }

    pub fn id(name: &str) -> Self {
        Self::Id { name: name.to_string() }
    }

    pub fn unary(op: UnOp, arg: Expr) -> Self {
        Self::Unary { op, arg: Box::new(arg) }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn paren(arg: Expr) -> Self {
        Self::Paren { arg: Box::new(arg) }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::Call { name: name.to_string(), args }
    }

    pub fn method_call(obj: Expr, name: &str, args: Vec<Expr>) -> Self {
        Self::MethodCall { obj: Box::new(obj), name: name.to_string(), args }
    }

    pub fn field(obj: Expr, name: &str) -> Self {
        Self::FieldAccess { obj: Box::new(obj), name: name.to_string() }
    }
}

impl LValue {
    pub fn var(name: &str) -> Self {
        Self::Var { name: name.to_string() }
    }

    pub fn field(obj: LValue, name: &str) -> Self {
        Self::Field { obj: Box::new(obj), name: name.to_string() }
    }
}

impl Stmt {
    pub fn assign(lhs: LValue, value: Expr) -> Self {
        Self::Assign { lhs, value }
    }

    pub fn expr(expr: Expr) -> Self {
        Self::Expr { expr }
    }

    pub fn ret(value: Expr) -> Self {
        Self::Return { value: Some(value) }
    }

    pub fn if_then(condition: Expr, body: Vec<Stmt>) -> Self {
        Self::If(IfStmt { condition: Some(condition), body, else_branch: None })
    }

    pub fn if_else(condition: Expr, body: Vec<Stmt>, else_branch: IfStmt) -> Self {
        Self::If(IfStmt {
            condition: Some(condition),
            body,
            else_branch: Some(Box::new(else_branch)),
        })
    }
}

impl IfStmt {
    /// A plain `else:` arm
    pub fn otherwise(body: Vec<Stmt>) -> Self {
        Self { condition: None, body, else_branch: None }
    }

    /// An `elif` arm with an optional trailing arm
    pub fn elif(condition: Expr, body: Vec<Stmt>, else_branch: Option<IfStmt>) -> Self {
        Self {
            condition: Some(condition),
            body,
            else_branch: else_branch.map(Box::new),
        }
    }
}

impl VarDef {
    pub fn new(name: &str, ty: Type, value: Literal) -> Self {
        Self { name: name.to_string(), ty, value }
    }
}

impl Param {
    pub fn new(name: &str, ty: Type) -> Self {
        Self { name: name.to_string(), ty }
    }
}

impl FuncDef {
    pub fn new(name: &str, params: Vec<Param>, ret: Type, definitions: Vec<VarDef>, statements: Vec<Stmt>) -> Self {
        Self {
            name: name.to_string(),
            params,
            ret,
            body: FuncBody { definitions, statements },
        }
    }
}
