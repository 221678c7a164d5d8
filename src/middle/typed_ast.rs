//! Typed AST - output of the type checker
//!
//! Mirrors [`crate::frontend::ast`] but every node carries its resolved
//! [`Type`]. Calls are already split into built-in calls and constructor
//! calls, so the code generator never has to guess.

use serde::{Deserialize, Serialize};

use crate::frontend::ast::{self, BinOp, Literal, UnOp};
use crate::types::Type;

/// A checked program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedProgram {
    /// Type of the last top-level statement (see `check_program`)
    pub ty: Type,
    pub variables: Vec<TypedVarDef>,
    pub classes: Vec<TypedClass>,
    pub body: Vec<TypedStmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedClass {
    pub name: String,
    pub ty: Type,
    pub fields: Vec<TypedVarDef>,
    pub methods: Vec<TypedMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedVarDef {
    pub name: String,
    pub ty: Type,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedParam {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedMethod {
    pub name: String,
    /// Declared return type
    pub ret: Type,
    pub params: Vec<TypedParam>,
    pub definitions: Vec<TypedVarDef>,
    pub statements: Vec<TypedStmt>,
    /// Fall-through type of the body
    pub body_ty: Type,
}

impl TypedMethod {
    pub fn is_constructor(&self) -> bool {
        self.name == "__init__"
    }
}

/// A statement with its "falls through with a value of type T" marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedStmt {
    pub ty: Type,
    pub kind: TypedStmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TypedStmtKind {
    Assign { lhs: TypedLValue, value: TypedExpr },
    Expr { expr: TypedExpr },
    Return { value: Option<TypedExpr> },
    If(TypedIf),
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedIf {
    pub ty: Type,
    pub condition: Option<TypedExpr>,
    pub body: Vec<TypedStmt>,
    pub else_branch: Option<Box<TypedIf>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedLValue {
    pub ty: Type,
    pub kind: TypedLValueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TypedLValueKind {
    Var { name: String },
    Field { obj: Box<TypedLValue>, name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedExpr {
    pub ty: Type,
    pub kind: TypedExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TypedExprKind {
    Literal { value: Literal },
    Id { name: String },
    Unary { op: UnOp, arg: Box<TypedExpr> },
    Binary { op: BinOp, lhs: Box<TypedExpr>, rhs: Box<TypedExpr> },
    Paren { arg: Box<TypedExpr> },
    /// Call of a registered built-in function
    Call { name: String, args: Vec<TypedExpr> },
    /// `ClassName()`
    Construct { class: String },
    MethodCall { obj: Box<TypedExpr>, name: String, args: Vec<TypedExpr> },
    FieldAccess { obj: Box<TypedExpr>, name: String },
}

impl TypedExpr {
    /// Visit this expression and every sub-expression, outermost first
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a TypedExpr)) {
        f(self);
        match &self.kind {
            TypedExprKind::Literal { .. } | TypedExprKind::Id { .. } | TypedExprKind::Construct { .. } => {}
            TypedExprKind::Unary { arg, .. } | TypedExprKind::Paren { arg } => arg.walk(f),
            TypedExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            TypedExprKind::Call { args, .. } => args.iter().for_each(|a| a.walk(f)),
            TypedExprKind::MethodCall { obj, args, .. } => {
                obj.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            TypedExprKind::FieldAccess { obj, .. } => obj.walk(f),
        }
    }
}

impl TypedProgram {
    /// Every expression in the program, including those inside method bodies
    pub fn expressions(&self) -> Vec<&TypedExpr> {
        let mut out = Vec::new();
        let mut stmts: Vec<&TypedStmt> = self.body.iter().collect();
        for class in &self.classes {
            for method in &class.methods {
                stmts.extend(method.statements.iter());
            }
        }
        for stmt in stmts {
            collect_stmt_exprs(stmt, &mut out);
        }
        out
    }

    /// Drop every annotation, giving back the tree the front end produced
    pub fn erase(&self) -> ast::Program {
        ast::Program {
            variables: self.variables.iter().map(erase_var_def).collect(),
            classes: self
                .classes
                .iter()
                .map(|c| ast::ClassDef {
                    name: c.name.clone(),
                    fields: c.fields.iter().map(erase_var_def).collect(),
                    methods: c.methods.iter().map(erase_method).collect(),
                })
                .collect(),
            body: self.body.iter().map(erase_stmt).collect(),
        }
    }
}

fn collect_stmt_exprs<'a>(stmt: &'a TypedStmt, out: &mut Vec<&'a TypedExpr>) {
    match &stmt.kind {
        TypedStmtKind::Assign { value, .. } => value.walk(&mut |e| out.push(e)),
        TypedStmtKind::Expr { expr } => expr.walk(&mut |e| out.push(e)),
        TypedStmtKind::Return { value } => {
            if let Some(v) = value {
                v.walk(&mut |e| out.push(e));
            }
        }
        TypedStmtKind::If(arm) => collect_if_exprs(arm, out),
        TypedStmtKind::Pass => {}
    }
}

fn collect_if_exprs<'a>(arm: &'a TypedIf, out: &mut Vec<&'a TypedExpr>) {
    if let Some(cond) = &arm.condition {
        cond.walk(&mut |e| out.push(e));
    }
    for stmt in &arm.body {
        collect_stmt_exprs(stmt, out);
    }
    if let Some(next) = &arm.else_branch {
        collect_if_exprs(next, out);
    }
}

// ==================== Erasure ====================

fn erase_var_def(v: &TypedVarDef) -> ast::VarDef {
    ast::VarDef {
        name: v.name.clone(),
        ty: v.ty.clone(),
        value: v.value.clone(),
    }
}

fn erase_method(m: &TypedMethod) -> ast::FuncDef {
    ast::FuncDef {
        name: m.name.clone(),
        params: m
            .params
            .iter()
            .map(|p| ast::Param { name: p.name.clone(), ty: p.ty.clone() })
            .collect(),
        ret: m.ret.clone(),
        body: ast::FuncBody {
            definitions: m.definitions.iter().map(erase_var_def).collect(),
            statements: m.statements.iter().map(erase_stmt).collect(),
        },
    }
}

fn erase_stmt(s: &TypedStmt) -> ast::Stmt {
    match &s.kind {
        TypedStmtKind::Assign { lhs, value } => ast::Stmt::Assign {
            lhs: erase_lvalue(lhs),
            value: erase_expr(value),
        },
        TypedStmtKind::Expr { expr } => ast::Stmt::Expr { expr: erase_expr(expr) },
        TypedStmtKind::Return { value } => ast::Stmt::Return {
            value: value.as_ref().map(erase_expr),
        },
        TypedStmtKind::If(arm) => ast::Stmt::If(erase_if(arm)),
        TypedStmtKind::Pass => ast::Stmt::Pass,
    }
}

fn erase_if(arm: &TypedIf) -> ast::IfStmt {
    ast::IfStmt {
        condition: arm.condition.as_ref().map(erase_expr),
        body: arm.body.iter().map(erase_stmt).collect(),
        else_branch: arm.else_branch.as_ref().map(|e| Box::new(erase_if(e))),
    }
}

fn erase_lvalue(l: &TypedLValue) -> ast::LValue {
    match &l.kind {
        TypedLValueKind::Var { name } => ast::LValue::Var { name: name.clone() },
        TypedLValueKind::Field { obj, name } => ast::LValue::Field {
            obj: Box::new(erase_lvalue(obj)),
            name: name.clone(),
        },
    }
}

fn erase_expr(e: &TypedExpr) -> ast::Expr {
    match &e.kind {
        TypedExprKind::Literal { value } => ast::Expr::Literal { value: value.clone() },
        TypedExprKind::Id { name } => ast::Expr::Id { name: name.clone() },
        TypedExprKind::Unary { op, arg } => ast::Expr::Unary {
            op: *op,
            arg: Box::new(erase_expr(arg)),
        },
        TypedExprKind::Binary { op, lhs, rhs } => ast::Expr::Binary {
            op: *op,
            lhs: Box::new(erase_expr(lhs)),
            rhs: Box::new(erase_expr(rhs)),
        },
        TypedExprKind::Paren { arg } => ast::Expr::Paren { arg: Box::new(erase_expr(arg)) },
        TypedExprKind::Call { name, args } => ast::Expr::Call {
            name: name.clone(),
            args: args.iter().map(erase_expr).collect(),
        },
        TypedExprKind::Construct { class } => ast::Expr::Call {
            name: class.clone(),
            args: Vec::new(),
        },
        TypedExprKind::MethodCall { obj, name, args } => ast::Expr::MethodCall {
            obj: Box::new(erase_expr(obj)),
            name: name.clone(),
            args: args.iter().map(erase_expr).collect(),
        },
        TypedExprKind::FieldAccess { obj, name } => ast::Expr::FieldAccess {
            obj: Box::new(erase_expr(obj)),
            name: name.clone(),
        },
    }
}
