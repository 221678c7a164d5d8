//! Semantic Analysis for the Python subset
//!
//! Performs:
//! - Shallow pass over classes (signatures only, so classes may refer to
//!   each other in any order)
//! - Type checking of globals, class bodies and top-level statements
//! - Fall-through typing of statements, used to prove methods return
//!
//! The first violation aborts checking; there is no recovery.

use std::collections::HashMap;

use log::{debug, trace};

use crate::frontend::ast::*;
use crate::frontend::env::{ClassSig, Env, FuncSig, VarBinding};
use crate::middle::typed_ast::*;
use crate::stdlib::BuiltinRegistry;
use crate::types::{is_assignable, same_type, Type};
use crate::utils::{Error, Result};

const CONSTRUCTOR: &str = "__init__";

/// Type checker
pub struct TypeChecker {
    builtins: BuiltinRegistry,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            builtins: BuiltinRegistry::new(),
        }
    }

    // ==================== Program ====================

    /// Check a whole program.
    ///
    /// Returns the typed tree and the top-level environment the code
    /// generator specializes per class and method.
    pub fn check_program(&self, program: &Program) -> Result<(TypedProgram, Env)> {
        let env = self.default_env(program)?;

        let variables = program
            .variables
            .iter()
            .map(|v| self.check_var_def(v, &env))
            .collect::<Result<Vec<_>>>()?;

        let classes = program
            .classes
            .iter()
            .map(|c| self.check_class(c, &env))
            .collect::<Result<Vec<_>>>()?;

        let body = program
            .body
            .iter()
            .map(|s| self.check_stmt(s, &env))
            .collect::<Result<Vec<_>>>()?;

        // A trailing bare expression gives the program its value
        let ty = match body.last() {
            Some(TypedStmt { ty: Type::None, kind: TypedStmtKind::Expr { expr } }) => expr.ty.clone(),
            Some(last) => last.ty.clone(),
            None => Type::None,
        };
        debug!("program type: {}", ty);

        Ok((TypedProgram { ty, variables, classes, body }, env))
    }

    /// Build the top-level environment: globals, class signatures, built-ins
    pub fn default_env(&self, program: &Program) -> Result<Env> {
        let mut vars = HashMap::new();
        for v in &program.variables {
            let binding = VarBinding { ty: v.ty.clone(), assignable: true };
            if vars.insert(v.name.clone(), binding).is_some() {
                return Err(Error::DuplicateDefinition {
                    what: "variable",
                    name: v.name.clone(),
                    scope: None,
                });
            }
        }

        let mut classes = HashMap::new();
        for c in &program.classes {
            let sig = self.shallow_check_class(c)?;
            if classes.insert(c.name.clone(), sig).is_some() {
                return Err(Error::DuplicateDefinition {
                    what: "class",
                    name: c.name.clone(),
                    scope: None,
                });
            }
        }

        debug!("default environment: {} globals, {} classes", vars.len(), classes.len());
        Ok(Env::new(vars, classes, self.builtins.signatures()))
    }

    // ==================== Classes ====================

    /// Signature-only pass over a class. Bodies are not looked at.
    pub fn shallow_check_class(&self, c: &ClassDef) -> Result<ClassSig> {
        let mut sig = ClassSig::default();
        let scope = || Some(format!("class {}", c.name));

        for f in &c.fields {
            if sig.fields.contains_key(&f.name) {
                return Err(Error::DuplicateDefinition { what: "field", name: f.name.clone(), scope: scope() });
            }
            sig.fields.insert(f.name.clone(), f.ty.clone());
        }

        for m in &c.methods {
            if sig.methods.contains_key(&m.name) || sig.fields.contains_key(&m.name) {
                return Err(Error::DuplicateDefinition { what: "method", name: m.name.clone(), scope: scope() });
            }

            if m.name == CONSTRUCTOR {
                if m.params.len() != 1 {
                    return Err(Error::ConstructorArity { class: c.name.clone(), got: m.params.len() });
                }
                if m.ret != Type::None {
                    return Err(Error::ConstructorReturnType { class: c.name.clone(), got: m.ret.clone() });
                }
                check_self_param(&m.params[0], &c.name, &m.name)?;
                sig.methods.insert(
                    m.name.clone(),
                    FuncSig { params: Vec::new(), ret: Type::object(&c.name) },
                );
            } else {
                let Some(first) = m.params.first() else {
                    return Err(Error::MissingSelf { class: c.name.clone(), method: m.name.clone() });
                };
                check_self_param(first, &c.name, &m.name)?;
                sig.methods.insert(
                    m.name.clone(),
                    FuncSig {
                        params: m.params[1..].iter().map(|p| p.ty.clone()).collect(),
                        ret: m.ret.clone(),
                    },
                );
            }
        }

        Ok(sig)
    }

    /// Full pass over a class, against the complete set of signatures
    pub fn check_class(&self, c: &ClassDef, env: &Env) -> Result<TypedClass> {
        debug!("checking class {}", c.name);
        let class_env = env.enter_class(&c.name);

        let fields = c
            .fields
            .iter()
            .map(|f| self.check_var_def(f, &class_env))
            .collect::<Result<Vec<_>>>()?;

        let methods = c
            .methods
            .iter()
            .map(|m| self.check_method(m, &class_env))
            .collect::<Result<Vec<_>>>()?;

        Ok(TypedClass {
            name: c.name.clone(),
            ty: Type::object(&c.name),
            fields,
            methods,
        })
    }

    /// Check a method body in the scope of its class
    pub fn check_method(&self, m: &FuncDef, env: &Env) -> Result<TypedMethod> {
        debug!("checking method {}.{}", env.scope_name.as_deref().unwrap_or("?"), m.name);

        let params = m
            .params
            .iter()
            .map(|p| {
                self.check_declared_type(&p.ty, env)?;
                Ok(TypedParam { name: p.name.clone(), ty: p.ty.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        self.check_declared_type(&m.ret, env)?;

        let definitions = m
            .body
            .definitions
            .iter()
            .map(|v| self.check_var_def(v, env))
            .collect::<Result<Vec<_>>>()?;

        let method_env = env.enter_method(
            &m.ret,
            params.iter().map(|p| (p.name.as_str(), &p.ty)),
            definitions.iter().map(|v| (v.name.as_str(), &v.ty)),
        )?;

        if m.name == CONSTRUCTOR && m.body.statements.iter().any(returns_value) {
            return Err(Error::ConstructorReturnsValue {
                class: env.scope_name.clone().unwrap_or_default(),
            });
        }

        let (statements, body_ty) = self.check_body(&m.body.statements, &method_env)?;

        if !is_assignable(&m.ret, &body_ty)? {
            return Err(if m.ret == Type::None {
                Error::UnexpectedReturnValue { method: m.name.clone() }
            } else if body_ty == Type::None {
                Error::MissingReturn { method: m.name.clone() }
            } else {
                Error::MethodReturnMismatch {
                    method: m.name.clone(),
                    expected: m.ret.clone(),
                    got: body_ty,
                }
            });
        }

        Ok(TypedMethod {
            name: m.name.clone(),
            ret: m.ret.clone(),
            params,
            definitions,
            statements,
            body_ty,
        })
    }

    // ==================== Definitions ====================

    /// Check a typed definition and its literal initializer
    pub fn check_var_def(&self, v: &VarDef, env: &Env) -> Result<TypedVarDef> {
        self.check_declared_type(&v.ty, env)?;
        let literal_ty = literal_type(&v.value);
        if !is_assignable(&v.ty, &literal_ty)? {
            return Err(Error::TypeMismatch { expected: v.ty.clone(), got: literal_ty });
        }
        Ok(TypedVarDef {
            name: v.name.clone(),
            ty: v.ty.clone(),
            value: v.value.clone(),
        })
    }

    /// User declarations may not name `any` or an unknown class
    fn check_declared_type(&self, ty: &Type, env: &Env) -> Result<()> {
        match ty {
            Type::Any => Err(Error::InvalidDeclaredType { ty: ty.clone() }),
            Type::Object(name) if env.class(name).is_none() => {
                Err(Error::UndefinedClass { name: name.clone() })
            }
            _ => Ok(()),
        }
    }

    // ==================== Statements ====================

    /// Check a statement list. The list falls through with the type of its
    /// last statement that produces a value.
    pub fn check_body(&self, stmts: &[Stmt], env: &Env) -> Result<(Vec<TypedStmt>, Type)> {
        let mut group = Type::None;
        let mut checked = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let typed = self.check_stmt(stmt, env)?;
            if typed.ty != Type::None {
                group = typed.ty.clone();
            }
            checked.push(typed);
        }
        Ok((checked, group))
    }

    pub fn check_stmt(&self, stmt: &Stmt, env: &Env) -> Result<TypedStmt> {
        trace!("checking statement {:?}", stmt);
        match stmt {
            Stmt::Assign { lhs, value } => {
                let lhs = self.check_lvalue(lhs, env)?;
                let value = self.check_expr(value, env)?;
                if !is_assignable(&lhs.ty, &value.ty)? {
                    return Err(Error::TypeMismatch { expected: lhs.ty, got: value.ty });
                }
                Ok(TypedStmt { ty: Type::None, kind: TypedStmtKind::Assign { lhs, value } })
            }
            Stmt::Expr { expr } => {
                let expr = self.check_expr(expr, env)?;
                Ok(TypedStmt { ty: Type::None, kind: TypedStmtKind::Expr { expr } })
            }
            Stmt::Return { value } => {
                if !env.in_method() {
                    return Err(Error::ReturnOutsideMethod);
                }
                let Some(value) = value else {
                    return Ok(TypedStmt { ty: Type::None, kind: TypedStmtKind::Return { value: None } });
                };
                let value = self.check_expr(value, env)?;
                if !is_assignable(&env.return_type, &value.ty)? {
                    return Err(Error::ReturnTypeMismatch {
                        expected: env.return_type.clone(),
                        got: value.ty,
                    });
                }
                Ok(TypedStmt {
                    ty: value.ty.clone(),
                    kind: TypedStmtKind::Return { value: Some(value) },
                })
            }
            Stmt::If(arm) => {
                let arm = self.check_if(arm, env)?;
                Ok(TypedStmt { ty: arm.ty.clone(), kind: TypedStmtKind::If(arm) })
            }
            Stmt::Pass => Ok(TypedStmt { ty: Type::None, kind: TypedStmtKind::Pass }),
        }
    }

    /// Check one arm of an `if` chain.
    ///
    /// - no condition, no else: plain block, typed as its body
    /// - condition, no else: `none`, the chain is not total
    /// - condition and else: the body's type if both sides produce a value
    fn check_if(&self, arm: &IfStmt, env: &Env) -> Result<TypedIf> {
        let condition = match &arm.condition {
            Some(cond) => {
                let cond = self.check_expr(cond, env)?;
                if cond.ty != Type::Bool {
                    return Err(Error::NonBoolCondition { got: cond.ty });
                }
                Some(cond)
            }
            None => None,
        };

        let else_branch = match &arm.else_branch {
            Some(next) => Some(Box::new(self.check_if(next, env)?)),
            None => None,
        };

        let (body, group) = self.check_body(&arm.body, env)?;

        let ty = match (&condition, &else_branch) {
            (None, None) => group,
            (Some(_), None) => Type::None,
            (Some(_), Some(other)) => {
                if group != Type::None && other.ty != Type::None {
                    group
                } else {
                    Type::None
                }
            }
            (None, Some(_)) => return Err(Error::MalformedIf),
        };

        Ok(TypedIf { ty, condition, body, else_branch })
    }

    /// Check an assignment target. A bare variable must be bound by the
    /// current scope; globals are read-only inside methods.
    pub fn check_lvalue(&self, lvalue: &LValue, env: &Env) -> Result<TypedLValue> {
        match lvalue {
            LValue::Var { name } => {
                let binding = env
                    .var(name)
                    .ok_or_else(|| Error::UndefinedVariable { name: name.clone() })?;
                if !binding.assignable {
                    return Err(Error::NotAssignableHere { name: name.clone() });
                }
                Ok(TypedLValue {
                    ty: binding.ty.clone(),
                    kind: TypedLValueKind::Var { name: name.clone() },
                })
            }
            LValue::Field { obj, name } => {
                let obj = self.check_receiver(obj, env)?;
                let ty = field_type(&obj.ty, name, env)?;
                Ok(TypedLValue {
                    ty,
                    kind: TypedLValueKind::Field { obj: Box::new(obj), name: name.clone() },
                })
            }
        }
    }

    /// The object part of a field target is only read, so any visible
    /// variable will do
    fn check_receiver(&self, lvalue: &LValue, env: &Env) -> Result<TypedLValue> {
        match lvalue {
            LValue::Var { name } => {
                let binding = env
                    .var(name)
                    .ok_or_else(|| Error::UndefinedVariable { name: name.clone() })?;
                Ok(TypedLValue {
                    ty: binding.ty.clone(),
                    kind: TypedLValueKind::Var { name: name.clone() },
                })
            }
            LValue::Field { .. } => self.check_lvalue(lvalue, env),
        }
    }

    // ==================== Expressions ====================

    pub fn check_expr(&self, expr: &Expr, env: &Env) -> Result<TypedExpr> {
        match expr {
            Expr::Literal { value } => Ok(TypedExpr {
                ty: literal_type(value),
                kind: TypedExprKind::Literal { value: value.clone() },
            }),

            Expr::Id { name } => {
                let binding = env
                    .var(name)
                    .ok_or_else(|| Error::UndefinedVariable { name: name.clone() })?;
                Ok(TypedExpr {
                    ty: binding.ty.clone(),
                    kind: TypedExprKind::Id { name: name.clone() },
                })
            }

            Expr::Unary { op, arg } => {
                let arg = self.check_expr(arg, env)?;
                let expected = match op {
                    UnOp::Not => Type::Bool,
                    UnOp::Neg | UnOp::Plus => Type::Int,
                };
                if arg.ty != expected {
                    return Err(Error::InvalidUnaryOperand { op: op.to_string(), ty: arg.ty });
                }
                Ok(TypedExpr {
                    ty: expected,
                    kind: TypedExprKind::Unary { op: *op, arg: Box::new(arg) },
                })
            }

            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(lhs, env)?;
                let rhs = self.check_expr(rhs, env)?;
                let ty = check_binary_op(*op, &lhs.ty, &rhs.ty)?;
                Ok(TypedExpr {
                    ty,
                    kind: TypedExprKind::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                })
            }

            Expr::Paren { arg } => {
                let arg = self.check_expr(arg, env)?;
                Ok(TypedExpr {
                    ty: arg.ty.clone(),
                    kind: TypedExprKind::Paren { arg: Box::new(arg) },
                })
            }

            Expr::Call { name, args } => self.check_call(name, args, env),

            Expr::MethodCall { obj, name, args } => self.check_method_call(obj, name, args, env),

            Expr::FieldAccess { obj, name } => {
                let obj = self.check_expr(obj, env)?;
                let ty = field_type(&obj.ty, name, env)?;
                Ok(TypedExpr {
                    ty,
                    kind: TypedExprKind::FieldAccess { obj: Box::new(obj), name: name.clone() },
                })
            }
        }
    }

    /// Built-in call, or else a constructor call
    fn check_call(&self, name: &str, args: &[Expr], env: &Env) -> Result<TypedExpr> {
        let Some(sig) = env.function(name) else {
            return self.check_constructor_call(name, args, env);
        };

        if args.len() != sig.params.len() {
            return Err(Error::ArgCountMismatch {
                callee: name.to_string(),
                expected: sig.params.len(),
                got: args.len(),
            });
        }

        let args = args
            .iter()
            .zip(&sig.params)
            .enumerate()
            .map(|(index, (arg, expected))| {
                let arg = self.check_expr(arg, env)?;
                if !is_assignable(expected, &arg.ty)? {
                    return Err(Error::ArgumentMismatch {
                        callee: name.to_string(),
                        index,
                        expected: expected.clone(),
                        got: arg.ty,
                    });
                }
                Ok(arg)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TypedExpr {
            ty: sig.ret.clone(),
            kind: TypedExprKind::Call { name: name.to_string(), args },
        })
    }

    fn check_constructor_call(&self, name: &str, args: &[Expr], env: &Env) -> Result<TypedExpr> {
        if env.class(name).is_none() {
            return Err(Error::UndefinedFunction { name: name.to_string() });
        }
        if !args.is_empty() {
            return Err(Error::ConstructorArgs { class: name.to_string(), got: args.len() });
        }
        Ok(TypedExpr {
            ty: Type::object(name),
            kind: TypedExprKind::Construct { class: name.to_string() },
        })
    }

    fn check_method_call(&self, obj: &Expr, name: &str, args: &[Expr], env: &Env) -> Result<TypedExpr> {
        let obj = self.check_expr(obj, env)?;
        let args = args
            .iter()
            .map(|a| self.check_expr(a, env))
            .collect::<Result<Vec<_>>>()?;

        if name == CONSTRUCTOR {
            return Err(Error::ExplicitConstructorCall { class: obj.ty.to_string() });
        }

        let Type::Object(class_name) = &obj.ty else {
            return Err(Error::NotAnObject { member: format!("method {}", name), ty: obj.ty.clone() });
        };
        let class = env
            .class(class_name)
            .ok_or_else(|| Error::UndefinedClass { name: class_name.clone() })?;
        let sig = class.method(name).ok_or_else(|| Error::UnknownMethod {
            class: class_name.clone(),
            method: name.to_string(),
        })?;

        if sig.params.len() != args.len() {
            return Err(Error::ArgCountMismatch {
                callee: format!("{}.{}", class_name, name),
                expected: sig.params.len(),
                got: args.len(),
            });
        }
        for (index, (expected, arg)) in sig.params.iter().zip(&args).enumerate() {
            if !is_assignable(expected, &arg.ty)? {
                return Err(Error::ArgumentMismatch {
                    callee: format!("{}.{}", class_name, name),
                    index,
                    expected: expected.clone(),
                    got: arg.ty.clone(),
                });
            }
        }

        Ok(TypedExpr {
            ty: sig.ret.clone(),
            kind: TypedExprKind::MethodCall {
                obj: Box::new(obj),
                name: name.to_string(),
                args,
            },
        })
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Helpers ====================

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::None => Type::None,
        Literal::Bool(_) => Type::Bool,
        Literal::Int(_) => Type::Int,
    }
}

fn check_self_param(param: &Param, class: &str, method: &str) -> Result<()> {
    let is_self = param.name == "self" && param.ty.class_name() == Some(class);
    if !is_self {
        return Err(Error::InvalidSelf { class: class.to_string(), method: method.to_string() });
    }
    Ok(())
}

/// Whether a statement (or any arm nested in it) returns something other than `None`
fn returns_value(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { value: None } => false,
        Stmt::Return { value: Some(Expr::Literal { value: Literal::None }) } => false,
        Stmt::Return { value: Some(_) } => true,
        Stmt::If(arm) => if_returns_value(arm),
        _ => false,
    }
}

fn if_returns_value(arm: &IfStmt) -> bool {
    arm.body.iter().any(returns_value) || arm.else_branch.as_deref().is_some_and(if_returns_value)
}

/// Type of a field on a receiver of type `obj`
fn field_type(obj: &Type, field: &str, env: &Env) -> Result<Type> {
    let Type::Object(class_name) = obj else {
        return Err(Error::NotAnObject { member: format!("field {}", field), ty: obj.clone() });
    };
    let class = env
        .class(class_name)
        .ok_or_else(|| Error::UndefinedClass { name: class_name.clone() })?;
    class.field(field).cloned().ok_or_else(|| Error::UnknownField {
        class: class_name.clone(),
        field: field.to_string(),
    })
}

/// Result type of a binary operator
fn check_binary_op(op: BinOp, lhs: &Type, rhs: &Type) -> Result<Type> {
    let mismatch = || Error::InvalidBinaryOperands {
        op: op.to_string(),
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    };

    if !same_type(lhs, rhs)? {
        // Reference comparison across classes or against None
        let references = match (lhs, rhs) {
            (Type::Object(_), Type::Object(_)) => true,
            (Type::Object(_), Type::None) | (Type::None, Type::Object(_)) => true,
            _ => false,
        };
        return if references && op == BinOp::Is { Ok(Type::Bool) } else { Err(mismatch()) };
    }

    match lhs {
        Type::Int if op == BinOp::Is => Err(mismatch()),
        Type::Int if op.returns_int() => Ok(Type::Int),
        Type::Int => Ok(Type::Bool),
        Type::Bool if matches!(op, BinOp::Eq | BinOp::Ne) => Ok(Type::Bool),
        Type::None | Type::Object(_) if op == BinOp::Is => Ok(Type::Bool),
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;
    use pretty_assertions::assert_eq;

    fn check(program: &Program) -> Result<TypedProgram> {
        TypeChecker::new().check_program(program).map(|(p, _)| p)
    }

    fn self_param(class: &str) -> Param {
        Param::new("self", Type::object(class))
    }

    fn method(name: &str, class: &str, extra: Vec<Param>, ret: Type, stmts: Vec<Stmt>) -> FuncDef {
        let mut params = vec![self_param(class)];
        params.extend(extra);
        FuncDef::new(name, params, ret, Vec::new(), stmts)
    }

    /// class C: x: int = 0; def get(self: C) -> int: return self.x
    fn class_c() -> ClassDef {
        ClassDef {
            name: "C".into(),
            fields: vec![VarDef::new("x", Type::Int, Literal::Int(0))],
            methods: vec![method(
                "get",
                "C",
                Vec::new(),
                Type::Int,
                vec![Stmt::ret(Expr::field(Expr::id("self"), "x"))],
            )],
        }
    }

    fn program_with_class(class: ClassDef, body: Vec<Stmt>) -> Program {
        Program {
            variables: vec![VarDef::new("c", Type::object(&class.name), Literal::None)],
            classes: vec![class],
            body,
        }
    }

    #[test]
    fn test_assign_then_read_global() {
        let program = Program {
            variables: vec![VarDef::new("x", Type::Int, Literal::Int(0))],
            classes: Vec::new(),
            body: vec![Stmt::assign(LValue::var("x"), Expr::int(5)), Stmt::expr(Expr::id("x"))],
        };
        let typed = check(&program).unwrap();
        assert_eq!(typed.ty, Type::Int);
        assert_eq!(typed.body[0].ty, Type::None);
    }

    #[test]
    fn test_class_method_call() {
        let program = program_with_class(
            class_c(),
            vec![
                Stmt::assign(LValue::var("c"), Expr::call("C", Vec::new())),
                Stmt::expr(Expr::method_call(Expr::id("c"), "get", Vec::new())),
            ],
        );
        let typed = check(&program).unwrap();
        assert_eq!(typed.ty, Type::Int);
        assert_eq!(typed.classes[0].ty, Type::object("C"));
        assert_eq!(typed.classes[0].methods[0].body_ty, Type::Int);

        let TypedStmtKind::Assign { value, .. } = &typed.body[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.kind, TypedExprKind::Construct { class: "C".into() });
    }

    #[test]
    fn test_bool_initializer_for_int() {
        let program = Program {
            variables: vec![VarDef::new("x", Type::Int, Literal::Bool(true))],
            ..Default::default()
        };
        let err = check(&program).unwrap_err();
        assert_eq!(err, Error::TypeMismatch { expected: Type::Int, got: Type::Bool });
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_method_call_on_none_valued_variable_checks() {
        let program = program_with_class(
            class_c(),
            vec![Stmt::expr(Expr::method_call(Expr::id("c"), "get", Vec::new()))],
        );
        assert_eq!(check(&program).unwrap().ty, Type::Int);
    }

    #[test]
    fn test_missing_return() {
        let mut class = class_c();
        class.methods = vec![method("get", "C", Vec::new(), Type::Int, vec![Stmt::Pass])];
        let err = check(&program_with_class(class, Vec::new())).unwrap_err();
        assert_eq!(err, Error::MissingReturn { method: "get".into() });
    }

    fn sign_method(with_else: bool) -> FuncDef {
        let a = || Expr::id("a");
        let tail = if with_else { Some(IfStmt::otherwise(vec![Stmt::ret(Expr::int(0))])) } else { None };
        let chain = Stmt::if_else(
            Expr::binary(BinOp::Gt, a(), Expr::int(0)),
            vec![Stmt::ret(Expr::int(1))],
            IfStmt::elif(Expr::binary(BinOp::Lt, a(), Expr::int(0)), vec![Stmt::ret(Expr::int(-1))], tail),
        );
        method("sign", "C", vec![Param::new("a", Type::Int)], Type::Int, vec![chain])
    }

    #[test]
    fn test_total_if_chain_has_branch_type() {
        let checker = TypeChecker::new();
        let mut class = class_c();
        class.methods = vec![sign_method(true)];
        let program = program_with_class(class, Vec::new());
        let env = checker.default_env(&program).unwrap();

        let typed = checker.check_class(&program.classes[0], &env).unwrap();
        let sign = &typed.methods[0];
        assert_eq!(sign.statements[0].ty, Type::Int);
        assert_eq!(sign.body_ty, Type::Int);
    }

    #[test]
    fn test_if_chain_without_else_is_not_total() {
        let checker = TypeChecker::new();
        let mut class = class_c();
        class.methods = vec![sign_method(false)];
        let program = program_with_class(class.clone(), Vec::new());
        let env = checker.default_env(&program).unwrap();

        let class_env = env.enter_class("C");
        let self_ty = Type::object("C");
        let method_env = class_env
            .enter_method(&Type::Int, [("self", &self_ty), ("a", &Type::Int)], std::iter::empty::<(&str, &Type)>())
            .unwrap();
        let stmt = checker.check_stmt(&class.methods[0].body.statements[0], &method_env).unwrap();
        assert_eq!(stmt.ty, Type::None);

        let err = checker.check_class(&class, &env).unwrap_err();
        assert_eq!(err, Error::MissingReturn { method: "sign".into() });
    }

    #[test]
    fn test_plain_block_takes_body_type() {
        let checker = TypeChecker::new();
        let program = program_with_class(class_c(), Vec::new());
        let env = checker
            .default_env(&program)
            .unwrap()
            .enter_class("C")
            .enter_method(&Type::Int, std::iter::empty::<(&str, &Type)>(), std::iter::empty::<(&str, &Type)>())
            .unwrap();
        let block = Stmt::If(IfStmt::otherwise(vec![Stmt::ret(Expr::int(3))]));
        assert_eq!(checker.check_stmt(&block, &env).unwrap().ty, Type::Int);
    }

    #[test]
    fn test_forward_reference_between_classes() {
        let a = ClassDef {
            name: "A".into(),
            fields: vec![VarDef::new("b", Type::object("B"), Literal::None)],
            methods: vec![method(
                "make",
                "A",
                Vec::new(),
                Type::object("B"),
                vec![Stmt::ret(Expr::call("B", Vec::new()))],
            )],
        };
        let b = ClassDef {
            name: "B".into(),
            fields: vec![VarDef::new("n", Type::Int, Literal::Int(7))],
            methods: Vec::new(),
        };
        let program = Program {
            variables: vec![VarDef::new("a", Type::object("A"), Literal::None)],
            classes: vec![a, b],
            body: vec![Stmt::expr(Expr::field(
                Expr::method_call(Expr::id("a"), "make", Vec::new()),
                "n",
            ))],
        };
        assert_eq!(check(&program).unwrap().ty, Type::Int);
    }

    #[test]
    fn test_return_at_top_level() {
        let program = Program { body: vec![Stmt::ret(Expr::int(1))], ..Default::default() };
        assert_eq!(check(&program).unwrap_err(), Error::ReturnOutsideMethod);
    }

    #[test]
    fn test_undefined_names() {
        let program = Program { body: vec![Stmt::expr(Expr::id("y"))], ..Default::default() };
        assert_eq!(check(&program).unwrap_err(), Error::UndefinedVariable { name: "y".into() });

        let program = Program { body: vec![Stmt::expr(Expr::call("nope", Vec::new()))], ..Default::default() };
        assert_eq!(check(&program).unwrap_err(), Error::UndefinedFunction { name: "nope".into() });

        let program = Program {
            variables: vec![VarDef::new("d", Type::object("D"), Literal::None)],
            ..Default::default()
        };
        assert_eq!(check(&program).unwrap_err(), Error::UndefinedClass { name: "D".into() });
    }

    #[test]
    fn test_unknown_member() {
        let program = program_with_class(class_c(), vec![Stmt::expr(Expr::field(Expr::id("c"), "y"))]);
        assert_eq!(
            check(&program).unwrap_err(),
            Error::UnknownField { class: "C".into(), field: "y".into() }
        );

        let program = program_with_class(
            class_c(),
            vec![Stmt::expr(Expr::method_call(Expr::id("c"), "put", Vec::new()))],
        );
        assert_eq!(
            check(&program).unwrap_err(),
            Error::UnknownMethod { class: "C".into(), method: "put".into() }
        );
    }

    #[test]
    fn test_builtin_calls() {
        let ok = Program {
            body: vec![
                Stmt::expr(Expr::call("print", vec![Expr::bool(true)])),
                Stmt::expr(Expr::call("pow", vec![Expr::int(2), Expr::int(10)])),
            ],
            ..Default::default()
        };
        assert_eq!(check(&ok).unwrap().ty, Type::Int);

        let arity = Program {
            body: vec![Stmt::expr(Expr::call("abs", vec![Expr::int(1), Expr::int(2)]))],
            ..Default::default()
        };
        assert_eq!(
            check(&arity).unwrap_err(),
            Error::ArgCountMismatch { callee: "abs".into(), expected: 1, got: 2 }
        );

        let bad_arg = Program {
            body: vec![Stmt::expr(Expr::call("max", vec![Expr::int(1), Expr::none()]))],
            ..Default::default()
        };
        assert_eq!(
            check(&bad_arg).unwrap_err(),
            Error::ArgumentMismatch { callee: "max".into(), index: 1, expected: Type::Int, got: Type::None }
        );
    }

    #[test]
    fn test_print_result_is_none_typed() {
        let program = Program {
            body: vec![Stmt::expr(Expr::call("print", vec![Expr::int(1)]))],
            ..Default::default()
        };
        assert_eq!(check(&program).unwrap().ty, Type::None);
    }

    #[test]
    fn test_operators() {
        let ty = |e: Expr| {
            let program = Program { body: vec![Stmt::expr(e)], ..Default::default() };
            check(&program).map(|p| p.ty)
        };
        assert_eq!(ty(Expr::binary(BinOp::Mod, Expr::int(7), Expr::int(2))), Ok(Type::Int));
        assert_eq!(ty(Expr::binary(BinOp::Le, Expr::int(7), Expr::int(2))), Ok(Type::Bool));
        assert_eq!(ty(Expr::binary(BinOp::Ne, Expr::bool(true), Expr::bool(false))), Ok(Type::Bool));
        assert_eq!(ty(Expr::binary(BinOp::Is, Expr::none(), Expr::none())), Ok(Type::Bool));
        assert_eq!(ty(Expr::unary(UnOp::Not, Expr::bool(false))), Ok(Type::Bool));
        assert_eq!(ty(Expr::paren(Expr::unary(UnOp::Neg, Expr::int(3)))), Ok(Type::Int));

        assert!(ty(Expr::binary(BinOp::Add, Expr::bool(true), Expr::bool(true))).is_err());
        assert!(ty(Expr::binary(BinOp::Is, Expr::int(1), Expr::int(1))).is_err());
        assert!(ty(Expr::binary(BinOp::Eq, Expr::int(1), Expr::bool(true))).is_err());
        assert!(ty(Expr::binary(BinOp::Is, Expr::int(1), Expr::none())).is_err());
        assert!(ty(Expr::binary(BinOp::Eq, Expr::none(), Expr::none())).is_err());
        assert_eq!(
            ty(Expr::unary(UnOp::Plus, Expr::bool(true))),
            Err(Error::InvalidUnaryOperand { op: "+".into(), ty: Type::Bool })
        );
    }

    #[test]
    fn test_is_between_objects_and_none() {
        let program = program_with_class(
            class_c(),
            vec![Stmt::expr(Expr::binary(BinOp::Is, Expr::id("c"), Expr::none()))],
        );
        assert_eq!(check(&program).unwrap().ty, Type::Bool);

        let program = program_with_class(
            class_c(),
            vec![Stmt::expr(Expr::binary(BinOp::Eq, Expr::id("c"), Expr::none()))],
        );
        assert!(check(&program).is_err());
    }

    #[test]
    fn test_non_bool_condition() {
        let program = Program {
            body: vec![Stmt::if_then(Expr::int(1), vec![Stmt::Pass])],
            ..Default::default()
        };
        assert_eq!(check(&program).unwrap_err(), Error::NonBoolCondition { got: Type::Int });
    }

    #[test]
    fn test_else_without_condition_is_malformed() {
        let program = Program {
            body: vec![Stmt::If(IfStmt {
                condition: None,
                body: vec![Stmt::Pass],
                else_branch: Some(Box::new(IfStmt::otherwise(vec![Stmt::Pass]))),
            })],
            ..Default::default()
        };
        assert_eq!(check(&program).unwrap_err(), Error::MalformedIf);
    }

    #[test]
    fn test_duplicate_members() {
        let mut class = class_c();
        class.fields.push(VarDef::new("x", Type::Bool, Literal::Bool(false)));
        assert!(matches!(
            TypeChecker::new().shallow_check_class(&class),
            Err(Error::DuplicateDefinition { what: "field", .. })
        ));

        let mut class = class_c();
        class.methods.push(method("x", "C", Vec::new(), Type::None, vec![Stmt::Pass]));
        assert!(matches!(
            TypeChecker::new().shallow_check_class(&class),
            Err(Error::DuplicateDefinition { what: "method", .. })
        ));
    }

    #[test]
    fn test_self_validation() {
        let mut class = class_c();
        class.methods = vec![FuncDef::new("f", vec![Param::new("me", Type::object("C"))], Type::None, Vec::new(), Vec::new())];
        assert_eq!(
            TypeChecker::new().shallow_check_class(&class).unwrap_err(),
            Error::InvalidSelf { class: "C".into(), method: "f".into() }
        );

        class.methods = vec![FuncDef::new("f", Vec::new(), Type::None, Vec::new(), Vec::new())];
        assert_eq!(
            TypeChecker::new().shallow_check_class(&class).unwrap_err(),
            Error::MissingSelf { class: "C".into(), method: "f".into() }
        );
    }

    #[test]
    fn test_constructor_signature() {
        let checker = TypeChecker::new();
        let mut class = class_c();
        class.methods = vec![method("__init__", "C", vec![Param::new("v", Type::Int)], Type::None, Vec::new())];
        assert_eq!(
            checker.shallow_check_class(&class).unwrap_err(),
            Error::ConstructorArity { class: "C".into(), got: 2 }
        );

        class.methods = vec![method("__init__", "C", Vec::new(), Type::Int, Vec::new())];
        assert_eq!(
            checker.shallow_check_class(&class).unwrap_err(),
            Error::ConstructorReturnType { class: "C".into(), got: Type::Int }
        );

        class.methods = vec![method("__init__", "C", Vec::new(), Type::None, Vec::new())];
        let sig = checker.shallow_check_class(&class).unwrap();
        assert_eq!(sig.method("__init__").unwrap().ret, Type::object("C"));
        assert!(sig.method("__init__").unwrap().params.is_empty());
    }

    #[test]
    fn test_constructor_may_not_return_a_value() {
        let mut class = class_c();
        class.methods = vec![method(
            "__init__",
            "C",
            Vec::new(),
            Type::None,
            vec![Stmt::if_then(Expr::bool(true), vec![Stmt::ret(Expr::int(1))])],
        )];
        let err = check(&program_with_class(class, Vec::new())).unwrap_err();
        assert_eq!(err, Error::ConstructorReturnsValue { class: "C".into() });
    }

    #[test]
    fn test_constructor_bare_return_is_fine() {
        let mut class = class_c();
        class.methods = vec![method(
            "__init__",
            "C",
            Vec::new(),
            Type::None,
            vec![
                Stmt::assign(LValue::field(LValue::var("self"), "x"), Expr::int(4)),
                Stmt::Return { value: None },
            ],
        )];
        assert!(check(&program_with_class(class, Vec::new())).is_ok());
    }

    #[test]
    fn test_explicit_constructor_call() {
        let program = program_with_class(
            class_c(),
            vec![Stmt::expr(Expr::method_call(Expr::id("c"), "__init__", Vec::new()))],
        );
        assert_eq!(check(&program).unwrap_err(), Error::ExplicitConstructorCall { class: "C".into() });
    }

    #[test]
    fn test_constructor_takes_no_arguments() {
        let program = program_with_class(
            class_c(),
            vec![Stmt::assign(LValue::var("c"), Expr::call("C", vec![Expr::int(1)]))],
        );
        assert_eq!(check(&program).unwrap_err(), Error::ConstructorArgs { class: "C".into(), got: 1 });
    }

    #[test]
    fn test_method_without_declared_return_type() {
        let mut class = class_c();
        class.methods = vec![method(
            "f",
            "C",
            Vec::new(),
            Type::None,
            vec![Stmt::If(IfStmt::otherwise(vec![Stmt::ret(Expr::none())]))],
        )];
        assert!(check(&program_with_class(class.clone(), Vec::new())).is_ok());

        class.methods = vec![method("f", "C", Vec::new(), Type::None, vec![Stmt::ret(Expr::int(1))])];
        assert_eq!(
            check(&program_with_class(class, Vec::new())).unwrap_err(),
            Error::ReturnTypeMismatch { expected: Type::None, got: Type::Int }
        );
    }

    #[test]
    fn test_globals_are_read_only_in_methods() {
        let mut class = class_c();
        class.methods = vec![method(
            "reset",
            "C",
            Vec::new(),
            Type::None,
            vec![Stmt::assign(LValue::var("c"), Expr::none())],
        )];
        assert_eq!(
            check(&program_with_class(class, Vec::new())).unwrap_err(),
            Error::NotAssignableHere { name: "c".into() }
        );
    }

    #[test]
    fn test_field_store_through_global_in_method() {
        let mut class = class_c();
        class.methods = vec![method(
            "poke",
            "C",
            Vec::new(),
            Type::None,
            vec![Stmt::assign(LValue::field(LValue::var("c"), "x"), Expr::int(9))],
        )];
        assert!(check(&program_with_class(class, Vec::new())).is_ok());
    }

    #[test]
    fn test_duplicate_parameter_and_local() {
        let mut class = class_c();
        class.methods = vec![FuncDef::new(
            "f",
            vec![self_param("C"), Param::new("a", Type::Int)],
            Type::None,
            vec![VarDef::new("a", Type::Bool, Literal::Bool(true))],
            Vec::new(),
        )];
        assert_eq!(
            check(&program_with_class(class, Vec::new())).unwrap_err(),
            Error::DuplicateDefinition { what: "variable", name: "a".into(), scope: None }
        );
    }

    #[test]
    fn test_duplicate_parameter() {
        let mut class = class_c();
        class.methods = vec![method(
            "f",
            "C",
            vec![Param::new("a", Type::Int), Param::new("a", Type::Bool)],
            Type::None,
            vec![Stmt::Pass],
        )];
        assert_eq!(
            check(&program_with_class(class, Vec::new())).unwrap_err(),
            Error::DuplicateDefinition { what: "parameter", name: "a".into(), scope: None }
        );
    }

    #[test]
    fn test_duplicate_global_and_class() {
        let program = Program {
            variables: vec![
                VarDef::new("a", Type::Int, Literal::Int(1)),
                VarDef::new("a", Type::Bool, Literal::Bool(true)),
            ],
            ..Default::default()
        };
        assert_eq!(
            check(&program).unwrap_err(),
            Error::DuplicateDefinition { what: "variable", name: "a".into(), scope: None }
        );

        let program = Program { classes: vec![class_c(), class_c()], ..Default::default() };
        assert_eq!(
            check(&program).unwrap_err(),
            Error::DuplicateDefinition { what: "class", name: "C".into(), scope: None }
        );
    }

    /// class_c plus `def set(self: C, v: int): self.x = v`
    fn class_c_with_setter() -> ClassDef {
        let mut class = class_c();
        class.methods.push(method(
            "set",
            "C",
            vec![Param::new("v", Type::Int)],
            Type::None,
            vec![Stmt::assign(LValue::field(LValue::var("self"), "x"), Expr::id("v"))],
        ));
        class
    }

    #[test]
    fn test_method_argument_type() {
        let program = program_with_class(
            class_c_with_setter(),
            vec![Stmt::expr(Expr::method_call(Expr::id("c"), "set", vec![Expr::bool(true)]))],
        );
        assert_eq!(
            check(&program).unwrap_err(),
            Error::ArgumentMismatch { callee: "C.set".into(), index: 0, expected: Type::Int, got: Type::Bool }
        );

        let program = program_with_class(
            class_c_with_setter(),
            vec![Stmt::expr(Expr::method_call(Expr::id("c"), "set", vec![Expr::int(4)]))],
        );
        assert_eq!(check(&program).unwrap().ty, Type::None);
    }

    #[test]
    fn test_method_argument_count() {
        let program = program_with_class(
            class_c_with_setter(),
            vec![Stmt::expr(Expr::method_call(Expr::id("c"), "set", Vec::new()))],
        );
        assert_eq!(
            check(&program).unwrap_err(),
            Error::ArgCountMismatch { callee: "C.set".into(), expected: 1, got: 0 }
        );
    }

    #[test]
    fn test_member_access_on_non_object() {
        let program = Program {
            variables: vec![VarDef::new("n", Type::Int, Literal::Int(1))],
            classes: vec![class_c()],
            body: vec![Stmt::expr(Expr::field(Expr::id("n"), "x"))],
        };
        assert_eq!(
            check(&program).unwrap_err(),
            Error::NotAnObject { member: "field x".into(), ty: Type::Int }
        );

        let program = Program {
            variables: vec![VarDef::new("n", Type::Int, Literal::Int(1))],
            classes: vec![class_c()],
            body: vec![Stmt::expr(Expr::method_call(Expr::id("n"), "get", Vec::new()))],
        };
        assert_eq!(
            check(&program).unwrap_err(),
            Error::NotAnObject { member: "method get".into(), ty: Type::Int }
        );
    }

    #[test]
    fn test_any_is_not_declarable() {
        let program = Program {
            variables: vec![VarDef::new("x", Type::Any, Literal::Int(1))],
            ..Default::default()
        };
        assert_eq!(check(&program).unwrap_err(), Error::InvalidDeclaredType { ty: Type::Any });
    }

    #[test]
    fn test_no_expression_is_typed_any() {
        let program = program_with_class(
            class_c(),
            vec![
                Stmt::assign(LValue::var("c"), Expr::call("C", Vec::new())),
                Stmt::expr(Expr::call("print", vec![Expr::id("c")])),
                Stmt::expr(Expr::call("print", vec![Expr::method_call(Expr::id("c"), "get", Vec::new())])),
            ],
        );
        let typed = check(&program).unwrap();
        let exprs = typed.expressions();
        assert!(exprs.len() >= 6);
        assert!(exprs.iter().all(|e| e.ty != Type::Any));
    }

    #[test]
    fn test_recheck_is_idempotent() {
        let mut class = class_c();
        class.methods.push(sign_method(true));
        let program = program_with_class(
            class,
            vec![
                Stmt::assign(LValue::var("c"), Expr::call("C", Vec::new())),
                Stmt::expr(Expr::method_call(Expr::id("c"), "sign", vec![Expr::int(-4)])),
            ],
        );
        let first = check(&program).unwrap();
        assert_eq!(first.erase(), program);
        let second = check(&first.erase()).unwrap();
        assert_eq!(first, second);
    }
}
