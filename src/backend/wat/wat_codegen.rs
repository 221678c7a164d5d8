//! WAT Code Generator
//!
//! Translates a checked program to WebAssembly text.
//!
//! Every expression leaves exactly one `i32` on the stack; statements leave
//! the stack as they found it. Objects are heap addresses and `None` is 0.

use log::{debug, trace};

use super::instr::{Instr, HEAP, SCRATCH};
use super::module::{WatFunc, WatGlobal, WatModule, ENTRY_EXPORT};
use crate::backend::codegen::CodeGen;
use crate::frontend::ast::{BinOp, Literal, UnOp};
use crate::frontend::env::Env;
use crate::middle::typed_ast::*;
use crate::stdlib::builtins::{host_import, print_variant, NONE_TRAP};
use crate::types::Type;
use crate::utils::{Error, Result};

/// WAT code generator
pub struct WatCodeGen {
    /// Set while generating `__init__`, whose returns hand back `self`
    in_constructor: bool,
}

impl WatCodeGen {
    pub fn new() -> Self {
        Self { in_constructor: false }
    }

    /// Build the module for a checked program. `env` must carry resolved
    /// class layouts.
    pub fn generate_module(&mut self, program: &TypedProgram, env: &Env) -> Result<WatModule> {
        let globals = program
            .variables
            .iter()
            .map(|v| WatGlobal { name: v.name.clone(), init: literal_value(&v.value) })
            .collect();

        let mut functions = Vec::new();
        for class in &program.classes {
            debug!("generating class {}", class.name);
            let class_env = env.enter_class(&class.name);
            functions.push(self.gen_constructor(class, &class_env)?);
            for method in &class.methods {
                functions.push(self.gen_method(&class.name, method, &class_env)?);
            }
        }

        Ok(WatModule {
            globals,
            functions,
            entry: self.gen_entry(program, env)?,
        })
    }

    /// Exported entry point running the top-level statements. It returns the
    /// last value only when the program ends in a bare expression.
    fn gen_entry(&self, program: &TypedProgram, env: &Env) -> Result<WatFunc> {
        let returns_value = matches!(
            program.body.last(),
            Some(TypedStmt { kind: TypedStmtKind::Expr { .. }, .. })
        );

        let mut body = self.gen_body(&program.body, env)?;
        if returns_value {
            body.push(Instr::local_get(SCRATCH));
            body.push(Instr::Return);
        }

        Ok(WatFunc {
            export: Some(ENTRY_EXPORT.to_string()),
            result: returns_value,
            body,
            ..Default::default()
        })
    }

    // ==================== Classes ====================

    /// `C$$constructor`: bump-allocate, store field initializers, run
    /// `__init__` if declared, return the new address.
    fn gen_constructor(&self, class: &TypedClass, env: &Env) -> Result<WatFunc> {
        let sig = env
            .class(&class.name)
            .ok_or_else(|| Error::internal(format!("class {} missing from the environment", class.name)))?;
        let layout = sig
            .layout
            .as_ref()
            .ok_or_else(|| Error::internal(format!("layout of class {} not resolved", class.name)))?;

        let mut body = Vec::new();
        for field in &class.fields {
            let offset = layout.offset_of(&field.name).ok_or_else(|| {
                Error::internal(format!("field {} missing from the layout of {}", field.name, class.name))
            })?;
            body.extend([
                Instr::global_get(HEAP),
                Instr::I32Const(offset as i32),
                Instr::Add,
                Instr::I32Const(literal_value(&field.value)),
                Instr::Store,
            ]);
        }

        // The object handle is the address before the bump
        body.push(Instr::global_get(HEAP));
        if sig.has_constructor() {
            body.push(Instr::global_get(HEAP));
        }
        body.extend([
            Instr::global_get(HEAP),
            Instr::I32Const(layout.size() as i32),
            Instr::Add,
            Instr::global_set(HEAP),
        ]);
        if sig.has_constructor() {
            body.push(Instr::call(method_symbol(&class.name, "__init__"), 1, true));
            body.push(Instr::local_set(SCRATCH));
        }
        body.push(Instr::Return);

        Ok(WatFunc {
            name: Some(constructor_symbol(&class.name)),
            result: true,
            body,
            ..Default::default()
        })
    }

    fn gen_method(&mut self, class: &str, method: &TypedMethod, class_env: &Env) -> Result<WatFunc> {
        debug!("generating method {}.{}", class, method.name);
        let env = class_env.enter_method(
            &method.ret,
            method.params.iter().map(|p| (p.name.as_str(), &p.ty)),
            method.definitions.iter().map(|v| (v.name.as_str(), &v.ty)),
        )?;

        self.in_constructor = method.is_constructor();

        let mut body = Vec::new();
        for def in &method.definitions {
            body.push(Instr::I32Const(literal_value(&def.value)));
            body.push(Instr::local_set(&def.name));
        }
        body.extend(self.gen_body(&method.statements, &env)?);
        body.extend(self.return_default());

        self.in_constructor = false;

        Ok(WatFunc {
            name: Some(method_symbol(class, &method.name)),
            export: None,
            params: method.params.iter().map(|p| p.name.clone()).collect(),
            result: true,
            locals: method.definitions.iter().map(|v| v.name.clone()).collect(),
            body,
        })
    }

    /// What a method returns when it has nothing to say
    fn return_default(&self) -> [Instr; 2] {
        if self.in_constructor {
            [Instr::local_get("self"), Instr::Return]
        } else {
            [Instr::I32Const(0), Instr::Return]
        }
    }

    // ==================== Statements ====================

    pub fn gen_body(&self, stmts: &[TypedStmt], env: &Env) -> Result<Vec<Instr>> {
        let mut code = Vec::new();
        for stmt in stmts {
            code.extend(self.gen_stmt(stmt, env)?);
        }
        Ok(code)
    }

    pub fn gen_stmt(&self, stmt: &TypedStmt, env: &Env) -> Result<Vec<Instr>> {
        trace!("generating statement {:?}", stmt.kind);
        match &stmt.kind {
            TypedStmtKind::Assign { lhs, value } => self.gen_assign(lhs, value, env),

            TypedStmtKind::Expr { expr } => {
                let mut code = self.gen_expr(expr, env)?;
                code.push(Instr::local_set(SCRATCH));
                Ok(code)
            }

            TypedStmtKind::Return { value } => {
                if !env.in_method() {
                    return Err(Error::internal("return outside a method reached code generation"));
                }
                match value {
                    Some(TypedExpr { kind: TypedExprKind::Literal { value: Literal::None }, .. }) if self.in_constructor => {
                        Ok(self.return_default().to_vec())
                    }
                    Some(value) => {
                        let mut code = self.gen_expr(value, env)?;
                        code.push(Instr::Return);
                        Ok(code)
                    }
                    None => Ok(self.return_default().to_vec()),
                }
            }

            TypedStmtKind::If(arm) => self.gen_if(arm, env),

            TypedStmtKind::Pass => Ok(vec![Instr::Nop]),
        }
    }

    fn gen_if(&self, arm: &TypedIf, env: &Env) -> Result<Vec<Instr>> {
        let body = self.gen_body(&arm.body, env)?;
        let Some(condition) = &arm.condition else {
            if arm.else_branch.is_some() {
                return Err(Error::internal("else branch without a condition reached code generation"));
            }
            return Ok(body);
        };

        let else_ = match &arm.else_branch {
            Some(next) => Some(self.gen_if(next, env)?),
            None => None,
        };

        let mut code = self.gen_expr(condition, env)?;
        code.push(Instr::If { then: body, else_ });
        Ok(code)
    }

    /// Variables are set directly. Fields compute the address first, then
    /// the value, then store.
    fn gen_assign(&self, lhs: &TypedLValue, value: &TypedExpr, env: &Env) -> Result<Vec<Instr>> {
        match &lhs.kind {
            TypedLValueKind::Var { name } => {
                let mut code = self.gen_expr(value, env)?;
                code.push(if env.is_global(name)? {
                    Instr::global_set(name)
                } else {
                    Instr::local_set(name)
                });
                Ok(code)
            }
            TypedLValueKind::Field { obj, name } => {
                let mut code = self.gen_lvalue_value(obj, env)?;
                code.extend(none_guard());
                code.push(Instr::I32Const(field_offset(&obj.ty, name, env)?));
                code.push(Instr::Add);
                code.extend(self.gen_expr(value, env)?);
                code.push(Instr::Store);
                Ok(code)
            }
        }
    }

    /// Value currently held by an l-value, used for field-store receivers
    fn gen_lvalue_value(&self, lvalue: &TypedLValue, env: &Env) -> Result<Vec<Instr>> {
        match &lvalue.kind {
            TypedLValueKind::Var { name } => Ok(vec![var_get(name, env)?]),
            TypedLValueKind::Field { obj, name } => {
                let mut code = self.gen_lvalue_value(obj, env)?;
                code.extend(none_guard());
                code.push(Instr::I32Const(field_offset(&obj.ty, name, env)?));
                code.push(Instr::Add);
                code.push(Instr::Load);
                Ok(code)
            }
        }
    }

    // ==================== Expressions ====================

    pub fn gen_expr(&self, expr: &TypedExpr, env: &Env) -> Result<Vec<Instr>> {
        if expr.ty == Type::Any {
            return Err(Error::internal(format!("expression typed any: {:?}", expr.kind)));
        }

        match &expr.kind {
            TypedExprKind::Literal { value } => Ok(vec![Instr::I32Const(literal_value(value))]),

            TypedExprKind::Id { name } => Ok(vec![var_get(name, env)?]),

            TypedExprKind::Unary { op, arg } => {
                let mut code = self.gen_expr(arg, env)?;
                match op {
                    UnOp::Not => code.extend([Instr::I32Const(1), Instr::Xor]),
                    UnOp::Neg => code.extend([Instr::I32Const(-1), Instr::Mul]),
                    UnOp::Plus => {}
                }
                Ok(code)
            }

            TypedExprKind::Binary { op, lhs, rhs } => {
                let mut code = self.gen_expr(lhs, env)?;
                code.extend(self.gen_expr(rhs, env)?);
                code.push(binop_instr(*op));
                Ok(code)
            }

            TypedExprKind::Paren { arg } => self.gen_expr(arg, env),

            TypedExprKind::Call { name, args } => self.gen_builtin_call(name, args, env),

            TypedExprKind::Construct { class } => {
                Ok(vec![Instr::call(constructor_symbol(class), 0, true)])
            }

            TypedExprKind::MethodCall { obj, name, args } => {
                let class = obj
                    .ty
                    .class_name()
                    .ok_or_else(|| Error::internal(format!("method call {} on non-object {}", name, obj.ty)))?;
                let mut code = self.gen_expr(obj, env)?;
                code.extend(none_guard());
                for arg in args {
                    code.extend(self.gen_expr(arg, env)?);
                }
                code.push(Instr::call(method_symbol(class, name), args.len() + 1, true));
                Ok(code)
            }

            TypedExprKind::FieldAccess { obj, name } => {
                let mut code = self.gen_expr(obj, env)?;
                code.extend(none_guard());
                code.push(Instr::I32Const(field_offset(&obj.ty, name, env)?));
                code.push(Instr::Add);
                code.push(Instr::Load);
                Ok(code)
            }
        }
    }

    /// Arguments left to right, then the host import. `print` picks its
    /// variant from the argument's static type.
    fn gen_builtin_call(&self, name: &str, args: &[TypedExpr], env: &Env) -> Result<Vec<Instr>> {
        let mut code = Vec::new();
        for arg in args {
            code.extend(self.gen_expr(arg, env)?);
        }

        let target = if name == "print" {
            match args {
                [arg] => print_variant(&arg.ty),
                _ => return Err(Error::internal(format!("print called with {} arguments", args.len()))),
            }
        } else {
            name
        };
        let import = host_import(target)
            .ok_or_else(|| Error::internal(format!("no host import for built-in {}", target)))?;

        code.push(Instr::call(import.name, import.params, import.returns));
        Ok(code)
    }
}

impl Default for WatCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen for WatCodeGen {
    fn generate(&mut self, program: &TypedProgram, env: &Env) -> Result<String> {
        let module = self.generate_module(program, env)?;
        debug!("generated {} class functions", module.functions.len());
        Ok(module.render())
    }

    fn name(&self) -> &str {
        "wat"
    }
}

// ==================== Helpers ====================

fn literal_value(lit: &Literal) -> i32 {
    match lit {
        Literal::None => 0,
        Literal::Bool(b) => i32::from(*b),
        Literal::Int(n) => *n,
    }
}

fn binop_instr(op: BinOp) -> Instr {
    match op {
        BinOp::Add => Instr::Add,
        BinOp::Sub => Instr::Sub,
        BinOp::Mul => Instr::Mul,
        BinOp::FloorDiv => Instr::DivS,
        BinOp::Mod => Instr::RemS,
        BinOp::Eq | BinOp::Is => Instr::Eq,
        BinOp::Ne => Instr::Ne,
        BinOp::Gt => Instr::GtS,
        BinOp::Lt => Instr::LtS,
        BinOp::Ge => Instr::GeS,
        BinOp::Le => Instr::LeS,
    }
}

fn var_get(name: &str, env: &Env) -> Result<Instr> {
    Ok(if env.is_global(name)? {
        Instr::global_get(name)
    } else {
        Instr::local_get(name)
    })
}

/// Trap if the object on top of the stack is `None`; the object stays put
fn none_guard() -> Vec<Instr> {
    vec![
        Instr::local_set(SCRATCH),
        Instr::local_get(SCRATCH),
        Instr::I32Const(0),
        Instr::local_get(SCRATCH),
        Instr::Eq,
        Instr::If {
            then: vec![Instr::call(NONE_TRAP, 0, false)],
            else_: None,
        },
    ]
}

fn field_offset(obj: &Type, field: &str, env: &Env) -> Result<i32> {
    let class = obj
        .class_name()
        .ok_or_else(|| Error::internal(format!("field {} read from non-object {}", field, obj)))?;
    let layout = env
        .class(class)
        .and_then(|sig| sig.layout.as_ref())
        .ok_or_else(|| Error::internal(format!("layout of class {} not resolved", class)))?;
    layout
        .offset_of(field)
        .map(|o| o as i32)
        .ok_or_else(|| Error::internal(format!("field {} missing from the layout of {}", field, class)))
}

fn method_symbol(class: &str, method: &str) -> String {
    format!("{}${}", class, method)
}

fn constructor_symbol(class: &str) -> String {
    format!("{}$$constructor", class)
}
