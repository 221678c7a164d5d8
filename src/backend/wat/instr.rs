//! Stack-machine instructions
//!
//! A small model of the WebAssembly text instructions the generator needs.
//! Identifiers are stored without their leading `$`; rendering adds it.

use std::fmt;

/// Scratch local present in every function
pub const SCRATCH: &str = "$scratch";

/// Heap pointer global
pub const HEAP: &str = "$heap";

/// One instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    I32Const(i32),
    LocalGet(String),
    LocalSet(String),
    GlobalGet(String),
    GlobalSet(String),

    // Arithmetic
    Add,
    Sub,
    Mul,
    DivS,
    RemS,
    Xor,

    // Comparison
    Eq,
    Ne,
    GtS,
    LtS,
    GeS,
    LeS,

    // Memory
    Load,
    Store,

    /// Direct call. `params` and `returns` describe the callee's signature.
    Call {
        func: String,
        params: usize,
        returns: bool,
    },
    /// Structured `if` without a result type; pops the condition
    If {
        then: Vec<Instr>,
        else_: Option<Vec<Instr>>,
    },
    Return,
    Nop,
}

impl Instr {
    pub fn local_get(name: &str) -> Self {
        Self::LocalGet(name.to_string())
    }

    pub fn local_set(name: &str) -> Self {
        Self::LocalSet(name.to_string())
    }

    pub fn global_get(name: &str) -> Self {
        Self::GlobalGet(name.to_string())
    }

    pub fn global_set(name: &str) -> Self {
        Self::GlobalSet(name.to_string())
    }

    pub fn call(func: impl Into<String>, params: usize, returns: bool) -> Self {
        Self::Call { func: func.into(), params, returns }
    }

    /// Net change in operand stack height.
    ///
    /// For `if`, the branches are assumed balanced (statement code), so only
    /// the popped condition counts. `return` is counted as popping the value
    /// it returns.
    pub fn stack_effect(&self) -> i32 {
        match self {
            Self::I32Const(_) | Self::LocalGet(_) | Self::GlobalGet(_) => 1,
            Self::LocalSet(_) | Self::GlobalSet(_) => -1,
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::DivS
            | Self::RemS
            | Self::Xor
            | Self::Eq
            | Self::Ne
            | Self::GtS
            | Self::LtS
            | Self::GeS
            | Self::LeS => -1,
            Self::Load => 0,
            Self::Store => -2,
            Self::Call { params, returns, .. } => i32::from(*returns) - *params as i32,
            Self::If { .. } => -1,
            Self::Return => -1,
            Self::Nop => 0,
        }
    }

    fn mnemonic(&self) -> &'static str {
        match self {
            Self::I32Const(_) => "i32.const",
            Self::LocalGet(_) => "local.get",
            Self::LocalSet(_) => "local.set",
            Self::GlobalGet(_) => "global.get",
            Self::GlobalSet(_) => "global.set",
            Self::Add => "i32.add",
            Self::Sub => "i32.sub",
            Self::Mul => "i32.mul",
            Self::DivS => "i32.div_s",
            Self::RemS => "i32.rem_s",
            Self::Xor => "i32.xor",
            Self::Eq => "i32.eq",
            Self::Ne => "i32.ne",
            Self::GtS => "i32.gt_s",
            Self::LtS => "i32.lt_s",
            Self::GeS => "i32.ge_s",
            Self::LeS => "i32.le_s",
            Self::Load => "i32.load",
            Self::Store => "i32.store",
            Self::Call { .. } => "call",
            Self::If { .. } => "if",
            Self::Return => "return",
            Self::Nop => "nop",
        }
    }
}

/// Sum of stack effects over a sequence
pub fn net_stack_effect(instrs: &[Instr]) -> i32 {
    instrs.iter().map(Instr::stack_effect).sum()
}

/// Single-line folded rendering, e.g. `(local.get $x)`
impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32Const(n) => write!(f, "({} {})", self.mnemonic(), n),
            Self::LocalGet(name) | Self::LocalSet(name) | Self::GlobalGet(name) | Self::GlobalSet(name) => {
                write!(f, "({} ${})", self.mnemonic(), name)
            }
            Self::Call { func, .. } => write!(f, "(call ${})", func),
            Self::If { then, else_ } => {
                write!(f, "(if (then")?;
                for i in then {
                    write!(f, " {}", i)?;
                }
                write!(f, ")")?;
                if let Some(else_) = else_ {
                    write!(f, " (else")?;
                    for i in else_ {
                        write!(f, " {}", i)?;
                    }
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
            _ => write!(f, "({})", self.mnemonic()),
        }
    }
}

/// Render instructions one per line, nesting `if` arms one level deeper
pub fn write_instrs(out: &mut String, instrs: &[Instr], indent: usize) {
    for instr in instrs {
        match instr {
            Instr::If { then, else_ } => {
                push_line(out, indent, "(if");
                push_line(out, indent + 1, "(then");
                write_instrs(out, then, indent + 2);
                push_line(out, indent + 1, ")");
                if let Some(else_) = else_ {
                    push_line(out, indent + 1, "(else");
                    write_instrs(out, else_, indent + 2);
                    push_line(out, indent + 1, ")");
                }
                push_line(out, indent, ")");
            }
            _ => push_line(out, indent, &instr.to_string()),
        }
    }
}

pub(crate) fn push_line(out: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}
