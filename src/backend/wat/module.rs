//! Module assembler
//!
//! Wraps generated functions with the fixed preamble every module carries:
//! host imports, the imported linear memory, the heap pointer and one
//! mutable global per top-level variable.

use super::instr::{push_line, write_instrs, Instr, HEAP, SCRATCH};
use crate::stdlib::builtins::{HostImport, HOST_IMPORTS};

/// First free heap address; address 0 stays reserved for `None`
pub const HEAP_START: i32 = 4;

/// Name under which the entry function is exported
pub const ENTRY_EXPORT: &str = "exported_func";

/// A mutable `i32` global
#[derive(Debug, Clone, PartialEq)]
pub struct WatGlobal {
    pub name: String,
    pub init: i32,
}

/// A function definition. Every function gets the scratch local on top of
/// `locals`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WatFunc {
    /// Identifier without the leading `$`
    pub name: Option<String>,
    pub export: Option<String>,
    pub params: Vec<String>,
    pub result: bool,
    pub locals: Vec<String>,
    pub body: Vec<Instr>,
}

impl WatFunc {
    fn header(&self) -> String {
        let mut header = String::from("(func");
        if let Some(name) = &self.name {
            header.push_str(&format!(" ${}", name));
        }
        if let Some(export) = &self.export {
            header.push_str(&format!(" (export \"{}\")", export));
        }
        for p in &self.params {
            header.push_str(&format!(" (param ${} i32)", p));
        }
        if self.result {
            header.push_str(" (result i32)");
        }
        header
    }

    fn write(&self, out: &mut String, indent: usize) {
        push_line(out, indent, &self.header());
        push_line(out, indent + 1, &format!("(local ${} i32)", SCRATCH));
        for l in &self.locals {
            push_line(out, indent + 1, &format!("(local ${} i32)", l));
        }
        write_instrs(out, &self.body, indent + 1);
        push_line(out, indent, ")");
    }
}

/// A complete module ready to render
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WatModule {
    pub globals: Vec<WatGlobal>,
    /// Class constructors and methods, in emission order
    pub functions: Vec<WatFunc>,
    pub entry: WatFunc,
}

impl WatModule {
    /// Render the module text
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, 0, "(module");

        for import in &HOST_IMPORTS {
            push_line(&mut out, 1, &import_line(import));
        }
        push_line(&mut out, 1, "(import \"js\" \"mem\" (memory 1))");
        push_line(&mut out, 1, &global_line(HEAP, HEAP_START));
        for g in &self.globals {
            push_line(&mut out, 1, &global_line(&g.name, g.init));
        }

        for func in &self.functions {
            func.write(&mut out, 1);
        }
        self.entry.write(&mut out, 1);

        push_line(&mut out, 0, ")");
        out
    }
}

fn import_line(import: &HostImport) -> String {
    let mut line = format!(
        "(func ${} (import \"{}\" \"{}\")",
        import.name, import.module, import.field
    );
    for _ in 0..import.params {
        line.push_str(" (param i32)");
    }
    if import.returns {
        line.push_str(" (result i32)");
    }
    line.push(')');
    line
}

fn global_line(name: &str, init: i32) -> String {
    format!("(global ${} (mut i32) (i32.const {}))", name, init)
}
