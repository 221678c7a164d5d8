//! pywat Compiler
//!
//! Reads a program tree (JSON) and writes a WebAssembly text module.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use pywat::feedback::CompilationFeedback;
use pywat::middle::layout::resolve_layouts;
use pywat::{type_check, CodeGen, Program, WatCodeGen};

/// pywat Compiler
#[derive(Parser, Debug)]
#[command(name = "pywatc")]
#[command(version = "0.1.0")]
#[command(about = "Compile a typed Python subset to WebAssembly text")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input program tree (.json)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit the typed tree as JSON instead of WAT
    #[arg(long, global = true)]
    emit_typed: bool,

    /// How to report errors
    #[arg(long, value_enum, default_value = "human", global = true)]
    message_format: MessageFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a program
    Build {
        /// Input program tree
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Type check a program and print its type
    Check {
        /// Input program tree
        input: PathBuf,
    },
    /// Print version information
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MessageFormat {
    Human,
    Json,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Build { input, output }) => compile_file(input, output.clone(), &cli),
        Some(Commands::Check { input }) => check_file(input, &cli),
        Some(Commands::Version) => {
            println!("pywatc 0.1.0");
            println!("Typed Python subset to WebAssembly text compiler");
            println!("License: Apache-2.0");
            Ok(true)
        }
        None => match &cli.input {
            Some(input) => compile_file(input, cli.output.clone(), &cli),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: pywatc <FILE> or pywatc build <FILE>");
                process::exit(1);
            }
        },
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn read_program(input: &Path) -> Result<Program> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    serde_json::from_str(&source).with_context(|| format!("parsing program tree in {}", input.display()))
}

/// Report a compiler error in the requested format
fn report(input: &Path, error: &pywat::Error, cli: &Cli) {
    match cli.message_format {
        MessageFormat::Human => eprintln!("{}", error),
        MessageFormat::Json => {
            let feedback = CompilationFeedback::failure(input.display().to_string(), error);
            println!("{}", feedback.to_json());
        }
    }
}

/// Compile a program tree. Returns `Ok(false)` when the program is rejected.
fn compile_file(input: &Path, output: Option<PathBuf>, cli: &Cli) -> Result<bool> {
    let human = cli.message_format == MessageFormat::Human;
    if human {
        println!("Compiling: {}", input.display());
    }

    let program = read_program(input)?;

    let (typed, env) = match type_check(&program) {
        Ok(checked) => checked,
        Err(e) => {
            report(input, &e, cli);
            return Ok(false);
        }
    };
    if human {
        println!("  [✓] Type check passed (program type {})", typed.ty);
    }

    if cli.emit_typed {
        let path = output.unwrap_or_else(|| input.with_extension("typed.json"));
        let json = serde_json::to_string_pretty(&typed).context("serializing typed tree")?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        if human {
            println!("  [✓] Wrote typed tree to {}", path.display());
        }
        return Ok(true);
    }

    let generated = resolve_layouts(&typed, &env).and_then(|env| {
        let mut codegen = WatCodeGen::new();
        codegen.generate(&typed, &env)
    });
    let text = match generated {
        Ok(text) => text,
        Err(e) => {
            report(input, &e, cli);
            return Ok(false);
        }
    };

    let path = output.unwrap_or_else(|| input.with_extension("wat"));
    fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;

    if human {
        println!("\n✅ Output: {}", path.display());
    } else {
        let feedback = CompilationFeedback::success(input.display().to_string(), &typed);
        println!("{}", feedback.to_json());
    }
    Ok(true)
}

/// Check a program for errors without generating code
fn check_file(input: &Path, cli: &Cli) -> Result<bool> {
    let program = read_program(input)?;

    match type_check(&program) {
        Ok((typed, _)) => {
            match cli.message_format {
                MessageFormat::Human => println!("Program type: {}", typed.ty),
                MessageFormat::Json => {
                    let feedback = CompilationFeedback::success(input.display().to_string(), &typed);
                    println!("{}", feedback.to_json());
                }
            }
            Ok(true)
        }
        Err(e) => {
            report(input, &e, cli);
            Ok(false)
        }
    }
}
