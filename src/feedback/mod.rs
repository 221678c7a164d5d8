//! Structured Feedback Module
//!
//! Machine-readable output for editors and test harnesses:
//! - JSON error reports with fix suggestions
//! - Compilation statistics

use serde::{Deserialize, Serialize};

use crate::middle::typed_ast::TypedProgram;
use crate::utils::{Error, ErrorKind};

// ==================== Structured Error Report ====================

/// A structured error report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    /// Error family
    pub kind: ReportKind,

    /// Human-readable message
    pub message: String,

    /// Suggested fixes
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Type,
    Internal,
}

impl From<ErrorKind> for ReportKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Type => Self::Type,
            ErrorKind::Internal => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Description of the fix
    pub message: String,

    /// Confidence in this suggestion (0.0 - 1.0)
    pub confidence: f64,
}

impl Suggestion {
    fn new(message: impl Into<String>, confidence: f64) -> Self {
        Self { message: message.into(), confidence }
    }
}

// ==================== Compilation Feedback ====================

/// Complete compilation feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationFeedback {
    /// Compilation status
    pub success: bool,

    /// Source file
    pub source_file: String,

    /// Type of the program's final statement, when checking succeeded
    pub program_type: Option<String>,

    /// The first error, if any
    pub diagnostics: Vec<ErrorReport>,

    /// Compilation statistics
    pub stats: CompilationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationStats {
    pub global_count: usize,
    pub class_count: usize,
    pub method_count: usize,
    pub statement_count: usize,
}

impl CompilationStats {
    pub fn of(program: &TypedProgram) -> Self {
        Self {
            global_count: program.variables.len(),
            class_count: program.classes.len(),
            method_count: program.classes.iter().map(|c| c.methods.len()).sum(),
            statement_count: program.body.len(),
        }
    }
}

// ==================== Error Conversion ====================

impl ErrorReport {
    /// Create an error report from a compiler error
    pub fn from_error(error: &Error) -> Self {
        let (code, suggestions) = error_info(error);
        Self {
            code: code.to_string(),
            kind: error.kind().into(),
            message: error.to_string(),
            suggestions,
        }
    }

    /// Sort suggestions by confidence (highest first)
    pub fn sort_suggestions(&mut self) {
        self.suggestions.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// Error code and suggestions for an error
fn error_info(error: &Error) -> (&'static str, Vec<Suggestion>) {
    match error {
        // ========== Names ==========
        Error::UndefinedVariable { name } => (
            "E0001",
            vec![Suggestion::new(format!("Declare `{}` with a type and a literal initializer", name), 0.8)],
        ),
        Error::NotAssignableHere { name } => (
            "E0002",
            vec![
                Suggestion::new(format!("Globals are read-only inside methods; declare a local instead of assigning `{}`", name), 0.7),
                Suggestion::new("Store the value in a field of an object instead", 0.4),
            ],
        ),
        Error::UndefinedFunction { .. } => ("E0003", Vec::new()),
        Error::UndefinedClass { .. } => ("E0004", Vec::new()),
        Error::UnknownMethod { .. } | Error::UnknownField { .. } => ("E0005", Vec::new()),
        Error::DuplicateDefinition { .. } => ("E0006", vec![Suggestion::new("Rename one of the definitions", 0.6)]),
        Error::InvalidDeclaredType { .. } => ("E0007", Vec::new()),

        // ========== Typing ==========
        Error::TypeMismatch { .. } | Error::ReturnTypeMismatch { .. } | Error::MethodReturnMismatch { .. } => {
            ("E0010", Vec::new())
        }
        Error::ArgumentMismatch { .. } => ("E0011", Vec::new()),
        Error::ArgCountMismatch { expected, got, .. } => {
            let fix = if got < expected {
                format!("Add {} more argument(s)", expected - got)
            } else {
                format!("Remove {} extra argument(s)", got - expected)
            };
            ("E0012", vec![Suggestion::new(fix, 0.9)])
        }
        Error::InvalidUnaryOperand { .. } | Error::InvalidBinaryOperands { .. } => ("E0013", Vec::new()),
        Error::NotAnObject { .. } => ("E0014", Vec::new()),
        Error::NonBoolCondition { .. } => (
            "E0015",
            vec![Suggestion::new("Compare the value explicitly, e.g. `x != 0` or `x is None`", 0.7)],
        ),
        Error::MalformedIf => ("E0016", Vec::new()),

        // ========== Returns ==========
        Error::ReturnOutsideMethod => ("E0020", Vec::new()),
        Error::UnexpectedReturnValue { .. } => (
            "E0021",
            vec![Suggestion::new("Annotate the method with a return type", 0.8)],
        ),
        Error::MissingReturn { .. } => (
            "E0022",
            vec![
                Suggestion::new("Add a return statement at the end of the method", 0.8),
                Suggestion::new("Give the final `if` an `else` arm that returns", 0.6),
            ],
        ),

        // ========== Classes ==========
        Error::InvalidSelf { class, .. } | Error::MissingSelf { class, .. } => (
            "E0030",
            vec![Suggestion::new(format!("Make the first parameter `self: {}`", class), 0.9)],
        ),
        Error::ConstructorArity { .. }
        | Error::ConstructorReturnType { .. }
        | Error::ConstructorReturnsValue { .. } => ("E0031", Vec::new()),
        Error::ExplicitConstructorCall { class } => (
            "E0032",
            vec![Suggestion::new(format!("Create a new object with `{}()`", class), 0.7)],
        ),
        Error::ConstructorArgs { .. } => (
            "E0033",
            vec![Suggestion::new("Constructors take no arguments; assign fields after construction", 0.7)],
        ),

        // ========== Compiler ==========
        Error::Internal(_) => ("E9000", Vec::new()),
    }
}

impl CompilationFeedback {
    /// Create a successful feedback
    pub fn success(source_file: String, program: &TypedProgram) -> Self {
        Self {
            success: true,
            source_file,
            program_type: Some(program.ty.to_string()),
            diagnostics: Vec::new(),
            stats: CompilationStats::of(program),
        }
    }

    /// Create a failed feedback
    pub fn failure(source_file: String, error: &Error) -> Self {
        Self {
            success: false,
            source_file,
            program_type: None,
            diagnostics: vec![ErrorReport::from_error(error)],
            stats: CompilationStats::default(),
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
