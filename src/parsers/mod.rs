//! Language front ends.
//!
//! Each adapter parses one source file with its tree-sitter grammar and
//! normalizes it into the closed statement/expression model below, so the
//! graph builder and the analyses never see language-specific AST shapes.
//! Constructs the model does not cover map to [`Expr::Unknown`] or produce an
//! `UnsupportedConstruct` warning; nothing is dropped silently.

pub mod python;
pub mod typescript;

use crate::core::errors::{AnalysisError, AnalysisWarning};
use crate::core::Language;
use std::path::{Path, PathBuf};

/// Parse result for one file: a normalized statement stream plus the
/// non-fatal warnings gathered along the way.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub language: Language,
    pub statements: Vec<Stmt>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Control context a statement executes under, as seen from its enclosing
/// function (or module). The type tracker uses this for its
/// modified-inside-loop-or-conditional warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlContext {
    Straight,
    Loop,
    Conditional,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
    pub context: ControlContext,
    /// Raw source text of the statement, single line, trimmed.
    pub code: String,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// One value bound to one or more targets (`x = e`, `a = b = c = e`).
    /// Chained targets are independent bindings of the same value.
    Assign {
        targets: Vec<AssignTarget>,
        annotation: Option<String>,
        value: Expr,
        value_text: String,
    },
    /// Tuple/destructuring assignment. When `values.len() == targets.len()`
    /// the bindings pair positionally; otherwise every target depends on
    /// every value (`a, b = pair`).
    TupleAssign {
        targets: Vec<AssignTarget>,
        values: Vec<Expr>,
        value_text: String,
    },
    /// Read-modify-write of a single target (`x += e`).
    AugAssign {
        target: AssignTarget,
        value: Expr,
        value_text: String,
    },
    FunctionDef(FunctionDef),
    Return {
        value: Option<Expr>,
    },
    /// A bare expression statement, kept for its calls (side-effect sinks).
    Expr {
        value: Expr,
    },
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Qualified name: `total` for a free function, `Order.total` for a
    /// method.
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Option<String>,
    pub line: usize,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Name(String),
    /// `obj.field = ...` / `self.x = ...` / `this.x = ...`
    Attribute { base: String, attr: String },
    /// `d[k] = ...` — coarse, no per-key precision; mutates the base.
    Subscript { base: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    Str,
    Bool,
    Null,
    List,
    Dict,
    Set,
    Tuple,
}

/// Normalized expression tree. A closed enum: every language construct the
/// engine models is one of these variants, and everything else is `Unknown`.
#[derive(Debug, Clone)]
pub enum Expr {
    Name(String),
    Literal(LiteralKind),
    /// Container literal; contributes one dependency edge per element.
    Container {
        kind: LiteralKind,
        elements: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        operand: Box<Expr>,
    },
    BoolOp {
        operands: Vec<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
    /// Attribute read; propagates from the base variable.
    Attribute {
        base: Box<Expr>,
        attr: String,
    },
    /// Subscript read; propagates from the base variable.
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// Comprehension / generator expression. Loop variables are scoped to
    /// the comprehension and must not leak to the enclosing scope.
    Comprehension {
        element: Box<Expr>,
        loop_vars: Vec<String>,
        /// One iterable per `for` clause, in clause order.
        iters: Vec<Expr>,
        condition: Option<Box<Expr>>,
    },
    /// f-string / template string; one dependency per interpolated part.
    Interpolation {
        parts: Vec<Expr>,
    },
    Unknown,
}

#[derive(Debug, Clone)]
pub enum Callee {
    Name(String),
    Method { receiver: Box<Expr>, name: String },
}

impl Callee {
    /// Human-readable callee name: `f`, `logger.info`, `.append` when the
    /// receiver is not a plain name.
    pub fn display_name(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Method { receiver, name } => match receiver.as_ref() {
                Expr::Name(base) => format!("{base}.{name}"),
                _ => format!(".{name}"),
            },
        }
    }

    /// Final path segment, used for definition lookup (`obj.helper` -> `helper`).
    pub fn last_segment(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Method { name, .. } => name,
        }
    }
}

/// One language front end. Implementations share this contract so downstream
/// components stay language-agnostic.
pub trait Adapter {
    fn language(&self) -> Language;

    /// Parse one file into the normalized model. A syntax failure is a
    /// `ParseError`; batch callers skip the file and continue.
    fn parse(&self, content: &str, path: &Path) -> Result<ParsedFile, AnalysisError>;
}

/// Select the adapter for a language surface.
pub fn adapter_for(language: Language) -> Box<dyn Adapter> {
    match language {
        Language::Python => Box::new(python::PythonAdapter),
        Language::JavaScript | Language::TypeScript => {
            Box::new(typescript::TypeScriptAdapter::new(language))
        }
    }
}

/// Parse a file, detecting the language from its extension.
pub fn parse_source(content: &str, path: &Path) -> Result<ParsedFile, AnalysisError> {
    let language = Language::from_path(path)
        .ok_or_else(|| AnalysisError::UnsupportedLanguage(path.to_path_buf()))?;
    adapter_for(language).parse(content, path)
}
