//! Core data model shared by the parsers, the graph layer, and the analyses.

pub mod errors;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub use errors::{AnalysisError, AnalysisWarning};

/// Supported language surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    /// Detect the language from a file extension. Returns `None` for
    /// unsupported files so batch discovery can skip them silently.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" | "pyi" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "ts" | "mts" | "tsx" => Some(Self::TypeScript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source position, file plus 1-indexed line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Classification of a variable-version node.
///
/// The first four kinds come straight from source text. The remaining kinds
/// are engine-internal: sentinel leaves for unresolved names, call-expression
/// results, per-scope return collectors, and depth-limit markers inserted by
/// the call linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Local,
    Parameter,
    Field,
    Global,
    External,
    CallResult,
    Return,
    Truncation,
}

impl VariableKind {
    /// Whether this kind names a variable a user could ask about.
    pub fn is_user_variable(&self) -> bool {
        matches!(
            self,
            Self::Local | Self::Parameter | Self::Field | Self::Global
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Parameter => "parameter",
            Self::Field => "field",
            Self::Global => "global",
            Self::External => "external",
            Self::CallResult => "call",
            Self::Return => "return",
            Self::Truncation => "truncated",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort syntactic type assigned to a variable version.
///
/// `Unknown` is an explicit variant rather than a null/Any placeholder so the
/// warning logic in the type tracker can be exhaustive about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferredType {
    Int,
    Float,
    Str,
    Bool,
    Null,
    List,
    Dict,
    Set,
    Tuple,
    Constructor(String),
    Annotated(String),
    Unknown,
}

impl InferredType {
    pub fn is_null_like(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Str => "str".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Null => "NoneType".to_string(),
            Self::List => "list".to_string(),
            Self::Dict => "dict".to_string(),
            Self::Set => "set".to_string(),
            Self::Tuple => "tuple".to_string(),
            Self::Constructor(name) => name.clone(),
            Self::Annotated(name) => name.clone(),
            Self::Unknown => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Query direction over the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Both => "both",
        };
        f.write_str(s)
    }
}

/// Wall-clock budget for one whole query.
///
/// Builder, linker, and traversal loops call [`Deadline::check`] at each
/// iteration; expiry fails the query with a distinct error kind instead of
/// returning partial results.
#[derive(Debug, Clone)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn check(&self) -> Result<(), AnalysisError> {
        match self.limit {
            Some(limit) if self.start.elapsed() > limit => Err(AnalysisError::Timeout {
                limit_ms: limit.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}
