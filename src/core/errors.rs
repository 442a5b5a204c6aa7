//! Error and warning kinds for the analysis engine.
//!
//! Fatal conditions are `AnalysisError` values; non-fatal diagnostics are
//! `AnalysisWarning` values collected alongside results. Per-file failures
//! never abort a multi-file batch: the query layer records them and keeps
//! going, so every front end renders partial batches uniformly.

use super::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a single query (never a whole batch, except `Timeout`).
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to parse {file}: {message}")]
    Parse { file: PathBuf, message: String },

    #[error("variable '{name}' not found in analyzed sources")]
    VariableNotFound { name: String },

    #[error("analysis exceeded the {limit_ms}ms time budget")]
    Timeout { limit_ms: u64 },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("io error on {file}: {source}")]
    Io {
        file: PathBuf,
        source: std::io::Error,
    },
}

/// Non-fatal diagnostics produced while parsing, building, or linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisWarning {
    /// A name did not resolve to any visible definition; it became an
    /// external sentinel leaf with no further backward expansion.
    UnresolvedReference { name: String, location: Location },

    /// A construct the adapters do not model; skipped with a note.
    UnsupportedConstruct {
        construct: String,
        location: Location,
    },

    /// The call linker hit its expansion bound and inserted a truncation
    /// marker instead of continuing. Informational, not fatal.
    DepthLimitReached { callee: String, location: Location },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { name, location } => {
                write!(f, "{location}: unresolved reference '{name}'")
            }
            Self::UnsupportedConstruct {
                construct,
                location,
            } => {
                write!(f, "{location}: unsupported construct '{construct}' skipped")
            }
            Self::DepthLimitReached { callee, location } => {
                write!(
                    f,
                    "{location}: call expansion into '{callee}' truncated at depth limit"
                )
            }
        }
    }
}

/// A file that failed to parse or load during a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

impl FileFailure {
    pub fn new(path: PathBuf, error: &AnalysisError) -> Self {
        Self {
            path,
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::VariableNotFound {
            name: "total".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "variable 'total' not found in analyzed sources"
        );

        let err = AnalysisError::Timeout { limit_ms: 500 };
        assert!(err.to_string().contains("500ms"));
    }

    #[test]
    fn test_warning_display() {
        let warning = AnalysisWarning::UnresolvedReference {
            name: "json".to_string(),
            location: Location::new("app.py", 3),
        };
        assert_eq!(warning.to_string(), "app.py:3: unresolved reference 'json'");
    }

    #[test]
    fn test_file_failure_preserves_message() {
        let err = AnalysisError::Parse {
            file: PathBuf::from("broken.py"),
            message: "syntax error".to_string(),
        };
        let failure = FileFailure::new(PathBuf::from("broken.py"), &err);
        assert!(failure.error.contains("syntax error"));
    }
}
