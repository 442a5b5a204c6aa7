//! flowtrace: static data-flow tracing for Python, JavaScript, and
//! TypeScript sources.
//!
//! The pipeline is parse -> build -> link -> query. Language adapters
//! normalize tree-sitter ASTs into one statement model, the graph layer turns
//! that into versioned variable nodes with dependency edges, the linker wires
//! calls to their definitions, and the query layer answers trace, impact,
//! calculation-path, and type questions against the merged graph.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod graph;
pub mod io;
pub mod parsers;
pub mod query;

pub use crate::config::FlowtraceConfig;
pub use crate::core::errors::{AnalysisError, AnalysisWarning};
pub use crate::core::{Deadline, Direction, Language};
pub use crate::query::{build_session, load_files, Session, SourceFile, TraceOptions};
