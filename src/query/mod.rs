//! Query orchestration.
//!
//! A [`Session`] is the unit of work behind every command: parse the input
//! files (in parallel, skipping files that fail to parse), build one graph
//! per file, merge them, link calls, and propagate types. The query functions
//! then answer against the merged graph. Sessions are rebuilt per run; there
//! is no cache to invalidate.

use crate::analysis::{
    analyze_impact, calculation_path, track_types, CalculationPath, ImpactReport, TypeEvolution,
};
use crate::config::FlowtraceConfig;
use crate::core::errors::{AnalysisError, AnalysisWarning, FileFailure};
use crate::core::{Deadline, Direction, Location, VariableKind};
use crate::graph::builder::build_graph;
use crate::graph::linker::link;
use crate::graph::traversal::{traverse, Traversal};
use crate::graph::{FlowGraph, NodeId};
use crate::parsers::parse_source;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

/// One input file, already read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

/// Read a batch of files. I/O errors are fatal here; parse errors are
/// deferred to session building so one bad file never sinks a batch.
pub fn load_files(paths: &[PathBuf]) -> Result<Vec<SourceFile>, AnalysisError> {
    paths
        .iter()
        .map(|path| {
            let content =
                std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
                    file: path.clone(),
                    source,
                })?;
            Ok(SourceFile {
                path: path.clone(),
                content,
            })
        })
        .collect()
}

/// The analyzed state all queries run against.
#[derive(Debug)]
pub struct Session {
    pub graph: FlowGraph,
    /// Files skipped because they did not parse.
    pub failures: Vec<FileFailure>,
    pub files_analyzed: usize,
    pub config: FlowtraceConfig,
}

/// Parse, build, merge, link. Input order does not matter: files are sorted
/// by path before merging so the same batch always yields the same graph.
pub fn build_session(
    mut files: Vec<SourceFile>,
    config: FlowtraceConfig,
    deadline: &Deadline,
) -> Result<Session, AnalysisError> {
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let parsed: Vec<Result<crate::parsers::ParsedFile, FileFailure>> = files
        .par_iter()
        .map(|file| {
            parse_source(&file.content, &file.path).map_err(|error| FileFailure {
                path: file.path.clone(),
                error: error.to_string(),
            })
        })
        .collect();

    let mut graph = FlowGraph::new();
    let mut failures = Vec::new();
    let mut files_analyzed = 0;
    for result in parsed {
        deadline.check()?;
        match result {
            Ok(file) => {
                let file_graph = build_graph(&file, deadline)?;
                graph.merge(file_graph);
                files_analyzed += 1;
            }
            Err(failure) => {
                log::warn!("skipping {}: {}", failure.path.display(), failure.error);
                failures.push(failure);
            }
        }
    }

    link(&mut graph, config.limits.max_call_depth, deadline)?;
    crate::analysis::type_tracker::propagate(&mut graph);

    Ok(Session {
        graph,
        failures,
        files_analyzed,
        config,
    })
}

impl Session {
    /// All version nodes for a variable, or the distinct not-found error. An
    /// existing variable with no dependencies is an empty result, never an
    /// error; that distinction is load-bearing for callers.
    fn origins(&self, name: &str) -> Result<Vec<NodeId>, AnalysisError> {
        let versions = self.graph.versions_of(name);
        if versions.is_empty() {
            return Err(AnalysisError::VariableNotFound {
                name: name.to_string(),
            });
        }
        Ok(versions.to_vec())
    }

    pub fn trace(
        &self,
        name: &str,
        options: &TraceOptions,
        deadline: &Deadline,
    ) -> Result<TraceReport, AnalysisError> {
        let origins = self.origins(name)?;

        let forward = match options.direction {
            Direction::Forward | Direction::Both => Some(self.direction_result(
                &origins,
                Direction::Forward,
                options.max_depth,
                deadline,
            )?),
            Direction::Backward => None,
        };
        let backward = match options.direction {
            Direction::Backward | Direction::Both => Some(self.direction_result(
                &origins,
                Direction::Backward,
                options.max_depth,
                deadline,
            )?),
            Direction::Forward => None,
        };

        Ok(TraceReport {
            variable: name.to_string(),
            direction: options.direction,
            definitions: origins
                .iter()
                .map(|&id| self.entry(id, 0, &[id]))
                .collect(),
            forward,
            backward,
            warnings: self.graph.warnings.clone(),
        })
    }

    fn direction_result(
        &self,
        origins: &[NodeId],
        direction: Direction,
        max_depth: Option<usize>,
        deadline: &Deadline,
    ) -> Result<DirectionResult, AnalysisError> {
        let walk = traverse(&self.graph, origins, direction, max_depth, deadline)?;
        let entries = walk
            .reached
            .iter()
            .map(|r| self.entry(r.node, r.depth, &r.path))
            .collect();
        let flow_paths = self.flow_paths(&walk, direction);
        Ok(DirectionResult {
            direction,
            total_count: walk.count(),
            entries,
            flow_paths,
        })
    }

    fn entry(&self, id: NodeId, depth: usize, path: &[NodeId]) -> TraceEntry {
        let node = self.graph.node(id);
        TraceEntry {
            name: node.name.clone(),
            kind: node.kind,
            location: node.location.clone(),
            depth,
            code: node.code.clone(),
            inferred_type: node.inferred_type.display_name(),
            path: path
                .iter()
                .map(|&p| self.graph.node(p).name.clone())
                .collect(),
        }
    }

    /// Human-readable chains from each origin to each terminal of the walk,
    /// e.g. `x -> y -> z -> result`. A terminal is a node the walk cannot
    /// continue past in its direction.
    fn flow_paths(&self, walk: &Traversal, direction: Direction) -> Vec<String> {
        walk.reached
            .iter()
            .filter(|r| match direction {
                Direction::Forward => self.graph.out_degree(r.node) == 0,
                Direction::Backward => self.graph.in_degree(r.node) == 0,
                Direction::Both => false,
            })
            .map(|r| {
                r.path
                    .iter()
                    .map(|&id| self.graph.node(id).name.clone())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
            .collect()
    }

    pub fn impact(
        &self,
        name: &str,
        deadline: &Deadline,
    ) -> Result<ImpactReport, AnalysisError> {
        let origins = self.origins(name)?;
        analyze_impact(&self.graph, name, &origins, &self.config, deadline)
    }

    pub fn calculation(
        &self,
        name: &str,
        deadline: &Deadline,
    ) -> Result<CalculationPath, AnalysisError> {
        self.origins(name)?;
        calculation_path(&self.graph, name, deadline)?.ok_or_else(|| {
            AnalysisError::VariableNotFound {
                name: name.to_string(),
            }
        })
    }

    pub fn type_evolution(&self, name: &str) -> Result<TypeEvolution, AnalysisError> {
        track_types(&self.graph, name).ok_or_else(|| AnalysisError::VariableNotFound {
            name: name.to_string(),
        })
    }

    /// Subgraph reachable from a variable in both directions, for graph
    /// export.
    pub fn export(
        &self,
        name: &str,
        deadline: &Deadline,
    ) -> Result<GraphExport, AnalysisError> {
        let origins = self.origins(name)?;
        let walk = traverse(&self.graph, &origins, Direction::Both, None, deadline)?;

        let mut included: Vec<NodeId> = origins.clone();
        included.extend(walk.reached.iter().map(|r| r.node));
        included.sort();
        included.dedup();

        let nodes = included
            .iter()
            .map(|&id| {
                let node = self.graph.node(id);
                ExportNode {
                    id: id.0,
                    label: format!("{} v{}", node.name, node.version),
                    kind: node.kind,
                    location: node.location.clone(),
                }
            })
            .collect();
        let edges = self
            .graph
            .edges()
            .iter()
            .filter(|e| included.binary_search(&e.from).is_ok() && included.binary_search(&e.to).is_ok())
            .map(|e| ExportEdge {
                from: e.from.0,
                to: e.to.0,
                kind: format!("{:?}", e.kind),
            })
            .collect();
        Ok(GraphExport { nodes, edges })
    }
}

#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub direction: Direction,
    pub max_depth: Option<usize>,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Both,
            max_depth: None,
        }
    }
}

/// One node in a trace result.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub name: String,
    pub kind: VariableKind,
    pub location: Location,
    pub depth: usize,
    pub code: String,
    pub inferred_type: String,
    /// Shortest chain of names from an origin to this node.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectionResult {
    pub direction: Direction,
    pub total_count: usize,
    pub entries: Vec<TraceEntry>,
    pub flow_paths: Vec<String>,
}

/// The full answer to a trace query, ready for any output format.
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub variable: String,
    pub direction: Direction,
    pub definitions: Vec<TraceEntry>,
    pub forward: Option<DirectionResult>,
    pub backward: Option<DirectionResult>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Flat node/edge lists for DOT rendering.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportNode {
    pub id: u32,
    pub label: String,
    pub kind: VariableKind,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportEdge {
    pub from: u32,
    pub to: u32,
    pub kind: String,
}
