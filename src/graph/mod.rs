//! The variable dependency graph.
//!
//! A [`FlowGraph`] is an arena of variable-version nodes addressed by dense
//! integer ids, with forward and reverse adjacency lists. It is a pure
//! function of the source text it was built from: building twice from the
//! same input yields an identical graph. Graphs are built fresh per query,
//! merged by union for multi-file batches, and discarded afterwards.

pub mod builder;
pub mod linker;
pub mod traversal;

use crate::core::errors::AnalysisWarning;
use crate::core::{Location, VariableKind};
use crate::parsers::ControlContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// One variable version (or engine-internal sentinel) in the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableNode {
    pub name: String,
    pub location: Location,
    pub scope: ScopeId,
    pub kind: VariableKind,
    /// Version number per (name, scope); re-assignment bumps it.
    pub version: u32,
    pub inferred_type: crate::core::InferredType,
    pub nullable: bool,
    /// Source text of the expression that produced this version.
    pub expression: String,
    /// Source text of the defining statement.
    pub code: String,
    #[serde(skip, default = "default_context")]
    pub context: ControlContext,
}

fn default_context() -> ControlContext {
    ControlContext::Straight
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Assignment,
    Augmented,
    ParameterBinding,
    ReturnBinding,
    AttributeWrite,
    CallArgument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub line: usize,
}

/// A function or module scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    /// `<module>` for file scope, otherwise the qualified function name.
    pub name: String,
    pub parent: Option<ScopeId>,
    pub file: PathBuf,
    pub params: Vec<NodeId>,
    /// Synthetic collector node that every `return` expression feeds.
    pub return_node: Option<NodeId>,
}

impl Scope {
    pub fn is_module(&self) -> bool {
        self.parent.is_none()
    }
}

/// A call expression recorded for the inter-procedural linker.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub caller: ScopeId,
    pub callee: String,
    /// Last path segment of the callee, for definition lookup.
    pub callee_segment: String,
    /// Dependency roots per argument position.
    pub args: Vec<Vec<NodeId>>,
    pub result: NodeId,
    pub line: usize,
}

/// The full node/edge set for one analysis unit. May contain cycles
/// (recursive calls); all traversal is cycle-safe.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: Vec<VariableNode>,
    edges: Vec<Edge>,
    out_adj: Vec<Vec<usize>>,
    in_adj: Vec<Vec<usize>>,
    pub scopes: Vec<Scope>,
    pub call_sites: Vec<CallSite>,
    /// Qualified function name -> defining scope.
    pub functions: HashMap<String, ScopeId>,
    /// Name -> version nodes, user variables only, in creation order.
    variables: HashMap<String, Vec<NodeId>>,
    /// Per-graph interning of external sentinel leaves.
    externals: HashMap<String, NodeId>,
    pub warnings: Vec<AnalysisWarning>,
    /// Set when the upstream parse failed; the graph then has zero nodes and
    /// callers must check before querying.
    pub error: Option<String>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The zero-node graph a parse failure yields.
    pub fn with_error(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> &VariableNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut VariableNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &VariableNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn add_node(&mut self, node: VariableNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        if node.kind.is_user_variable() {
            self.variables
                .entry(node.name.clone())
                .or_default()
                .push(id);
        }
        self.nodes.push(node);
        self.out_adj.push(Vec::new());
        self.in_adj.push(Vec::new());
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind, line: usize) {
        let idx = self.edges.len();
        self.edges.push(Edge {
            from,
            to,
            kind,
            line,
        });
        self.out_adj[from.0 as usize].push(idx);
        self.in_adj[to.0 as usize].push(idx);
    }

    pub fn add_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        debug_assert_eq!(scope.id, id);
        self.scopes.push(scope);
        id
    }

    /// Outgoing edges with their target nodes, in insertion order.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.out_adj[id.0 as usize].iter().map(|&i| &self.edges[i])
    }

    /// Incoming edges with their source nodes, in insertion order.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.in_adj[id.0 as usize].iter().map(|&i| &self.edges[i])
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.out_adj[id.0 as usize].len()
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.in_adj[id.0 as usize].len()
    }

    /// All version nodes for a user-visible variable name, creation order.
    pub fn versions_of(&self, name: &str) -> &[NodeId] {
        self.variables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Interned sentinel leaf for an unresolved name. The first reference
    /// records an `UnresolvedReference` warning; later references reuse the
    /// same leaf with no further backward expansion.
    pub fn external(&mut self, name: &str, location: Location, scope: ScopeId) -> NodeId {
        if let Some(&id) = self.externals.get(name) {
            return id;
        }
        self.warnings.push(AnalysisWarning::UnresolvedReference {
            name: name.to_string(),
            location: location.clone(),
        });
        let id = self.add_node(VariableNode {
            name: name.to_string(),
            location,
            scope,
            kind: VariableKind::External,
            version: 0,
            inferred_type: crate::core::InferredType::Unknown,
            nullable: false,
            expression: String::new(),
            code: String::new(),
            context: ControlContext::Straight,
        });
        self.externals.insert(name.to_string(), id);
        id
    }

    /// Union another graph into this one, rebasing its ids. Used to combine
    /// independently built per-file graphs before linking.
    pub fn merge(&mut self, other: FlowGraph) {
        let node_base = self.nodes.len() as u32;
        let scope_base = self.scopes.len() as u32;

        for mut node in other.nodes {
            node.scope = ScopeId(node.scope.0 + scope_base);
            // Bypass add_node's variable indexing; re-indexed below.
            self.nodes.push(node);
            self.out_adj.push(Vec::new());
            self.in_adj.push(Vec::new());
        }
        for (name, ids) in other.variables {
            let rebased = ids.into_iter().map(|id| NodeId(id.0 + node_base));
            self.variables.entry(name).or_default().extend(rebased);
        }
        for edge in other.edges {
            self.add_edge(
                NodeId(edge.from.0 + node_base),
                NodeId(edge.to.0 + node_base),
                edge.kind,
                edge.line,
            );
        }
        for mut scope in other.scopes {
            scope.id = ScopeId(scope.id.0 + scope_base);
            scope.parent = scope.parent.map(|p| ScopeId(p.0 + scope_base));
            scope.params = scope.params.iter().map(|p| NodeId(p.0 + node_base)).collect();
            scope.return_node = scope.return_node.map(|r| NodeId(r.0 + node_base));
            self.scopes.push(scope);
        }
        for (name, scope) in other.functions {
            self.functions
                .entry(name)
                .or_insert(ScopeId(scope.0 + scope_base));
        }
        for mut site in other.call_sites {
            site.caller = ScopeId(site.caller.0 + scope_base);
            site.result = NodeId(site.result.0 + node_base);
            site.args = site
                .args
                .into_iter()
                .map(|roots| roots.into_iter().map(|r| NodeId(r.0 + node_base)).collect())
                .collect();
            self.call_sites.push(site);
        }
        self.warnings.extend(other.warnings);
        if self.error.is_none() {
            self.error = other.error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InferredType;

    fn test_node(name: &str, scope: ScopeId) -> VariableNode {
        VariableNode {
            name: name.to_string(),
            location: Location::new("test.py", 1),
            scope,
            kind: VariableKind::Local,
            version: 0,
            inferred_type: InferredType::Unknown,
            nullable: false,
            expression: String::new(),
            code: String::new(),
            context: ControlContext::Straight,
        }
    }

    fn module_scope() -> Scope {
        Scope {
            id: ScopeId(0),
            name: "<module>".to_string(),
            parent: None,
            file: "test.py".into(),
            params: vec![],
            return_node: None,
        }
    }

    #[test]
    fn test_arena_ids_are_dense() {
        let mut graph = FlowGraph::new();
        graph.add_scope(module_scope());
        let a = graph.add_node(test_node("a", ScopeId(0)));
        let b = graph.add_node(test_node("b", ScopeId(0)));
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_adjacency() {
        let mut graph = FlowGraph::new();
        graph.add_scope(module_scope());
        let a = graph.add_node(test_node("a", ScopeId(0)));
        let b = graph.add_node(test_node("b", ScopeId(0)));
        graph.add_edge(a, b, EdgeKind::Assignment, 2);

        assert_eq!(graph.out_degree(a), 1);
        assert_eq!(graph.in_degree(b), 1);
        assert_eq!(graph.outgoing(a).next().unwrap().to, b);
        assert_eq!(graph.incoming(b).next().unwrap().from, a);
    }

    #[test]
    fn test_external_interning_warns_once() {
        let mut graph = FlowGraph::new();
        graph.add_scope(module_scope());
        let first = graph.external("json", Location::new("test.py", 1), ScopeId(0));
        let second = graph.external("json", Location::new("test.py", 9), ScopeId(0));
        assert_eq!(first, second);
        assert_eq!(graph.warnings.len(), 1);
    }

    #[test]
    fn test_versions_index_tracks_user_variables_only() {
        let mut graph = FlowGraph::new();
        graph.add_scope(module_scope());
        graph.add_node(test_node("x", ScopeId(0)));
        let mut sentinel = test_node("x", ScopeId(0));
        sentinel.kind = VariableKind::External;
        graph.add_node(sentinel);
        assert_eq!(graph.versions_of("x").len(), 1);
    }

    #[test]
    fn test_merge_rebases_ids() {
        let mut left = FlowGraph::new();
        left.add_scope(module_scope());
        let a = left.add_node(test_node("a", ScopeId(0)));
        let b = left.add_node(test_node("b", ScopeId(0)));
        left.add_edge(a, b, EdgeKind::Assignment, 1);

        let mut right = FlowGraph::new();
        right.add_scope(module_scope());
        let c = right.add_node(test_node("c", ScopeId(0)));
        let d = right.add_node(test_node("d", ScopeId(0)));
        right.add_edge(c, d, EdgeKind::Assignment, 1);

        left.merge(right);
        assert_eq!(left.node_count(), 4);
        assert_eq!(left.edge_count(), 2);
        assert_eq!(left.scopes.len(), 2);
        // The rebased edge connects the rebased nodes.
        let edge = &left.edges()[1];
        assert_eq!(left.node(edge.from).name, "c");
        assert_eq!(left.node(edge.to).name, "d");
        assert_eq!(left.versions_of("c"), &[NodeId(2)]);
    }
}
