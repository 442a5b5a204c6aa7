//! Cycle-safe breadth-first traversal over the dependency graph.
//!
//! Forward follows out-edges (who consumes this value), backward follows
//! in-edges (where this value came from). Every reached node carries its hop
//! distance and one shortest path back to an origin; when several shortest
//! paths exist the first discovered in adjacency order wins, which is stable
//! across runs because the graph itself is deterministic.

use super::{FlowGraph, NodeId};
use crate::core::errors::AnalysisError;
use crate::core::{Deadline, Direction};
use std::collections::VecDeque;

/// One node reached by a traversal.
#[derive(Debug, Clone)]
pub struct Reached {
    pub node: NodeId,
    /// Hop distance from the nearest origin (1 = direct neighbor).
    pub depth: usize,
    /// Shortest path from an origin to this node, origin first.
    pub path: Vec<NodeId>,
}

/// Result of one breadth-first walk. Origins are not included in `reached`.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub origins: Vec<NodeId>,
    pub reached: Vec<Reached>,
}

impl Traversal {
    pub fn count(&self) -> usize {
        self.reached.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.reached.iter().any(|r| r.node == node)
    }
}

/// Walk from `origins` in the given direction.
///
/// `max_depth` of `Some(d)` keeps nodes up to `d + 1` hops out, so a limit of
/// zero still shows direct neighbors. `None` walks to exhaustion.
pub fn traverse(
    graph: &FlowGraph,
    origins: &[NodeId],
    direction: Direction,
    max_depth: Option<usize>,
    deadline: &Deadline,
) -> Result<Traversal, AnalysisError> {
    let hop_limit = max_depth.map(|d| d + 1);

    let mut visited = vec![false; graph.node_count()];
    let mut parent: Vec<Option<NodeId>> = vec![None; graph.node_count()];
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
    let mut reached = Vec::new();

    for &origin in origins {
        if !visited[origin.0 as usize] {
            visited[origin.0 as usize] = true;
            queue.push_back((origin, 0));
        }
    }

    while let Some((node, depth)) = queue.pop_front() {
        deadline.check()?;
        if hop_limit.is_some_and(|limit| depth >= limit) {
            continue;
        }
        for neighbor in neighbors(graph, node, direction) {
            let slot = neighbor.0 as usize;
            if visited[slot] {
                continue;
            }
            visited[slot] = true;
            parent[slot] = Some(node);
            reached.push(Reached {
                node: neighbor,
                depth: depth + 1,
                path: trace_path(&parent, neighbor),
            });
            queue.push_back((neighbor, depth + 1));
        }
    }

    Ok(Traversal {
        origins: origins.to_vec(),
        reached,
    })
}

fn neighbors(graph: &FlowGraph, node: NodeId, direction: Direction) -> Vec<NodeId> {
    match direction {
        Direction::Forward => graph.outgoing(node).map(|e| e.to).collect(),
        Direction::Backward => graph.incoming(node).map(|e| e.from).collect(),
        Direction::Both => {
            let mut out: Vec<NodeId> = graph.outgoing(node).map(|e| e.to).collect();
            out.extend(graph.incoming(node).map(|e| e.from));
            out
        }
    }
}

fn trace_path(parent: &[Option<NodeId>], node: NodeId) -> Vec<NodeId> {
    let mut path = vec![node];
    let mut current = node;
    while let Some(prev) = parent[current.0 as usize] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
