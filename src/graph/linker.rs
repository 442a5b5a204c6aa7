//! Inter-procedural call linking.
//!
//! The builder leaves conservative argument-to-result edges at every call
//! site. Linking adds the precise plumbing where the callee is defined in the
//! analyzed set: argument roots bind to parameter nodes, and the callee's
//! return collector binds to the call-result node. Linking is bounded by a
//! call depth; sites past the bound get a truncation marker node instead, so
//! the output says where the walk stopped rather than silently ending.

use super::{EdgeKind, FlowGraph, ScopeId, VariableNode};
use crate::core::errors::{AnalysisError, AnalysisWarning};
use crate::core::{Deadline, InferredType, VariableKind};
use crate::parsers::ControlContext;
use std::collections::{HashSet, VecDeque};

/// Link call sites to their definitions, breadth-first from module scope.
///
/// `max_depth` counts caller hops: module-level calls are depth 0, calls made
/// inside their callees are depth 1, and so on. Returns the informational
/// warnings produced for truncated sites; they are also appended to
/// `graph.warnings`.
pub fn link(
    graph: &mut FlowGraph,
    max_depth: usize,
    deadline: &Deadline,
) -> Result<Vec<AnalysisWarning>, AnalysisError> {
    let total = graph.call_sites.len();
    let mut worklist: VecDeque<(usize, usize)> = VecDeque::new();
    let mut seen: HashSet<usize> = HashSet::new();

    // Module-level sites seed the walk at depth 0. Sites the walk never
    // reaches (inside never-called functions) are swept up afterwards, also
    // at depth 0, so every site is processed exactly once.
    for (idx, site) in graph.call_sites.iter().enumerate() {
        if graph.scope(site.caller).is_module() {
            seen.insert(idx);
            worklist.push_back((idx, 0));
        }
    }

    let mut truncations = Vec::new();
    loop {
        while let Some((idx, depth)) = worklist.pop_front() {
            deadline.check()?;
            let site = graph.call_sites[idx].clone();

            let Some(callee) = resolve(graph, &site.callee, &site.callee_segment) else {
                continue;
            };

            if depth >= max_depth {
                let location = graph.node(site.result).location.clone();
                let marker = graph.add_node(VariableNode {
                    name: format!("{} (not expanded)", site.callee),
                    location: location.clone(),
                    scope: site.caller,
                    kind: VariableKind::Truncation,
                    version: 0,
                    inferred_type: InferredType::Unknown,
                    nullable: false,
                    expression: site.callee.clone(),
                    code: String::new(),
                    context: ControlContext::Straight,
                });
                graph.add_edge(marker, site.result, EdgeKind::ReturnBinding, site.line);
                let warning = AnalysisWarning::DepthLimitReached {
                    callee: site.callee.clone(),
                    location,
                };
                graph.warnings.push(warning.clone());
                truncations.push(warning);
                continue;
            }

            bind_site(graph, &site, callee);

            for next in sites_in_scope(graph, callee) {
                if seen.insert(next) {
                    worklist.push_back((next, depth + 1));
                }
            }
        }

        match (0..total).find(|idx| !seen.contains(idx)) {
            Some(idx) => {
                seen.insert(idx);
                worklist.push_back((idx, 0));
            }
            None => break,
        }
    }

    Ok(truncations)
}

/// Find the defining scope for a callee name: exact qualified match first,
/// then any definition whose final segment matches (method calls where the
/// receiver class is unknown). Ties break on the lexically smallest name so
/// repeated runs resolve identically.
fn resolve(graph: &FlowGraph, callee: &str, segment: &str) -> Option<ScopeId> {
    if let Some(&scope) = graph.functions.get(callee) {
        return Some(scope);
    }
    let suffix = format!(".{segment}");
    let mut candidates: Vec<(&String, ScopeId)> = graph
        .functions
        .iter()
        .filter(|(name, _)| name.as_str() == segment || name.ends_with(&suffix))
        .map(|(name, &scope)| (name, scope))
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(b.0));
    candidates.first().map(|&(_, scope)| scope)
}

fn bind_site(graph: &mut FlowGraph, site: &super::CallSite, callee: ScopeId) {
    let params = graph.scope(callee).params.clone();
    // Methods carry an implicit receiver in their first slot; skip it only
    // when that slot is literally self/this. An arity difference alone can
    // also mean an omitted defaulted parameter, where arguments still bind
    // from the first slot.
    let offset = usize::from(
        params.len() == site.args.len() + 1
            && params
                .first()
                .is_some_and(|&p| matches!(graph.node(p).name.as_str(), "self" | "this")),
    );
    for (position, roots) in site.args.iter().enumerate() {
        let Some(&param) = params.get(position + offset) else {
            break;
        };
        for &root in roots {
            graph.add_edge(root, param, EdgeKind::ParameterBinding, site.line);
        }
    }
    if let Some(ret) = graph.scope(callee).return_node {
        graph.add_edge(ret, site.result, EdgeKind::ReturnBinding, site.line);
    }
}

fn sites_in_scope(graph: &FlowGraph, scope: ScopeId) -> Vec<usize> {
    graph
        .call_sites
        .iter()
        .enumerate()
        .filter(|(_, site)| site.caller == scope)
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build_graph;
    use crate::parsers::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn linked(source: &str, max_depth: usize) -> FlowGraph {
        let parsed = parse_source(source, Path::new("test.py")).expect("parse");
        let mut graph = build_graph(&parsed, &Deadline::unbounded()).expect("build");
        link(&mut graph, max_depth, &Deadline::unbounded()).expect("link");
        graph
    }

    #[test]
    fn test_arguments_bind_to_parameters() {
        let graph = linked(
            indoc! {"
                def double(x):
                    return x * 2
                n = 5
                result = double(n)
            "},
            8,
        );
        let scope = graph.functions["double"];
        let param = graph.scope(scope).params[0];
        let n = graph.versions_of("n")[0];
        assert!(graph
            .incoming(param)
            .any(|e| e.from == n && e.kind == EdgeKind::ParameterBinding));
    }

    #[test]
    fn test_return_binds_to_call_result() {
        let graph = linked(
            indoc! {"
                def ident(x):
                    return x
                y = ident(1)
            "},
            8,
        );
        let scope = graph.functions["ident"];
        let ret = graph.scope(scope).return_node.expect("return node");
        let y = graph.versions_of("y")[0];
        // ret -> call result -> y
        let call = graph.incoming(y).next().unwrap().from;
        assert!(graph
            .incoming(call)
            .any(|e| e.from == ret && e.kind == EdgeKind::ReturnBinding));
    }

    #[test]
    fn test_method_resolution_by_segment() {
        let graph = linked(
            indoc! {"
                class Calc:
                    def add(self, a, b):
                        return a + b
                c = Calc()
                total = c.add(1, 2)
            "},
            8,
        );
        let scope = graph.functions["Calc.add"];
        let ret = graph.scope(scope).return_node.expect("return node");
        assert!(graph.outgoing(ret).any(|e| e.kind == EdgeKind::ReturnBinding));
    }

    #[test]
    fn test_depth_limit_inserts_truncation_marker() {
        let graph = linked(
            indoc! {"
                def inner(x):
                    return x
                def outer(x):
                    return inner(x)
                r = outer(1)
            "},
            1,
        );
        // outer links at depth 0; inner(x) would link at depth 1 == limit.
        assert!(graph
            .nodes()
            .any(|(_, n)| n.kind == VariableKind::Truncation));
        assert!(graph
            .warnings
            .iter()
            .any(|w| matches!(w, AnalysisWarning::DepthLimitReached { callee, .. } if callee == "inner")));
    }

    #[test]
    fn test_omitted_default_argument_binds_first_parameter() {
        let graph = linked(
            indoc! {"
                def scale(value, factor=2):
                    return value * factor
                x = 5
                y = scale(x)
            "},
            8,
        );
        let scope = graph.functions["scale"];
        let params = graph.scope(scope).params.clone();
        let x = graph.versions_of("x")[0];
        assert!(graph
            .incoming(params[0])
            .any(|e| e.from == x && e.kind == EdgeKind::ParameterBinding));
        assert!(
            !graph.incoming(params[1]).any(|e| e.from == x),
            "x must not bind to the defaulted parameter"
        );
    }

    #[test]
    fn test_recursive_call_terminates() {
        let graph = linked(
            indoc! {"
                def fact(n):
                    return n * fact(n - 1)
                r = fact(5)
            "},
            8,
        );
        // Each site is linked exactly once; recursion must not loop.
        assert!(graph.functions.contains_key("fact"));
    }

    #[test]
    fn test_unresolved_callee_is_left_alone() {
        let graph = linked("y = os.getenv('HOME')\n", 8);
        assert!(!graph
            .nodes()
            .any(|(_, n)| n.kind == VariableKind::Truncation));
        assert!(graph
            .edges()
            .iter()
            .all(|e| e.kind != EdgeKind::ParameterBinding));
    }
}
