//! Calculation path extraction.
//!
//! Answers "how was this value computed": walk backward from the latest
//! version of a variable, keep the user-visible assignment steps, and present
//! them in source order so the output reads like the program text. External
//! sentinels and engine-internal nodes show up as step inputs, not as steps.

use crate::core::errors::AnalysisError;
use crate::core::{Deadline, Direction, Location};
use crate::graph::traversal::traverse;
use crate::graph::{FlowGraph, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;

/// One assignment on the way to the requested value.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationStep {
    pub name: String,
    pub location: Location,
    /// Source text of the defining statement.
    pub code: String,
    /// Names feeding this step, in edge order, deduplicated.
    pub inputs: Vec<String>,
    pub expression: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculationPath {
    pub variable: String,
    pub steps: Vec<CalculationStep>,
    /// Names the path could not resolve inside the analyzed code.
    pub external_inputs: Vec<String>,
}

/// Extract the calculation path for `name`, starting from its latest version.
pub fn calculation_path(
    graph: &FlowGraph,
    name: &str,
    deadline: &Deadline,
) -> Result<Option<CalculationPath>, AnalysisError> {
    let versions = graph.versions_of(name);
    let Some(&origin) = versions.last() else {
        return Ok(None);
    };

    let walk = traverse(graph, &[origin], Direction::Backward, None, deadline)?;

    let mut step_nodes: Vec<NodeId> = vec![origin];
    let mut externals = BTreeSet::new();
    for reached in &walk.reached {
        let node = graph.node(reached.node);
        if node.kind.is_user_variable() {
            step_nodes.push(reached.node);
        } else if node.kind == crate::core::VariableKind::External {
            externals.insert(node.name.clone());
        }
    }

    // Source order, version as tiebreaker for same-line rebinds.
    step_nodes.sort_by(|&a, &b| {
        let (na, nb) = (graph.node(a), graph.node(b));
        (&na.location.file, na.location.line, na.version, a).cmp(&(
            &nb.location.file,
            nb.location.line,
            nb.version,
            b,
        ))
    });
    step_nodes.dedup();

    let steps = step_nodes
        .into_iter()
        .map(|id| {
            let node = graph.node(id);
            let mut inputs = Vec::new();
            for edge in graph.incoming(id) {
                let source = &graph.node(edge.from).name;
                if !inputs.contains(source) {
                    inputs.push(source.clone());
                }
            }
            CalculationStep {
                name: node.name.clone(),
                location: node.location.clone(),
                code: node.code.clone(),
                inputs,
                expression: node.expression.clone(),
            }
        })
        .collect();

    Ok(Some(CalculationPath {
        variable: name.to_string(),
        steps,
        external_inputs: externals.into_iter().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build_graph;
    use crate::graph::linker::link;
    use crate::parsers::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn path_for(source: &str, name: &str) -> CalculationPath {
        let parsed = parse_source(source, Path::new("test.py")).expect("parse");
        let mut graph = build_graph(&parsed, &Deadline::unbounded()).expect("build");
        link(&mut graph, 8, &Deadline::unbounded()).expect("link");
        calculation_path(&graph, name, &Deadline::unbounded())
            .expect("no timeout")
            .expect("variable exists")
    }

    #[test]
    fn test_steps_in_source_order() {
        let path = path_for(
            indoc! {"
                price = 100
                qty = 3
                subtotal = price * qty
                total = subtotal * 1.2
            "},
            "total",
        );
        let names: Vec<_> = path.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["price", "qty", "subtotal", "total"]);
        let subtotal = &path.steps[2];
        assert_eq!(subtotal.inputs, vec!["price", "qty"]);
        assert_eq!(subtotal.expression, "price * qty");
    }

    #[test]
    fn test_unrelated_variables_excluded() {
        let path = path_for(
            indoc! {"
                a = 1
                noise = 99
                b = a + 1
            "},
            "b",
        );
        let names: Vec<_> = path.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_latest_version_is_the_origin() {
        let path = path_for(
            indoc! {"
                x = 1
                y = x + 1
                y = 100
            "},
            "y",
        );
        // The final rebind ignores x, so x does not appear.
        let names: Vec<_> = path.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["y"]);
        assert_eq!(path.steps[0].expression, "100");
    }

    #[test]
    fn test_shared_input_appears_once() {
        let path = path_for(
            indoc! {"
                base = 10
                a = base + 1
                b = base + 2
                c = a + b
            "},
            "c",
        );
        let base_steps = path
            .steps
            .iter()
            .filter(|s| s.name == "base")
            .count();
        assert_eq!(base_steps, 1);
    }

    #[test]
    fn test_external_inputs_reported() {
        let path = path_for("total = price * tax_rate\n", "total");
        assert_eq!(path.external_inputs, vec!["price", "tax_rate"]);
        assert_eq!(path.steps.len(), 1);
    }

    #[test]
    fn test_path_crosses_function_boundary() {
        let path = path_for(
            indoc! {"
                def double(x):
                    return x * 2
                n = 5
                result = double(n)
            "},
            "result",
        );
        let names: Vec<_> = path.steps.iter().map(|s| s.name.as_str()).collect();
        // The parameter binding pulls n and the parameter x into the path.
        assert!(names.contains(&"n"));
        assert!(names.contains(&"x"));
        assert!(names.contains(&"result"));
    }

    #[test]
    fn test_missing_variable_is_none() {
        let parsed = parse_source("x = 1\n", Path::new("test.py")).expect("parse");
        let graph = build_graph(&parsed, &Deadline::unbounded()).expect("build");
        let result = calculation_path(&graph, "ghost", &Deadline::unbounded()).expect("ok");
        assert!(result.is_none());
    }
}
