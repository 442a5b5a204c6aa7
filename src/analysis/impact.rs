//! Change-impact analysis.
//!
//! Starting from every version of a variable, walk forward to everything the
//! value reaches, classify where it leaves the analyzed code, and rate how
//! risky a change to the variable would be. Exit points are the forward
//! terminals of the walk: returned values, calls that look like externally
//! visible side effects, and writes to globals or object fields.

use crate::config::{FlowtraceConfig, RiskThresholds};
use crate::core::errors::AnalysisError;
use crate::core::{Deadline, Direction, Location, VariableKind};
use crate::graph::traversal::traverse;
use crate::graph::{FlowGraph, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitKind {
    /// The value is returned to a caller.
    Return,
    /// The value feeds a call with an externally visible effect.
    SideEffect,
    /// The value is written to a global or an object field.
    StateChange,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Return => "return",
            Self::SideEffect => "side effect",
            Self::StateChange => "state change",
        };
        f.write_str(s)
    }
}

/// A point where the traced value leaves the analyzed code.
#[derive(Debug, Clone, Serialize)]
pub struct ExitPoint {
    pub kind: ExitKind,
    pub name: String,
    pub location: Location,
    /// Defining statement text, for display.
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub variable: String,
    /// Count of everything the value reaches, terminals or not.
    pub reached_count: usize,
    /// Distinct functions the value flows through, sorted.
    pub functions_touched: Vec<String>,
    pub exit_points: Vec<ExitPoint>,
    pub risk: RiskLevel,
    pub recommendation: String,
}

/// Analyze the downstream impact of changing `name`. The caller has already
/// resolved `name` to its version nodes; an empty slice is a programming
/// error upstream, not handled here.
pub fn analyze_impact(
    graph: &FlowGraph,
    name: &str,
    origins: &[NodeId],
    config: &FlowtraceConfig,
    deadline: &Deadline,
) -> Result<ImpactReport, AnalysisError> {
    let walk = traverse(graph, origins, Direction::Forward, None, deadline)?;

    let mut exit_points = Vec::new();
    let mut functions = BTreeSet::new();
    for reached in &walk.reached {
        let node = graph.node(reached.node);
        let scope = graph.scope(node.scope);
        if !scope.is_module() {
            functions.insert(scope.name.clone());
        }
        if graph.out_degree(reached.node) > 0 {
            continue;
        }
        let kind = match node.kind {
            VariableKind::Return => Some(ExitKind::Return),
            VariableKind::CallResult if config.side_effects.matches(&node.expression) => {
                Some(ExitKind::SideEffect)
            }
            VariableKind::Global | VariableKind::Field => Some(ExitKind::StateChange),
            _ => None,
        };
        if let Some(kind) = kind {
            exit_points.push(ExitPoint {
                kind,
                name: node.name.clone(),
                location: node.location.clone(),
                code: node.code.clone(),
            });
        }
    }

    let functions_touched: Vec<String> = functions.into_iter().collect();
    let risk = rate_risk(&exit_points, functions_touched.len(), &config.risk);
    Ok(ImpactReport {
        variable: name.to_string(),
        reached_count: walk.count(),
        functions_touched,
        risk,
        recommendation: recommendation(risk).to_string(),
        exit_points,
    })
}

fn rate_risk(exits: &[ExitPoint], functions: usize, thresholds: &RiskThresholds) -> RiskLevel {
    if exits.is_empty() && functions == 0 {
        return RiskLevel::Low;
    }
    if functions > thresholds.functions_high || exits.len() > thresholds.exits_high {
        return RiskLevel::High;
    }
    let has_side_effect = exits.iter().any(|e| e.kind == ExitKind::SideEffect);
    if has_side_effect || exits.len() > thresholds.exits_medium {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

fn recommendation(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "Contained change. Verify with the tests covering this file.",
        RiskLevel::Medium => {
            "Value reaches observable effects. Review each exit point before changing."
        }
        RiskLevel::High => {
            "Wide blast radius. Trace each affected function and add regression coverage first."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build_graph;
    use crate::graph::linker::link;
    use crate::parsers::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn report_for(source: &str, name: &str) -> ImpactReport {
        let parsed = parse_source(source, Path::new("test.py")).expect("parse");
        let mut graph = build_graph(&parsed, &Deadline::unbounded()).expect("build");
        link(&mut graph, 8, &Deadline::unbounded()).expect("link");
        let origins = graph.versions_of(name).to_vec();
        let config = FlowtraceConfig::default();
        analyze_impact(&graph, name, &origins, &config, &Deadline::unbounded()).expect("impact")
    }

    #[test]
    fn test_unused_variable_is_low_risk() {
        let report = report_for("x = 1\ny = 2\n", "x");
        assert_eq!(report.reached_count, 0);
        assert!(report.exit_points.is_empty());
        assert_eq!(report.risk, RiskLevel::Low);
    }

    #[test]
    fn test_return_exit_detected() {
        let report = report_for(
            indoc! {"
                def total(price):
                    amount = price * 2
                    return amount
            "},
            "price",
        );
        assert!(report
            .exit_points
            .iter()
            .any(|e| e.kind == ExitKind::Return));
        assert_eq!(report.functions_touched, vec!["total"]);
    }

    #[test]
    fn test_side_effect_exit_raises_risk_to_medium() {
        let report = report_for(
            indoc! {"
                amount = 100
                db.save(amount)
            "},
            "amount",
        );
        let side_effects: Vec<_> = report
            .exit_points
            .iter()
            .filter(|e| e.kind == ExitKind::SideEffect)
            .collect();
        assert_eq!(side_effects.len(), 1);
        assert!(report.risk >= RiskLevel::Medium);
    }

    #[test]
    fn test_state_change_exit() {
        let report = report_for(
            indoc! {"
                class Cart:
                    def apply(self, discount):
                        self.total = discount
            "},
            "discount",
        );
        assert!(report
            .exit_points
            .iter()
            .any(|e| e.kind == ExitKind::StateChange && e.name == "self.total"));
    }

    #[test]
    fn test_many_functions_is_high_risk() {
        let report = report_for(
            indoc! {"
                def a(x):
                    return b(x)
                def b(x):
                    return c(x)
                def c(x):
                    return d(x)
                def d(x):
                    return x + 1
                seed = 1
                out = a(seed)
            "},
            "seed",
        );
        assert!(report.functions_touched.len() > 3);
        assert_eq!(report.risk, RiskLevel::High);
    }

    #[test]
    fn test_plain_chain_without_exits_is_low() {
        let report = report_for("x = 1\ny = x + 1\nz = y + 1\n", "x");
        // z is a terminal global write, so it counts as a state change.
        assert!(report
            .exit_points
            .iter()
            .all(|e| e.kind == ExitKind::StateChange));
        assert_eq!(report.risk, RiskLevel::Low);
    }

    #[test]
    fn test_validation_helper_is_not_a_side_effect() {
        let report = report_for(
            indoc! {"
                value = 5
                ok = validate(value)
            "},
            "value",
        );
        assert!(report
            .exit_points
            .iter()
            .all(|e| e.kind != ExitKind::SideEffect));
    }
}
