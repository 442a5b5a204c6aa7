//! Static type and state tracking.
//!
//! Types are inferred structurally from literals, annotations, and a handful
//! of well-known constructors at build time, then propagated along
//! single-source assignment edges. The tracker reports a variable's type
//! evolution across its versions plus the warnings a careful reviewer would
//! raise by hand: a type that changes mid-function, a value
//! that may be null, and a rebind that only happens on some paths.

use crate::core::{InferredType, Location};
use crate::graph::{EdgeKind, FlowGraph, NodeId};
use crate::parsers::{Callee, ControlContext, Expr, LiteralKind};
use serde::Serialize;
use std::fmt;

/// Infer the static type of an assigned expression. An explicit annotation
/// wins over the expression shape.
pub fn infer_type(expr: &Expr, annotation: Option<&str>) -> InferredType {
    if let Some(annotation) = annotation {
        return annotation_type(annotation);
    }
    expr_type(expr)
}

/// Map an annotation string to a type. Well-known names become concrete
/// types; anything else is carried verbatim.
pub fn annotation_type(annotation: &str) -> InferredType {
    let base = annotation
        .split(['[', '<'])
        .next()
        .unwrap_or(annotation)
        .trim();
    match base {
        "int" | "number" => InferredType::Int,
        "float" => InferredType::Float,
        "str" | "string" => InferredType::Str,
        "bool" | "boolean" => InferredType::Bool,
        "None" | "null" | "undefined" => InferredType::Null,
        "list" | "List" | "Array" => InferredType::List,
        "dict" | "Dict" | "Map" | "Record" => InferredType::Dict,
        "set" | "Set" => InferredType::Set,
        "tuple" | "Tuple" => InferredType::Tuple,
        "" => InferredType::Unknown,
        _ => InferredType::Annotated(annotation.to_string()),
    }
}

fn expr_type(expr: &Expr) -> InferredType {
    match expr {
        Expr::Literal(kind) => literal_type(*kind),
        Expr::Container { kind, .. } => literal_type(*kind),
        Expr::Binary { left, right } => {
            let (l, r) = (expr_type(left), expr_type(right));
            numeric_join(l, r)
        }
        Expr::Unary { operand } => expr_type(operand),
        Expr::Ternary { then, otherwise, .. } => {
            let (t, o) = (expr_type(then), expr_type(otherwise));
            if t == o {
                t
            } else if t.is_null_like() || o.is_null_like() {
                // One branch may produce null.
                InferredType::Null
            } else {
                InferredType::Unknown
            }
        }
        Expr::Call { callee, .. } => call_type(callee),
        Expr::Interpolation { .. } => InferredType::Str,
        Expr::Comprehension { .. } => InferredType::List,
        _ => InferredType::Unknown,
    }
}

fn literal_type(kind: LiteralKind) -> InferredType {
    match kind {
        LiteralKind::Int => InferredType::Int,
        LiteralKind::Float => InferredType::Float,
        LiteralKind::Str => InferredType::Str,
        LiteralKind::Bool => InferredType::Bool,
        LiteralKind::Null => InferredType::Null,
        LiteralKind::List => InferredType::List,
        LiteralKind::Dict => InferredType::Dict,
        LiteralKind::Set => InferredType::Set,
        LiteralKind::Tuple => InferredType::Tuple,
    }
}

fn call_type(callee: &Callee) -> InferredType {
    let segment = callee.last_segment();
    match segment {
        "int" | "len" | "Number" | "parseInt" => InferredType::Int,
        "float" | "parseFloat" => InferredType::Float,
        "str" | "String" | "repr" => InferredType::Str,
        "bool" | "Boolean" => InferredType::Bool,
        "list" | "sorted" | "Array" => InferredType::List,
        "dict" => InferredType::Dict,
        "set" => InferredType::Set,
        "tuple" => InferredType::Tuple,
        _ if segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase()) =>
        {
            InferredType::Constructor(segment.to_string())
        }
        _ => InferredType::Unknown,
    }
}

fn numeric_join(left: InferredType, right: InferredType) -> InferredType {
    use InferredType::{Float, Int, Str, Unknown};
    match (left, right) {
        (Int, Int) => Int,
        (Int, Float) | (Float, Int) | (Float, Float) => Float,
        (Str, Str) => Str,
        (a, b) if a == b => a,
        _ => Unknown,
    }
}

/// Flow known types along single-source assignment edges (`y = x`), one pass
/// in arena order. Nodes are created in source order, so a single forward
/// sweep covers straight-line rebinds; cyclic flows just stay `Unknown`.
pub fn propagate(graph: &mut FlowGraph) {
    for idx in 0..graph.node_count() {
        let id = NodeId(idx as u32);
        if graph.node(id).inferred_type.is_known() {
            continue;
        }
        let sources: Vec<NodeId> = graph
            .incoming(id)
            .filter(|e| matches!(e.kind, EdgeKind::Assignment | EdgeKind::ReturnBinding))
            .map(|e| e.from)
            .collect();
        let [source] = sources.as_slice() else {
            continue;
        };
        let inferred = graph.node(*source).inferred_type.clone();
        if inferred.is_known() {
            let nullable = graph.node(*source).nullable;
            let node = graph.node_mut(id);
            node.inferred_type = inferred;
            node.nullable = nullable;
        }
    }
}

/// One version of a variable, as the type report sees it.
#[derive(Debug, Clone, Serialize)]
pub struct TypeEvent {
    pub name: String,
    pub version: u32,
    pub location: Location,
    pub inferred_type: InferredType,
    pub nullable: bool,
    pub expression: String,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypeWarning {
    TypeChange {
        name: String,
        from: InferredType,
        to: InferredType,
        location: Location,
    },
    PossibleNull {
        name: String,
        location: Location,
    },
    ConditionalModification {
        name: String,
        location: Location,
    },
}

impl fmt::Display for TypeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeChange {
                name,
                from,
                to,
                location,
            } => write!(
                f,
                "{name} changes type from {} to {} at {location}",
                from.display_name(),
                to.display_name()
            ),
            Self::PossibleNull { name, location } => {
                write!(f, "{name} may be null at {location}")
            }
            Self::ConditionalModification { name, location } => write!(
                f,
                "{name} is modified inside a loop or conditional at {location}"
            ),
        }
    }
}

/// Type history of one variable across all its versions.
#[derive(Debug, Clone, Serialize)]
pub struct TypeEvolution {
    pub name: String,
    pub events: Vec<TypeEvent>,
    pub warnings: Vec<TypeWarning>,
}

impl TypeEvolution {
    /// Render the version history as a chain, e.g. `int -> str -> NoneType`.
    pub fn chain(&self) -> String {
        self.events
            .iter()
            .map(|e| e.inferred_type.display_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Collect the type evolution for a named variable. Returns `None` when the
/// graph has no version of that name.
pub fn track_types(graph: &FlowGraph, name: &str) -> Option<TypeEvolution> {
    let versions = graph.versions_of(name);
    if versions.is_empty() {
        return None;
    }

    let mut events = Vec::with_capacity(versions.len());
    let mut warnings = Vec::new();
    let mut last_known: Option<InferredType> = None;

    for &id in versions {
        let node = graph.node(id);
        events.push(TypeEvent {
            name: node.name.clone(),
            version: node.version,
            location: node.location.clone(),
            inferred_type: node.inferred_type.clone(),
            nullable: node.nullable,
            expression: node.expression.clone(),
        });

        if node.inferred_type.is_known() {
            if let Some(previous) = &last_known {
                if *previous != node.inferred_type {
                    warnings.push(TypeWarning::TypeChange {
                        name: node.name.clone(),
                        from: previous.clone(),
                        to: node.inferred_type.clone(),
                        location: node.location.clone(),
                    });
                }
            }
            last_known = Some(node.inferred_type.clone());
        }
        if node.nullable {
            warnings.push(TypeWarning::PossibleNull {
                name: node.name.clone(),
                location: node.location.clone(),
            });
        }
        if !matches!(node.context, ControlContext::Straight) {
            warnings.push(TypeWarning::ConditionalModification {
                name: node.name.clone(),
                location: node.location.clone(),
            });
        }
    }

    Some(TypeEvolution {
        name: name.to_string(),
        events,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Deadline;
    use crate::graph::builder::build_graph;
    use crate::parsers::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn graph_of(source: &str) -> FlowGraph {
        let parsed = parse_source(source, Path::new("test.py")).expect("parse");
        let mut graph = build_graph(&parsed, &Deadline::unbounded()).expect("build");
        propagate(&mut graph);
        graph
    }

    #[test]
    fn test_literal_inference() {
        let graph = graph_of(indoc! {"
            a = 1
            b = 2.5
            c = 'hi'
            d = True
            e = None
            f = [1, 2]
        "});
        let ty = |name: &str| graph.node(graph.versions_of(name)[0]).inferred_type.clone();
        assert_eq!(ty("a"), InferredType::Int);
        assert_eq!(ty("b"), InferredType::Float);
        assert_eq!(ty("c"), InferredType::Str);
        assert_eq!(ty("d"), InferredType::Bool);
        assert_eq!(ty("e"), InferredType::Null);
        assert_eq!(ty("f"), InferredType::List);
    }

    #[test]
    fn test_arithmetic_widens_to_float() {
        let graph = graph_of("x = 1 + 2.0\n");
        assert_eq!(
            graph.node(graph.versions_of("x")[0]).inferred_type,
            InferredType::Float
        );
    }

    #[test]
    fn test_annotation_wins() {
        let graph = graph_of("x: float = 1\n");
        assert_eq!(
            graph.node(graph.versions_of("x")[0]).inferred_type,
            InferredType::Float
        );
    }

    #[test]
    fn test_constructor_call() {
        let graph = graph_of("order = Order()\n");
        let call = graph
            .nodes()
            .find(|(_, n)| n.name == "Order()")
            .map(|(id, _)| id)
            .expect("call node");
        assert_eq!(
            graph.node(call).inferred_type,
            InferredType::Constructor("Order".to_string())
        );
    }

    #[test]
    fn test_propagation_through_rebind() {
        let graph = graph_of("x = 1\ny = x\n");
        assert_eq!(
            graph.node(graph.versions_of("y")[0]).inferred_type,
            InferredType::Int
        );
    }

    #[test]
    fn test_type_change_warning() {
        let graph = graph_of("v = 1\nv = 'text'\n");
        let evolution = track_types(&graph, "v").expect("tracked");
        assert_eq!(evolution.chain(), "int -> str");
        assert!(evolution
            .warnings
            .iter()
            .any(|w| matches!(w, TypeWarning::TypeChange { .. })));
    }

    #[test]
    fn test_null_warning() {
        let graph = graph_of("maybe = None\n");
        let evolution = track_types(&graph, "maybe").expect("tracked");
        assert_eq!(evolution.chain(), "NoneType");
        assert!(evolution
            .warnings
            .iter()
            .any(|w| matches!(w, TypeWarning::PossibleNull { .. })));
    }

    #[test]
    fn test_conditional_modification_warning() {
        let graph = graph_of(indoc! {"
            x = 1
            if flag:
                x = 2
        "});
        let evolution = track_types(&graph, "x").expect("tracked");
        assert!(evolution
            .warnings
            .iter()
            .any(|w| matches!(w, TypeWarning::ConditionalModification { .. })));
    }

    #[test]
    fn test_unknown_variable_is_none() {
        let graph = graph_of("x = 1\n");
        assert!(track_types(&graph, "ghost").is_none());
    }

    #[test]
    fn test_no_spurious_change_warning_for_same_type() {
        let graph = graph_of("n = 1\nn = 2\nn = 3\n");
        let evolution = track_types(&graph, "n").expect("tracked");
        assert!(evolution
            .warnings
            .iter()
            .all(|w| !matches!(w, TypeWarning::TypeChange { .. })));
    }
}
