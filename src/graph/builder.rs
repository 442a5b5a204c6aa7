//! Builds a [`FlowGraph`] from one parsed file.
//!
//! Statements are walked in source order. Each assignment creates (or
//! versions) its target nodes; every right-hand name that resolves to a
//! visible prior version contributes an edge. Names that do not resolve
//! (imports, builtins) become interned external sentinel leaves with no
//! further backward expansion. Calls produce a `CallResult` node that
//! receives conservative edges from the receiver and every argument, and a
//! `CallSite` record for the inter-procedural linker.

use super::{CallSite, EdgeKind, FlowGraph, NodeId, Scope, ScopeId, VariableNode};
use crate::analysis::type_tracker::infer_type;
use crate::core::errors::AnalysisError;
use crate::core::{Deadline, InferredType, Location, VariableKind};
use crate::parsers::{
    AssignTarget, Callee, ControlContext, Expr, FunctionDef, ParsedFile, Stmt, StmtKind,
};
use std::collections::HashMap;
use std::path::PathBuf;

/// Build the dependency graph for one parsed file.
pub fn build_graph(parsed: &ParsedFile, deadline: &Deadline) -> Result<FlowGraph, AnalysisError> {
    let mut builder = GraphBuilder {
        graph: FlowGraph::new(),
        file: parsed.path.clone(),
        frames: Vec::new(),
        deadline,
    };
    builder.graph.warnings = parsed.warnings.clone();

    let module = builder.graph.add_scope(Scope {
        id: ScopeId(0),
        name: "<module>".to_string(),
        parent: None,
        file: parsed.path.clone(),
        params: Vec::new(),
        return_node: None,
    });
    builder.frames.push(Frame::new(module));

    for stmt in &parsed.statements {
        builder.statement(stmt)?;
    }

    Ok(builder.graph)
}

struct Frame {
    scope: ScopeId,
    /// name -> latest version node visible in this frame.
    symbols: HashMap<String, NodeId>,
    /// name -> next version number.
    versions: HashMap<String, u32>,
}

impl Frame {
    fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            symbols: HashMap::new(),
            versions: HashMap::new(),
        }
    }
}

struct GraphBuilder<'a> {
    graph: FlowGraph,
    file: PathBuf,
    frames: Vec<Frame>,
    deadline: &'a Deadline,
}

impl GraphBuilder<'_> {
    fn current_scope(&self) -> ScopeId {
        self.frames.last().expect("frame stack never empty").scope
    }

    fn in_module_scope(&self) -> bool {
        self.frames.len() == 1
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<(), AnalysisError> {
        self.deadline.check()?;
        match &stmt.kind {
            StmtKind::Assign {
                targets,
                annotation,
                value,
                value_text,
            } => {
                let deps = self.eval(value, stmt);
                for target in targets {
                    self.assign(
                        target,
                        &deps,
                        stmt,
                        value,
                        value_text,
                        annotation.as_deref(),
                        EdgeKind::Assignment,
                    );
                }
            }
            StmtKind::TupleAssign {
                targets,
                values,
                value_text,
            } => {
                if targets.len() == values.len() {
                    // Positional pairing: each target binds its own value.
                    for (target, value) in targets.iter().zip(values) {
                        let deps = self.eval(value, stmt);
                        self.assign(
                            target,
                            &deps,
                            stmt,
                            value,
                            value_text,
                            None,
                            EdgeKind::Assignment,
                        );
                    }
                } else {
                    // `a, b = pair`: every target depends on every value.
                    let mut deps = Vec::new();
                    for value in values {
                        push_unique(&mut deps, self.eval(value, stmt));
                    }
                    for target in targets {
                        self.assign(
                            target,
                            &deps,
                            stmt,
                            &Expr::Unknown,
                            value_text,
                            None,
                            EdgeKind::Assignment,
                        );
                    }
                }
            }
            StmtKind::AugAssign {
                target,
                value,
                value_text,
            } => {
                let deps = self.eval(value, stmt);
                let prev = match target {
                    AssignTarget::Name(name) => self.lookup(name),
                    AssignTarget::Attribute { base, attr } => {
                        self.lookup(&format!("{base}.{attr}"))
                    }
                    AssignTarget::Subscript { base } => self.lookup(base),
                };
                let node =
                    self.assign(target, &deps, stmt, value, value_text, None, EdgeKind::Augmented);
                if let (Some(prev), Some(node)) = (prev, node) {
                    self.graph.add_edge(prev, node, EdgeKind::Augmented, stmt.line);
                }
            }
            StmtKind::FunctionDef(def) => self.function(def, stmt)?,
            StmtKind::Return { value } => {
                let deps = value
                    .as_ref()
                    .map(|v| self.eval(v, stmt))
                    .unwrap_or_default();
                let ret = self.return_collector(stmt);
                for dep in deps {
                    self.graph.add_edge(dep, ret, EdgeKind::Assignment, stmt.line);
                }
            }
            StmtKind::Expr { value } => {
                // Evaluated for its calls: arguments need a forward terminal.
                let _ = self.eval(value, stmt);
            }
        }
        Ok(())
    }

    fn function(&mut self, def: &FunctionDef, stmt: &Stmt) -> Result<(), AnalysisError> {
        let parent = self.current_scope();
        let scope = self.graph.add_scope(Scope {
            id: ScopeId(self.graph.scopes.len() as u32),
            name: def.name.clone(),
            parent: Some(parent),
            file: self.file.clone(),
            params: Vec::new(),
            return_node: None,
        });
        self.graph.functions.entry(def.name.clone()).or_insert(scope);

        let mut frame = Frame::new(scope);
        let mut param_ids = Vec::new();
        for param in &def.params {
            let inferred = match &param.annotation {
                Some(annotation) => InferredType::Annotated(annotation.clone()),
                None => InferredType::Unknown,
            };
            let id = self.graph.add_node(VariableNode {
                name: param.name.clone(),
                location: Location::new(&self.file, param.line),
                scope,
                kind: VariableKind::Parameter,
                version: 0,
                inferred_type: inferred,
                nullable: false,
                expression: "parameter".to_string(),
                code: stmt.code.clone(),
                context: ControlContext::Straight,
            });
            frame.symbols.insert(param.name.clone(), id);
            frame.versions.insert(param.name.clone(), 1);
            param_ids.push(id);
        }
        self.graph.scopes[scope.0 as usize].params = param_ids;

        self.frames.push(frame);
        for inner in &def.body {
            self.statement(inner)?;
        }
        self.frames.pop();
        Ok(())
    }

    fn return_collector(&mut self, stmt: &Stmt) -> NodeId {
        let scope = self.current_scope();
        if let Some(ret) = self.graph.scope(scope).return_node {
            return ret;
        }
        let scope_name = self.graph.scope(scope).name.clone();
        let ret = self.graph.add_node(VariableNode {
            name: format!("return of {scope_name}"),
            location: Location::new(&self.file, stmt.line),
            scope,
            kind: VariableKind::Return,
            version: 0,
            inferred_type: InferredType::Unknown,
            nullable: false,
            expression: stmt.code.clone(),
            code: stmt.code.clone(),
            context: stmt.context,
        });
        self.graph.scopes[scope.0 as usize].return_node = Some(ret);
        ret
    }

    /// Create a new version node for one assignment target and wire its
    /// dependency edges. Returns `None` when the target is not representable.
    #[allow(clippy::too_many_arguments)]
    fn assign(
        &mut self,
        target: &AssignTarget,
        deps: &[NodeId],
        stmt: &Stmt,
        value: &Expr,
        value_text: &str,
        annotation: Option<&str>,
        kind: EdgeKind,
    ) -> Option<NodeId> {
        let (name, node_kind, edge_kind) = match target {
            AssignTarget::Name(name) => {
                let node_kind = if self.in_module_scope() {
                    VariableKind::Global
                } else {
                    VariableKind::Local
                };
                (name.clone(), node_kind, kind)
            }
            AssignTarget::Attribute { base, attr } => (
                format!("{base}.{attr}"),
                VariableKind::Field,
                EdgeKind::AttributeWrite,
            ),
            // Coarse: `d[k] = v` re-versions `d` itself.
            AssignTarget::Subscript { base } => {
                let node_kind = if self.in_module_scope() {
                    VariableKind::Global
                } else {
                    VariableKind::Local
                };
                (base.clone(), node_kind, kind)
            }
        };

        let prior = if matches!(target, AssignTarget::Subscript { .. }) {
            self.lookup(&name)
        } else {
            None
        };

        let inferred = infer_type(value, annotation);
        let nullable = inferred.is_null_like();
        let frame = self.frames.last_mut().expect("frame stack never empty");
        let version = {
            let v = frame.versions.entry(name.clone()).or_insert(0);
            let current = *v;
            *v += 1;
            current
        };
        let scope = frame.scope;
        let node = self.graph.add_node(VariableNode {
            name: name.clone(),
            location: Location::new(&self.file, stmt.line),
            scope,
            kind: node_kind,
            version,
            inferred_type: inferred,
            nullable,
            expression: value_text.to_string(),
            code: stmt.code.clone(),
            context: stmt.context,
        });
        self.frames
            .last_mut()
            .expect("frame stack never empty")
            .symbols
            .insert(name, node);

        for &dep in deps {
            self.graph.add_edge(dep, node, edge_kind, stmt.line);
        }
        if let Some(prior) = prior {
            self.graph.add_edge(prior, node, EdgeKind::Augmented, stmt.line);
        }
        Some(node)
    }

    /// Dependency roots of an expression, deduplicated, discovery order.
    fn eval(&mut self, expr: &Expr, stmt: &Stmt) -> Vec<NodeId> {
        let mut deps = Vec::new();
        self.eval_into(expr, stmt, &mut deps);
        deps
    }

    fn eval_into(&mut self, expr: &Expr, stmt: &Stmt, deps: &mut Vec<NodeId>) {
        match expr {
            Expr::Name(name) => {
                let id = self.resolve(name, stmt);
                if !deps.contains(&id) {
                    deps.push(id);
                }
            }
            Expr::Literal(_) => {}
            Expr::Container { elements, .. } => {
                for element in elements {
                    self.eval_into(element, stmt, deps);
                }
            }
            Expr::Binary { left, right } => {
                self.eval_into(left, stmt, deps);
                self.eval_into(right, stmt, deps);
            }
            Expr::Unary { operand } => self.eval_into(operand, stmt, deps),
            Expr::BoolOp { operands } => {
                for operand in operands {
                    self.eval_into(operand, stmt, deps);
                }
            }
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => {
                self.eval_into(condition, stmt, deps);
                self.eval_into(then, stmt, deps);
                self.eval_into(otherwise, stmt, deps);
            }
            Expr::Call { callee, args } => {
                let call = self.call(callee, args, stmt);
                if !deps.contains(&call) {
                    deps.push(call);
                }
            }
            // Coarse reads: propagate from the base variable, no per-key or
            // per-attribute precision.
            Expr::Attribute { base, .. } => self.eval_into(base, stmt, deps),
            Expr::Subscript { base, .. } => self.eval_into(base, stmt, deps),
            Expr::Comprehension {
                element,
                loop_vars,
                iters,
                condition,
            } => self.comprehension(element, loop_vars, iters, condition.as_deref(), stmt, deps),
            Expr::Interpolation { parts } => {
                for part in parts {
                    self.eval_into(part, stmt, deps);
                }
            }
            Expr::Unknown => {}
        }
    }

    /// Comprehension loop variables bind inside the expression only; the
    /// enclosing frame's bindings are restored afterwards so nothing leaks.
    fn comprehension(
        &mut self,
        element: &Expr,
        loop_vars: &[String],
        iters: &[Expr],
        condition: Option<&Expr>,
        stmt: &Stmt,
        deps: &mut Vec<NodeId>,
    ) {
        let mut iter_deps = Vec::new();
        for iter in iters {
            push_unique(&mut iter_deps, self.eval(iter, stmt));
        }
        push_unique(deps, iter_deps.clone());

        let mut shadowed = Vec::new();
        for var in loop_vars {
            let frame = self.frames.last_mut().expect("frame stack never empty");
            let scope = frame.scope;
            shadowed.push((var.clone(), frame.symbols.get(var).copied()));
            let node = self.graph.add_node(VariableNode {
                name: var.clone(),
                location: Location::new(&self.file, stmt.line),
                scope,
                kind: VariableKind::Local,
                version: 0,
                inferred_type: InferredType::Unknown,
                nullable: false,
                expression: "comprehension variable".to_string(),
                code: stmt.code.clone(),
                context: stmt.context,
            });
            for &dep in &iter_deps {
                self.graph.add_edge(dep, node, EdgeKind::Assignment, stmt.line);
            }
            self.frames
                .last_mut()
                .expect("frame stack never empty")
                .symbols
                .insert(var.clone(), node);
        }

        push_unique(deps, self.eval(element, stmt));
        if let Some(condition) = condition {
            push_unique(deps, self.eval(condition, stmt));
        }

        let frame = self.frames.last_mut().expect("frame stack never empty");
        for (name, previous) in shadowed {
            match previous {
                Some(id) => {
                    frame.symbols.insert(name, id);
                }
                None => {
                    frame.symbols.remove(&name);
                }
            }
        }
    }

    /// Evaluate a call: conservative edges from receiver and every argument
    /// into a fresh `CallResult` node, plus a `CallSite` for the linker.
    fn call(&mut self, callee: &Callee, args: &[Expr], stmt: &Stmt) -> NodeId {
        let display = callee.display_name();
        let scope = self.current_scope();
        let result = self.graph.add_node(VariableNode {
            name: format!("{display}()"),
            location: Location::new(&self.file, stmt.line),
            scope,
            kind: VariableKind::CallResult,
            version: 0,
            inferred_type: constructor_type(callee),
            nullable: false,
            expression: display.clone(),
            code: stmt.code.clone(),
            context: stmt.context,
        });

        if let Callee::Method { receiver, .. } = callee {
            let receiver_deps = self.eval(receiver, stmt);
            for dep in receiver_deps {
                self.graph
                    .add_edge(dep, result, EdgeKind::CallArgument, stmt.line);
            }
        }

        let mut arg_roots = Vec::with_capacity(args.len());
        for arg in args {
            let roots = self.eval(arg, stmt);
            for &dep in &roots {
                self.graph
                    .add_edge(dep, result, EdgeKind::CallArgument, stmt.line);
            }
            arg_roots.push(roots);
        }

        self.graph.call_sites.push(CallSite {
            caller: scope,
            callee: display,
            callee_segment: callee.last_segment().to_string(),
            args: arg_roots,
            result,
            line: stmt.line,
        });
        result
    }

    /// Resolve a name through the lexical frame chain; misses intern an
    /// external sentinel leaf.
    fn resolve(&mut self, name: &str, stmt: &Stmt) -> NodeId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let scope = self.current_scope();
        self.graph
            .external(name, Location::new(&self.file, stmt.line), scope)
    }

    fn lookup(&self, name: &str) -> Option<NodeId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.symbols.get(name).copied())
    }
}

/// Constructor-looking callees (`SomeType()`, `new Thing()`) give the call
/// result a constructor type; everything else stays `Unknown` here.
fn constructor_type(callee: &Callee) -> InferredType {
    let segment = callee.last_segment();
    if segment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
    {
        InferredType::Constructor(segment.to_string())
    } else {
        InferredType::Unknown
    }
}

fn push_unique(deps: &mut Vec<NodeId>, extra: Vec<NodeId>) {
    for id in extra {
        if !deps.contains(&id) {
            deps.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn graph_of(source: &str) -> FlowGraph {
        let parsed = parse_source(source, Path::new("test.py")).expect("parse");
        build_graph(&parsed, &Deadline::unbounded()).expect("build")
    }

    #[test]
    fn test_assignment_chain_creates_edges() {
        let graph = graph_of(indoc! {"
            x = 1
            y = x * 2
        "});
        let x = graph.versions_of("x")[0];
        let y = graph.versions_of("y")[0];
        assert_eq!(graph.outgoing(x).next().unwrap().to, y);
        assert_eq!(graph.node(y).expression, "x * 2");
    }

    #[test]
    fn test_reassignment_creates_new_version() {
        let graph = graph_of("v = 1\nv = 2\nv = 3\n");
        let versions = graph.versions_of("v");
        assert_eq!(versions.len(), 3);
        assert_eq!(graph.node(versions[2]).version, 2);
    }

    #[test]
    fn test_chained_literal_assignment_has_no_deps() {
        let graph = graph_of("a = b = c = 10\n");
        for name in ["a", "b", "c"] {
            let node = graph.versions_of(name)[0];
            assert_eq!(graph.in_degree(node), 0, "{name} should have no deps");
        }
    }

    #[test]
    fn test_augmented_assignment_links_previous_version() {
        let graph = graph_of("total = 0\ntotal += n\n");
        let versions = graph.versions_of("total");
        assert_eq!(versions.len(), 2);
        let kinds: Vec<_> = graph.incoming(versions[1]).map(|e| e.kind).collect();
        assert!(kinds.contains(&EdgeKind::Augmented));
    }

    #[test]
    fn test_unresolved_name_becomes_external_leaf() {
        let graph = graph_of("x = unknown_thing + 1\n");
        let x = graph.versions_of("x")[0];
        let dep = graph.incoming(x).next().unwrap().from;
        assert_eq!(graph.node(dep).kind, VariableKind::External);
        assert_eq!(graph.in_degree(dep), 0);
    }

    #[test]
    fn test_call_creates_result_node_and_site() {
        let graph = graph_of("x = 1\nresult = compute(x)\n");
        assert_eq!(graph.call_sites.len(), 1);
        let site = &graph.call_sites[0];
        assert_eq!(site.callee, "compute");
        let x = graph.versions_of("x")[0];
        // x -> compute() -> result
        let call = graph.outgoing(x).next().unwrap().to;
        assert_eq!(graph.node(call).kind, VariableKind::CallResult);
        let result = graph.versions_of("result")[0];
        assert!(graph.outgoing(call).any(|e| e.to == result));
    }

    #[test]
    fn test_function_scope_and_params() {
        let graph = graph_of(indoc! {"
            def double(x):
                return x * 2
        "});
        let scope = graph.functions.get("double").copied().expect("registered");
        let params = &graph.scope(scope).params;
        assert_eq!(params.len(), 1);
        assert_eq!(graph.node(params[0]).kind, VariableKind::Parameter);
        // The return collector exists and depends on the parameter.
        let ret = graph.scope(scope).return_node.expect("return node");
        assert!(graph.incoming(ret).any(|e| e.from == params[0]));
    }

    #[test]
    fn test_module_assignments_are_global_kind() {
        let graph = graph_of("x = 1\n");
        assert_eq!(
            graph.node(graph.versions_of("x")[0]).kind,
            VariableKind::Global
        );
    }

    #[test]
    fn test_field_write() {
        let graph = graph_of(indoc! {"
            class Order:
                def set_total(self, amount):
                    self.total = amount
        "});
        let field = graph.versions_of("self.total");
        assert_eq!(field.len(), 1);
        assert_eq!(graph.node(field[0]).kind, VariableKind::Field);
        let kinds: Vec<_> = graph.incoming(field[0]).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EdgeKind::AttributeWrite]);
    }

    #[test]
    fn test_comprehension_vars_do_not_leak() {
        let graph = graph_of("squares = [n * n for n in values]\n");
        // `n` exists as a node but resolving it afterwards is external.
        let graph2 = graph_of("squares = [n * n for n in values]\nafter = n\n");
        let after = graph2.versions_of("after")[0];
        let dep = graph2.incoming(after).next().unwrap().from;
        assert_eq!(graph2.node(dep).kind, VariableKind::External);
        // The comprehension result still depends on the iterated value.
        let squares = graph.versions_of("squares")[0];
        assert!(graph
            .incoming(squares)
            .any(|e| graph.node(e.from).kind == VariableKind::External));
    }

    #[test]
    fn test_comprehension_depends_on_every_iterable() {
        let graph = graph_of(indoc! {"
            a = [1]
            b = [2]
            pairs = [x + y for x in a for y in b]
        "});
        let pairs = graph.versions_of("pairs")[0];
        let deps: Vec<_> = graph.incoming(pairs).map(|e| e.from).collect();
        let a = graph.versions_of("a")[0];
        let b = graph.versions_of("b")[0];
        assert!(deps.contains(&a), "pairs must depend on a");
        assert!(deps.contains(&b), "pairs must depend on b");
    }

    #[test]
    fn test_tuple_assignment_pairs_positionally() {
        let graph = graph_of("x = 1\ny = 2\na, b = x, y\n");
        let a = graph.versions_of("a")[0];
        let b = graph.versions_of("b")[0];
        let x = graph.versions_of("x")[0];
        let y = graph.versions_of("y")[0];
        assert!(graph.incoming(a).all(|e| e.from == x));
        assert!(graph.incoming(b).all(|e| e.from == y));
    }

    #[test]
    fn test_subscript_write_reversions_base() {
        let graph = graph_of("d = {}\nd[key] = value\n");
        let versions = graph.versions_of("d");
        assert_eq!(versions.len(), 2);
        assert!(graph
            .incoming(versions[1])
            .any(|e| e.kind == EdgeKind::Augmented && e.from == versions[0]));
    }

    #[test]
    fn test_identical_source_builds_identical_graph() {
        let source = indoc! {"
            x = 1
            y = x + 2
            def f(a):
                return a * x
            z = f(y)
        "};
        let g1 = graph_of(source);
        let g2 = graph_of(source);
        assert_eq!(g1.node_count(), g2.node_count());
        assert_eq!(g1.edge_count(), g2.edge_count());
        let names1: Vec<_> = g1.nodes().map(|(_, n)| n.name.clone()).collect();
        let names2: Vec<_> = g2.nodes().map(|(_, n)| n.name.clone()).collect();
        assert_eq!(names1, names2);
    }
}
