//! Python front end over tree-sitter.
//!
//! Normalizes the tree-sitter parse tree into the shared statement model:
//! chained and tuple assignments are flattened, loop headers become loop-local
//! assignments, control-block bodies are walked in place with their control
//! context attached, and class bodies contribute methods under qualified
//! `Class.method` names.

use super::{
    Adapter, AssignTarget, Callee, ControlContext, Expr, FunctionDef, LiteralKind, Param,
    ParsedFile, Stmt, StmtKind,
};
use crate::core::errors::{AnalysisError, AnalysisWarning};
use crate::core::{Language, Location};
use std::path::Path;
use tree_sitter::{Node, Parser};

pub struct PythonAdapter;

impl Adapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, content: &str, path: &Path) -> Result<ParsedFile, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| AnalysisError::Parse {
                file: path.to_path_buf(),
                message: format!("failed to load python grammar: {e}"),
            })?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| AnalysisError::Parse {
                file: path.to_path_buf(),
                message: "tree-sitter returned no tree".to_string(),
            })?;

        if tree.root_node().has_error() {
            return Err(AnalysisError::Parse {
                file: path.to_path_buf(),
                message: format!("syntax error near line {}", first_error_line(tree.root_node())),
            });
        }

        let mut walker = PyWalker {
            source: content,
            path,
            warnings: Vec::new(),
        };
        let statements = walker.block(tree.root_node(), ControlContext::Straight, None);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            language: Language::Python,
            statements,
            warnings: walker.warnings,
        })
    }
}

fn first_error_line(root: Node) -> usize {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        stack.extend(node.children(&mut cursor));
    }
    1
}

struct PyWalker<'a> {
    source: &'a str,
    path: &'a Path,
    warnings: Vec<AnalysisWarning>,
}

impl<'a> PyWalker<'a> {
    fn text(&self, node: Node) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    fn line(&self, node: Node) -> usize {
        node.start_position().row + 1
    }

    fn code_line(&self, node: Node) -> String {
        self.text(node).lines().next().unwrap_or("").trim().to_string()
    }

    fn location(&self, node: Node) -> Location {
        Location::new(self.path, self.line(node))
    }

    fn unsupported(&mut self, node: Node) {
        self.warnings.push(AnalysisWarning::UnsupportedConstruct {
            construct: node.kind().to_string(),
            location: self.location(node),
        });
    }

    /// Walk the named children of a block-like node, flattening control
    /// structures into the enclosing stream with their context attached.
    fn block(&mut self, node: Node, context: ControlContext, class: Option<&str>) -> Vec<Stmt> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.statement(child, context, class, &mut out);
        }
        out
    }

    fn statement(
        &mut self,
        node: Node,
        context: ControlContext,
        class: Option<&str>,
        out: &mut Vec<Stmt>,
    ) {
        match node.kind() {
            "expression_statement" => {
                if let Some(inner) = node.named_child(0) {
                    self.expression_statement(inner, context, out);
                }
            }
            "function_definition" => {
                if let Some(def) = self.function_def(node, class) {
                    out.push(self.stmt(node, context, StmtKind::FunctionDef(def)));
                }
            }
            "decorated_definition" => {
                if let Some(def_node) = node.child_by_field_name("definition") {
                    self.statement(def_node, context, class, out);
                }
            }
            "class_definition" => self.class_def(node, context, out),
            "return_statement" => {
                let value = node.named_child(0).map(|v| self.expr(v));
                out.push(self.stmt(node, context, StmtKind::Return { value }));
            }
            "if_statement" => {
                let ctx = merge_context(context, ControlContext::Conditional);
                if let Some(body) = node.child_by_field_name("consequence") {
                    out.extend(self.block(body, ctx, class));
                }
                let mut cursor = node.walk();
                let alternatives: Vec<Node> =
                    node.children_by_field_name("alternative", &mut cursor).collect();
                for alt in alternatives {
                    match alt.kind() {
                        "elif_clause" => {
                            if let Some(body) = alt.child_by_field_name("consequence") {
                                out.extend(self.block(body, ctx, class));
                            }
                        }
                        "else_clause" => {
                            if let Some(body) = alt.child_by_field_name("body") {
                                out.extend(self.block(body, ctx, class));
                            }
                        }
                        _ => {}
                    }
                }
            }
            "for_statement" => {
                let ctx = merge_context(context, ControlContext::Loop);
                // The loop variable is an assignment from the iterated value.
                if let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    let targets = self.targets(left);
                    let value = self.expr(right);
                    if !targets.is_empty() {
                        out.push(Stmt {
                            kind: StmtKind::Assign {
                                targets,
                                annotation: None,
                                value,
                                value_text: self.text(right).to_string(),
                            },
                            line: self.line(node),
                            context: ctx,
                            code: self.code_line(node),
                        });
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    out.extend(self.block(body, ctx, class));
                }
            }
            "while_statement" => {
                let ctx = merge_context(context, ControlContext::Loop);
                if let Some(body) = node.child_by_field_name("body") {
                    out.extend(self.block(body, ctx, class));
                }
            }
            "try_statement" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    match child.kind() {
                        "block" => out.extend(self.block(child, context, class)),
                        "except_clause" | "finally_clause" | "else_clause" => {
                            let ctx = merge_context(context, ControlContext::Conditional);
                            let mut inner = child.walk();
                            let blocks: Vec<Node> = child
                                .named_children(&mut inner)
                                .filter(|n| n.kind() == "block")
                                .collect();
                            for b in blocks {
                                out.extend(self.block(b, ctx, class));
                            }
                        }
                        _ => {}
                    }
                }
            }
            "with_statement" => {
                self.with_items(node, context, out);
                if let Some(body) = node.child_by_field_name("body") {
                    out.extend(self.block(body, context, class));
                }
            }
            // Imports intentionally stay unbound: imported names resolve to
            // external sentinel leaves downstream.
            "import_statement" | "import_from_statement" | "future_import_statement" => {}
            "pass_statement" | "break_statement" | "continue_statement" | "comment" => {}
            "global_statement" | "nonlocal_statement" | "delete_statement" | "raise_statement"
            | "assert_statement" | "match_statement" => self.unsupported(node),
            _ => self.unsupported(node),
        }
    }

    fn expression_statement(&mut self, inner: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        match inner.kind() {
            "assignment" => self.assignment(inner, context, out),
            "augmented_assignment" => {
                let target = inner
                    .child_by_field_name("left")
                    .and_then(|l| self.target(l));
                let value = inner
                    .child_by_field_name("right")
                    .map(|r| (self.expr(r), self.text(r).to_string()));
                if let (Some(target), Some((value, value_text))) = (target, value) {
                    out.push(self.stmt(
                        inner,
                        context,
                        StmtKind::AugAssign {
                            target,
                            value,
                            value_text,
                        },
                    ));
                }
            }
            "string" => {} // docstring
            _ => {
                let value = self.expr(inner);
                out.push(self.stmt(inner, context, StmtKind::Expr { value }));
            }
        }
    }

    /// Flatten `a = b = c = expr` into one Assign with several targets, and
    /// detect tuple assignment on the way.
    fn assignment(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let mut targets: Vec<Node> = Vec::new();
        let mut current = node;
        let value_node = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                Some(right) => break Some(right),
                // Bare annotation (`x: int`) has no right-hand side.
                None => break None,
            }
        };
        let annotation = current
            .child_by_field_name("type")
            .map(|t| self.text(t).to_string());

        let Some(value_node) = value_node else {
            return;
        };
        let value_text = self.text(value_node).to_string();

        // `a, b = ...` with a single pattern target becomes a tuple binding.
        if targets.len() == 1
            && matches!(targets[0].kind(), "pattern_list" | "tuple_pattern" | "list_pattern")
        {
            let tuple_targets = self.targets(targets[0]);
            let values = self.value_list(value_node);
            if !tuple_targets.is_empty() {
                out.push(self.stmt(
                    node,
                    context,
                    StmtKind::TupleAssign {
                        targets: tuple_targets,
                        values,
                        value_text,
                    },
                ));
            }
            return;
        }

        let mut flat = Vec::new();
        for t in targets {
            flat.extend(self.targets(t));
        }
        if flat.is_empty() {
            return;
        }
        let value = self.expr(value_node);
        out.push(self.stmt(
            node,
            context,
            StmtKind::Assign {
                targets: flat,
                annotation,
                value,
                value_text,
            },
        ));
    }

    fn value_list(&mut self, node: Node) -> Vec<Expr> {
        match node.kind() {
            "expression_list" | "tuple" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                children.into_iter().map(|c| self.expr(c)).collect()
            }
            _ => vec![self.expr(node)],
        }
    }

    fn targets(&mut self, node: Node) -> Vec<AssignTarget> {
        match node.kind() {
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                children.into_iter().flat_map(|c| self.targets(c)).collect()
            }
            _ => self.target(node).into_iter().collect(),
        }
    }

    fn target(&mut self, node: Node) -> Option<AssignTarget> {
        match node.kind() {
            "identifier" => Some(AssignTarget::Name(self.text(node).to_string())),
            "attribute" => {
                let base = node.child_by_field_name("object")?;
                let attr = node.child_by_field_name("attribute")?;
                Some(AssignTarget::Attribute {
                    base: root_name_text(self.text(base)),
                    attr: self.text(attr).to_string(),
                })
            }
            "subscript" => {
                let base = node.child_by_field_name("value")?;
                Some(AssignTarget::Subscript {
                    base: root_name_text(self.text(base)),
                })
            }
            "list_splat_pattern" => {
                let inner = node.named_child(0)?;
                self.target(inner)
            }
            _ => {
                self.unsupported(node);
                None
            }
        }
    }

    fn function_def(&mut self, node: Node, class: Option<&str>) -> Option<FunctionDef> {
        let name_node = node.child_by_field_name("name")?;
        let plain = self.text(name_node).to_string();
        let name = match class {
            Some(class) => format!("{class}.{plain}"),
            None => plain,
        };

        let mut params = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            let children: Vec<Node> = parameters.named_children(&mut cursor).collect();
            for p in children {
                if let Some(param) = self.param(p) {
                    params.push(param);
                }
            }
        }

        let body = node
            .child_by_field_name("body")
            .map(|b| self.block(b, ControlContext::Straight, None))
            .unwrap_or_default();

        Some(FunctionDef {
            name,
            params,
            body,
            line: self.line(node),
        })
    }

    fn param(&mut self, node: Node) -> Option<Param> {
        let line = self.line(node);
        match node.kind() {
            "identifier" => Some(Param {
                name: self.text(node).to_string(),
                annotation: None,
                line,
            }),
            "typed_parameter" => {
                let name = node.named_child(0)?;
                let annotation = node
                    .child_by_field_name("type")
                    .map(|t| self.text(t).to_string());
                Some(Param {
                    name: self.text(name).to_string(),
                    annotation,
                    line,
                })
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = node.child_by_field_name("name")?;
                let annotation = node
                    .child_by_field_name("type")
                    .map(|t| self.text(t).to_string());
                Some(Param {
                    name: self.text(name).to_string(),
                    annotation,
                    line,
                })
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let inner = node.named_child(0)?;
                Some(Param {
                    name: self.text(inner).to_string(),
                    annotation: None,
                    line,
                })
            }
            _ => None,
        }
    }

    fn class_def(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let class_name = self.text(name_node).to_string();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let children: Vec<Node> = body.named_children(&mut cursor).collect();
            for child in children {
                match child.kind() {
                    "function_definition" | "decorated_definition" => {
                        self.statement(child, context, Some(&class_name), out)
                    }
                    "expression_statement" | "comment" | "pass_statement" => {}
                    _ => self.unsupported(child),
                }
            }
        }
    }

    fn with_items(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let mut cursor = node.walk();
        let mut stack = vec![node];
        let mut items = Vec::new();
        while let Some(n) = stack.pop() {
            for child in n.children(&mut cursor) {
                if child.kind() == "as_pattern" {
                    items.push(child);
                } else if matches!(child.kind(), "with_clause" | "with_item") {
                    stack.push(child);
                }
            }
        }
        for item in items {
            let value = item.named_child(0);
            let alias = item
                .child_by_field_name("alias")
                .and_then(|a| a.named_child(0).or(Some(a)));
            if let (Some(value), Some(alias)) = (value, alias) {
                let target = AssignTarget::Name(self.text(alias).to_string());
                let expr = self.expr(value);
                out.push(Stmt {
                    kind: StmtKind::Assign {
                        targets: vec![target],
                        annotation: None,
                        value: expr,
                        value_text: self.text(value).to_string(),
                    },
                    line: self.line(item),
                    context,
                    code: self.code_line(node),
                });
            }
        }
    }

    fn stmt(&self, node: Node, context: ControlContext, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            line: self.line(node),
            context,
            code: self.code_line(node),
        }
    }

    fn expr(&mut self, node: Node) -> Expr {
        match node.kind() {
            "identifier" => Expr::Name(self.text(node).to_string()),
            "integer" => Expr::Literal(LiteralKind::Int),
            "float" => Expr::Literal(LiteralKind::Float),
            "true" | "false" => Expr::Literal(LiteralKind::Bool),
            "none" => Expr::Literal(LiteralKind::Null),
            "string" | "concatenated_string" => self.string_expr(node),
            "list" => self.container(node, LiteralKind::List),
            "tuple" | "expression_list" => self.container(node, LiteralKind::Tuple),
            "set" => self.container(node, LiteralKind::Set),
            "dictionary" => self.dictionary(node),
            "binary_operator" => {
                let left = self.field_expr(node, "left");
                let right = self.field_expr(node, "right");
                Expr::Binary {
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            "boolean_operator" => {
                let left = self.field_expr(node, "left");
                let right = self.field_expr(node, "right");
                Expr::BoolOp {
                    operands: vec![left, right],
                }
            }
            "comparison_operator" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                Expr::BoolOp {
                    operands: children.into_iter().map(|c| self.expr(c)).collect(),
                }
            }
            "not_operator" | "unary_operator" => {
                let operand = self.field_expr(node, "argument");
                Expr::Unary {
                    operand: Box::new(operand),
                }
            }
            "conditional_expression" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                if children.len() == 3 {
                    let then = self.expr(children[0]);
                    let condition = self.expr(children[1]);
                    let otherwise = self.expr(children[2]);
                    Expr::Ternary {
                        condition: Box::new(condition),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    }
                } else {
                    Expr::Unknown
                }
            }
            "call" => self.call(node),
            "attribute" => {
                let base = self.field_expr(node, "object");
                let attr = node
                    .child_by_field_name("attribute")
                    .map(|a| self.text(a).to_string())
                    .unwrap_or_default();
                Expr::Attribute {
                    base: Box::new(base),
                    attr,
                }
            }
            "subscript" => {
                let base = self.field_expr(node, "value");
                let index = node
                    .child_by_field_name("subscript")
                    .map(|s| self.expr(s))
                    .unwrap_or(Expr::Unknown);
                Expr::Subscript {
                    base: Box::new(base),
                    index: Box::new(index),
                }
            }
            "parenthesized_expression" | "await" => node
                .named_child(0)
                .map(|c| self.expr(c))
                .unwrap_or(Expr::Unknown),
            "named_expression" => self.field_expr(node, "value"),
            "list_comprehension" | "set_comprehension" | "generator_expression" => {
                self.comprehension(node, false)
            }
            "dictionary_comprehension" => self.comprehension(node, true),
            _ => Expr::Unknown,
        }
    }

    fn field_expr(&mut self, node: Node, field: &str) -> Expr {
        node.child_by_field_name(field)
            .map(|c| self.expr(c))
            .unwrap_or(Expr::Unknown)
    }

    fn string_expr(&mut self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let mut stack = vec![node];
        let mut parts = Vec::new();
        while let Some(n) = stack.pop() {
            for child in n.children(&mut cursor) {
                if child.kind() == "interpolation" {
                    if let Some(inner) = child.child_by_field_name("expression").or_else(|| child.named_child(0)) {
                        stack.push(inner);
                        parts.push(inner);
                    }
                } else if child.kind() == "string" {
                    stack.push(child);
                }
            }
        }
        if parts.is_empty() {
            Expr::Literal(LiteralKind::Str)
        } else {
            let parts = parts.into_iter().map(|p| self.expr(p)).collect();
            Expr::Interpolation { parts }
        }
    }

    fn container(&mut self, node: Node, kind: LiteralKind) -> Expr {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        let elements = children.into_iter().map(|c| self.expr(c)).collect();
        Expr::Container { kind, elements }
    }

    fn dictionary(&mut self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        let mut elements = Vec::new();
        for pair in children {
            if pair.kind() == "pair" {
                if let Some(key) = pair.child_by_field_name("key") {
                    elements.push(self.expr(key));
                }
                if let Some(value) = pair.child_by_field_name("value") {
                    elements.push(self.expr(value));
                }
            } else {
                elements.push(self.expr(pair));
            }
        }
        Expr::Container {
            kind: LiteralKind::Dict,
            elements,
        }
    }

    fn call(&mut self, node: Node) -> Expr {
        let callee = match node.child_by_field_name("function") {
            Some(f) if f.kind() == "attribute" => {
                let receiver = self.field_expr(f, "object");
                let name = f
                    .child_by_field_name("attribute")
                    .map(|a| self.text(a).to_string())
                    .unwrap_or_default();
                Callee::Method {
                    receiver: Box::new(receiver),
                    name,
                }
            }
            Some(f) if f.kind() == "identifier" => Callee::Name(self.text(f).to_string()),
            Some(f) => Callee::Name(self.code_line(f)),
            None => Callee::Name(String::new()),
        };

        let mut args = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            let children: Vec<Node> = arguments.named_children(&mut cursor).collect();
            for arg in children {
                match arg.kind() {
                    "keyword_argument" => {
                        if let Some(value) = arg.child_by_field_name("value") {
                            args.push(self.expr(value));
                        }
                    }
                    "list_splat" | "dictionary_splat" => {
                        if let Some(inner) = arg.named_child(0) {
                            args.push(self.expr(inner));
                        }
                    }
                    "comment" => {}
                    _ => args.push(self.expr(arg)),
                }
            }
        }

        Expr::Call { callee, args }
    }

    /// Comprehensions keep their loop variables scoped to the expression.
    fn comprehension(&mut self, node: Node, dict: bool) -> Expr {
        let element = if dict {
            node.child_by_field_name("body")
                .map(|pair| {
                    let key = self.field_expr(pair, "key");
                    let value = self.field_expr(pair, "value");
                    Expr::Container {
                        kind: LiteralKind::Dict,
                        elements: vec![key, value],
                    }
                })
                .unwrap_or(Expr::Unknown)
        } else {
            self.field_expr(node, "body")
        };

        let mut loop_vars = Vec::new();
        let mut iters = Vec::new();
        let mut condition = None;
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "for_in_clause" => {
                    if let Some(left) = child.child_by_field_name("left") {
                        for t in self.targets(left) {
                            if let AssignTarget::Name(name) = t {
                                loop_vars.push(name);
                            }
                        }
                    }
                    iters.push(self.field_expr(child, "right"));
                }
                "if_clause" => {
                    if condition.is_none() {
                        if let Some(cond) = child.named_child(0) {
                            condition = Some(Box::new(self.expr(cond)));
                        }
                    }
                }
                _ => {}
            }
        }

        Expr::Comprehension {
            element: Box::new(element),
            loop_vars,
            iters,
            condition,
        }
    }
}

fn merge_context(outer: ControlContext, inner: ControlContext) -> ControlContext {
    match (outer, inner) {
        (ControlContext::Loop, _) | (_, ControlContext::Loop) => ControlContext::Loop,
        (ControlContext::Conditional, _) | (_, ControlContext::Conditional) => {
            ControlContext::Conditional
        }
        _ => ControlContext::Straight,
    }
}

/// Leftmost dotted segment of an lvalue base (`a.b.c` -> `a`).
fn root_name_text(text: &str) -> String {
    text.split(['.', '[']).next().unwrap_or(text).to_string()
}
