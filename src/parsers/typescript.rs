//! JavaScript/TypeScript front end over tree-sitter.
//!
//! Grammar selection by file extension follows the same scheme as the Python
//! side: `.ts`/`.mts` use the TypeScript grammar, `.tsx` the TSX grammar, and
//! `.js`/`.mjs`/`.cjs`/`.jsx` the JavaScript grammar. Arrow functions and
//! function expressions bound to a `const`/`let` name normalize to the same
//! `FunctionDef` shape as declarations, so the call linker treats them alike.

use super::{
    Adapter, AssignTarget, Callee, ControlContext, Expr, FunctionDef, LiteralKind, Param,
    ParsedFile, Stmt, StmtKind,
};
use crate::core::errors::{AnalysisError, AnalysisWarning};
use crate::core::{Language, Location};
use std::path::Path;
use tree_sitter::{Language as Grammar, Node, Parser};

pub struct TypeScriptAdapter {
    language: Language,
}

impl TypeScriptAdapter {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn grammar(&self, path: &Path) -> Grammar {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match (self.language, ext) {
            (Language::TypeScript, "tsx") => tree_sitter_typescript::LANGUAGE_TSX.into(),
            (Language::TypeScript, _) => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            _ => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

impl Adapter for TypeScriptAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&self, content: &str, path: &Path) -> Result<ParsedFile, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar(path))
            .map_err(|e| AnalysisError::Parse {
                file: path.to_path_buf(),
                message: format!("failed to load grammar: {e}"),
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
                message: format!(
                    "syntax error near line {}",
                    first_error_line(tree.root_node())
                ),
            });
        }

        let mut walker = JsWalker {
            source: content,
            path,
            warnings: Vec::new(),
        };
        let statements = walker.block(tree.root_node(), ControlContext::Straight, None);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            language: self.language,
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

struct JsWalker<'a> {
    source: &'a str,
    path: &'a Path,
    warnings: Vec<AnalysisWarning>,
}

impl<'a> JsWalker<'a> {
    fn text(&self, node: Node) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    fn line(&self, node: Node) -> usize {
        node.start_position().row + 1
    }

    fn code_line(&self, node: Node) -> String {
        self.text(node).lines().next().unwrap_or("").trim().to_string()
    }

    fn unsupported(&mut self, node: Node) {
        self.warnings.push(AnalysisWarning::UnsupportedConstruct {
            construct: node.kind().to_string(),
            location: Location::new(self.path, self.line(node)),
        });
    }

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
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                let declarators: Vec<Node> = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() == "variable_declarator")
                    .collect();
                for declarator in declarators {
                    self.declarator(declarator, context, out);
                }
            }
            "expression_statement" => {
                if let Some(inner) = node.named_child(0) {
                    self.expression_statement(inner, context, out);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(def) = self.function_def(node, class) {
                    out.push(self.stmt(node, context, StmtKind::FunctionDef(def)));
                }
            }
            "class_declaration" => self.class_def(node, context, out),
            "return_statement" => {
                let value = node.named_child(0).map(|v| self.expr(v));
                out.push(self.stmt(node, context, StmtKind::Return { value }));
            }
            "if_statement" => {
                let ctx = merge_context(context, ControlContext::Conditional);
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.nested(consequence, ctx, class, out);
                }
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    // else_clause wraps either a block or another if.
                    let mut cursor = alternative.walk();
                    let children: Vec<Node> =
                        alternative.named_children(&mut cursor).collect();
                    for child in children {
                        self.nested(child, ctx, class, out);
                    }
                }
            }
            "for_statement" => {
                let ctx = merge_context(context, ControlContext::Loop);
                if let Some(init) = node.child_by_field_name("initializer") {
                    self.statement(init, ctx, class, out);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.nested(body, ctx, class, out);
                }
            }
            "for_in_statement" => {
                let ctx = merge_context(context, ControlContext::Loop);
                self.for_in_binding(node, ctx, out);
                if let Some(body) = node.child_by_field_name("body") {
                    self.nested(body, ctx, class, out);
                }
            }
            "while_statement" | "do_statement" => {
                let ctx = merge_context(context, ControlContext::Loop);
                if let Some(body) = node.child_by_field_name("body") {
                    self.nested(body, ctx, class, out);
                }
            }
            "try_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    out.extend(self.block(body, context, class));
                }
                let ctx = merge_context(context, ControlContext::Conditional);
                if let Some(handler) = node.child_by_field_name("handler") {
                    if let Some(body) = handler.child_by_field_name("body") {
                        out.extend(self.block(body, ctx, class));
                    }
                }
                if let Some(finalizer) = node.child_by_field_name("finalizer") {
                    if let Some(body) = finalizer.child_by_field_name("body") {
                        out.extend(self.block(body, context, class));
                    }
                }
            }
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    self.statement(declaration, context, class, out);
                }
            }
            "statement_block" => out.extend(self.block(node, context, class)),
            "import_statement" | "comment" | "empty_statement" | "break_statement"
            | "continue_statement" => {}
            // TS type surface carries no value flow.
            "type_alias_declaration" | "interface_declaration" | "enum_declaration"
            | "ambient_declaration" => {}
            "throw_statement" | "switch_statement" | "labeled_statement" | "with_statement" => {
                self.unsupported(node)
            }
            _ => self.unsupported(node),
        }
    }

    /// Wrap a single nested statement (block or bare statement) into the
    /// enclosing stream.
    fn nested(
        &mut self,
        node: Node,
        context: ControlContext,
        class: Option<&str>,
        out: &mut Vec<Stmt>,
    ) {
        if node.kind() == "statement_block" {
            out.extend(self.block(node, context, class));
        } else {
            self.statement(node, context, class, out);
        }
    }

    fn declarator(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let annotation = node
            .child_by_field_name("type")
            .map(|t| self.text(t).trim_start_matches(':').trim().to_string());
        let Some(value_node) = node.child_by_field_name("value") else {
            return; // bare `let x;`
        };

        // `const f = (x) => ...` is a function definition in disguise.
        if matches!(
            value_node.kind(),
            "arrow_function" | "function_expression" | "function"
        ) && name_node.kind() == "identifier"
        {
            if let Some(def) =
                self.closure_def(self.text(name_node).to_string(), value_node)
            {
                out.push(self.stmt(node, context, StmtKind::FunctionDef(def)));
                return;
            }
        }

        let value = self.expr(value_node);
        let value_text = self.text(value_node).to_string();
        match name_node.kind() {
            "identifier" => out.push(self.stmt(
                node,
                context,
                StmtKind::Assign {
                    targets: vec![AssignTarget::Name(self.text(name_node).to_string())],
                    annotation,
                    value,
                    value_text,
                },
            )),
            "array_pattern" | "object_pattern" => {
                let targets = self.pattern_targets(name_node);
                if !targets.is_empty() {
                    out.push(self.stmt(
                        node,
                        context,
                        StmtKind::TupleAssign {
                            targets,
                            values: vec![value],
                            value_text,
                        },
                    ));
                }
            }
            _ => self.unsupported(name_node),
        }
    }

    fn pattern_targets(&mut self, node: Node) -> Vec<AssignTarget> {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        let mut targets = Vec::new();
        for child in children {
            match child.kind() {
                "identifier" | "shorthand_property_identifier_pattern" => {
                    targets.push(AssignTarget::Name(self.text(child).to_string()));
                }
                "pair_pattern" => {
                    if let Some(value) = child.child_by_field_name("value") {
                        targets.extend(self.pattern_targets_single(value));
                    }
                }
                "rest_pattern" => {
                    if let Some(inner) = child.named_child(0) {
                        targets.extend(self.pattern_targets_single(inner));
                    }
                }
                "array_pattern" | "object_pattern" => {
                    targets.extend(self.pattern_targets(child));
                }
                _ => {}
            }
        }
        targets
    }

    fn pattern_targets_single(&mut self, node: Node) -> Vec<AssignTarget> {
        match node.kind() {
            "identifier" => vec![AssignTarget::Name(self.text(node).to_string())],
            "array_pattern" | "object_pattern" => self.pattern_targets(node),
            _ => Vec::new(),
        }
    }

    fn expression_statement(&mut self, inner: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        match inner.kind() {
            "assignment_expression" => self.assignment(inner, context, out),
            "augmented_assignment_expression" => {
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
            _ => {
                let value = self.expr(inner);
                out.push(self.stmt(inner, context, StmtKind::Expr { value }));
            }
        }
    }

    fn assignment(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let mut targets = Vec::new();
        let mut current = node;
        let value_node = loop {
            if let Some(left) = current.child_by_field_name("left") {
                if let Some(target) = self.target(left) {
                    targets.push(target);
                }
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment_expression" => current = right,
                Some(right) => break right,
                None => return,
            }
        };
        if targets.is_empty() {
            return;
        }
        let value = self.expr(value_node);
        out.push(self.stmt(
            node,
            context,
            StmtKind::Assign {
                targets,
                annotation: None,
                value,
                value_text: self.text(value_node).to_string(),
            },
        ));
    }

    fn target(&mut self, node: Node) -> Option<AssignTarget> {
        match node.kind() {
            "identifier" => Some(AssignTarget::Name(self.text(node).to_string())),
            "member_expression" => {
                let base = node.child_by_field_name("object")?;
                let attr = node.child_by_field_name("property")?;
                Some(AssignTarget::Attribute {
                    base: root_name_text(self.text(base)),
                    attr: self.text(attr).to_string(),
                })
            }
            "subscript_expression" => {
                let base = node.child_by_field_name("object")?;
                Some(AssignTarget::Subscript {
                    base: root_name_text(self.text(base)),
                })
            }
            "non_null_expression" | "parenthesized_expression" => {
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
        Some(FunctionDef {
            name,
            params: self.params(node),
            body: node
                .child_by_field_name("body")
                .map(|b| self.block(b, ControlContext::Straight, None))
                .unwrap_or_default(),
            line: self.line(node),
        })
    }

    fn closure_def(&mut self, name: String, node: Node) -> Option<FunctionDef> {
        let params = self.params(node);
        let body = match node.child_by_field_name("body") {
            // Expression-bodied arrow: the body is an implicit return.
            Some(body) if body.kind() != "statement_block" => {
                let value = self.expr(body);
                vec![Stmt {
                    kind: StmtKind::Return { value: Some(value) },
                    line: self.line(body),
                    context: ControlContext::Straight,
                    code: self.code_line(body),
                }]
            }
            Some(body) => self.block(body, ControlContext::Straight, None),
            None => return None,
        };
        Some(FunctionDef {
            name,
            params,
            body,
            line: self.line(node),
        })
    }

    fn params(&mut self, node: Node) -> Vec<Param> {
        let mut params = Vec::new();
        let parameters = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"));
        let Some(parameters) = parameters else {
            return params;
        };
        if parameters.kind() == "identifier" {
            // Single-parameter arrow without parentheses.
            params.push(Param {
                name: self.text(parameters).to_string(),
                annotation: None,
                line: self.line(parameters),
            });
            return params;
        }
        let mut cursor = parameters.walk();
        let children: Vec<Node> = parameters.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "identifier" => params.push(Param {
                    name: self.text(child).to_string(),
                    annotation: None,
                    line: self.line(child),
                }),
                "required_parameter" | "optional_parameter" => {
                    let pattern = child
                        .child_by_field_name("pattern")
                        .unwrap_or(child);
                    let annotation = child
                        .child_by_field_name("type")
                        .map(|t| self.text(t).trim_start_matches(':').trim().to_string());
                    if pattern.kind() == "identifier" {
                        params.push(Param {
                            name: self.text(pattern).to_string(),
                            annotation,
                            line: self.line(child),
                        });
                    }
                }
                "assignment_pattern" => {
                    if let Some(left) = child.child_by_field_name("left") {
                        if left.kind() == "identifier" {
                            params.push(Param {
                                name: self.text(left).to_string(),
                                annotation: None,
                                line: self.line(child),
                            });
                        }
                    }
                }
                "rest_pattern" => {
                    if let Some(inner) = child.named_child(0) {
                        if inner.kind() == "identifier" {
                            params.push(Param {
                                name: self.text(inner).to_string(),
                                annotation: None,
                                line: self.line(child),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        params
    }

    fn class_def(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let class_name = self.text(name_node).to_string();
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        let children: Vec<Node> = body.named_children(&mut cursor).collect();
        for child in children {
            if child.kind() == "method_definition" {
                if let Some(name) = child.child_by_field_name("name") {
                    let qualified = format!("{class_name}.{}", self.text(name));
                    if let Some(def) = self.closure_def(qualified, child) {
                        out.push(self.stmt(child, context, StmtKind::FunctionDef(def)));
                    }
                }
            }
        }
    }

    fn for_in_binding(&mut self, node: Node, context: ControlContext, out: &mut Vec<Stmt>) {
        let Some(right) = node.child_by_field_name("right") else {
            return;
        };
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let targets = match left.kind() {
            "identifier" => vec![AssignTarget::Name(self.text(left).to_string())],
            "array_pattern" | "object_pattern" => self.pattern_targets(left),
            _ => Vec::new(),
        };
        if targets.is_empty() {
            return;
        }
        let value = self.expr(right);
        out.push(Stmt {
            kind: StmtKind::Assign {
                targets,
                annotation: None,
                value,
                value_text: self.text(right).to_string(),
            },
            line: self.line(node),
            context,
            code: self.code_line(node),
        });
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
            "number" => {
                if self.text(node).contains('.') {
                    Expr::Literal(LiteralKind::Float)
                } else {
                    Expr::Literal(LiteralKind::Int)
                }
            }
            "string" => Expr::Literal(LiteralKind::Str),
            "true" | "false" => Expr::Literal(LiteralKind::Bool),
            // `undefined` is its own node kind in these grammars, not an
            // identifier.
            "null" | "undefined" => Expr::Literal(LiteralKind::Null),
            "array" => self.container(node, LiteralKind::List),
            "object" => self.object(node),
            "template_string" => self.template(node),
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("");
                let left = self.field_expr(node, "left");
                let right = self.field_expr(node, "right");
                if matches!(op, "&&" | "||" | "??") {
                    Expr::BoolOp {
                        operands: vec![left, right],
                    }
                } else {
                    Expr::Binary {
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
            }
            "unary_expression" => Expr::Unary {
                operand: Box::new(self.field_expr(node, "argument")),
            },
            "ternary_expression" => Expr::Ternary {
                condition: Box::new(self.field_expr(node, "condition")),
                then: Box::new(self.field_expr(node, "consequence")),
                otherwise: Box::new(self.field_expr(node, "alternative")),
            },
            "call_expression" => self.call(node),
            "new_expression" => {
                let callee = node
                    .child_by_field_name("constructor")
                    .map(|c| Callee::Name(self.text(c).to_string()))
                    .unwrap_or(Callee::Name(String::new()));
                let args = self.arguments(node);
                Expr::Call { callee, args }
            }
            "member_expression" => Expr::Attribute {
                base: Box::new(self.field_expr(node, "object")),
                attr: node
                    .child_by_field_name("property")
                    .map(|p| self.text(p).to_string())
                    .unwrap_or_default(),
            },
            "subscript_expression" => Expr::Subscript {
                base: Box::new(self.field_expr(node, "object")),
                index: Box::new(self.field_expr(node, "index")),
            },
            "parenthesized_expression" | "await_expression" | "non_null_expression"
            | "as_expression" | "satisfies_expression" => node
                .named_child(0)
                .map(|c| self.expr(c))
                .unwrap_or(Expr::Unknown),
            "spread_element" => node
                .named_child(0)
                .map(|c| self.expr(c))
                .unwrap_or(Expr::Unknown),
            _ => Expr::Unknown,
        }
    }

    fn field_expr(&mut self, node: Node, field: &str) -> Expr {
        node.child_by_field_name(field)
            .map(|c| self.expr(c))
            .unwrap_or(Expr::Unknown)
    }

    fn container(&mut self, node: Node, kind: LiteralKind) -> Expr {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        Expr::Container {
            kind,
            elements: children.into_iter().map(|c| self.expr(c)).collect(),
        }
    }

    fn object(&mut self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        let mut elements = Vec::new();
        for child in children {
            match child.kind() {
                "pair" => {
                    if let Some(value) = child.child_by_field_name("value") {
                        elements.push(self.expr(value));
                    }
                }
                "shorthand_property_identifier" => {
                    elements.push(Expr::Name(self.text(child).to_string()));
                }
                "spread_element" => {
                    if let Some(inner) = child.named_child(0) {
                        elements.push(self.expr(inner));
                    }
                }
                _ => {}
            }
        }
        Expr::Container {
            kind: LiteralKind::Dict,
            elements,
        }
    }

    fn template(&mut self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        let mut parts = Vec::new();
        for child in children {
            if child.kind() == "template_substitution" {
                if let Some(inner) = child.named_child(0) {
                    parts.push(self.expr(inner));
                }
            }
        }
        if parts.is_empty() {
            Expr::Literal(LiteralKind::Str)
        } else {
            Expr::Interpolation { parts }
        }
    }

    fn call(&mut self, node: Node) -> Expr {
        let callee = match node.child_by_field_name("function") {
            Some(f) if f.kind() == "member_expression" => {
                let receiver = self.field_expr(f, "object");
                let name = f
                    .child_by_field_name("property")
                    .map(|p| self.text(p).to_string())
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
        Expr::Call {
            callee,
            args: self.arguments(node),
        }
    }

    fn arguments(&mut self, node: Node) -> Vec<Expr> {
        let mut args = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            let children: Vec<Node> = arguments.named_children(&mut cursor).collect();
            for arg in children {
                args.push(self.expr(arg));
            }
        }
        args
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

fn root_name_text(text: &str) -> String {
    text.split(['.', '[']).next().unwrap_or(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse_ts(source: &str) -> ParsedFile {
        TypeScriptAdapter::new(Language::TypeScript)
            .parse(source, Path::new("test.ts"))
            .expect("parse should succeed")
    }

    fn parse_js(source: &str) -> ParsedFile {
        TypeScriptAdapter::new(Language::JavaScript)
            .parse(source, Path::new("test.js"))
            .expect("parse should succeed")
    }

    #[test]
    fn test_const_declaration() {
        let parsed = parse_ts("const x: number = 1;\n");
        match &parsed.statements[0].kind {
            StmtKind::Assign {
                targets,
                annotation,
                value,
                ..
            } => {
                assert!(matches!(&targets[0], AssignTarget::Name(n) if n == "x"));
                assert_eq!(annotation.as_deref(), Some("number"));
                assert!(matches!(value, Expr::Literal(LiteralKind::Int)));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn test_destructuring_assignment() {
        let parsed = parse_js("const [a, b] = pair;\n");
        match &parsed.statements[0].kind {
            StmtKind::TupleAssign {
                targets, values, ..
            } => {
                assert_eq!(targets.len(), 2);
                assert_eq!(values.len(), 1);
            }
            other => panic!("expected tuple assign, got {other:?}"),
        }
    }

    #[test]
    fn test_arrow_function_becomes_def() {
        let parsed = parse_ts("const double = (x: number) => x * 2;\n");
        match &parsed.statements[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "double");
                assert_eq!(def.params[0].name, "x");
                assert!(matches!(def.body[0].kind, StmtKind::Return { .. }));
            }
            other => panic!("expected function def, got {other:?}"),
        }
    }

    #[test]
    fn test_function_declaration() {
        let source = indoc! {"
            function add(a, b) {
                return a + b;
            }
        "};
        let parsed = parse_js(source);
        match &parsed.statements[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "add");
                assert_eq!(def.params.len(), 2);
            }
            other => panic!("expected function def, got {other:?}"),
        }
    }

    #[test]
    fn test_class_method_qualified() {
        let source = indoc! {"
            class Cart {
                total(items) {
                    return items.length;
                }
            }
        "};
        let parsed = parse_js(source);
        match &parsed.statements[0].kind {
            StmtKind::FunctionDef(def) => assert_eq!(def.name, "Cart.total"),
            other => panic!("expected method def, got {other:?}"),
        }
    }

    #[test]
    fn test_this_member_write() {
        let source = indoc! {"
            class Cart {
                add(item) {
                    this.count = this.count + 1;
                }
            }
        "};
        let parsed = parse_js(source);
        let StmtKind::FunctionDef(def) = &parsed.statements[0].kind else {
            panic!("expected def");
        };
        match &def.body[0].kind {
            StmtKind::Assign { targets, .. } => {
                assert!(matches!(
                    &targets[0],
                    AssignTarget::Attribute { base, attr } if base == "this" && attr == "count"
                ));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn test_loop_context_for_of() {
        let source = indoc! {"
            for (const item of items) {
                total += item;
            }
        "};
        let parsed = parse_js(source);
        assert!(parsed
            .statements
            .iter()
            .all(|s| s.context == ControlContext::Loop));
        assert!(parsed
            .statements
            .iter()
            .any(|s| matches!(s.kind, StmtKind::AugAssign { .. })));
    }

    #[test]
    fn test_template_string_interpolation() {
        let parsed = parse_js("const msg = `value ${x}`;\n");
        match &parsed.statements[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value, Expr::Interpolation { parts } if parts.len() == 1));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_is_null_like() {
        let parsed = parse_js("let v = undefined;\n");
        match &parsed.statements[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value, Expr::Literal(LiteralKind::Null)));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error_reported() {
        let result =
            TypeScriptAdapter::new(Language::JavaScript).parse("function {", Path::new("bad.js"));
        assert!(matches!(result, Err(AnalysisError::Parse { .. })));
    }
}
