// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Compiler - lowers a parse tree into the IR
//!
//! Lowering is pure and deterministic. Per block it:
//! - hoists module and function definitions ahead of the other statements
//!   (source order is kept within each group);
//! - turns a statement-level call to a known value function into a
//!   non-yielding expression statement, and every other call into an
//!   operator invocation that owns its nested block as a body;
//! - orders definition parameters required-first;
//! - rejects duplicate parameters and duplicate keyword arguments.
//!
//! Unknown node kinds are logged, recorded in [`Compiler::issues`] and
//! skipped. An error inside a nested block drops the statement that owns the
//! block and compilation of the parent continues. Errors in statements
//! directly at the program root fail the compilation.

mod expr;

use crate::error::CompileError;
use crate::io::ParseNode;
use crate::ir::{
    Argument, Expr, ExprKind, ForBinding, FunctionDef, Invocation, ModuleDef, Param, Program,
    Statement, StatementKind,
};
use crate::runtime::Registry;
use ahash::AHashSet;
use std::rc::Rc;
use tracing::{debug, warn};

/// Compile a parse tree against the builtin tables
pub fn compile(tree: &ParseNode) -> Result<Program, CompileError> {
    Compiler::new().compile(tree)
}

/// Names defined by a block
#[derive(Debug, Default, Clone)]
struct KnownNames {
    functions: AHashSet<String>,
    operators: AHashSet<String>,
}

/// Where a statement failure originated
enum Failure {
    /// In the statement itself; aborts the enclosing block
    Here(CompileError),
    /// Inside a nested block owned by the statement; drops only the statement
    Nested(CompileError),
}

impl From<CompileError> for Failure {
    fn from(err: CompileError) -> Self {
        Failure::Here(err)
    }
}

/// Parse tree to IR compiler
pub struct Compiler {
    builtin_functions: AHashSet<String>,
    scopes: Vec<KnownNames>,
    issues: Vec<CompileError>,
}

impl Compiler {
    /// Compiler aware of the default builtin function table
    pub fn new() -> Self {
        Self::for_registry(&Registry::with_builtins())
    }

    /// Compiler aware of the names registered in `registry`
    pub fn for_registry(registry: &Registry) -> Self {
        Self {
            builtin_functions: registry.function_names().map(str::to_string).collect(),
            scopes: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Non-fatal problems recorded during the last compilation
    pub fn issues(&self) -> &[CompileError] {
        &self.issues
    }

    pub fn compile(&mut self, tree: &ParseNode) -> Result<Program, CompileError> {
        self.issues.clear();
        self.scopes.clear();

        let nodes: &[ParseNode] = if tree.is("program") {
            &tree.children
        } else {
            std::slice::from_ref(tree)
        };

        let program = self.lower_block(nodes, 0)?;
        debug!(
            statements = program.len(),
            issues = self.issues.len(),
            "compiled program"
        );
        Ok(program)
    }

    fn record(&mut self, err: CompileError) {
        warn!("{}", err);
        self.issues.push(err);
    }

    fn is_known_function(&self, name: &str) -> bool {
        self.builtin_functions.contains(name)
            || self.scopes.iter().any(|s| s.functions.contains(name))
    }

    /// Modules defined in scope shadow value functions of the same name
    fn is_user_module(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.operators.contains(name))
    }

    /// Lower one block. Returns `Err` only for failures at this block's own
    /// level; nested failures have already been recorded and their owning
    /// statements dropped.
    fn lower_block(&mut self, nodes: &[ParseNode], depth: usize) -> Result<Program, CompileError> {
        let mut known = KnownNames::default();
        scan_definitions(nodes, &mut known);
        self.scopes.push(known);

        let result = self.lower_statements(nodes, depth);
        self.scopes.pop();

        let statements = result?;
        let (mut hoisted, rest): (Vec<_>, Vec<_>) =
            statements.into_iter().partition(Statement::is_definition);
        hoisted.extend(rest);
        Ok(Program::new(hoisted))
    }

    fn lower_statements(
        &mut self,
        nodes: &[ParseNode],
        depth: usize,
    ) -> Result<Vec<Statement>, CompileError> {
        let mut out = Vec::new();
        for node in nodes {
            match self.lower_statement(node, depth) {
                Ok(mut lowered) => out.append(&mut lowered),
                Err(Failure::Nested(err)) => {
                    warn!(
                        kind = %node.kind,
                        pos = %node.pos,
                        "dropping statement whose nested block failed to compile"
                    );
                    self.record(err);
                }
                Err(Failure::Here(err)) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Lower a nested block owned by a statement at `depth`
    fn lower_body(&mut self, node: &ParseNode, depth: usize) -> Result<Program, Failure> {
        let nodes = if node.is("block") {
            node.children.as_slice()
        } else {
            std::slice::from_ref(node)
        };
        self.lower_block(nodes, depth + 1).map_err(Failure::Nested)
    }

    fn lower_statement(&mut self, node: &ParseNode, depth: usize) -> Result<Vec<Statement>, Failure> {
        let pos = node.pos;
        let kind = match node.kind.as_str() {
            "empty_stmt" => return Ok(Vec::new()),
            // Bare blocks group statements without introducing a scope
            "block" => return self.lower_statements(&node.children, depth).map_err(Failure::Here),
            "assignment" => {
                let name = ident(node)?;
                let value = self.lower_expr(required(node, "expr")?)?;
                StatementKind::Assign { name, value }
            }
            "module_def" => {
                let name = ident(node)?;
                let params = self.lower_params(node)?;
                let body = self.lower_body(last_child(node)?, depth)?;
                StatementKind::ModuleDef(Rc::new(ModuleDef { name, params, body }))
            }
            "function_def" => {
                let name = ident(node)?;
                let params = self.lower_params(node)?;
                let body = self.lower_expr(required(node, "expr")?)?;
                StatementKind::FunctionDef(Rc::new(FunctionDef { name, params, body }))
            }
            "if_stmt" => {
                let condition = self.lower_expr(required(node, "expr")?)?;
                let branches: Vec<&ParseNode> = node.children.iter().skip(1).collect();
                let then_node = branches.first().ok_or_else(|| malformed(node, "missing branch"))?;
                let then_body = self.lower_body(then_node, depth)?;
                let else_body = match branches.get(1) {
                    Some(else_node) => self.lower_body(else_node, depth)?,
                    None => Program::empty(),
                };
                StatementKind::If {
                    condition,
                    then_body,
                    else_body,
                }
            }
            "for_stmt" => {
                let mut bindings = Vec::new();
                for binding in node.children.iter().filter(|c| c.is("for_binding")) {
                    bindings.push(ForBinding {
                        name: ident(binding)?,
                        iterable: self.lower_expr(required(binding, "expr")?)?,
                    });
                }
                if bindings.is_empty() {
                    return Err(malformed(node, "no loop variables").into());
                }
                let body = self.lower_body(last_child(node)?, depth)?;
                StatementKind::For { bindings, body }
            }
            "operator_call" => {
                if let Some(modifier) = node.child("modifier") {
                    // `*` disables a subtree, `%` marks it as background only
                    if modifier.text == "*" || modifier.text == "%" {
                        debug!(pos = %pos, modifier = %modifier.text, "skipping modified statement");
                        return Ok(Vec::new());
                    }
                }
                let name = ident(node)?;
                let args = self.lower_args(required(node, "call_args")?)?;
                let body = self.lower_body(last_child(node)?, depth)?;

                if body.is_empty() && self.is_known_function(&name) && !self.is_user_module(&name) {
                    StatementKind::Expr(Expr::new(ExprKind::Call { name, args }, pos))
                } else {
                    StatementKind::Invoke(Invocation { name, args, body })
                }
            }
            other => {
                self.record(CompileError::SyntaxMapping {
                    kind: other.to_string(),
                    pos,
                });
                return Ok(Vec::new());
            }
        };
        Ok(vec![Statement::new(kind, pos)])
    }

    fn lower_params(&mut self, node: &ParseNode) -> Result<Vec<Param>, CompileError> {
        let Some(params) = node.child("params") else {
            return Ok(Vec::new());
        };

        let mut seen = AHashSet::new();
        let mut required_params = Vec::new();
        let mut defaulted = Vec::new();
        for param in params.children.iter().filter(|c| c.is("param")) {
            let name = ident(param)?;
            if !seen.insert(name.clone()) {
                return Err(CompileError::ArgumentBinding {
                    message: format!("duplicate parameter `{}`", name),
                    pos: param.pos,
                });
            }
            match param.child("expr") {
                Some(default) => defaulted.push(Param {
                    name,
                    default: Some(self.lower_expr(default)?),
                }),
                None => required_params.push(Param { name, default: None }),
            }
        }
        required_params.extend(defaulted);
        Ok(required_params)
    }

    fn lower_args(&mut self, node: &ParseNode) -> Result<Vec<Argument>, CompileError> {
        let mut seen = AHashSet::new();
        let mut args = Vec::new();
        for arg in node.children.iter().filter(|c| c.is("argument")) {
            let inner = arg
                .children
                .first()
                .ok_or_else(|| malformed(arg, "empty argument"))?;
            if inner.is("named_arg") {
                let name = ident(inner)?;
                if !seen.insert(name.clone()) {
                    return Err(CompileError::ArgumentBinding {
                        message: format!("keyword argument `{}` given more than once", name),
                        pos: inner.pos,
                    });
                }
                let value = self.lower_expr(required(inner, "expr")?)?;
                args.push(Argument {
                    name: Some(name),
                    value,
                });
            } else {
                args.push(Argument {
                    name: None,
                    value: self.lower_expr(inner)?,
                });
            }
        }
        Ok(args)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect definition names of a block, looking through bare nested blocks
fn scan_definitions(nodes: &[ParseNode], known: &mut KnownNames) {
    for node in nodes {
        match node.kind.as_str() {
            "module_def" => {
                if let Some(name) = node.child("ident") {
                    known.operators.insert(name.text.clone());
                }
            }
            "function_def" => {
                if let Some(name) = node.child("ident") {
                    known.functions.insert(name.text.clone());
                }
            }
            "block" => scan_definitions(&node.children, known),
            _ => {}
        }
    }
}

fn malformed(node: &ParseNode, message: &str) -> CompileError {
    CompileError::Malformed {
        kind: node.kind.clone(),
        message: message.to_string(),
        pos: node.pos,
    }
}

fn required<'a>(node: &'a ParseNode, kind: &str) -> Result<&'a ParseNode, CompileError> {
    node.child(kind)
        .ok_or_else(|| malformed(node, &format!("missing `{}`", kind)))
}

fn ident(node: &ParseNode) -> Result<String, CompileError> {
    required(node, "ident").map(|n| n.text.clone())
}

fn last_child(node: &ParseNode) -> Result<&ParseNode, CompileError> {
    node.children
        .last()
        .ok_or_else(|| malformed(node, "missing body"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_scad;
    use crate::ir::{ExprKind, SourcePos};

    fn compile_src(source: &str) -> Program {
        compile(&parse_scad(source).unwrap()).unwrap()
    }

    #[test]
    fn test_definitions_are_hoisted() {
        let program = compile_src("x = f(1); sphere(x); function f(a) = a; module m() {}");
        let kinds: Vec<_> = program
            .statements()
            .iter()
            .map(|s| match &s.kind {
                StatementKind::FunctionDef(_) => "function",
                StatementKind::ModuleDef(_) => "module",
                StatementKind::Assign { .. } => "assign",
                StatementKind::Invoke(_) => "invoke",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["function", "module", "assign", "invoke"]);
    }

    #[test]
    fn test_value_function_call_is_expression_statement() {
        let program = compile_src("echo(1); function g() = 2; g(); cube(1);");
        let stmts = program.statements();
        assert!(matches!(stmts[1].kind, StatementKind::Expr(_)));
        assert!(matches!(stmts[2].kind, StatementKind::Expr(_)));
        assert!(matches!(stmts[3].kind, StatementKind::Invoke(_)));
    }

    #[test]
    fn test_unknown_call_is_invocation() {
        let program = compile_src("mystery(1);");
        assert!(matches!(
            program.statements()[0].kind,
            StatementKind::Invoke(_)
        ));
    }

    #[test]
    fn test_invocation_owns_body() {
        let program = compile_src("union() { cube(1); sphere(2); }");
        match &program.statements()[0].kind {
            StatementKind::Invoke(inv) => {
                assert_eq!(inv.name, "union");
                assert_eq!(inv.body.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parameters_are_ordered_required_first() {
        let program = compile_src("module m(a = 1, b, c = 3, d) {}");
        match &program.statements()[0].kind {
            StatementKind::ModuleDef(def) => {
                let names: Vec<_> = def.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["b", "d", "a", "c"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_parameter_at_root_fails() {
        let tree = parse_scad("function f(a, a) = a;").unwrap();
        let err = compile(&tree).unwrap_err();
        assert!(matches!(err, CompileError::ArgumentBinding { .. }));
    }

    #[test]
    fn test_nested_error_drops_only_owning_statement() {
        let tree = parse_scad("union() { cube(size = 1, size = 2); } sphere(1);").unwrap();
        let mut compiler = Compiler::new();
        let program = compiler.compile(&tree).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(compiler.issues().len(), 1);
    }

    #[test]
    fn test_unknown_node_kind_is_skipped() {
        let pos = SourcePos::new(1, 1);
        let tree = ParseNode::new("program", "", pos).with_children(vec![
            ParseNode::new("teleport_stmt", "teleport;", pos),
            ParseNode::new("empty_stmt", ";", pos),
        ]);
        let mut compiler = Compiler::new();
        let program = compiler.compile(&tree).unwrap();
        assert!(program.is_empty());
        assert!(matches!(
            compiler.issues()[0],
            CompileError::SyntaxMapping { .. }
        ));
    }

    #[test]
    fn test_for_keeps_binding_order() {
        let program = compile_src("for (x = [1, 2], y = [3, 4]) cube(x);");
        match &program.statements()[0].kind {
            StatementKind::For { bindings, body } => {
                assert_eq!(bindings[0].name, "x");
                assert_eq!(bindings[1].name, "y");
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_disable_modifier_drops_statement() {
        let program = compile_src("*cube(1); sphere(1);");
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_positions_reach_ir() {
        let program = compile_src("\n\n   x = 1 + y;");
        let stmt = &program.statements()[0];
        assert_eq!(stmt.pos, SourcePos::new(3, 4));
        match &stmt.kind {
            StatementKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Binary { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
