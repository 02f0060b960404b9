// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! IR node definitions

use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Line/column of the source construct a node was lowered from (1-based)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// An ordered block of statements.
///
/// Blocks are shared by reference count so that lazily evaluated streams can
/// own the body they walk without borrowing from the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Program {
    statements: Rc<[Statement]>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements: statements.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single statement with its source position
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub pos: SourcePos,
}

impl Statement {
    pub fn new(kind: StatementKind, pos: SourcePos) -> Self {
        Self { kind, pos }
    }

    /// Module and function definitions are hoisted to the top of their block
    pub fn is_definition(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::ModuleDef(_) | StatementKind::FunctionDef(_)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum StatementKind {
    /// `name = value;` writes into the innermost frame
    Assign { name: String, value: Expr },
    /// Value-function call evaluated for its side effects only
    Expr(Expr),
    /// Operator invocation; yields geometry
    Invoke(Invocation),
    ModuleDef(Rc<ModuleDef>),
    FunctionDef(Rc<FunctionDef>),
    If {
        condition: Expr,
        then_body: Program,
        else_body: Program,
    },
    /// Cartesian product over all bindings, first binding outermost
    For {
        bindings: Vec<ForBinding>,
        body: Program,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<Argument>,
    pub body: Program,
}

/// Call-site argument; `name` is set for keyword arguments
#[derive(Debug, Clone, Serialize)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

/// Definition parameter; required parameters always precede defaulted ones
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Program,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Expr,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForBinding {
    pub name: String,
    pub iterable: Expr,
}

#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: SourcePos,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: SourcePos) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Bool(bool),
    Undef,
    Variable(String),
    Vector(Vec<Expr>),
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `[start : stop]` or `[start : step : stop]`
    Range {
        start: Box<Expr>,
        step: Option<Box<Expr>>,
        stop: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Argument>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}
