// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Intermediate representation
//!
//! The compiler lowers a parse tree into these nodes; the runtime executes them.

mod node;

pub use node::{
    Argument, BinaryOp, CompareOp, Expr, ExprKind, ForBinding, FunctionDef, Invocation,
    ModuleDef, Param, Program, SourcePos, Statement, StatementKind,
};
