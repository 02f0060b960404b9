// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error taxonomy for parsing, compilation, evaluation and meshing

use crate::ir::SourcePos;
use std::fmt;
use thiserror::Error;

/// Result type alias using the crate's umbrella error
pub type Result<T> = std::result::Result<T, Error>;

/// Source text could not be parsed
#[derive(Debug, Clone, Error, PartialEq)]
#[error("syntax error at {pos}: {message}")]
pub struct ParseError {
    pub pos: SourcePos,
    pub message: String,
}

/// Errors raised while lowering a parse tree into IR
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// The parse tree holds a node kind the compiler has no rule for
    #[error("no compiler rule for parse node `{kind}` at {pos}")]
    SyntaxMapping { kind: String, pos: SourcePos },

    /// Duplicate parameter or keyword argument
    #[error("argument binding error at {pos}: {message}")]
    ArgumentBinding { message: String, pos: SourcePos },

    /// A known node kind without the children its rule expects
    #[error("malformed `{kind}` node at {pos}: {message}")]
    Malformed {
        kind: String,
        message: String,
        pos: SourcePos,
    },
}

impl CompileError {
    pub fn pos(&self) -> SourcePos {
        match self {
            Self::SyntaxMapping { pos, .. }
            | Self::ArgumentBinding { pos, .. }
            | Self::Malformed { pos, .. } => *pos,
        }
    }
}

/// What kind of callable a failed lookup was searching for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Operator,
    Function,
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => f.write_str("operator"),
            Self::Function => f.write_str("function"),
        }
    }
}

fn at(pos: &Option<SourcePos>) -> String {
    pos.map(|p| format!(" at {}", p)).unwrap_or_default()
}

/// Errors that abort an evaluation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("undefined variable `{name}`{}", at(.pos))]
    Name {
        name: String,
        pos: Option<SourcePos>,
    },

    #[error("unknown {kind} `{name}`{}", at(.pos))]
    Lookup {
        kind: CallableKind,
        name: String,
        pos: Option<SourcePos>,
    },

    #[error("cannot bind arguments of `{callee}`: {message}{}", at(.pos))]
    ArgumentBinding {
        callee: String,
        message: String,
        pos: Option<SourcePos>,
    },

    #[error("`{operator}` cannot combine 2-D and 3-D geometry{}", at(.pos))]
    DimensionMismatch {
        operator: String,
        pos: Option<SourcePos>,
    },

    #[error("children of `{operator}` consumed more than once{}", at(.pos))]
    Reuse {
        operator: String,
        pos: Option<SourcePos>,
    },

    #[error("`{name}` exceeded the recursion limit of {limit}{}", at(.pos))]
    RecursionLimit {
        name: String,
        limit: usize,
        pos: Option<SourcePos>,
    },

    #[error("invalid argument to `{callee}`: {message}{}", at(.pos))]
    InvalidArgument {
        callee: String,
        message: String,
        pos: Option<SourcePos>,
    },

    #[error("`{callee}` could not resolve a font: {message}{}", at(.pos))]
    Font {
        callee: String,
        message: String,
        pos: Option<SourcePos>,
    },
}

impl RuntimeError {
    pub fn pos(&self) -> Option<SourcePos> {
        match self {
            Self::Name { pos, .. }
            | Self::Lookup { pos, .. }
            | Self::ArgumentBinding { pos, .. }
            | Self::DimensionMismatch { pos, .. }
            | Self::Reuse { pos, .. }
            | Self::RecursionLimit { pos, .. }
            | Self::InvalidArgument { pos, .. }
            | Self::Font { pos, .. } => *pos,
        }
    }

    /// Attach a position if the error does not carry one yet
    pub fn or_at(mut self, at: SourcePos) -> Self {
        let slot = match &mut self {
            Self::Name { pos, .. }
            | Self::Lookup { pos, .. }
            | Self::ArgumentBinding { pos, .. }
            | Self::DimensionMismatch { pos, .. }
            | Self::Reuse { pos, .. }
            | Self::RecursionLimit { pos, .. }
            | Self::InvalidArgument { pos, .. }
            | Self::Font { pos, .. } => pos,
        };
        slot.get_or_insert(at);
        self
    }
}

/// Errors raised while turning geometry into a mesh
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("cannot mesh 2-D geometry; extrude it first")]
    NotSolid,

    #[error("geometry has unbounded or empty extent")]
    Unbounded,

    #[error("mesh resolution must be at least 2, got {0}")]
    Resolution(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the high-level entry points
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}
