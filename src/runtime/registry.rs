// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Name-keyed operator and function tables
//!
//! The [`Registry`] holds the builtins. User definitions live in scope
//! frames as the `Module`/`User` variants of the same enums and shadow the
//! registry while their frame is alive.

use super::binding::Arguments;
use super::children::ChildrenProvider;
use super::scope::FrameId;
use super::stream::GeometryStream;
use super::value::Value;
use crate::config::Config;
use crate::diagnostics::{DiagnosticsSink, Level};
use crate::error::RuntimeError;
use crate::fonts::FontResolver;
use crate::ir::{FunctionDef, ModuleDef, SourcePos};
use ahash::AHashMap;
use std::fmt;
use std::rc::Rc;

/// Second stage of an operator call: consumes the children
pub type OperatorEvaluator = Box<dyn FnOnce(ChildrenProvider) -> Result<GeometryStream, RuntimeError>>;

/// First stage of an operator call: validates arguments
pub type OperatorFactory = fn(&CallContext<'_>, &Arguments) -> Result<OperatorEvaluator, RuntimeError>;

pub type PureFunction = fn(&CallContext<'_>, &Arguments) -> Result<Value, RuntimeError>;

/// A user module together with the frame it was defined in
pub struct ModuleClosure {
    pub(crate) def: Rc<ModuleDef>,
    pub(crate) frame: FrameId,
}

/// A user function together with the frame it was defined in
pub struct FunctionClosure {
    pub(crate) def: Rc<FunctionDef>,
    pub(crate) frame: FrameId,
}

#[derive(Clone)]
pub enum Operator {
    Builtin(OperatorFactory),
    Module(Rc<ModuleClosure>),
}

#[derive(Clone)]
pub enum Function {
    Builtin(PureFunction),
    User(Rc<FunctionClosure>),
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Builtin(_) => f.write_str("Operator::Builtin"),
            Operator::Module(m) => write!(f, "Operator::Module({})", m.def.name),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(_) => f.write_str("Function::Builtin"),
            Function::User(c) => write!(f, "Function::User({})", c.def.name),
        }
    }
}

/// Builtin operator and function tables
#[derive(Clone, Default)]
pub struct Registry {
    operators: AHashMap<String, OperatorFactory>,
    functions: AHashMap<String, PureFunction>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every builtin operator and function
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register(&mut registry);
        registry
    }

    pub fn register_operator(&mut self, name: &str, factory: OperatorFactory) {
        self.operators.insert(name.to_string(), factory);
    }

    pub fn register_function(&mut self, name: &str, function: PureFunction) {
        self.functions.insert(name.to_string(), function);
    }

    pub fn operator(&self, name: &str) -> Option<Operator> {
        self.operators.get(name).map(|f| Operator::Builtin(*f))
    }

    pub fn function(&self, name: &str) -> Option<Function> {
        self.functions.get(name).map(|f| Function::Builtin(*f))
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

/// Name and position of a call, kept by evaluators for error reporting
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub name: String,
    pub pos: SourcePos,
}

impl CallSite {
    pub fn new(name: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }

    pub fn reuse(&self) -> RuntimeError {
        RuntimeError::Reuse {
            operator: self.name.clone(),
            pos: Some(self.pos),
        }
    }

    pub fn dimension_mismatch(&self) -> RuntimeError {
        RuntimeError::DimensionMismatch {
            operator: self.name.clone(),
            pos: Some(self.pos),
        }
    }

    pub fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::InvalidArgument {
            callee: self.name.clone(),
            message: message.into(),
            pos: Some(self.pos),
        }
    }
}

/// Everything a builtin may use while handling a call
pub struct CallContext<'a> {
    site: CallSite,
    config: &'a Config,
    diagnostics: &'a dyn DiagnosticsSink,
    fonts: &'a dyn FontResolver,
}

impl<'a> CallContext<'a> {
    pub fn new(
        site: CallSite,
        config: &'a Config,
        diagnostics: &'a dyn DiagnosticsSink,
        fonts: &'a dyn FontResolver,
    ) -> Self {
        Self {
            site,
            config,
            diagnostics,
            fonts,
        }
    }

    pub fn name(&self) -> &str {
        &self.site.name
    }

    pub fn pos(&self) -> SourcePos {
        self.site.pos
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn fonts(&self) -> &dyn FontResolver {
        self.fonts
    }

    pub fn emit(&self, level: Level, message: &str) {
        self.diagnostics.emit(level, message);
    }

    /// Warning tagged with the callee and source position
    pub fn warn(&self, message: impl fmt::Display) {
        self.diagnostics.emit(
            Level::Warning,
            &format!("{}: {} at {}", self.site.name, message, self.site.pos),
        );
    }

    pub fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        self.site.invalid(message)
    }

    /// Warn about keyword arguments the callee does not know.
    /// `$`-prefixed special variables are always accepted.
    pub fn check_keywords(&self, args: &Arguments, known: &[&str]) {
        for (name, _) in args.named() {
            if !name.starts_with('$') && !known.contains(&name.as_str()) {
                self.warn(format_args!("ignoring unknown argument `{}`", name));
            }
        }
    }
}
