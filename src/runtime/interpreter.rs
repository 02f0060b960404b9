// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Public entry point of the runtime

use super::evaluator::Evaluation;
use super::registry::Registry;
use super::stream::GeometryStream;
use crate::config::Config;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::RuntimeError;
use crate::fonts::{FontCache, FontResolver};
use crate::geometry::Geometry;
use crate::ir::Program;
use std::rc::Rc;
use tracing::debug;

/// Evaluates IR programs into geometry streams.
///
/// Every call to [`evaluate`](Self::evaluate) starts from a fresh scope
/// arena. The interpreter itself can be reused.
pub struct Interpreter {
    registry: Rc<Registry>,
    config: Rc<Config>,
    diagnostics: Rc<dyn DiagnosticsSink>,
    fonts: Option<Rc<dyn FontResolver>>,
}

impl Interpreter {
    /// Interpreter with the builtin tables, default configuration and
    /// diagnostics forwarded to `tracing`
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry::with_builtins()),
            config: Rc::new(Config::default()),
            diagnostics: Rc::new(TracingSink),
            fonts: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Rc::new(config);
        self
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Rc::new(sink);
        self
    }

    /// Font resolver used by `text`; defaults to a cache over
    /// `config.fonts.cache_dir`
    pub fn with_fonts(mut self, fonts: impl FontResolver + 'static) -> Self {
        self.fonts = Some(Rc::new(fonts));
        self
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Rc::new(registry);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lazily evaluate `program`. Nothing runs until the stream is pulled.
    pub fn evaluate(&self, program: &Program) -> GeometryStream {
        debug!(statements = program.len(), "evaluating program");
        let fonts = match &self.fonts {
            Some(fonts) => fonts.clone(),
            None => Rc::new(FontCache::from_settings(&self.config.fonts)),
        };
        let evaluation = Evaluation::new(
            self.registry.clone(),
            self.config.clone(),
            self.diagnostics.clone(),
            fonts,
        );
        evaluation.run(program)
    }

    /// Evaluate `program` to completion
    pub fn evaluate_all(&self, program: &Program) -> Result<Vec<Geometry>, RuntimeError> {
        self.evaluate(program).collect_all()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
