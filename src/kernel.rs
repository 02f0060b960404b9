// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel API: source text to geometry and meshes

use crate::builtins;
use crate::compiler::Compiler;
use crate::config::Config;
use crate::geometry::{union, Geometry, Mesh};
use crate::io::{parse_scad, read_scad_file};
use crate::ir::{Program, SourcePos};
use crate::runtime::{CallSite, Interpreter};
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Parse, compile, evaluate and mesh in one place
pub struct Kernel {
    interpreter: Interpreter,
}

impl Kernel {
    /// Kernel with default configuration; diagnostics go to `tracing`
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            interpreter: Interpreter::new().with_config(config),
        }
    }

    /// Kernel around a configured interpreter (custom sink, fonts or builtins)
    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    pub fn config(&self) -> &Config {
        self.interpreter.config()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Parse and compile source text
    pub fn compile(&self, source: &str) -> Result<Program> {
        let tree = parse_scad(source).context("Failed to parse source")?;
        let mut compiler = Compiler::for_registry(self.interpreter.registry());
        let program = compiler.compile(&tree).context("Failed to compile source")?;
        if !compiler.issues().is_empty() {
            debug!(issues = compiler.issues().len(), "compiled with skipped statements");
        }
        Ok(program)
    }

    /// Every top-level geometry of `source`, in order
    pub fn evaluate(&self, source: &str) -> Result<Vec<Geometry>> {
        let program = self.compile(source)?;
        let geometries = self
            .interpreter
            .evaluate_all(&program)
            .context("Evaluation failed")?;
        debug!(count = geometries.len(), "evaluated program");
        Ok(geometries)
    }

    /// Top-level geometry reduced with the union rule; `None` if the
    /// program yields nothing
    pub fn render(&self, source: &str) -> Result<Option<Geometry>> {
        let geometries = self.evaluate(source)?;
        let site = CallSite::new("<root>", SourcePos::new(1, 1));
        let k = self.config().smoothing.union;
        let geometry = builtins::reduce(&site, &geometries, k, union)
            .context("Failed to combine top-level geometry")?;
        Ok(geometry)
    }

    /// Render `source` and mesh the result
    pub fn mesh(&self, source: &str) -> Result<Mesh> {
        let Some(geometry) = self.render(source)? else {
            bail!("Program produced no geometry");
        };
        let mesh = Mesh::generate(&geometry, &self.config().mesh).context("Meshing failed")?;
        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "meshed geometry"
        );
        Ok(mesh)
    }

    /// Read a .scad file, render it and mesh the result
    pub fn mesh_file(&self, path: impl AsRef<Path>) -> Result<Mesh> {
        let source = read_scad_file(path)?;
        self.mesh(&source)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;
    use crate::error::RuntimeError;

    fn kernel() -> Kernel {
        Kernel::with_config(Config {
            mesh: MeshConfig {
                resolution: 16,
                ..MeshConfig::default()
            },
            ..Config::default()
        })
    }

    #[test]
    fn test_render_unions_top_level() -> Result<()> {
        let geometry = kernel().render("sphere(1); translate([3, 0, 0]) sphere(1);")?;
        assert!(geometry.is_some_and(|g| g.is_3d()));
        assert!(kernel().render("x = 1;")?.is_none());
        Ok(())
    }

    #[test]
    fn test_mesh_empty_program_fails() {
        assert!(kernel().mesh("").is_err());
    }

    #[test]
    fn test_mixed_top_level_is_dimension_mismatch() {
        let err = kernel().render("sphere(1); square(1);").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RuntimeError>(),
            Some(RuntimeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_mesh_cube() -> Result<()> {
        let mesh = kernel().mesh("cube(10, center = true);")?;
        assert!(mesh.is_closed_manifold());
        assert!((mesh.volume() - 1000.0).abs() / 1000.0 < 0.1);
        Ok(())
    }
}
