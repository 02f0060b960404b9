// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! sdfscad
//!
//! Compiles an OpenSCAD-style language into an intermediate representation
//! and evaluates it lazily into signed distance field geometry, which can be
//! meshed and exported as STL.

pub mod builtins;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod io;
pub mod ir;
pub mod kernel;
pub mod runtime;

pub use compiler::{compile, Compiler};
pub use config::Config;
pub use diagnostics::{DiagnosticsSink, Level, MemorySink, TracingSink};
pub use error::{CompileError, Error, MeshError, ParseError, RuntimeError};
pub use fonts::{FontCache, FontResolver};
pub use geometry::{Geometry, Mesh};
pub use io::{export_stl, import_scad_file, parse_scad};
pub use ir::Program;
pub use kernel::Kernel;
pub use runtime::{GeometryStream, Interpreter, Registry, Value};

use anyhow::Result;
use std::path::Path;

/// Render a SCAD script to a mesh with the default configuration
pub fn render(source: &str) -> Result<Mesh> {
    Kernel::new().mesh(source)
}

/// Render a SCAD file to a mesh
pub fn render_file(path: impl AsRef<Path>) -> Result<Mesh> {
    Kernel::new().mesh_file(path)
}
