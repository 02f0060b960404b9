// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - parsing, importing, and exporting

mod exporter;
mod importer;
mod parser;

pub use exporter::{export_stl, write_stl};
pub use importer::{import_scad_file, read_scad_file};
pub use parser::{parse_scad, ParseNode};
