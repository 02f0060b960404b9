// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SCAD file importer

use super::parser::ParseNode;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a .scad file
pub fn read_scad_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).with_context(|| format!("Failed to read SCAD file: {}", path.display()))
}

/// Import a .scad file and parse it into a parse tree
pub fn import_scad_file(path: impl AsRef<Path>) -> Result<ParseNode> {
    let path = path.as_ref();
    let source = read_scad_file(path)?;
    super::parse_scad(&source)
        .with_context(|| format!("Failed to parse SCAD file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_scad_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "cube([10, 10, 10]);")?;

        let tree = import_scad_file(file.path())?;
        assert!(tree.is("program"));

        Ok(())
    }

    #[test]
    fn test_import_reports_syntax_errors() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "cube([10, 10, 10];")?;

        let err = import_scad_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("syntax error"));

        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(import_scad_file("/nonexistent/model.scad").is_err());
    }
}
