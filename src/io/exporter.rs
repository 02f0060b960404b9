// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL export

use crate::geometry::Mesh;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

fn stl_triangles(mesh: &Mesh) -> Vec<StlTriangle> {
    mesh.triangles
        .iter()
        .map(|tri| {
            let [v0, v1, v2] = mesh.triangle_positions(tri);
            let normal = mesh.face_normal(tri);
            let vertex = |p: nalgebra::Point3<f64>| StlVertex::new([p.x as f32, p.y as f32, p.z as f32]);

            StlTriangle {
                normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [vertex(v0), vertex(v1), vertex(v2)],
            }
        })
        .collect()
}

/// Write `mesh` as binary STL
pub fn write_stl(mesh: &Mesh, writer: &mut impl Write) -> Result<()> {
    let triangles = stl_triangles(mesh);
    stl_io::write_stl(writer, triangles.iter()).context("Failed to write STL data")?;
    Ok(())
}

/// Export `mesh` to a binary STL file
pub fn export_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create STL file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_stl(mesh, &mut writer)?;
    writer.flush().context("Failed to flush STL file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;
    use crate::geometry::make_sphere;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_stl() -> Result<()> {
        let config = MeshConfig {
            resolution: 12,
            ..MeshConfig::default()
        };
        let mesh = Mesh::generate(&make_sphere(5.0), &config)?;

        let file = NamedTempFile::new()?;
        export_stl(&mesh, file.path())?;

        let mut reader = std::fs::File::open(file.path())?;
        let stl = stl_io::read_stl(&mut reader)?;
        assert_eq!(stl.faces.len(), mesh.triangle_count());

        Ok(())
    }

    #[test]
    fn test_write_stl_binary_size() -> Result<()> {
        let config = MeshConfig {
            resolution: 8,
            ..MeshConfig::default()
        };
        let mesh = Mesh::generate(&make_sphere(1.0), &config)?;
        let mut bytes = Vec::new();
        write_stl(&mesh, &mut bytes)?;
        // 80-byte header, triangle count, 50 bytes per triangle
        assert_eq!(bytes.len(), 84 + 50 * mesh.triangle_count());
        Ok(())
    }
}
