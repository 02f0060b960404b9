// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh generation, content hashing and STL export

use anyhow::Result;
use sdfscad::config::MeshConfig;
use sdfscad::{io, Config, Kernel};
use std::fs::File;
use tempfile::NamedTempFile;

fn kernel(resolution: u32) -> Kernel {
    Kernel::with_config(Config {
        mesh: MeshConfig {
            resolution,
            ..MeshConfig::default()
        },
        ..Config::default()
    })
}

#[test]
fn test_sphere_mesh_hash_is_stable() -> Result<()> {
    let first = kernel(32).mesh("sphere(r=20);")?;
    let second = kernel(32).mesh("sphere(r=20);")?;

    assert!(first.is_closed_manifold());
    assert!(first.triangle_count() > 0);
    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(first.content_hash().len(), 64);

    // Volume of a radius 20 ball, within the sampling error of a coarse grid
    let expected = 4.0 / 3.0 * std::f64::consts::PI * 20.0_f64.powi(3);
    assert!((first.volume() - expected).abs() / expected < 0.1);
    Ok(())
}

#[test]
fn test_hash_changes_with_geometry() -> Result<()> {
    let small = kernel(24).mesh("sphere(r=10);")?;
    let moved = kernel(24).mesh("translate([1, 0, 0]) sphere(r=10);")?;
    assert_ne!(small.content_hash(), moved.content_hash());
    Ok(())
}

#[test]
fn test_difference_mesh_is_manifold() -> Result<()> {
    let mesh = kernel(40).mesh("difference() { cube(20, center = true); sphere(12); }")?;
    assert!(mesh.is_closed_manifold());
    assert!(mesh.volume() < 20.0_f64.powi(3));
    Ok(())
}

#[test]
fn test_stl_export_roundtrip() -> Result<()> {
    let mesh = kernel(24).mesh("cube(10);")?;

    let file = NamedTempFile::with_suffix(".stl")?;
    io::export_stl(&mesh, file.path())?;

    let metadata = std::fs::metadata(file.path())?;
    assert_eq!(metadata.len(), 84 + 50 * mesh.triangle_count() as u64);

    let mut reader = File::open(file.path())?;
    let imported = stl_io::read_stl(&mut reader)?;
    assert_eq!(imported.faces.len(), mesh.triangle_count());
    Ok(())
}

#[test]
fn test_render_file() -> Result<()> {
    let file = NamedTempFile::with_suffix(".scad")?;
    std::fs::write(file.path(), "module post(h) { cylinder(h, 1, 1); }\npost(5);\n")?;

    let mesh = kernel(24).mesh_file(file.path())?;
    let bounds = mesh.bounding_box();
    assert!(bounds.min.z > -0.5 && bounds.max.z < 5.5);
    Ok(())
}
