// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::{mesher, BoundingBox, Geometry};
use crate::config::MeshConfig;
use crate::error::MeshError;
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }
}

/// Triangle defined by three vertex indices, counter-clockwise seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Triangular mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    /// Triangulate the surface of a finished 3-D geometry
    pub fn generate(geometry: &Geometry, config: &MeshConfig) -> Result<Mesh, MeshError> {
        mesher::extract(geometry, config)
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of a triangle
    pub fn triangle_positions(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        triangle.indices.map(|i| self.vertices[i].position)
    }

    /// Unit face normal from the winding order
    pub fn face_normal(&self, triangle: &Triangle) -> Vector3<f64> {
        let [a, b, c] = self.triangle_positions(triangle);
        (b - a).cross(&(c - a)).try_normalize(0.0).unwrap_or_else(Vector3::zeros)
    }

    /// Signed volume enclosed by the surface; positive for outward winding
    pub fn volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.triangle_positions(t);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    /// Every edge is shared by exactly two triangles that traverse it in
    /// opposite directions
    pub fn is_closed_manifold(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }
        let mut directed: AHashMap<(usize, usize), u32> = AHashMap::new();
        for triangle in &self.triangles {
            let [a, b, c] = triangle.indices;
            for edge in [(a, b), (b, c), (c, a)] {
                *directed.entry(edge).or_insert(0) += 1;
            }
        }
        directed
            .iter()
            .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
    }

    /// SHA-256 hex digest over vertex positions and triangle indices in
    /// mesh order. Identical geometry meshed with the same settings always
    /// hashes the same.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.vertices.len() as u64).to_le_bytes());
        for vertex in &self.vertices {
            for c in vertex.position.iter() {
                hasher.update(c.to_le_bytes());
            }
        }
        hasher.update((self.triangles.len() as u64).to_le_bytes());
        for triangle in &self.triangles {
            for i in triangle.indices {
                hasher.update((i as u64).to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Merge with another mesh without any CSG
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles
                .push(Triangle::new(triangle.indices.map(|i| i + offset)));
        }
    }

    /// Recompute vertex normals as area-weighted face normals
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let [v0, v1, v2] = self.triangle_positions(triangle);
            // Cross product length is twice the area, which weights the sum
            let face_normal = (v1 - v0).cross(&(v2 - v0));
            for &idx in &triangle.indices {
                normal_sums[idx] += face_normal;
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(normal_sums) {
            vertex.normal = sum
                .try_normalize(1e-12)
                .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{make_box, make_sphere};

    fn tetrahedron() -> Mesh {
        let mut mesh = Mesh::new();
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ] {
            mesh.add_vertex(Vertex::new(p, Vector3::zeros()));
        }
        for indices in [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]] {
            mesh.add_triangle(Triangle::new(indices));
        }
        mesh
    }

    #[test]
    fn test_tetrahedron_properties() {
        let mut mesh = tetrahedron();
        assert!(mesh.is_closed_manifold());
        assert!((mesh.volume() - 1.0 / 6.0).abs() < 1e-12);

        mesh.recompute_normals();
        assert!(mesh.vertices.iter().all(|v| (v.normal.norm() - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_open_mesh_is_not_manifold() {
        let mut mesh = tetrahedron();
        mesh.triangles.pop();
        assert!(!mesh.is_closed_manifold());
    }

    #[test]
    fn test_generate_sphere() {
        let config = MeshConfig {
            resolution: 24,
            ..MeshConfig::default()
        };
        let mesh = Mesh::generate(&make_sphere(10.0), &config).unwrap();
        assert!(mesh.is_closed_manifold());

        let exact = 4.0 / 3.0 * std::f64::consts::PI * 1000.0;
        assert!((mesh.volume() - exact).abs() / exact < 0.05);

        let bounds = mesh.bounding_box();
        assert!(bounds.approx_eq(
            &BoundingBox::symmetric(Vector3::repeat(10.0)),
            1.0
        ));
    }

    #[test]
    fn test_content_hash_tracks_content() {
        let mesh = tetrahedron();
        assert_eq!(mesh.content_hash(), tetrahedron().content_hash());
        assert_eq!(mesh.content_hash().len(), 64);

        let mut moved = tetrahedron();
        moved.vertices[0].position.x += 1e-6;
        assert_ne!(mesh.content_hash(), moved.content_hash());
    }

    #[test]
    fn test_generate_box_outward_normals() {
        let config = MeshConfig {
            resolution: 16,
            ..MeshConfig::default()
        };
        let mesh = Mesh::generate(&make_box(Vector3::new(4.0, 4.0, 4.0)), &config).unwrap();
        assert!(mesh.volume() > 0.0);
        let outward = mesh
            .triangles
            .iter()
            .filter(|t| {
                let [a, b, c] = mesh.triangle_positions(t);
                let centroid = (a.coords + b.coords + c.coords) / 3.0;
                mesh.face_normal(t).dot(&centroid) > 0.0
            })
            .count();
        assert!(outward * 10 > mesh.triangle_count() * 9);
    }

    #[test]
    fn test_generate_rejects_flat_and_bad_resolution() {
        let square = crate::geometry::make_rectangle(nalgebra::Vector2::new(1.0, 1.0));
        assert!(matches!(
            Mesh::generate(&square, &MeshConfig::default()),
            Err(MeshError::NotSolid)
        ));

        let config = MeshConfig {
            resolution: 1,
            ..MeshConfig::default()
        };
        assert!(matches!(
            Mesh::generate(&make_sphere(1.0), &config),
            Err(MeshError::Resolution(1))
        ));
    }
}
