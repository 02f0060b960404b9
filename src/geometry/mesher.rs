// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Marching-tetrahedra surface extraction
//!
//! The distance field is sampled on a regular grid (in parallel), then every
//! grid cell is split into six tetrahedra sharing the cell's main diagonal.
//! Surface vertices are keyed by the grid edge they lie on, so neighbouring
//! cells share vertices and the result is a closed, manifold mesh.

use super::{BoundingBox, Geometry, Mesh, Triangle, Vertex};
use crate::config::MeshConfig;
use crate::error::MeshError;
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

/// Corner offsets of the six tetrahedra of a unit cell, all sharing the
/// diagonal from (0,0,0) to (1,1,1)
const TETRAHEDRA: [[[usize; 3]; 4]; 6] = [
    [[0, 0, 0], [1, 0, 0], [1, 1, 0], [1, 1, 1]],
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [1, 1, 1]],
    [[0, 0, 0], [0, 1, 0], [1, 1, 0], [1, 1, 1]],
    [[0, 0, 0], [0, 1, 0], [0, 1, 1], [1, 1, 1]],
    [[0, 0, 0], [0, 0, 1], [1, 0, 1], [1, 1, 1]],
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [1, 1, 1]],
];

struct Grid {
    origin: Point3<f64>,
    step: f64,
    dims: [usize; 3],
}

impl Grid {
    fn fit(bounds: &BoundingBox, config: &MeshConfig) -> Self {
        let size = bounds.size();
        let step = size.max() / config.resolution as f64;
        let padded = bounds.padded(step * config.margin.max(1.0));
        let extent = padded.size();
        let dims = [
            (extent.x / step).ceil() as usize + 1,
            (extent.y / step).ceil() as usize + 1,
            (extent.z / step).ceil() as usize + 1,
        ];
        Self {
            origin: padded.min,
            step,
            dims,
        }
    }

    fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    fn coords(&self, index: usize) -> [i64; 3] {
        let x = index % self.dims[0];
        let y = (index / self.dims[0]) % self.dims[1];
        let z = index / (self.dims[0] * self.dims[1]);
        [x as i64, y as i64, z as i64]
    }

    fn point(&self, index: usize) -> Point3<f64> {
        let [x, y, z] = self.coords(index);
        self.origin + Vector3::new(x as f64, y as f64, z as f64) * self.step
    }
}

/// Extract the zero level set of a 3-D geometry
pub(crate) fn extract(geometry: &Geometry, config: &MeshConfig) -> Result<Mesh, MeshError> {
    if !geometry.is_3d() {
        return Err(MeshError::NotSolid);
    }
    if config.resolution < 2 {
        return Err(MeshError::Resolution(config.resolution));
    }
    let bounds = geometry.bounds();
    if bounds.is_empty() || !bounds.is_finite() || bounds.size().max() <= 0.0 {
        return Err(MeshError::Unbounded);
    }

    let grid = Grid::fit(&bounds, config);
    let samples: Vec<f64> = (0..grid.len())
        .into_par_iter()
        .map(|i| geometry.distance(&grid.point(i)))
        .collect();
    debug!(
        dims = ?grid.dims,
        samples = samples.len(),
        "sampled distance field"
    );

    let mut builder = Builder {
        geometry,
        grid: &grid,
        samples: &samples,
        mesh: Mesh::new(),
        edge_vertices: AHashMap::new(),
    };

    for z in 0..grid.dims[2] - 1 {
        for y in 0..grid.dims[1] - 1 {
            for x in 0..grid.dims[0] - 1 {
                for tet in &TETRAHEDRA {
                    let corners = tet.map(|[dx, dy, dz]| grid.index(x + dx, y + dy, z + dz));
                    builder.polygonize(corners);
                }
            }
        }
    }

    let mesh = builder.mesh;
    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "extracted surface"
    );
    Ok(mesh)
}

struct Builder<'a> {
    geometry: &'a Geometry,
    grid: &'a Grid,
    samples: &'a [f64],
    mesh: Mesh,
    edge_vertices: AHashMap<(usize, usize), usize>,
}

impl Builder<'_> {
    fn polygonize(&mut self, corners: [usize; 4]) {
        let (inside, outside): (Vec<usize>, Vec<usize>) =
            corners.iter().copied().partition(|&c| self.samples[c] < 0.0);

        // Winding is decided from the grid corners, which never degenerate,
        // so neighbouring cells always agree on the orientation of shared edges
        match inside.len() {
            1 => {
                let i = inside[0];
                let outward = self.orientation(i, outside[0], outside[1], outside[2]) > 0;
                let tri = [
                    self.edge_vertex(i, outside[0]),
                    self.edge_vertex(i, outside[1]),
                    self.edge_vertex(i, outside[2]),
                ];
                self.emit(tri, outward);
            }
            3 => {
                let o = outside[0];
                let outward = self.orientation(o, inside[0], inside[1], inside[2]) < 0;
                let tri = [
                    self.edge_vertex(inside[0], o),
                    self.edge_vertex(inside[1], o),
                    self.edge_vertex(inside[2], o),
                ];
                self.emit(tri, outward);
            }
            2 => {
                let (a, b) = (inside[0], inside[1]);
                let (c, d) = (outside[0], outside[1]);
                let outward = self.quad_orientation(a, b, c, d) > 0;
                let ac = self.edge_vertex(a, c);
                let ad = self.edge_vertex(a, d);
                let bd = self.edge_vertex(b, d);
                let bc = self.edge_vertex(b, c);
                self.emit([ac, ad, bd], outward);
                self.emit([ac, bd, bc], outward);
            }
            _ => {}
        }
    }

    /// Sign of `det(a - p, b - p, c - p)` in grid units
    fn orientation(&self, p: usize, a: usize, b: usize, c: usize) -> i64 {
        let origin = self.grid.coords(p);
        let [u, v, w] = [a, b, c].map(|i| {
            let q = self.grid.coords(i);
            [q[0] - origin[0], q[1] - origin[1], q[2] - origin[2]]
        });
        det(u, v, w).signum()
    }

    /// Sign of `det(d - c, b - a, c - a)`, the winding of the section
    /// quad `ac, ad, bd, bc` relative to the inside pair `a, b`
    fn quad_orientation(&self, a: usize, b: usize, c: usize, d: usize) -> i64 {
        let [pa, pb, pc, pd] = [a, b, c, d].map(|i| self.grid.coords(i));
        let sub = |x: [i64; 3], y: [i64; 3]| [x[0] - y[0], x[1] - y[1], x[2] - y[2]];
        det(sub(pd, pc), sub(pb, pa), sub(pc, pa)).signum()
    }

    /// Vertex where the surface crosses the grid edge `a`-`b`
    fn edge_vertex(&mut self, a: usize, b: usize) -> usize {
        let key = (a.min(b), a.max(b));
        if let Some(&index) = self.edge_vertices.get(&key) {
            return index;
        }

        let (da, db) = (self.samples[key.0], self.samples[key.1]);
        let t = if da == db {
            0.5
        } else {
            (da / (da - db)).clamp(0.0, 1.0)
        };
        let pa = self.grid.point(key.0);
        let pb = self.grid.point(key.1);
        let position = pa + (pb - pa) * t;

        let gradient = self.geometry.gradient(&position, self.grid.step * 1e-3);
        let normal = gradient
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| (pb - pa).normalize());

        let index = self.mesh.add_vertex(Vertex::new(position, normal));
        self.edge_vertices.insert(key, index);
        index
    }

    fn emit(&mut self, tri: [usize; 3], outward: bool) {
        let indices = if outward {
            tri
        } else {
            [tri[0], tri[2], tri[1]]
        };
        self.mesh.add_triangle(Triangle::new(indices));
    }
}

fn det(u: [i64; 3], v: [i64; 3], w: [i64; 3]) -> i64 {
    u[0] * (v[1] * w[2] - v[2] * w[1]) - u[1] * (v[0] * w[2] - v[2] * w[0])
        + u[2] * (v[0] * w[1] - v[1] * w[0])
}
