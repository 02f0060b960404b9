// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - SDF shapes, bounds and mesh extraction

mod bbox;
mod mesh;
mod mesher;
mod sdf;
mod shape;

pub use bbox::BoundingBox;
pub use mesh::{Mesh, Triangle, Vertex};
pub use shape::{
    blend, difference, extrude, intersection, make_box, make_circle, make_cylinder_frustum,
    make_rectangle, make_sphere, make_text, mirror, rotate_x, rotate_y, rotate_z, scale, shell,
    translate, union, Dimension, Geometry, GlyphCell, Shape,
};
