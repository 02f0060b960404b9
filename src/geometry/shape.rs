// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SDF expression tree and the constructors the builtins build it with

use nalgebra::{Rotation3, Unit, Vector2, Vector3};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dimension {
    Two,
    Three,
}

/// One glyph cell of a text shape, in the text's local plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphCell {
    pub center: Vector2<f64>,
    pub half: Vector2<f64>,
}

/// Node of an SDF tree. 2-D shapes live in the XY plane and ignore `z`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Shape {
    Sphere {
        radius: f64,
    },
    /// Axis-aligned box centered on the origin
    Box {
        half: Vector3<f64>,
    },
    /// Capped cone along Z, centered on the origin
    Frustum {
        r1: f64,
        r2: f64,
        half_height: f64,
    },
    Circle {
        radius: f64,
    },
    Rectangle {
        half: Vector2<f64>,
    },
    Text {
        font: PathBuf,
        text: String,
        glyphs: Vec<GlyphCell>,
    },
    Union {
        a: Arc<Shape>,
        b: Arc<Shape>,
        k: f64,
    },
    Difference {
        a: Arc<Shape>,
        b: Arc<Shape>,
        k: f64,
    },
    Intersection {
        a: Arc<Shape>,
        b: Arc<Shape>,
        k: f64,
    },
    Blend {
        a: Arc<Shape>,
        b: Arc<Shape>,
        k: f64,
    },
    Translate {
        inner: Arc<Shape>,
        offset: Vector3<f64>,
    },
    Rotate {
        inner: Arc<Shape>,
        rotation: Rotation3<f64>,
    },
    Scale {
        inner: Arc<Shape>,
        factor: Vector3<f64>,
    },
    Mirror {
        inner: Arc<Shape>,
        normal: Unit<Vector3<f64>>,
    },
    /// 2-D profile swept along Z, centered on the origin
    Extrude {
        inner: Arc<Shape>,
        half_height: f64,
    },
    Shell {
        inner: Arc<Shape>,
        thickness: f64,
    },
}

/// Immutable, shareable handle to an SDF tree tagged with its dimension
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: Arc<Shape>,
    dimension: Dimension,
}

impl Geometry {
    fn new(shape: Shape, dimension: Dimension) -> Self {
        Self {
            shape: Arc::new(shape),
            dimension,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_2d(&self) -> bool {
        self.dimension == Dimension::Two
    }

    pub fn is_3d(&self) -> bool {
        self.dimension == Dimension::Three
    }

    /// Whether both handles share the same tree node
    pub fn ptr_eq(&self, other: &Geometry) -> bool {
        Arc::ptr_eq(&self.shape, &other.shape)
    }

    fn wrap(&self, build: impl FnOnce(Arc<Shape>) -> Shape) -> Geometry {
        Geometry {
            shape: Arc::new(build(self.shape.clone())),
            dimension: self.dimension,
        }
    }
}

impl Serialize for Geometry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.shape.serialize(serializer)
    }
}

pub fn make_sphere(radius: f64) -> Geometry {
    Geometry::new(Shape::Sphere { radius }, Dimension::Three)
}

/// Box of the given edge lengths, centered on the origin
pub fn make_box(size: Vector3<f64>) -> Geometry {
    Geometry::new(Shape::Box { half: size / 2.0 }, Dimension::Three)
}

/// Frustum with radius `r1` at the bottom and `r2` at the top, centered on the origin
pub fn make_cylinder_frustum(r1: f64, r2: f64, height: f64) -> Geometry {
    Geometry::new(
        Shape::Frustum {
            r1,
            r2,
            half_height: height / 2.0,
        },
        Dimension::Three,
    )
}

pub fn make_circle(radius: f64) -> Geometry {
    Geometry::new(Shape::Circle { radius }, Dimension::Two)
}

/// Rectangle of the given edge lengths, centered on the origin
pub fn make_rectangle(size: Vector2<f64>) -> Geometry {
    Geometry::new(Shape::Rectangle { half: size / 2.0 }, Dimension::Two)
}

/// Text laid out on the baseline starting at the origin.
///
/// Glyph outlines are approximated by one cell per visible character:
/// `height` is the cap height and `width` the advance of the whole string.
pub fn make_text(font: PathBuf, text: &str, height: f64, width: f64) -> Geometry {
    let count = text.chars().count().max(1) as f64;
    let advance = width / count;
    let glyphs = text
        .chars()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| GlyphCell {
            center: Vector2::new((i as f64 + 0.5) * advance, height / 2.0),
            half: Vector2::new(advance * 0.4, height / 2.0),
        })
        .collect();

    Geometry::new(
        Shape::Text {
            font,
            text: text.to_string(),
            glyphs,
        },
        Dimension::Two,
    )
}

pub fn union(a: &Geometry, b: &Geometry, k: f64) -> Geometry {
    combine(a, b, |a, b| Shape::Union { a, b, k })
}

pub fn difference(a: &Geometry, b: &Geometry, k: f64) -> Geometry {
    combine(a, b, |a, b| Shape::Difference { a, b, k })
}

pub fn intersection(a: &Geometry, b: &Geometry, k: f64) -> Geometry {
    combine(a, b, |a, b| Shape::Intersection { a, b, k })
}

/// Linear interpolation of two distance fields, `k = 0` is `a`, `k = 1` is `b`
pub fn blend(a: &Geometry, b: &Geometry, k: f64) -> Geometry {
    combine(a, b, |a, b| Shape::Blend { a, b, k })
}

fn combine(a: &Geometry, b: &Geometry, build: impl FnOnce(Arc<Shape>, Arc<Shape>) -> Shape) -> Geometry {
    Geometry {
        shape: Arc::new(build(a.shape.clone(), b.shape.clone())),
        dimension: a.dimension,
    }
}

/// Translate; the `z` component is dropped for 2-D geometry
pub fn translate(geometry: &Geometry, offset: Vector3<f64>) -> Geometry {
    let offset = match geometry.dimension {
        Dimension::Two => Vector3::new(offset.x, offset.y, 0.0),
        Dimension::Three => offset,
    };
    geometry.wrap(|inner| Shape::Translate { inner, offset })
}

pub fn rotate_x(geometry: &Geometry, radians: f64) -> Geometry {
    rotate(geometry, Rotation3::from_axis_angle(&Vector3::x_axis(), radians))
}

pub fn rotate_y(geometry: &Geometry, radians: f64) -> Geometry {
    rotate(geometry, Rotation3::from_axis_angle(&Vector3::y_axis(), radians))
}

pub fn rotate_z(geometry: &Geometry, radians: f64) -> Geometry {
    rotate(geometry, Rotation3::from_axis_angle(&Vector3::z_axis(), radians))
}

fn rotate(geometry: &Geometry, rotation: Rotation3<f64>) -> Geometry {
    geometry.wrap(|inner| Shape::Rotate { inner, rotation })
}

/// Per-axis scale. Factors must be non-zero.
pub fn scale(geometry: &Geometry, factor: Vector3<f64>) -> Geometry {
    let factor = match geometry.dimension {
        Dimension::Two => Vector3::new(factor.x, factor.y, 1.0),
        Dimension::Three => factor,
    };
    geometry.wrap(|inner| Shape::Scale { inner, factor })
}

/// Reflect across the plane through the origin with the given normal
pub fn mirror(geometry: &Geometry, normal: Unit<Vector3<f64>>) -> Geometry {
    geometry.wrap(|inner| Shape::Mirror { inner, normal })
}

/// Sweep a 2-D profile along Z, centered on the XY plane
pub fn extrude(profile: &Geometry, height: f64) -> Geometry {
    Geometry {
        shape: Arc::new(Shape::Extrude {
            inner: profile.shape.clone(),
            half_height: height / 2.0,
        }),
        dimension: Dimension::Three,
    }
}

/// Hollow out a shape, keeping a wall of `thickness` around its surface
pub fn shell(geometry: &Geometry, thickness: f64) -> Geometry {
    geometry.wrap(|inner| Shape::Shell { inner, thickness })
}
