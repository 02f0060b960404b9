// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Distance evaluation and bounds of SDF trees

use super::shape::{Dimension, Geometry, GlyphCell, Shape};
use super::BoundingBox;
use nalgebra::{Point3, Vector2, Vector3};

impl Geometry {
    /// Signed distance from `p` to the surface, negative inside
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        distance(self.shape(), p)
    }

    /// Conservative axis-aligned bounds; 2-D shapes are flat in Z
    pub fn bounds(&self) -> BoundingBox {
        bounds(self.shape())
    }

    /// Central-difference gradient of the distance field
    pub fn gradient(&self, p: &Point3<f64>, eps: f64) -> Vector3<f64> {
        let dx = Vector3::new(eps, 0.0, 0.0);
        let dy = Vector3::new(0.0, eps, 0.0);
        let dz = Vector3::new(0.0, 0.0, eps);
        let g = Vector3::new(
            self.distance(&(p + dx)) - self.distance(&(p - dx)),
            self.distance(&(p + dy)) - self.distance(&(p - dy)),
            self.distance(&(p + dz)) - self.distance(&(p - dz)),
        );
        if self.dimension() == Dimension::Two {
            Vector3::new(g.x, g.y, 0.0)
        } else {
            g
        }
    }
}

fn distance(shape: &Shape, p: &Point3<f64>) -> f64 {
    match shape {
        Shape::Sphere { radius } => p.coords.norm() - radius,
        Shape::Box { half } => box_distance(&p.coords, half),
        Shape::Frustum {
            r1,
            r2,
            half_height,
        } => capped_cone(p, *half_height, *r1, *r2),
        Shape::Circle { radius } => p.xy().coords.norm() - radius,
        Shape::Rectangle { half } => rect_distance(&p.xy().coords, half),
        Shape::Text { glyphs, .. } => glyphs
            .iter()
            .map(|g| rect_distance(&(p.xy().coords - g.center), &g.half))
            .fold(f64::INFINITY, f64::min),
        Shape::Union { a, b, k } => smooth_union(distance(a, p), distance(b, p), *k),
        Shape::Difference { a, b, k } => smooth_subtract(distance(a, p), distance(b, p), *k),
        Shape::Intersection { a, b, k } => smooth_intersect(distance(a, p), distance(b, p), *k),
        Shape::Blend { a, b, k } => {
            let (da, db) = (distance(a, p), distance(b, p));
            da + (db - da) * k
        }
        Shape::Translate { inner, offset } => distance(inner, &(p - offset)),
        Shape::Rotate { inner, rotation } => {
            distance(inner, &rotation.inverse_transform_point(p))
        }
        Shape::Scale { inner, factor } => {
            let local = Point3::from(p.coords.component_div(factor));
            distance(inner, &local) * factor.abs().min()
        }
        Shape::Mirror { inner, normal } => {
            let n = normal.as_ref();
            distance(inner, &(p - n * (2.0 * p.coords.dot(n))))
        }
        Shape::Extrude { inner, half_height } => {
            let d = distance(inner, &Point3::new(p.x, p.y, 0.0));
            let w = Vector2::new(d, p.z.abs() - half_height);
            w.x.max(w.y).min(0.0) + w.sup(&Vector2::zeros()).norm()
        }
        Shape::Shell { inner, thickness } => distance(inner, p).abs() - thickness / 2.0,
    }
}

fn box_distance(p: &Vector3<f64>, half: &Vector3<f64>) -> f64 {
    let q = p.abs() - half;
    q.sup(&Vector3::zeros()).norm() + q.max().min(0.0)
}

fn rect_distance(p: &Vector2<f64>, half: &Vector2<f64>) -> f64 {
    let q = p.abs() - half;
    q.sup(&Vector2::zeros()).norm() + q.max().min(0.0)
}

/// Capped cone along Z: radius `r1` at `z = -h`, `r2` at `z = h`
fn capped_cone(p: &Point3<f64>, h: f64, r1: f64, r2: f64) -> f64 {
    let q = Vector2::new(p.xy().coords.norm(), p.z);
    let k1 = Vector2::new(r2, h);
    let k2 = Vector2::new(r2 - r1, 2.0 * h);
    let rim = if q.y < 0.0 { r1 } else { r2 };
    let ca = Vector2::new(q.x - q.x.min(rim), q.y.abs() - h);
    let k2_len2 = k2.norm_squared();
    let t = if k2_len2 > 0.0 {
        ((k1 - q).dot(&k2) / k2_len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cb = q - k1 + k2 * t;
    let sign = if cb.x < 0.0 && ca.y < 0.0 { -1.0 } else { 1.0 };
    sign * ca.norm_squared().min(cb.norm_squared()).sqrt()
}

fn smooth_union(a: f64, b: f64, k: f64) -> f64 {
    if k <= 0.0 {
        return a.min(b);
    }
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
    lerp(b, a, h) - k * h * (1.0 - h)
}

fn smooth_subtract(a: f64, b: f64, k: f64) -> f64 {
    if k <= 0.0 {
        return a.max(-b);
    }
    let h = (0.5 - 0.5 * (a + b) / k).clamp(0.0, 1.0);
    lerp(a, -b, h) + k * h * (1.0 - h)
}

fn smooth_intersect(a: f64, b: f64, k: f64) -> f64 {
    if k <= 0.0 {
        return a.max(b);
    }
    let h = (0.5 - 0.5 * (b - a) / k).clamp(0.0, 1.0);
    lerp(b, a, h) + k * h * (1.0 - h)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn bounds(shape: &Shape) -> BoundingBox {
    match shape {
        Shape::Sphere { radius } => BoundingBox::symmetric(Vector3::repeat(*radius)),
        Shape::Box { half } => BoundingBox::symmetric(*half),
        Shape::Frustum {
            r1,
            r2,
            half_height,
        } => {
            let r = r1.max(*r2);
            BoundingBox::symmetric(Vector3::new(r, r, *half_height))
        }
        Shape::Circle { radius } => BoundingBox::symmetric(Vector3::new(*radius, *radius, 0.0)),
        Shape::Rectangle { half } => BoundingBox::symmetric(Vector3::new(half.x, half.y, 0.0)),
        Shape::Text { glyphs, .. } => glyphs.iter().fold(BoundingBox::empty(), |acc, g| {
            acc.union(&glyph_bounds(g))
        }),
        Shape::Union { a, b, k } | Shape::Blend { a, b, k } => {
            bounds(a).union(&bounds(b)).padded(k.max(0.0))
        }
        Shape::Difference { a, k, .. } => bounds(a).padded(k.max(0.0)),
        Shape::Intersection { a, b, .. } => bounds(a).intersection(&bounds(b)),
        Shape::Translate { inner, offset } => bounds(inner).map_corners(|c| c + offset),
        Shape::Rotate { inner, rotation } => {
            bounds(inner).map_corners(|c| rotation.transform_point(c))
        }
        Shape::Scale { inner, factor } => {
            bounds(inner).map_corners(|c| Point3::from(c.coords.component_mul(factor)))
        }
        Shape::Mirror { inner, normal } => {
            let n = normal.as_ref();
            bounds(inner).map_corners(|c| c - n * (2.0 * c.coords.dot(n)))
        }
        Shape::Extrude { inner, half_height } => {
            let profile = bounds(inner);
            BoundingBox::new(
                Point3::new(profile.min.x, profile.min.y, -half_height),
                Point3::new(profile.max.x, profile.max.y, *half_height),
            )
        }
        Shape::Shell { inner, thickness } => bounds(inner).padded(thickness / 2.0),
    }
}

fn glyph_bounds(glyph: &GlyphCell) -> BoundingBox {
    let lo = glyph.center - glyph.half;
    let hi = glyph.center + glyph.half;
    BoundingBox::new(Point3::new(lo.x, lo.y, 0.0), Point3::new(hi.x, hi.y, 0.0))
}

#[cfg(test)]
mod tests {
    use super::super::shape::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2, Vector3};

    #[test]
    fn test_primitive_distances() {
        let sphere = make_sphere(2.0);
        assert_relative_eq!(sphere.distance(&Point3::new(3.0, 0.0, 0.0)), 1.0);
        assert_relative_eq!(sphere.distance(&Point3::origin()), -2.0);

        let cube = make_box(Vector3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(cube.distance(&Point3::new(0.0, 0.0, 3.0)), 2.0);
        assert_relative_eq!(cube.distance(&Point3::origin()), -1.0);

        let square = make_rectangle(Vector2::new(4.0, 4.0));
        // Flat shapes ignore z
        assert_relative_eq!(square.distance(&Point3::new(0.0, 0.0, 100.0)), -2.0);
    }

    #[test]
    fn test_frustum_distance() {
        let cylinder = make_cylinder_frustum(1.0, 1.0, 4.0);
        assert_relative_eq!(cylinder.distance(&Point3::new(3.0, 0.0, 0.0)), 2.0, epsilon = 1e-9);
        assert_relative_eq!(cylinder.distance(&Point3::new(0.0, 0.0, 5.0)), 3.0, epsilon = 1e-9);
        assert!(cylinder.distance(&Point3::origin()) < 0.0);

        let cone = make_cylinder_frustum(2.0, 0.0, 2.0);
        assert!(cone.distance(&Point3::new(1.5, 0.0, -0.9)) < 0.0);
        assert!(cone.distance(&Point3::new(1.5, 0.0, 0.9)) > 0.0);
    }

    #[test]
    fn test_sharp_booleans() {
        let a = make_sphere(1.0);
        let b = translate(&make_sphere(1.0), Vector3::new(1.5, 0.0, 0.0));
        let p = Point3::new(2.0, 0.0, 0.0);

        assert_relative_eq!(union(&a, &b, 0.0).distance(&p), -0.5);
        assert_relative_eq!(difference(&a, &b, 0.0).distance(&p), 1.0);
        assert_relative_eq!(intersection(&a, &b, 0.0).distance(&p), 1.0);
    }

    #[test]
    fn test_smooth_union_is_below_sharp_union() {
        let a = make_sphere(1.0);
        let b = translate(&make_sphere(1.0), Vector3::new(2.0, 0.0, 0.0));
        let p = Point3::new(1.0, 0.0, 0.0);
        let sharp = union(&a, &b, 0.0).distance(&p);
        let smooth = union(&a, &b, 1.0).distance(&p);
        assert!(smooth < sharp);
    }

    #[test]
    fn test_transforms() {
        let cube = make_box(Vector3::new(2.0, 4.0, 6.0));
        let turned = rotate_z(&cube, std::f64::consts::FRAC_PI_2);
        // The long Y extent now lies along X
        assert_relative_eq!(turned.distance(&Point3::new(2.0, 0.0, 0.0)), 0.0, epsilon = 1e-9);

        let bounds = turned.bounds();
        assert_relative_eq!(bounds.max.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 1.0, epsilon = 1e-9);

        let scaled = scale(&make_sphere(1.0), Vector3::repeat(3.0));
        assert_relative_eq!(scaled.distance(&Point3::new(4.0, 0.0, 0.0)), 1.0, epsilon = 1e-9);

        let moved = translate(&make_sphere(1.0), Vector3::new(5.0, 0.0, 0.0));
        let mirrored = mirror(&moved, Vector3::x_axis());
        assert_relative_eq!(mirrored.distance(&Point3::new(-5.0, 0.0, 0.0)), -1.0);
    }

    #[test]
    fn test_extrude_and_shell() {
        let slab = extrude(&make_circle(1.0), 2.0);
        assert_relative_eq!(slab.distance(&Point3::new(0.0, 0.0, 3.0)), 2.0);
        assert_relative_eq!(slab.bounds().min.z, -1.0);

        let hollow = shell(&make_sphere(2.0), 0.5);
        assert!(hollow.distance(&Point3::origin()) > 0.0);
        assert!(hollow.distance(&Point3::new(2.0, 0.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_blend_interpolates() {
        let a = make_sphere(1.0);
        let b = make_sphere(3.0);
        let p = Point3::new(5.0, 0.0, 0.0);
        assert_relative_eq!(blend(&a, &b, 0.5).distance(&p), 3.0);
    }
}
