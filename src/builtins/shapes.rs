// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Primitive shapes. Each yields exactly one geometry and ignores its children.

use super::{flag, number, primitive, radius, vector3};
use crate::error::RuntimeError;
use crate::geometry::{
    make_box, make_circle, make_cylinder_frustum, make_rectangle, make_sphere, make_text, translate,
};
use crate::runtime::{Arguments, CallContext, OperatorEvaluator, Registry, Value};
use nalgebra::{Vector2, Vector3};

/// Advance of one glyph cell relative to the text size
const GLYPH_ADVANCE: f64 = 0.6;

pub(super) fn register(registry: &mut Registry) {
    registry.register_operator("sphere", sphere);
    registry.register_operator("cube", cube);
    registry.register_operator("cylinder", cylinder);
    registry.register_operator("circle", circle);
    registry.register_operator("square", square);
    registry.register_operator("text", text);
}

fn positive_size(ctx: &CallContext<'_>, size: Vector3<f64>) -> Result<Vector3<f64>, RuntimeError> {
    if size.iter().any(|s| *s < 0.0) {
        return Err(ctx.invalid(format!(
            "size must not be negative, got [{}, {}, {}]",
            size.x, size.y, size.z
        )));
    }
    Ok(size)
}

fn sphere(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["r", "d"]);
    let r = radius(ctx, args, ("r", "d"), Some(0))?.unwrap_or(1.0);
    Ok(primitive(make_sphere(r)))
}

/// `cube(size, center)`; without `center` the minimum corner sits at the origin
fn cube(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["size", "center"]);
    let size = vector3(ctx, args, "size", 0, 1.0)?.unwrap_or_else(|| Vector3::repeat(1.0));
    let size = positive_size(ctx, size)?;

    let geometry = make_box(size);
    if flag(args, "center", 1) {
        Ok(primitive(geometry))
    } else {
        Ok(primitive(translate(&geometry, size / 2.0)))
    }
}

/// `cylinder(h, r1, r2, center)`, with `r`/`d`/`d1`/`d2` as keywords
fn cylinder(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["h", "r", "d", "r1", "r2", "d1", "d2", "center"]);
    let h = number(ctx, args, "h", Some(0))?.unwrap_or(1.0);
    if h < 0.0 {
        return Err(ctx.invalid(format!("negative height {}", h)));
    }
    let r = radius(ctx, args, ("r", "d"), None)?;
    let r1 = radius(ctx, args, ("r1", "d1"), Some(1))?.or(r).unwrap_or(1.0);
    let r2 = radius(ctx, args, ("r2", "d2"), Some(2))?.or(r).unwrap_or(1.0);

    let geometry = make_cylinder_frustum(r1, r2, h);
    if flag(args, "center", 3) {
        Ok(primitive(geometry))
    } else {
        Ok(primitive(translate(&geometry, Vector3::new(0.0, 0.0, h / 2.0))))
    }
}

fn circle(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["r", "d"]);
    let r = radius(ctx, args, ("r", "d"), Some(0))?.unwrap_or(1.0);
    Ok(primitive(make_circle(r)))
}

fn square(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["size", "center"]);
    let size = vector3(ctx, args, "size", 0, 0.0)?.unwrap_or_else(|| Vector3::repeat(1.0));
    let size = positive_size(ctx, size)?;
    let size = Vector2::new(size.x, size.y);

    let geometry = make_rectangle(size);
    if flag(args, "center", 1) {
        Ok(primitive(geometry))
    } else {
        let offset = size / 2.0;
        Ok(primitive(translate(&geometry, Vector3::new(offset.x, offset.y, 0.0))))
    }
}

/// `text(text, size, font)`: glyph cells laid out from the origin along +X
fn text(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["text", "size", "font"]);
    let content = match args.get("text", 0) {
        None | Some(Value::Undef) => String::new(),
        Some(value) => value.to_string(),
    };
    let size = number(ctx, args, "size", Some(1))?.unwrap_or(10.0);
    let family = match args.get("font", 2) {
        Some(Value::String(family)) => family.clone(),
        Some(Value::Undef) | None => ctx.config().fonts.default_family.clone(),
        Some(other) => {
            return Err(ctx.invalid(format!("`font` must be a string, got {}", other.repr())))
        }
    };

    let font = ctx.fonts().resolve(&family).map_err(|e| RuntimeError::Font {
        callee: ctx.name().to_string(),
        message: e.to_string(),
        pos: Some(ctx.pos()),
    })?;
    let width = size * GLYPH_ADVANCE * content.chars().count() as f64;
    Ok(primitive(make_text(font, &content, size, width)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::diagnostics::MemorySink;
    use crate::fonts::FontCache;
    use crate::geometry::Geometry;
    use crate::ir::SourcePos;
    use crate::runtime::{CallSite, ChildrenProvider, OperatorFactory};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn run(factory: OperatorFactory, args: Arguments) -> Result<Vec<Geometry>, RuntimeError> {
        let config = Config::default();
        let sink = MemorySink::new();
        let fonts = FontCache::new("/nonexistent/fonts");
        let site = CallSite::new("test", SourcePos::new(1, 1));
        let ctx = CallContext::new(site.clone(), &config, &sink, &fonts);
        let evaluator = factory(&ctx, &args)?;
        evaluator(ChildrenProvider::empty(site))?.collect_all()
    }

    fn cube_args(center: bool) -> Arguments {
        let mut args = Arguments::with_positional(vec![Value::Vector(vec![
            Value::Number(30.0),
            Value::Number(30.0),
            Value::Number(30.0),
        ])]);
        args.push_named("center", Value::Bool(center));
        args
    }

    #[test]
    fn test_cube_corner_and_center() {
        let corner = run(cube, cube_args(false)).unwrap();
        let bounds = corner[0].bounds();
        assert_relative_eq!(bounds.min, Point3::origin(), epsilon = 1e-9);
        assert_relative_eq!(bounds.max, Point3::new(30.0, 30.0, 30.0), epsilon = 1e-9);

        let centered = run(cube, cube_args(true)).unwrap();
        assert_relative_eq!(centered[0].bounds().center(), Point3::origin(), epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_from_diameter() {
        let mut args = Arguments::new();
        args.push_named("d", Value::Number(4.0));
        let spheres = run(sphere, args).unwrap();
        assert_relative_eq!(spheres[0].distance(&Point3::origin()), -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cylinder_sits_on_xy_plane() {
        let mut args = Arguments::new();
        args.push_named("h", Value::Number(10.0));
        args.push_named("r", Value::Number(2.0));
        let cylinders = run(cylinder, args).unwrap();
        let bounds = cylinders[0].bounds();
        assert_relative_eq!(bounds.min.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.z, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_square_is_2d() {
        let squares = run(square, Arguments::with_positional(vec![Value::Number(2.0)])).unwrap();
        assert!(squares[0].is_2d());
    }

    #[test]
    fn test_invalid_arguments() {
        let negative = Arguments::with_positional(vec![Value::Number(-1.0)]);
        assert!(matches!(
            run(sphere, negative),
            Err(RuntimeError::InvalidArgument { .. })
        ));
        let text_size = Arguments::with_positional(vec![Value::String("x".into())]);
        assert!(matches!(
            run(cube, text_size),
            Err(RuntimeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_text_without_fonts_is_font_error() {
        let args = Arguments::with_positional(vec![Value::String("hi".into())]);
        assert!(matches!(run(text, args), Err(RuntimeError::Font { .. })));
    }
}
