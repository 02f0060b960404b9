// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Operators that reduce their children with the union rule and transform
//! the result

use super::{echo_line, flag, number, reduce, vector3};
use crate::diagnostics::Level;
use crate::error::RuntimeError;
use crate::geometry::{
    extrude, mirror, rotate_x, rotate_y, rotate_z, scale, shell, translate, union, Geometry,
};
use crate::runtime::{Arguments, CallContext, GeometryStream, OperatorEvaluator, Registry, Value};
use nalgebra::{Rotation3, Unit, Vector3};

pub(super) fn register(registry: &mut Registry) {
    registry.register_operator("translate", translate_op);
    registry.register_operator("rotate", rotate_op);
    registry.register_operator("scale", scale_op);
    registry.register_operator("mirror", mirror_op);
    registry.register_operator("linear_extrude", linear_extrude);
    registry.register_operator("extrude", linear_extrude);
    registry.register_operator("shell", shell_op);
    registry.register_operator("echo", echo_op);
}

/// Evaluator that unions the children and applies `apply` to the result
fn transform(
    ctx: &CallContext<'_>,
    apply: impl FnOnce(&Geometry) -> Result<Geometry, RuntimeError> + 'static,
) -> OperatorEvaluator {
    let site = ctx.site().clone();
    let k = ctx.config().smoothing.union;

    Box::new(move |children| {
        let geometries = children.collect()?;
        Ok(match reduce(&site, &geometries, k, union)? {
            Some(geometry) => GeometryStream::once(apply(&geometry)?),
            None => GeometryStream::empty(),
        })
    })
}

fn translate_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["v"]);
    let offset = vector3(ctx, args, "v", 0, 0.0)?.unwrap_or_else(Vector3::zeros);
    Ok(transform(ctx, move |g| Ok(translate(g, offset))))
}

/// Rotation angles in degrees about X, Y and Z
fn rotation_angles(ctx: &CallContext<'_>, args: &Arguments) -> Result<Vector3<f64>, RuntimeError> {
    let axis = vector3(ctx, args, "v", 1, 0.0)?;
    match args.get("a", 0) {
        None | Some(Value::Undef) => Ok(Vector3::zeros()),
        Some(Value::Number(a)) => match axis {
            // Axis-angle, decomposed into the X-then-Y-then-Z sequence
            Some(axis) => {
                let Some(axis) = Unit::try_new(axis, f64::EPSILON) else {
                    return Err(ctx.invalid("rotation axis must not be zero"));
                };
                let (x, y, z) = Rotation3::from_axis_angle(&axis, a.to_radians()).euler_angles();
                Ok(Vector3::new(x, y, z).map(f64::to_degrees))
            }
            None => Ok(Vector3::new(0.0, 0.0, *a)),
        },
        Some(_) => Ok(vector3(ctx, args, "a", 0, 0.0)?.unwrap_or_else(Vector3::zeros)),
    }
}

/// `rotate(a, v)` in degrees. 2-D geometry turns about Z by `a` or `a[2]`;
/// 3-D geometry turns about X, then Y, then Z.
fn rotate_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["a", "v"]);
    let angles = rotation_angles(ctx, args)?;

    Ok(transform(ctx, move |g| {
        if g.is_2d() {
            return Ok(rotate_z(g, angles.z.to_radians()));
        }
        let mut rotated = g.clone();
        if angles.x != 0.0 {
            rotated = rotate_x(&rotated, angles.x.to_radians());
        }
        if angles.y != 0.0 {
            rotated = rotate_y(&rotated, angles.y.to_radians());
        }
        if angles.z != 0.0 {
            rotated = rotate_z(&rotated, angles.z.to_radians());
        }
        Ok(rotated)
    }))
}

fn scale_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["v"]);
    let factor = vector3(ctx, args, "v", 0, 1.0)?.unwrap_or_else(|| Vector3::repeat(1.0));
    if factor.iter().any(|f| *f == 0.0) {
        return Err(ctx.invalid("scale factors must be non-zero"));
    }
    Ok(transform(ctx, move |g| Ok(scale(g, factor))))
}

fn mirror_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["v"]);
    let normal = vector3(ctx, args, "v", 0, 0.0)?.unwrap_or_else(Vector3::x);
    let Some(normal) = Unit::try_new(normal, f64::EPSILON) else {
        return Err(ctx.invalid("mirror normal must not be zero"));
    };
    Ok(transform(ctx, move |g| Ok(mirror(g, normal))))
}

/// `linear_extrude(height, center)`; without `center` the solid starts at z = 0
fn linear_extrude(
    ctx: &CallContext<'_>,
    args: &Arguments,
) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["height", "center"]);
    let height = number(ctx, args, "height", Some(0))?.unwrap_or(100.0);
    if height <= 0.0 {
        return Err(ctx.invalid(format!("height must be positive, got {}", height)));
    }
    let center = flag(args, "center", 1);
    let site = ctx.site().clone();

    Ok(transform(ctx, move |profile| {
        if !profile.is_2d() {
            return Err(site.invalid("children must be 2-D"));
        }
        let solid = extrude(profile, height);
        Ok(if center {
            solid
        } else {
            translate(&solid, Vector3::new(0.0, 0.0, height / 2.0))
        })
    }))
}

fn shell_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["thickness"]);
    let thickness = number(ctx, args, "thickness", Some(0))?.unwrap_or(1.0);
    if thickness <= 0.0 {
        return Err(ctx.invalid(format!("thickness must be positive, got {}", thickness)));
    }
    Ok(transform(ctx, move |g| Ok(shell(g, thickness))))
}

/// `echo(...) { ... }`: prints, then passes the children through unchanged
fn echo_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.emit(Level::Info, &echo_line(args));
    Ok(Box::new(|mut children| children.take()))
}
