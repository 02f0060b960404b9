// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Builtin operators and functions
//!
//! Operators are registered as [`OperatorFactory`](crate::runtime::OperatorFactory)
//! pointers: the factory checks arguments when the call is executed, the
//! returned evaluator consumes the children when the stream is pulled.

mod csg;
mod functions;
mod shapes;
mod transforms;

pub use csg::{reduce, Combine};

use crate::error::RuntimeError;
use crate::geometry::Geometry;
use crate::runtime::{Arguments, CallContext, GeometryStream, OperatorEvaluator, Registry, Value};
use nalgebra::Vector3;

/// Install every builtin into `registry`
pub fn register(registry: &mut Registry) {
    shapes::register(registry);
    csg::register(registry);
    transforms::register(registry);
    functions::register(registry);
}

/// Evaluator yielding `geometry` and leaving the children untouched
fn primitive(geometry: Geometry) -> OperatorEvaluator {
    Box::new(move |_children| Ok(GeometryStream::once(geometry)))
}

fn lookup<'a>(args: &'a Arguments, name: &str, index: Option<usize>) -> Option<&'a Value> {
    match index {
        Some(index) => args.get(name, index),
        None => args.keyword(name),
    }
}

/// Finite number given by keyword or position; absent and `undef` give `None`
fn number(
    ctx: &CallContext<'_>,
    args: &Arguments,
    name: &str,
    index: Option<usize>,
) -> Result<Option<f64>, RuntimeError> {
    match lookup(args, name, index) {
        None | Some(Value::Undef) => Ok(None),
        Some(Value::Number(n)) if n.is_finite() => Ok(Some(*n)),
        Some(other) => Err(ctx.invalid(format!(
            "`{}` must be a finite number, got {}",
            name,
            other.repr()
        ))),
    }
}

/// Radius from `r`, or from the diameter `d`
fn radius(
    ctx: &CallContext<'_>,
    args: &Arguments,
    (r, d): (&str, &str),
    index: Option<usize>,
) -> Result<Option<f64>, RuntimeError> {
    let radius = match number(ctx, args, r, index)? {
        Some(r) => Some(r),
        None => number(ctx, args, d, None)?.map(|d| d / 2.0),
    };
    match radius {
        Some(r) if r < 0.0 => Err(ctx.invalid(format!("negative radius {}", r))),
        other => Ok(other),
    }
}

fn flag(args: &Arguments, name: &str, index: usize) -> bool {
    args.get(name, index).is_some_and(Value::is_truthy)
}

/// `[x, y, z]`, `[x, y]` with `z = fill`, or a scalar applied to every axis
fn vector3(
    ctx: &CallContext<'_>,
    args: &Arguments,
    name: &str,
    index: usize,
    fill: f64,
) -> Result<Option<Vector3<f64>>, RuntimeError> {
    let value = match args.get(name, index) {
        None | Some(Value::Undef) => return Ok(None),
        Some(value) => value,
    };
    if let Value::Number(n) = value {
        return Ok(Some(Vector3::repeat(*n)));
    }
    match value.as_numbers().as_deref() {
        Some([x, y]) => Ok(Some(Vector3::new(*x, *y, fill))),
        Some([x, y, z]) => Ok(Some(Vector3::new(*x, *y, *z))),
        _ => Err(ctx.invalid(format!(
            "`{}` must be a number or a 2- or 3-vector, got {}",
            name,
            value.repr()
        ))),
    }
}

/// `ECHO: ` line for positional values and `name=value` pairs
pub(crate) fn echo_line(args: &Arguments) -> String {
    let tokens: Vec<String> = args
        .positional()
        .iter()
        .map(Value::repr)
        .chain(
            args.named()
                .iter()
                .map(|(name, value)| format!("{}={}", name, value.repr())),
        )
        .collect();
    format!("ECHO: {}", tokens.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_line_format() {
        let mut args = Arguments::with_positional(vec![
            Value::Number(1.0),
            Value::String("a".into()),
            Value::Vector(vec![Value::Number(2.5), Value::Undef]),
        ]);
        args.push_named("flag", Value::Bool(true));
        assert_eq!(echo_line(&args), "ECHO: 1, \"a\", [2.5, undef], flag=true");
        assert_eq!(echo_line(&Arguments::new()), "ECHO: ");
    }
}
