// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pure value functions
//!
//! Functions never fail on a wrong argument type: they warn and return
//! `undef`, like the arithmetic operators do.

use super::echo_line;
use crate::diagnostics::Level;
use crate::error::RuntimeError;
use crate::runtime::{self, Arguments, CallContext, RangeValue, Registry, Value};

/// Language version reported by `version()`
const VERSION: [f64; 3] = [2021.0, 1.0, 0.0];

pub(super) fn register(registry: &mut Registry) {
    registry.register_function("sin", sin);
    registry.register_function("cos", cos);
    registry.register_function("tan", tan);
    registry.register_function("asin", asin);
    registry.register_function("acos", acos);
    registry.register_function("atan", atan);
    registry.register_function("atan2", atan2);
    registry.register_function("abs", abs);
    registry.register_function("sign", sign);
    registry.register_function("floor", floor);
    registry.register_function("ceil", ceil);
    registry.register_function("round", round);
    registry.register_function("sqrt", sqrt);
    registry.register_function("exp", exp);
    registry.register_function("ln", ln);
    registry.register_function("log", log);
    registry.register_function("pow", pow);
    registry.register_function("min", min);
    registry.register_function("max", max);
    registry.register_function("norm", norm);
    registry.register_function("len", len);
    registry.register_function("concat", concat);
    registry.register_function("chr", chr);
    registry.register_function("str", to_str);
    registry.register_function("version", version);
    registry.register_function("version_num", version_num);
    registry.register_function("div", div);
    registry.register_function("range", range);
    registry.register_function("echo", echo);
}

fn undef_with_warning(ctx: &CallContext<'_>, args: &Arguments) -> Value {
    let kinds: Vec<&str> = args.positional().iter().map(Value::type_name).collect();
    ctx.warn(format_args!("no overload for ({})", kinds.join(", ")));
    Value::Undef
}

/// Apply `f` to the single numeric argument
fn unary(ctx: &CallContext<'_>, args: &Arguments, f: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    match args.positional() {
        [Value::Number(x)] => Ok(Value::Number(f(*x))),
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

fn binary(
    ctx: &CallContext<'_>,
    args: &Arguments,
    f: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match args.positional() {
        [Value::Number(a), Value::Number(b)] => Ok(Value::Number(f(*a, *b))),
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

fn sin(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |deg| deg.to_radians().sin())
}

fn cos(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |deg| deg.to_radians().cos())
}

fn tan(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |deg| deg.to_radians().tan())
}

fn asin(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |x| x.asin().to_degrees())
}

fn acos(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |x| x.acos().to_degrees())
}

fn atan(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |x| x.atan().to_degrees())
}

fn atan2(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    binary(ctx, args, |y, x| y.atan2(x).to_degrees())
}

fn abs(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::abs)
}

fn sign(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, |x| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    })
}

fn floor(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::floor)
}

fn ceil(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::ceil)
}

/// Halves round away from zero
fn round(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::round)
}

fn sqrt(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::sqrt)
}

fn exp(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::exp)
}

fn ln(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    unary(ctx, args, f64::ln)
}

/// `log(x)` is base 10, `log(b, x)` is base `b`
fn log(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    match args.positional() {
        [Value::Number(x)] => Ok(Value::Number(x.log10())),
        [Value::Number(base), Value::Number(x)] => Ok(Value::Number(x.log(*base))),
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

fn pow(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    binary(ctx, args, f64::powf)
}

/// Numbers of a variadic call, or of its single vector argument
fn operands(args: &Arguments) -> Option<Vec<f64>> {
    match args.positional() {
        [vector @ Value::Vector(_)] => vector.as_numbers(),
        values => values.iter().map(Value::as_number).collect(),
    }
}

fn extremum(
    ctx: &CallContext<'_>,
    args: &Arguments,
    pick: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match operands(args) {
        Some(numbers) if !numbers.is_empty() => {
            Ok(Value::Number(numbers.into_iter().reduce(pick).unwrap_or(f64::NAN)))
        }
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

fn min(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    extremum(ctx, args, f64::min)
}

fn max(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    extremum(ctx, args, f64::max)
}

fn norm(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    match args.positional() {
        [vector @ Value::Vector(_)] => match vector.as_numbers() {
            Some(numbers) => Ok(Value::Number(numbers.iter().map(|x| x * x).sum::<f64>().sqrt())),
            None => Ok(undef_with_warning(ctx, args)),
        },
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

fn len(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    match args.positional() {
        [value] => match value.len() {
            Some(n) => Ok(Value::Number(n as f64)),
            None => Ok(undef_with_warning(ctx, args)),
        },
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

/// Vectors are spliced in, other values appended as single elements
fn concat(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    let mut items = Vec::new();
    for value in args.positional() {
        match value {
            Value::Vector(inner) => items.extend(inner.iter().cloned()),
            other => items.push(other.clone()),
        }
    }
    Ok(Value::Vector(items))
}

fn push_chars(value: &Value, out: &mut String) -> bool {
    match value {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => match char::from_u32(*n as u32) {
            Some(c) => {
                out.push(c);
                true
            }
            None => false,
        },
        Value::Vector(items) => items.iter().all(|item| push_chars(item, out)),
        Value::Range(range) => range.iter().all(|n| push_chars(&Value::Number(n), out)),
        _ => false,
    }
}

/// String of the given code points
fn chr(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    let mut out = String::new();
    if args.positional().iter().all(|value| push_chars(value, &mut out)) {
        Ok(Value::String(out))
    } else {
        Ok(undef_with_warning(ctx, args))
    }
}

/// Concatenation of the arguments' display forms; strings are not quoted
fn to_str(_ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    Ok(Value::String(
        args.positional().iter().map(Value::to_string).collect(),
    ))
}

fn version(_ctx: &CallContext<'_>, _args: &Arguments) -> Result<Value, RuntimeError> {
    Ok(Value::Vector(VERSION.iter().copied().map(Value::Number).collect()))
}

fn version_num(_ctx: &CallContext<'_>, _args: &Arguments) -> Result<Value, RuntimeError> {
    let [year, month, patch] = VERSION;
    Ok(Value::Number(year * 10000.0 + month * 100.0 + patch))
}

fn div(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    binary(ctx, args, runtime::div)
}

/// `range(start, stop, step = 1)`
fn range(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    let start = args.number("start", 0);
    let stop = args.number("stop", 1);
    let step = match args.get("step", 2) {
        None | Some(Value::Undef) => Some(1.0),
        Some(value) => value.as_number(),
    };
    match (start, stop, step) {
        (Some(start), Some(stop), Some(step)) => Ok(Value::Range(RangeValue::new(start, stop, step))),
        _ => Ok(undef_with_warning(ctx, args)),
    }
}

fn echo(ctx: &CallContext<'_>, args: &Arguments) -> Result<Value, RuntimeError> {
    ctx.emit(Level::Info, &echo_line(args));
    Ok(Value::Undef)
}
