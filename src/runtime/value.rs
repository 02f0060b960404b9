// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runtime values and their arithmetic
//!
//! Arithmetic is tolerant: operations on mismatched types return `None`, and
//! the evaluator turns that into `undef` plus a warning.

use super::range::RangeValue;
use crate::ir::{BinaryOp, CompareOp};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undef,
    Bool(bool),
    Number(f64),
    String(String),
    Vector(Vec<Value>),
    Range(RangeValue),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undef => "undef",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Vector(_) => "vector",
            Value::Range(_) => "range",
        }
    }

    /// `false`, `undef`, `0`, `""`, `[]` and empty ranges are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undef => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Vector(v) => !v.is_empty(),
            Value::Range(r) => !r.is_empty(),
        }
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Vector of numbers, if every element is a number
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        self.as_vector()?.iter().map(Value::as_number).collect()
    }

    /// Element count of vectors, strings and ranges
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Vector(v) => Some(v.len()),
            Value::String(s) => Some(s.chars().count()),
            Value::Range(r) => Some(r.len()),
            _ => None,
        }
    }

    /// `self[index]`; `None` when out of bounds or not indexable
    pub fn index(&self, index: &Value) -> Option<Value> {
        let i = index.as_number()?;
        if !(i >= 0.0) {
            return None;
        }
        let i = i.floor() as usize;
        match self {
            Value::Vector(v) => v.get(i).cloned(),
            Value::String(s) => s.chars().nth(i).map(|c| Value::String(c.to_string())),
            Value::Range(r) => r.get(i).map(Value::Number),
            _ => None,
        }
    }

    /// Representation used by `echo`: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("{:?}", s),
            other => other.to_string(),
        }
    }
}

/// Integers print without a fraction, other numbers in shortest round-trip form
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        String::from(if n > 0.0 { "inf" } else { "-inf" })
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => f.write_str("undef"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Value::Range(r) => write!(f, "{}", r),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Vector(items)
    }
}

impl From<RangeValue> for Value {
    fn from(range: RangeValue) -> Self {
        Value::Range(range)
    }
}

/// Division that never faults: `x/0` is `+inf`/`-inf` by the sign of `x`,
/// and `0/0` is NaN
pub fn div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        if a > 0.0 {
            f64::INFINITY
        } else if a < 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::NAN
        }
    } else {
        a / b
    }
}

fn elementwise(a: &[Value], b: &[Value], op: BinaryOp) -> Option<Value> {
    a.iter()
        .zip(b)
        .map(|(x, y)| binary(op, x, y))
        .collect::<Option<Vec<_>>>()
        .map(Value::Vector)
}

fn broadcast(items: &[Value], scalar: &Value, op: BinaryOp, scalar_first: bool) -> Option<Value> {
    items
        .iter()
        .map(|item| {
            if scalar_first {
                binary(op, scalar, item)
            } else {
                binary(op, item, scalar)
            }
        })
        .collect::<Option<Vec<_>>>()
        .map(Value::Vector)
}

pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    use Value::{Number, Vector};

    match (op, lhs, rhs) {
        (_, Number(a), Number(b)) => Some(Number(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => div(*a, *b),
            BinaryOp::Mod => a % b,
            BinaryOp::Pow => a.powf(*b),
        })),
        (BinaryOp::Add | BinaryOp::Sub, Vector(a), Vector(b)) => elementwise(a, b, op),
        (BinaryOp::Mul, Vector(a), Vector(b)) => {
            // Dot product of numeric vectors of equal length
            if a.len() != b.len() {
                return None;
            }
            a.iter().zip(b).try_fold(0.0, |acc, (x, y)| {
                Some(acc + x.as_number()? * y.as_number()?)
            })
            .map(Number)
        }
        (BinaryOp::Mul | BinaryOp::Div, Vector(items), scalar @ Number(_)) => {
            broadcast(items, scalar, op, false)
        }
        (BinaryOp::Mul | BinaryOp::Div, scalar @ Number(_), Vector(items)) => {
            broadcast(items, scalar, op, true)
        }
        _ => None,
    }
}

pub fn negate(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => Some(Value::Number(-n)),
        Value::Vector(items) => items
            .iter()
            .map(negate)
            .collect::<Option<Vec<_>>>()
            .map(Value::Vector),
        _ => None,
    }
}

/// Comparison; ordering is defined between numbers and between strings
pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    let result = match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::Ne => lhs != rhs,
        _ => {
            let ordering = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
                _ => return None,
            };
            // NaN compares false with everything
            let Some(ordering) = ordering else {
                return Some(Value::Bool(false));
            };
            match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
            }
        }
    };
    Some(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn vec3(x: f64, y: f64, z: f64) -> Value {
        Value::Vector(vec![num(x), num(y), num(z)])
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(div(1.0, 0.0), f64::INFINITY);
        assert_eq!(div(-3.0, 0.0), f64::NEG_INFINITY);
        assert_eq!(div(2.0, -0.0), f64::INFINITY);
        assert!(div(0.0, 0.0).is_nan());
        assert_eq!(div(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_vector_arithmetic() {
        assert_eq!(
            binary(BinaryOp::Add, &vec3(1.0, 2.0, 3.0), &vec3(1.0, 1.0, 1.0)),
            Some(vec3(2.0, 3.0, 4.0))
        );
        assert_eq!(
            binary(BinaryOp::Mul, &num(2.0), &vec3(1.0, 2.0, 3.0)),
            Some(vec3(2.0, 4.0, 6.0))
        );
        assert_eq!(
            binary(BinaryOp::Div, &vec3(2.0, 4.0, 0.0), &num(2.0)),
            Some(vec3(1.0, 2.0, 0.0))
        );
        assert_eq!(
            binary(BinaryOp::Mul, &vec3(1.0, 2.0, 3.0), &vec3(4.0, 5.0, 6.0)),
            Some(num(32.0))
        );
        assert_eq!(binary(BinaryOp::Add, &num(1.0), &Value::from("a")), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undef.is_truthy());
        assert!(!num(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Vector(vec![]).is_truthy());
        assert!(Value::Vector(vec![Value::Undef]).is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn test_formatting() {
        assert_eq!(num(14.0).to_string(), "14");
        assert_eq!(num(-0.5).to_string(), "-0.5");
        assert_eq!(num(f64::INFINITY).to_string(), "inf");
        let mixed = Value::Vector(vec![num(1.0), Value::from("a"), Value::Bool(true), Value::Undef]);
        assert_eq!(mixed.to_string(), r#"[1, "a", true, undef]"#);
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::from("hi").repr(), r#""hi""#);
        assert_eq!(
            Value::Range(RangeValue::new(0.0, 10.0, 2.0)).to_string(),
            "[0 : 2 : 10]"
        );
    }

    #[test]
    fn test_indexing() {
        let v = vec3(7.0, 8.0, 9.0);
        assert_eq!(v.index(&num(1.0)), Some(num(8.0)));
        assert_eq!(v.index(&num(3.0)), None);
        assert_eq!(v.index(&num(-1.0)), None);
        assert_eq!(Value::from("abc").index(&num(2.0)), Some(Value::from("c")));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(compare(CompareOp::Lt, &num(1.0), &num(2.0)), Some(Value::Bool(true)));
        assert_eq!(compare(CompareOp::Eq, &num(1.0), &Value::Bool(true)), Some(Value::Bool(false)));
        assert_eq!(compare(CompareOp::Ge, &num(1.0), &Value::from("a")), None);
        assert_eq!(
            compare(CompareOp::Eq, &vec3(1.0, 2.0, 3.0), &vec3(1.0, 2.0, 3.0)),
            Some(Value::Bool(true))
        );
    }
}
