// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Call arguments and their binding to parameters

use super::value::Value;
use crate::error::RuntimeError;
use crate::ir::{Expr, Param};

/// Evaluated arguments of a call, in call-site order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            named: Vec::new(),
        }
    }

    pub fn push_positional(&mut self, value: Value) {
        self.positional.push(value);
    }

    pub fn push_named(&mut self, name: impl Into<String>, value: Value) {
        self.named.push((name.into(), value));
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Argument given by keyword `name`, else at position `index`
    pub fn get(&self, name: &str, index: usize) -> Option<&Value> {
        self.keyword(name).or_else(|| self.positional.get(index))
    }

    pub fn number(&self, name: &str, index: usize) -> Option<f64> {
        self.get(name, index).and_then(Value::as_number)
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bind call arguments to a user definition's parameters.
///
/// Positional arguments fill parameters left to right, keywords by name.
/// Unfilled parameters take their default, produced by `default`. Keywords
/// naming `$` special variables are passed through as extra bindings.
pub(crate) fn bind_parameters(
    callee: &str,
    params: &[Param],
    args: &Arguments,
    mut default: impl FnMut(&Expr) -> Result<Value, RuntimeError>,
) -> Result<Vec<(String, Value)>, RuntimeError> {
    let error = |message: String| RuntimeError::ArgumentBinding {
        callee: callee.to_string(),
        message,
        pos: None,
    };

    if args.positional.len() > params.len() {
        return Err(error(format!(
            "expected at most {} positional arguments, got {}",
            params.len(),
            args.positional.len()
        )));
    }

    let mut slots: Vec<Option<Value>> = params.iter().map(|_| None).collect();
    for (slot, value) in slots.iter_mut().zip(&args.positional) {
        *slot = Some(value.clone());
    }

    let mut specials = Vec::new();
    for (name, value) in &args.named {
        match params.iter().position(|p| &p.name == name) {
            Some(index) if slots[index].is_some() => {
                return Err(error(format!("`{}` is already bound by position", name)));
            }
            Some(index) => slots[index] = Some(value.clone()),
            None if name.starts_with('$') => specials.push((name.clone(), value.clone())),
            None => return Err(error(format!("unknown keyword argument `{}`", name))),
        }
    }

    let mut bound = Vec::with_capacity(params.len() + specials.len());
    for (param, slot) in params.iter().zip(slots) {
        let value = match (slot, &param.default) {
            (Some(value), _) => value,
            (None, Some(expr)) => default(expr)?,
            (None, None) => {
                return Err(error(format!("missing required argument `{}`", param.name)));
            }
        };
        bound.push((param.name.clone(), value));
    }
    bound.extend(specials);
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ExprKind, SourcePos};

    fn params() -> Vec<Param> {
        let pos = SourcePos::new(1, 1);
        vec![
            Param {
                name: "a".into(),
                default: None,
            },
            Param {
                name: "b".into(),
                default: Some(Expr::new(ExprKind::Number(2.0), pos)),
            },
        ]
    }

    fn literal(expr: &Expr) -> Result<Value, RuntimeError> {
        match expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(n)),
            _ => Ok(Value::Undef),
        }
    }

    #[test]
    fn test_positional_then_default() {
        let args = Arguments::with_positional(vec![Value::Number(1.0)]);
        let bound = bind_parameters("f", &params(), &args, literal).unwrap();
        assert_eq!(
            bound,
            vec![
                ("a".to_string(), Value::Number(1.0)),
                ("b".to_string(), Value::Number(2.0))
            ]
        );
    }

    #[test]
    fn test_keyword_overrides_default() {
        let mut args = Arguments::new();
        args.push_named("b", Value::Number(5.0));
        args.push_named("a", Value::Number(4.0));
        args.push_named("$fn", Value::Number(32.0));
        let bound = bind_parameters("f", &params(), &args, literal).unwrap();
        assert_eq!(bound[0].1, Value::Number(4.0));
        assert_eq!(bound[1].1, Value::Number(5.0));
        assert_eq!(bound[2].0, "$fn");
    }

    #[test]
    fn test_binding_errors() {
        let too_many = Arguments::with_positional(vec![Value::Undef; 3]);
        let missing = Arguments::new();
        let mut unknown = Arguments::new();
        unknown.push_named("zzz", Value::Undef);
        let mut twice = Arguments::with_positional(vec![Value::Number(1.0)]);
        twice.push_named("a", Value::Number(1.0));

        for args in [too_many, missing, unknown, twice] {
            assert!(matches!(
                bind_parameters("f", &params(), &args, literal),
                Err(RuntimeError::ArgumentBinding { .. })
            ));
        }
    }
}
