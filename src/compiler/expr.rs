// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Expression lowering

use super::{malformed, required, Compiler};
use crate::error::CompileError;
use crate::io::ParseNode;
use crate::ir::{BinaryOp, CompareOp, Expr, ExprKind};

impl Compiler {
    pub(super) fn lower_expr(&mut self, node: &ParseNode) -> Result<Expr, CompileError> {
        let pos = node.pos;
        let kind = match node.kind.as_str() {
            // Precedence levels that matched a single operand collapse away
            "expr" | "ternary" | "logic_or" | "logic_and" | "equality" | "comparison"
            | "additive" | "multiplicative" | "unary" | "power" | "postfix"
                if node.children.len() == 1 =>
            {
                return self.lower_expr(&node.children[0]);
            }
            "ternary" => {
                let [condition, then, otherwise] = node.children.as_slice() else {
                    return Err(malformed(node, "expected condition and two branches"));
                };
                ExprKind::Ternary {
                    condition: Box::new(self.lower_expr(condition)?),
                    then: Box::new(self.lower_expr(then)?),
                    otherwise: Box::new(self.lower_expr(otherwise)?),
                }
            }
            "logic_or" | "logic_and" => {
                let or = node.is("logic_or");
                let mut operands = node.children.iter();
                let first = operands.next().ok_or_else(|| malformed(node, "no operands"))?;
                let mut acc = self.lower_expr(first)?;
                for operand in operands {
                    let rhs = Box::new(self.lower_expr(operand)?);
                    let lhs = Box::new(acc);
                    let kind = if or {
                        ExprKind::Or(lhs, rhs)
                    } else {
                        ExprKind::And(lhs, rhs)
                    };
                    acc = Expr::new(kind, pos);
                }
                return Ok(acc);
            }
            "equality" | "comparison" | "additive" | "multiplicative" => {
                return self.lower_left_fold(node);
            }
            "unary" => {
                let (ops, operand) = node.children.split_at(node.children.len() - 1);
                let mut expr = self.lower_expr(&operand[0])?;
                for op in ops.iter().rev() {
                    expr = match op.text.as_str() {
                        "-" => Expr::new(ExprKind::Negate(Box::new(expr)), op.pos),
                        "!" => Expr::new(ExprKind::Not(Box::new(expr)), op.pos),
                        _ => expr,
                    };
                }
                return Ok(expr);
            }
            "power" => {
                let [base, exponent] = node.children.as_slice() else {
                    return Err(malformed(node, "expected base and exponent"));
                };
                ExprKind::Binary {
                    op: BinaryOp::Pow,
                    lhs: Box::new(self.lower_expr(base)?),
                    rhs: Box::new(self.lower_expr(exponent)?),
                }
            }
            "postfix" => {
                let mut parts = node.children.iter();
                let primary = parts.next().ok_or_else(|| malformed(node, "no operand"))?;
                let mut expr = self.lower_expr(primary)?;
                for index in parts {
                    let index_expr = self.lower_expr(required(index, "expr")?)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index_expr),
                        },
                        index.pos,
                    );
                }
                return Ok(expr);
            }
            "number" => {
                let value: f64 = node
                    .text
                    .parse()
                    .map_err(|_| malformed(node, "not a number"))?;
                ExprKind::Number(value)
            }
            "string" => {
                let raw = node.child("string_inner").map(|n| n.text.as_str()).unwrap_or("");
                ExprKind::String(unescape(raw))
            }
            "boolean" => ExprKind::Bool(node.text == "true"),
            "undef" => ExprKind::Undef,
            "variable" => ExprKind::Variable(super::ident(node)?),
            "vector" => {
                let mut items = Vec::with_capacity(node.children.len());
                for item in &node.children {
                    items.push(self.lower_expr(item)?);
                }
                ExprKind::Vector(items)
            }
            "range" => {
                let parts: Vec<Expr> = node
                    .children
                    .iter()
                    .map(|c| self.lower_expr(c))
                    .collect::<Result<_, _>>()?;
                let mut parts = parts.into_iter();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(start), Some(stop), None) => ExprKind::Range {
                        start: Box::new(start),
                        step: None,
                        stop: Box::new(stop),
                    },
                    (Some(start), Some(step), Some(stop)) => ExprKind::Range {
                        start: Box::new(start),
                        step: Some(Box::new(step)),
                        stop: Box::new(stop),
                    },
                    _ => return Err(malformed(node, "expected two or three bounds")),
                }
            }
            "function_call" => {
                let name = super::ident(node)?;
                let args = self.lower_args(required(node, "call_args")?)?;
                ExprKind::Call { name, args }
            }
            other => {
                // Tolerate wrapper rules added to the grammar later
                if node.children.len() == 1 {
                    return self.lower_expr(&node.children[0]);
                }
                self.record(CompileError::SyntaxMapping {
                    kind: other.to_string(),
                    pos,
                });
                ExprKind::Undef
            }
        };
        Ok(Expr::new(kind, pos))
    }

    /// `operand (op operand)*` folded left-associatively
    fn lower_left_fold(&mut self, node: &ParseNode) -> Result<Expr, CompileError> {
        let mut parts = node.children.iter();
        let first = parts.next().ok_or_else(|| malformed(node, "no operands"))?;
        let mut acc = self.lower_expr(first)?;

        while let Some(op) = parts.next() {
            let operand = parts
                .next()
                .ok_or_else(|| malformed(node, "operator without right operand"))?;
            let lhs = Box::new(acc);
            let rhs = Box::new(self.lower_expr(operand)?);
            let kind = match op.text.as_str() {
                "+" => ExprKind::Binary { op: BinaryOp::Add, lhs, rhs },
                "-" => ExprKind::Binary { op: BinaryOp::Sub, lhs, rhs },
                "*" => ExprKind::Binary { op: BinaryOp::Mul, lhs, rhs },
                "/" => ExprKind::Binary { op: BinaryOp::Div, lhs, rhs },
                "%" => ExprKind::Binary { op: BinaryOp::Mod, lhs, rhs },
                "<" => ExprKind::Compare { op: CompareOp::Lt, lhs, rhs },
                "<=" => ExprKind::Compare { op: CompareOp::Le, lhs, rhs },
                ">" => ExprKind::Compare { op: CompareOp::Gt, lhs, rhs },
                ">=" => ExprKind::Compare { op: CompareOp::Ge, lhs, rhs },
                "==" => ExprKind::Compare { op: CompareOp::Eq, lhs, rhs },
                "!=" => ExprKind::Compare { op: CompareOp::Ne, lhs, rhs },
                other => {
                    return Err(malformed(op, &format!("unknown operator `{}`", other)));
                }
            };
            acc = Expr::new(kind, op.pos);
        }
        Ok(acc)
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_scad;
    use crate::ir::StatementKind;

    fn lower(source: &str) -> Expr {
        let tree = parse_scad(&format!("x = {};", source)).unwrap();
        let program = Compiler::new().compile(&tree).unwrap();
        match &program.statements()[0].kind {
            StatementKind::Assign { value, .. } => value.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 => Add(1, Mul(2, 3))
        match lower("1 + 2 * 3").kind {
            ExprKind::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        match lower("10 - 3 - 2").kind {
            ExprKind::Binary { op: BinaryOp::Sub, lhs, .. } => {
                assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_range_forms() {
        match lower("[0 : 10]").kind {
            ExprKind::Range { step, .. } => assert!(step.is_none()),
            other => panic!("unexpected {:?}", other),
        }
        match lower("[0 : 2 : 10]").kind {
            ExprKind::Range { step, stop, .. } => {
                assert!(step.is_some());
                assert!(matches!(stop.kind, ExprKind::Number(n) if n == 10.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ternary_index_and_negation() {
        assert!(matches!(lower("a ? 1 : 2").kind, ExprKind::Ternary { .. }));
        assert!(matches!(lower("v[1][0]").kind, ExprKind::Index { .. }));
        assert!(matches!(lower("-a").kind, ExprKind::Negate(_)));
        assert!(matches!(lower("!a && b").kind, ExprKind::And(..)));
    }

    #[test]
    fn test_string_escapes() {
        match lower(r#""a\"b\n""#).kind {
            ExprKind::String(s) => assert_eq!(s, "a\"b\n"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_function_call_keyword_args() {
        match lower("f(1, b = 2)").kind {
            ExprKind::Call { name, args } => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 2);
                assert_eq!(args[1].name.as_deref(), Some("b"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
