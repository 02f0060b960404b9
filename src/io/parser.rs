// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenSCAD-style parser using pest
//!
//! The grammar produces pest pairs, which are converted into an owned
//! [`ParseNode`] tree. The compiler only ever sees `ParseNode`s, so the
//! grammar can evolve without the compiler depending on pest.

use crate::error::ParseError;
use crate::ir::SourcePos;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde::Serialize;

#[derive(Parser)]
#[grammar = "io/scad.pest"]
struct ScadParser;

/// Parse tree node handed to the compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseNode {
    /// Grammar rule name, e.g. `operator_call`
    pub kind: String,
    /// Matched source text
    pub text: String,
    pub pos: SourcePos,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub fn new(kind: impl Into<String>, text: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            pos,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ParseNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// First child of the given kind
    pub fn child(&self, kind: &str) -> Option<&ParseNode> {
        self.children.iter().find(|c| c.kind == kind)
    }
}

/// Parse source text into a parse tree rooted at a `program` node
pub fn parse_scad(source: &str) -> Result<ParseNode, ParseError> {
    let mut pairs = ScadParser::parse(Rule::program, source).map_err(|e| {
        let (line, column) = match e.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        ParseError {
            pos: SourcePos::new(line, column),
            message: e.variant.message().into_owned(),
        }
    })?;

    let program = pairs.next().ok_or_else(|| ParseError {
        pos: SourcePos::new(1, 1),
        message: "empty parse".into(),
    })?;

    Ok(convert(program))
}

fn convert(pair: Pair<'_, Rule>) -> ParseNode {
    let (line, column) = pair.line_col();
    let node = ParseNode::new(rule_name(pair.as_rule()), pair.as_str(), SourcePos::new(line, column));
    let children = pair
        .into_inner()
        .filter(|p| !is_lexical(p.as_rule()))
        .map(convert)
        .collect();
    node.with_children(children)
}

/// Keyword tokens and end-of-input carry no structure for the compiler
fn is_lexical(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::EOI
            | Rule::kw_module
            | Rule::kw_function
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_for
    )
}

fn rule_name(rule: Rule) -> String {
    format!("{:?}", rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(node: &ParseNode) -> Vec<&str> {
        node.children.iter().map(|c| c.kind.as_str()).collect()
    }

    #[test]
    fn test_parse_cube() {
        let tree = parse_scad("cube([10, 10, 10]);").unwrap();
        assert_eq!(tree.kind, "program");
        assert_eq!(kinds(&tree), vec!["operator_call"]);
    }

    #[test]
    fn test_parse_transform_chain() {
        let tree = parse_scad("translate([5, 0, 0]) rotate(45) cube(10);").unwrap();
        let call = &tree.children[0];
        assert_eq!(call.child("ident").unwrap().text, "translate");
        let nested = call.child("operator_call").unwrap();
        assert_eq!(nested.child("ident").unwrap().text, "rotate");
    }

    #[test]
    fn test_parse_boolean_block() {
        let tree = parse_scad("difference() { cube(10); sphere(8); }").unwrap();
        let block = tree.children[0].child("block").unwrap();
        assert_eq!(kinds(block), vec!["operator_call", "operator_call"]);
    }

    #[test]
    fn test_parse_definitions_and_control_flow() {
        let source = r#"
            // Parametric box
            module box(w, h = 2) { cube([w, w, h]); }
            function double(x) = x * 2;
            if (true) box(3); else sphere(1);
            for (i = [0 : 2 : 10], j = [1, 2]) translate([i, j, 0]) box(1);
        "#;
        let tree = parse_scad(source).unwrap();
        assert_eq!(
            kinds(&tree),
            vec!["module_def", "function_def", "if_stmt", "for_stmt"]
        );
        let for_stmt = &tree.children[3];
        assert_eq!(
            for_stmt.children.iter().filter(|c| c.is("for_binding")).count(),
            2
        );
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        assert!(parse_scad("module = 3;").is_err());
        let tree = parse_scad("modules = 3;").unwrap();
        assert_eq!(kinds(&tree), vec!["assignment"]);
    }

    #[test]
    fn test_positions_are_tracked() {
        let tree = parse_scad("x = 1;\n  sphere(r = x);").unwrap();
        let call = &tree.children[1];
        assert_eq!(call.pos, SourcePos::new(2, 3));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let err = parse_scad("cube(10;").unwrap_err();
        assert_eq!(err.pos.line, 1);
    }
}
