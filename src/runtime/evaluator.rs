// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Statement execution and expression evaluation
//!
//! Blocks are executed lazily: a [`BlockStream`] runs one statement per pull
//! until a statement yields geometry, then drains that geometry before moving
//! on. Frames are owned by the stream that runs the block and are released
//! when it finishes or is dropped.

use super::binding::{bind_parameters, Arguments};
use super::children::{ChildrenProvider, ChildrenSlot};
use super::range::RangeValue;
use super::registry::{
    CallContext, CallSite, Function, FunctionClosure, ModuleClosure, Operator, Registry,
};
use super::scope::{FrameGuard, FrameId, ScopeArena};
use super::stream::GeometryStream;
use super::value::{binary, compare, negate, Value};
use crate::config::Config;
use crate::diagnostics::{DiagnosticsSink, Level};
use crate::error::{CallableKind, RuntimeError};
use crate::fonts::FontResolver;
use crate::geometry::Geometry;
use crate::ir::{
    Argument, BinaryOp, Expr, ExprKind, ForBinding, Invocation, Program, SourcePos, Statement,
    StatementKind,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Remaining stack below which deep evaluation switches to a new segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Run `f`, growing the native stack first if it is close to exhausted.
/// User recursion nests Rust calls, so this keeps `max_recursion_depth`
/// the only limit on it.
fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

/// State shared by every stream of one evaluation
pub(crate) struct Evaluation {
    scopes: Rc<RefCell<ScopeArena>>,
    registry: Rc<Registry>,
    config: Rc<Config>,
    diagnostics: Rc<dyn DiagnosticsSink>,
    fonts: Rc<dyn FontResolver>,
    depth: Cell<usize>,
}

impl Evaluation {
    pub(crate) fn new(
        registry: Rc<Registry>,
        config: Rc<Config>,
        diagnostics: Rc<dyn DiagnosticsSink>,
        fonts: Rc<dyn FontResolver>,
    ) -> Rc<Self> {
        Rc::new(Self {
            scopes: Rc::new(RefCell::new(ScopeArena::new())),
            registry,
            config,
            diagnostics,
            fonts,
            depth: Cell::new(0),
        })
    }

    /// Run `program` in a fresh root frame
    pub(crate) fn run(self: &Rc<Self>, program: &Program) -> GeometryStream {
        let root = FrameGuard::push(&self.scopes, None);
        block(self, program.clone(), root, None)
    }

    #[cfg(test)]
    pub(crate) fn live_frames(&self) -> usize {
        self.scopes.borrow().live()
    }

    fn warn(&self, message: impl fmt::Display, pos: SourcePos) {
        self.diagnostics
            .emit(Level::Warning, &format!("{} at {}", message, pos));
    }

    fn call_context(&self, site: CallSite) -> CallContext<'_> {
        CallContext::new(
            site,
            &self.config,
            self.diagnostics.as_ref(),
            self.fonts.as_ref(),
        )
    }

    /// Count one more nested user call
    fn enter(self: &Rc<Self>, name: &str, pos: SourcePos) -> Result<DepthGuard, RuntimeError> {
        let limit = self.config.max_recursion_depth;
        if self.depth.get() >= limit {
            return Err(RuntimeError::RecursionLimit {
                name: name.to_string(),
                limit,
                pos: Some(pos),
            });
        }
        self.depth.set(self.depth.get() + 1);
        Ok(DepthGuard { eval: self.clone() })
    }
}

struct DepthGuard {
    eval: Rc<Evaluation>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.eval.depth.set(self.eval.depth.get().saturating_sub(1));
    }
}

fn block(
    eval: &Rc<Evaluation>,
    body: Program,
    frame: FrameGuard,
    depth: Option<DepthGuard>,
) -> GeometryStream {
    GeometryStream::new(BlockStream {
        current: None,
        id: frame.id(),
        frame: Some(frame),
        _depth: depth,
        eval: eval.clone(),
        body,
        next: 0,
    })
}

// Field order is drop order: nested streams release their frames first
struct BlockStream {
    current: Option<GeometryStream>,
    frame: Option<FrameGuard>,
    _depth: Option<DepthGuard>,
    id: FrameId,
    eval: Rc<Evaluation>,
    body: Program,
    next: usize,
}

impl BlockStream {
    fn finish(&mut self) {
        self.current = None;
        self.frame = None;
        self._depth = None;
    }
}

impl Iterator for BlockStream {
    type Item = Result<Geometry, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        with_stack(|| self.pull())
    }
}

impl BlockStream {
    fn pull(&mut self) -> Option<Result<Geometry, RuntimeError>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(item) = current.next() {
                    if item.is_err() {
                        self.finish();
                    }
                    return Some(item);
                }
                self.current = None;
            }

            let Some(statement) = self.body.statements().get(self.next) else {
                self.finish();
                return None;
            };
            self.next += 1;

            match execute(&self.eval, self.id, statement) {
                Ok(Some(stream)) => self.current = Some(stream),
                Ok(None) => {}
                Err(err) => {
                    self.next = self.body.len();
                    self.finish();
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Run one statement; geometry-producing statements return their stream
fn execute(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    statement: &Statement,
) -> Result<Option<GeometryStream>, RuntimeError> {
    match &statement.kind {
        StatementKind::Assign { name, value } => {
            let value = eval_expr(eval, frame, value)?;
            eval.scopes.borrow_mut().set_var(frame, name, value);
            Ok(None)
        }
        StatementKind::Expr(expr) => {
            eval_expr(eval, frame, expr)?;
            Ok(None)
        }
        StatementKind::Invoke(invocation) => {
            invoke(eval, frame, invocation, statement.pos).map(Some)
        }
        StatementKind::ModuleDef(def) => {
            let closure = Rc::new(ModuleClosure {
                def: def.clone(),
                frame,
            });
            eval.scopes
                .borrow_mut()
                .define_operator(frame, &def.name, Operator::Module(closure));
            Ok(None)
        }
        StatementKind::FunctionDef(def) => {
            let closure = Rc::new(FunctionClosure {
                def: def.clone(),
                frame,
            });
            eval.scopes
                .borrow_mut()
                .define_function(frame, &def.name, Function::User(closure));
            Ok(None)
        }
        StatementKind::If {
            condition,
            then_body,
            else_body,
        } => {
            let branch = if eval_expr(eval, frame, condition)?.is_truthy() {
                then_body
            } else {
                else_body
            };
            if branch.is_empty() {
                return Ok(None);
            }
            let guard = FrameGuard::push(&eval.scopes, Some(frame));
            Ok(Some(block(eval, branch.clone(), guard, None)))
        }
        StatementKind::For { bindings, body } => {
            let stream = ForStream::start(eval, frame, bindings, body)?;
            Ok(Some(GeometryStream::new(stream)))
        }
    }
}

fn arguments(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    args: &[Argument],
) -> Result<Arguments, RuntimeError> {
    let mut evaluated = Arguments::new();
    for arg in args {
        let value = eval_expr(eval, frame, &arg.value)?;
        match &arg.name {
            Some(name) => evaluated.push_named(name.as_str(), value),
            None => evaluated.push_positional(value),
        }
    }
    Ok(evaluated)
}

fn invoke(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    invocation: &Invocation,
    pos: SourcePos,
) -> Result<GeometryStream, RuntimeError> {
    let name = invocation.name.as_str();
    let site = CallSite::new(name, pos);
    let user = eval.scopes.borrow().lookup_operator(frame, name);

    let operator = match user {
        Some(operator) => operator,
        None if name == "children" => {
            let args = arguments(eval, frame, &invocation.args)?;
            return Ok(children(eval, frame, args, site));
        }
        None => eval
            .registry
            .operator(name)
            .ok_or_else(|| RuntimeError::Lookup {
                kind: CallableKind::Operator,
                name: name.to_string(),
                pos: Some(pos),
            })?,
    };

    let args = arguments(eval, frame, &invocation.args)?;
    let provider = body_provider(eval, frame, &invocation.body, site.clone());

    match operator {
        Operator::Builtin(factory) => {
            let evaluator = factory(&eval.call_context(site), &args).map_err(|e| e.or_at(pos))?;
            Ok(GeometryStream::deferred(move || evaluator(provider)).map_err(move |e| e.or_at(pos)))
        }
        Operator::Module(closure) => {
            let eval = eval.clone();
            Ok(
                GeometryStream::deferred(move || enter_module(&eval, &closure, &args, provider, pos))
                    .map_err(move |e| e.or_at(pos)),
            )
        }
    }
}

/// Provider running `body` in a fresh child frame of the caller
fn body_provider(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    body: &Program,
    site: CallSite,
) -> ChildrenProvider {
    if body.is_empty() {
        return ChildrenProvider::empty(site);
    }
    let eval = eval.clone();
    let body = body.clone();
    ChildrenProvider::new(site, move || {
        let guard = FrameGuard::push(&eval.scopes, Some(frame));
        block(&eval, body, guard, None)
    })
}

fn enter_module(
    eval: &Rc<Evaluation>,
    closure: &ModuleClosure,
    args: &Arguments,
    provider: ChildrenProvider,
    pos: SourcePos,
) -> Result<GeometryStream, RuntimeError> {
    let def = &closure.def;
    trace!(module = %def.name, "entering module");
    let depth = eval.enter(&def.name, pos)?;
    let bound = bind_parameters(&def.name, &def.params, args, |expr| {
        eval_expr(eval, closure.frame, expr)
    })?;

    let guard = FrameGuard::push(&eval.scopes, Some(closure.frame));
    {
        let mut scopes = eval.scopes.borrow_mut();
        for (name, value) in bound {
            scopes.set_var(guard.id(), &name, value);
        }
        scopes.set_children(guard.id(), Rc::new(ChildrenSlot::new(provider)));
    }
    Ok(block(eval, def.body.clone(), guard, Some(depth)))
}

/// `children(...)`: geometry of the nearest enclosing module invocation
fn children(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    args: Arguments,
    site: CallSite,
) -> GeometryStream {
    let eval = eval.clone();
    GeometryStream::deferred(move || {
        let slot = eval.scopes.borrow().find_children(frame);
        let Some(slot) = slot else {
            eval.warn("children() outside of a module has nothing to yield", site.pos);
            return Ok(GeometryStream::empty());
        };
        let geometries = slot.geometries().map_err(|e| e.or_at(site.pos))?;
        Ok(GeometryStream::from_vec(select_children(
            &eval,
            &geometries,
            &args,
            &site,
        )))
    })
}

fn select_children(
    eval: &Evaluation,
    geometries: &[Geometry],
    args: &Arguments,
    site: &CallSite,
) -> Vec<Geometry> {
    // Ranges are walked lazily; they may be far longer than the child list
    let (indices, step): (Box<dyn Iterator<Item = f64> + '_>, f64) = match args.get("index", 0) {
        None => return geometries.to_vec(),
        Some(Value::Number(i)) => (Box::new(std::iter::once(*i)), 0.0),
        Some(Value::Range(range)) => (Box::new(range.iter()), range.step()),
        Some(Value::Vector(items)) => (Box::new(items.iter().filter_map(Value::as_number)), 0.0),
        Some(other) => {
            eval.warn(
                format_args!("children() cannot select with a {}", other.type_name()),
                site.pos,
            );
            return Vec::new();
        }
    };

    let count = geometries.len() as f64;
    let mut selected = Vec::new();
    for index in indices {
        let child = (index >= 0.0)
            .then(|| geometries.get(index.floor() as usize))
            .flatten();
        if let Some(geometry) = child {
            selected.push(geometry.clone());
            continue;
        }
        eval.warn(
            format_args!(
                "children index {} out of range for {} children",
                index,
                geometries.len()
            ),
            site.pos,
        );
        // A range moving away from the children never comes back
        if (step > 0.0 && index >= count) || (step < 0.0 && index < 0.0) {
            break;
        }
    }
    selected
}

/// Values a `for` binding iterates over
enum Domain {
    Values(Vec<Value>),
    Range { range: RangeValue, len: usize },
}

impl Domain {
    fn of(value: Value) -> Self {
        match value {
            Value::Undef => Domain::Values(Vec::new()),
            Value::Vector(items) => Domain::Values(items),
            Value::Range(range) => Domain::Range {
                len: range.len(),
                range,
            },
            Value::String(s) => {
                Domain::Values(s.chars().map(|c| Value::String(c.to_string())).collect())
            }
            scalar => Domain::Values(vec![scalar]),
        }
    }

    fn len(&self) -> usize {
        match self {
            Domain::Values(values) => values.len(),
            Domain::Range { len, .. } => *len,
        }
    }

    fn get(&self, index: usize) -> Value {
        match self {
            Domain::Values(values) => values.get(index).cloned().unwrap_or_default(),
            Domain::Range { range, len } if index < *len => {
                Value::Number(range.start() + index as f64 * range.step())
            }
            Domain::Range { .. } => Value::Undef,
        }
    }
}

/// Cartesian iteration with the first binding outermost; each tuple runs the
/// body in its own frame
struct ForStream {
    current: Option<GeometryStream>,
    eval: Rc<Evaluation>,
    parent: FrameId,
    names: Vec<String>,
    domains: Vec<Domain>,
    cursor: Option<Vec<usize>>,
    body: Program,
}

impl ForStream {
    fn start(
        eval: &Rc<Evaluation>,
        parent: FrameId,
        bindings: &[ForBinding],
        body: &Program,
    ) -> Result<Self, RuntimeError> {
        let mut names = Vec::with_capacity(bindings.len());
        let mut domains = Vec::with_capacity(bindings.len());
        for binding in bindings {
            names.push(binding.name.clone());
            domains.push(Domain::of(eval_expr(eval, parent, &binding.iterable)?));
        }

        let cursor = if domains.iter().any(|d| d.len() == 0) {
            None
        } else {
            Some(vec![0; domains.len()])
        };

        Ok(Self {
            current: None,
            eval: eval.clone(),
            parent,
            names,
            domains,
            cursor,
            body: body.clone(),
        })
    }
}

/// Step the odometer; false once every tuple has been visited
fn advance(cursor: &mut [usize], domains: &[Domain]) -> bool {
    for k in (0..cursor.len()).rev() {
        cursor[k] += 1;
        if cursor[k] < domains[k].len() {
            return true;
        }
        cursor[k] = 0;
    }
    false
}

impl Iterator for ForStream {
    type Item = Result<Geometry, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(item) = current.next() {
                    if item.is_err() {
                        self.cursor = None;
                    }
                    return Some(item);
                }
                self.current = None;
            }

            let cursor = self.cursor.as_mut()?;
            let guard = FrameGuard::push(&self.eval.scopes, Some(self.parent));
            {
                let mut scopes = self.eval.scopes.borrow_mut();
                for ((name, domain), &index) in self.names.iter().zip(&self.domains).zip(cursor.iter()) {
                    scopes.set_var(guard.id(), name, domain.get(index));
                }
            }
            if !advance(cursor, &self.domains) {
                self.cursor = None;
            }
            self.current = Some(block(&self.eval, self.body.clone(), guard, None));
        }
    }
}

fn operator_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "^",
    }
}

pub(crate) fn eval_expr(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    expr: &Expr,
) -> Result<Value, RuntimeError> {
    with_stack(|| eval_expr_in(eval, frame, expr))
}

fn eval_expr_in(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    expr: &Expr,
) -> Result<Value, RuntimeError> {
    let value = match &expr.kind {
        ExprKind::Number(n) => Value::Number(*n),
        ExprKind::String(s) => Value::String(s.clone()),
        ExprKind::Bool(b) => Value::Bool(*b),
        ExprKind::Undef => Value::Undef,
        ExprKind::Variable(name) => {
            let found = eval.scopes.borrow().lookup_var(frame, name);
            match found {
                Some(value) => value,
                // Unset special variables read as undef
                None if name.starts_with('$') => Value::Undef,
                None => {
                    return Err(RuntimeError::Name {
                        name: name.clone(),
                        pos: Some(expr.pos),
                    })
                }
            }
        }
        ExprKind::Vector(items) => Value::Vector(
            items
                .iter()
                .map(|item| eval_expr(eval, frame, item))
                .collect::<Result<_, _>>()?,
        ),
        ExprKind::Index { target, index } => {
            let target = eval_expr(eval, frame, target)?;
            let index = eval_expr(eval, frame, index)?;
            match target.index(&index) {
                Some(value) => value,
                None => {
                    if target.len().is_none() || index.as_number().is_none() {
                        eval.warn(
                            format_args!(
                                "cannot index {} with {}",
                                target.type_name(),
                                index.type_name()
                            ),
                            expr.pos,
                        );
                    }
                    Value::Undef
                }
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(eval, frame, lhs)?;
            let rhs = eval_expr(eval, frame, rhs)?;
            binary(*op, &lhs, &rhs).unwrap_or_else(|| {
                eval.warn(
                    format_args!(
                        "undefined operation {} {} {}",
                        lhs.type_name(),
                        operator_symbol(*op),
                        rhs.type_name()
                    ),
                    expr.pos,
                );
                Value::Undef
            })
        }
        ExprKind::Negate(operand) => {
            let operand = eval_expr(eval, frame, operand)?;
            negate(&operand).unwrap_or_else(|| {
                eval.warn(
                    format_args!("cannot negate {}", operand.type_name()),
                    expr.pos,
                );
                Value::Undef
            })
        }
        ExprKind::Not(operand) => Value::Bool(!eval_expr(eval, frame, operand)?.is_truthy()),
        ExprKind::Compare { op, lhs, rhs } => {
            let lhs = eval_expr(eval, frame, lhs)?;
            let rhs = eval_expr(eval, frame, rhs)?;
            compare(*op, &lhs, &rhs).unwrap_or_else(|| {
                eval.warn(
                    format_args!(
                        "cannot order {} against {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                    expr.pos,
                );
                Value::Undef
            })
        }
        ExprKind::And(lhs, rhs) => Value::Bool(
            eval_expr(eval, frame, lhs)?.is_truthy() && eval_expr(eval, frame, rhs)?.is_truthy(),
        ),
        ExprKind::Or(lhs, rhs) => Value::Bool(
            eval_expr(eval, frame, lhs)?.is_truthy() || eval_expr(eval, frame, rhs)?.is_truthy(),
        ),
        ExprKind::Ternary {
            condition,
            then,
            otherwise,
        } => {
            if eval_expr(eval, frame, condition)?.is_truthy() {
                eval_expr(eval, frame, then)?
            } else {
                eval_expr(eval, frame, otherwise)?
            }
        }
        ExprKind::Range { start, step, stop } => {
            let start = eval_expr(eval, frame, start)?;
            let step = match step {
                Some(step) => eval_expr(eval, frame, step)?,
                None => Value::Number(1.0),
            };
            let stop = eval_expr(eval, frame, stop)?;
            match (start.as_number(), step.as_number(), stop.as_number()) {
                (Some(start), Some(step), Some(stop)) => {
                    Value::Range(RangeValue::new(start, stop, step))
                }
                _ => {
                    eval.warn("range bounds must be numbers", expr.pos);
                    Value::Undef
                }
            }
        }
        ExprKind::Call { name, args } => {
            let args = arguments(eval, frame, args)?;
            call_function(eval, frame, name, &args, expr.pos)?
        }
    };
    Ok(value)
}

fn call_function(
    eval: &Rc<Evaluation>,
    frame: FrameId,
    name: &str,
    args: &Arguments,
    pos: SourcePos,
) -> Result<Value, RuntimeError> {
    let user = eval.scopes.borrow().lookup_function(frame, name);
    let function = match user {
        Some(function) => function,
        None => eval
            .registry
            .function(name)
            .ok_or_else(|| RuntimeError::Lookup {
                kind: CallableKind::Function,
                name: name.to_string(),
                pos: Some(pos),
            })?,
    };

    match function {
        Function::Builtin(function) => {
            function(&eval.call_context(CallSite::new(name, pos)), args).map_err(|e| e.or_at(pos))
        }
        Function::User(closure) => {
            let _depth = eval.enter(name, pos)?;
            let def = &closure.def;
            let bound = bind_parameters(name, &def.params, args, |expr| {
                eval_expr(eval, closure.frame, expr)
            })
            .map_err(|e| e.or_at(pos))?;

            let guard = FrameGuard::push(&eval.scopes, Some(closure.frame));
            {
                let mut scopes = eval.scopes.borrow_mut();
                for (param, value) in bound {
                    scopes.set_var(guard.id(), &param, value);
                }
            }
            let result = eval_expr(eval, guard.id(), &def.body);
            drop(guard);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::diagnostics::MemorySink;
    use crate::fonts::FontCache;
    use crate::io::parse_scad;

    fn evaluation(sink: &MemorySink, config: Config) -> Rc<Evaluation> {
        Evaluation::new(
            Rc::new(Registry::with_builtins()),
            Rc::new(config),
            Rc::new(sink.clone()),
            Rc::new(FontCache::new("fonts")),
        )
    }

    fn program(source: &str) -> Program {
        compile(&parse_scad(source).unwrap()).unwrap()
    }

    #[test]
    fn test_frames_released_after_drain() {
        let sink = MemorySink::new();
        let eval = evaluation(&sink, Config::default());
        let source = "module m() { children(); } for (i = [0:3]) m() sphere(i + 1);";
        let geometries = eval.run(&program(source)).collect_all().unwrap();
        assert_eq!(geometries.len(), 3);
        assert_eq!(eval.live_frames(), 0);
    }

    #[test]
    fn test_statements_run_on_pull() {
        let sink = MemorySink::new();
        let eval = evaluation(&sink, Config::default());
        let mut stream = eval.run(&program("echo(1); sphere(1); echo(2); sphere(2);"));
        assert!(sink.echoes().is_empty());

        assert!(stream.next().unwrap().is_ok());
        assert_eq!(sink.echoes(), vec!["ECHO: 1"]);
        assert!(stream.next().unwrap().is_ok());
        assert_eq!(sink.echoes().len(), 2);
        drop(stream);
        assert_eq!(eval.live_frames(), 0);
    }

    #[test]
    fn test_recursion_limit() {
        let sink = MemorySink::new();
        let config = Config {
            max_recursion_depth: 16,
            ..Config::default()
        };
        let eval = evaluation(&sink, config);
        let result = eval
            .run(&program("function f(n) = f(n + 1); x = f(0);"))
            .collect_all();
        assert!(matches!(
            result,
            Err(RuntimeError::RecursionLimit { limit: 16, .. })
        ));
        assert_eq!(eval.depth.get(), 0);
    }

    #[test]
    fn test_odometer_order() {
        let domains = vec![
            Domain::of(Value::Vector(vec![Value::Number(0.0), Value::Number(1.0)])),
            Domain::of(Value::String("ab".into())),
        ];
        let mut cursor = vec![0, 0];
        let mut seen = vec![cursor.clone()];
        while advance(&mut cursor, &domains) {
            seen.push(cursor.clone());
        }
        assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    }
}
