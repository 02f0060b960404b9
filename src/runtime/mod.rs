// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runtime: lazily evaluates IR programs into geometry

mod binding;
mod children;
mod evaluator;
mod interpreter;
mod range;
mod registry;
mod scope;
mod stream;
mod value;

pub use binding::Arguments;
pub use children::ChildrenProvider;
pub use interpreter::Interpreter;
pub use range::{RangeIter, RangeValue};
pub use registry::{
    CallContext, CallSite, Function, FunctionClosure, ModuleClosure, Operator, OperatorEvaluator,
    OperatorFactory, PureFunction, Registry,
};
pub use scope::FrameId;
pub use stream::GeometryStream;
pub use value::{binary, compare, div, format_number, negate, Value};
