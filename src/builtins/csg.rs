// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean combinators over the children of an invocation

use super::number;
use crate::error::RuntimeError;
use crate::geometry::{blend, difference, intersection, union, Geometry};
use crate::runtime::{Arguments, CallContext, CallSite, GeometryStream, OperatorEvaluator, Registry};

/// Binary SDF combinator with smoothing radius `k`
pub type Combine = fn(&Geometry, &Geometry, f64) -> Geometry;

pub(super) fn register(registry: &mut Registry) {
    registry.register_operator("union", union_op);
    registry.register_operator("intersection", intersection_op);
    registry.register_operator("difference", difference_op);
    registry.register_operator("blend", blend_op);
}

/// Left-fold `geometries` with `combine`.
///
/// Returns `None` for no geometry. Mixing 2-D and 3-D geometry is a
/// `DimensionMismatch` reported against `site`.
pub fn reduce(
    site: &CallSite,
    geometries: &[Geometry],
    k: f64,
    combine: Combine,
) -> Result<Option<Geometry>, RuntimeError> {
    let mut iter = geometries.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };

    let mut result = first.clone();
    for geometry in iter {
        if geometry.dimension() != result.dimension() {
            return Err(site.dimension_mismatch());
        }
        result = combine(&result, geometry, k);
    }
    Ok(Some(result))
}

fn combinator(
    ctx: &CallContext<'_>,
    args: &Arguments,
    default_k: f64,
    combine: Combine,
) -> Result<OperatorEvaluator, RuntimeError> {
    ctx.check_keywords(args, &["k"]);
    let k = number(ctx, args, "k", Some(0))?.unwrap_or(default_k);
    let site = ctx.site().clone();

    Ok(Box::new(move |children| {
        let geometries = children.collect()?;
        Ok(match reduce(&site, &geometries, k, combine)? {
            Some(geometry) => GeometryStream::once(geometry),
            None => GeometryStream::empty(),
        })
    }))
}

fn union_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    combinator(ctx, args, ctx.config().smoothing.union, union)
}

fn intersection_op(
    ctx: &CallContext<'_>,
    args: &Arguments,
) -> Result<OperatorEvaluator, RuntimeError> {
    combinator(ctx, args, ctx.config().smoothing.intersection, intersection)
}

fn difference_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    combinator(ctx, args, ctx.config().smoothing.difference, difference)
}

fn blend_op(ctx: &CallContext<'_>, args: &Arguments) -> Result<OperatorEvaluator, RuntimeError> {
    combinator(ctx, args, ctx.config().smoothing.blend, blend)
}
