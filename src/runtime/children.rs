// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! The children protocol between an invocation and its body

use super::registry::CallSite;
use super::stream::GeometryStream;
use crate::error::RuntimeError;
use crate::geometry::Geometry;
use std::cell::RefCell;
use std::rc::Rc;

type Source = Box<dyn FnOnce() -> GeometryStream>;

/// One-shot source of the geometry produced by an invocation's body.
///
/// Nothing in the body runs until [`take`](Self::take) is called and the
/// returned stream is pulled. Taking it a second time is a `Reuse` error.
pub struct ChildrenProvider {
    source: Option<Source>,
    site: CallSite,
}

impl ChildrenProvider {
    pub fn new(site: CallSite, source: impl FnOnce() -> GeometryStream + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            site,
        }
    }

    /// Provider for an invocation without a body
    pub fn empty(site: CallSite) -> Self {
        Self::new(site, GeometryStream::empty)
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    pub fn take(&mut self) -> Result<GeometryStream, RuntimeError> {
        match self.source.take() {
            Some(source) => Ok(source()),
            None => Err(self.site.reuse()),
        }
    }

    /// Take the stream and drain it
    pub fn collect(mut self) -> Result<Vec<Geometry>, RuntimeError> {
        self.take()?.collect_all()
    }
}

enum SlotState {
    Pending(ChildrenProvider),
    Forcing(CallSite),
    Ready(Rc<[Geometry]>),
}

/// The `children` binding of a module body: forces the provider once and
/// keeps the result so it can be indexed repeatedly
pub(crate) struct ChildrenSlot {
    state: RefCell<SlotState>,
}

impl ChildrenSlot {
    pub(crate) fn new(provider: ChildrenProvider) -> Self {
        Self {
            state: RefCell::new(SlotState::Pending(provider)),
        }
    }

    pub(crate) fn geometries(&self) -> Result<Rc<[Geometry]>, RuntimeError> {
        let pending = {
            let mut state = self.state.borrow_mut();
            match &*state {
                SlotState::Ready(geometries) => return Ok(geometries.clone()),
                // children() reached again while its own body is being evaluated
                SlotState::Forcing(site) => return Err(site.reuse()),
                SlotState::Pending(provider) => {
                    let site = provider.site().clone();
                    std::mem::replace(&mut *state, SlotState::Forcing(site))
                }
            }
        };
        let SlotState::Pending(provider) = pending else {
            return Ok(Rc::from(Vec::new()));
        };

        // The provider runs arbitrary user code; no borrow may be held here
        let site = provider.site().clone();
        match provider.collect() {
            Ok(geometries) => {
                let geometries: Rc<[Geometry]> = geometries.into();
                *self.state.borrow_mut() = SlotState::Ready(geometries.clone());
                Ok(geometries)
            }
            Err(err) => {
                *self.state.borrow_mut() = SlotState::Forcing(site);
                Err(err)
            }
        }
    }
}
