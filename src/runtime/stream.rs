// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Lazy geometry sequences

use crate::error::RuntimeError;
use crate::geometry::Geometry;
use std::iter::FusedIterator;

type Source = Box<dyn Iterator<Item = Result<Geometry, RuntimeError>>>;

/// Lazy, finite, non-restartable sequence of geometry.
///
/// Pulling drives evaluation. After an error has been yielded the stream
/// is finished and yields nothing more.
pub struct GeometryStream {
    source: Source,
    finished: bool,
}

impl GeometryStream {
    pub fn new(source: impl Iterator<Item = Result<Geometry, RuntimeError>> + 'static) -> Self {
        Self {
            source: Box::new(source),
            finished: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn once(geometry: Geometry) -> Self {
        Self::new(std::iter::once(Ok(geometry)))
    }

    pub fn from_vec(geometries: Vec<Geometry>) -> Self {
        Self::new(geometries.into_iter().map(Ok))
    }

    /// Stream yielding a single error
    #[cfg(test)]
    pub(crate) fn failed(err: RuntimeError) -> Self {
        Self::new(std::iter::once(Err(err)))
    }

    /// Stream whose contents are produced by `start` on the first pull
    pub fn deferred(
        start: impl FnOnce() -> Result<GeometryStream, RuntimeError> + 'static,
    ) -> Self {
        Self::new(Deferred {
            start: Some(Box::new(start)),
            current: None,
        })
    }

    /// Drain the stream, stopping at the first error
    pub fn collect_all(self) -> Result<Vec<Geometry>, RuntimeError> {
        self.collect()
    }

    /// Map errors that have no position yet
    pub fn map_err(self, f: impl Fn(RuntimeError) -> RuntimeError + 'static) -> Self {
        Self::new(self.map(move |item| item.map_err(&f)))
    }
}

impl Iterator for GeometryStream {
    type Item = Result<Geometry, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.source.next() {
            Some(Ok(geometry)) => Some(Ok(geometry)),
            Some(Err(err)) => {
                self.finished = true;
                Some(Err(err))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl FusedIterator for GeometryStream {}

type Start = Box<dyn FnOnce() -> Result<GeometryStream, RuntimeError>>;

struct Deferred {
    start: Option<Start>,
    current: Option<GeometryStream>,
}

impl Iterator for Deferred {
    type Item = Result<Geometry, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(start) = self.start.take() {
            match start() {
                Ok(stream) => self.current = Some(stream),
                Err(err) => return Some(Err(err)),
            }
        }
        self.current.as_mut()?.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::make_sphere;
    use std::cell::Cell;
    use std::rc::Rc;

    fn failure() -> RuntimeError {
        RuntimeError::Reuse {
            operator: "test".into(),
            pos: None,
        }
    }

    #[test]
    fn test_stops_after_first_error() {
        let items = vec![Ok(make_sphere(1.0)), Err(failure()), Ok(make_sphere(2.0))];
        let mut stream = GeometryStream::new(items.into_iter());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_deferred_runs_on_first_pull() {
        let started = Rc::new(Cell::new(false));
        let flag = started.clone();
        let mut stream = GeometryStream::deferred(move || {
            flag.set(true);
            Ok(GeometryStream::once(make_sphere(1.0)))
        });
        assert!(!started.get());
        assert!(stream.next().is_some());
        assert!(started.get());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_collect_all_reports_error() {
        let stream = GeometryStream::from_vec(vec![make_sphere(1.0)]);
        assert_eq!(stream.collect_all().unwrap().len(), 1);
        assert_eq!(GeometryStream::failed(failure()).collect_all(), Err(failure()));
    }
}
