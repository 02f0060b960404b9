// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Half-open numeric ranges

use std::fmt;

/// `start, start + step, ...` stopping before the first value that reaches
/// `stop` in the direction of `step`.
///
/// Ranges are values: iterating one does not consume it, and the same range
/// can be iterated any number of times. A zero step or a non-finite bound
/// gives an empty range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeValue {
    start: f64,
    step: f64,
    stop: f64,
}

impl RangeValue {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, step, stop }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    fn before_stop(&self, value: f64) -> bool {
        if self.step > 0.0 {
            value < self.stop
        } else {
            value > self.stop
        }
    }

    /// Number of values the range yields
    pub fn len(&self) -> usize {
        let finite = self.start.is_finite() && self.step.is_finite() && self.stop.is_finite();
        if !finite || self.step == 0.0 {
            return 0;
        }
        let span = (self.stop - self.start) / self.step;
        if !(span > 0.0) {
            return 0;
        }

        // The closed form can be off when the division rounds. Values are
        // monotone in the index, so search for the first one that reaches
        // `stop` below the estimate. Counts past `usize::MAX` saturate.
        let estimate = if span >= usize::MAX as f64 {
            usize::MAX
        } else {
            span.ceil() as usize
        };
        let (mut lo, mut hi) = (0, estimate.saturating_add(1));
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.before_stop(self.value_at(mid)) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value_at(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        (index < self.len()).then(|| self.value_at(index))
    }

    pub fn iter(&self) -> RangeIter {
        RangeIter {
            range: *self,
            index: 0,
            len: self.len(),
        }
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use super::value::format_number;
        write!(
            f,
            "[{} : {} : {}]",
            format_number(self.start),
            format_number(self.step),
            format_number(self.stop)
        )
    }
}

impl IntoIterator for RangeValue {
    type Item = f64;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

impl IntoIterator for &RangeValue {
    type Item = f64;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct RangeIter {
    range: RangeValue,
    index: usize,
    len: usize,
}

impl Iterator for RangeIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.len {
            return None;
        }
        let value = self.range.value_at(self.index);
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RangeIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_matches_closed_form() {
        for (start, stop, step) in [
            (0.0, 10.0, 1.0),
            (0.0, 10.0, 3.0),
            (-2.5, 7.0, 0.5),
            (1.0, 2.0, 0.25),
            (0.0, 1.0, 0.1),
        ] {
            let range = RangeValue::new(start, stop, step);
            let expected = ((stop - start) / step).ceil() as usize;
            assert_eq!(range.len(), expected, "range {}", range);
            assert!(range.iter().all(|v| v < stop));
        }
    }

    #[test]
    fn test_descending() {
        let values: Vec<f64> = RangeValue::new(5.0, 0.0, -2.0).iter().collect();
        assert_eq!(values, vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn test_degenerate_ranges_are_empty() {
        assert!(RangeValue::new(3.0, 3.0, 1.0).is_empty());
        assert!(RangeValue::new(0.0, 10.0, 0.0).is_empty());
        assert!(RangeValue::new(0.0, 10.0, -1.0).is_empty());
        assert!(RangeValue::new(0.0, f64::INFINITY, 1.0).is_empty());
        assert!(RangeValue::new(f64::NAN, 1.0, 1.0).is_empty());
    }

    #[test]
    fn test_huge_ranges_saturate() {
        let range = RangeValue::new(0.0, 1e20, 1.0);
        assert_eq!(range.len(), usize::MAX);
        assert!(!range.is_empty());
        assert_eq!(range.get(5), Some(5.0));
        assert_eq!(range.iter().take(3).collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);

        let descending = RangeValue::new(1e20, -1e20, -1.0);
        assert_eq!(descending.len(), usize::MAX);
    }

    #[test]
    fn test_step_below_float_spacing() {
        // Near 1e20 consecutive floats are 16384 apart, so most steps round away
        let range = RangeValue::new(1e20, 1e20 + 65536.0, 1.0);
        let len = range.len();
        assert!(len > 0 && len <= 65536);
        assert!(range.iter().take(100).all(|v| v < range.stop()));
        assert!(range.get(len - 1).is_some_and(|v| v < range.stop()));
    }

    #[test]
    fn test_restartable() {
        let range = RangeValue::new(0.0, 3.0, 1.0);
        let first: Vec<f64> = range.iter().collect();
        let second: Vec<f64> = range.into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(range.get(2), Some(2.0));
        assert_eq!(range.get(3), None);
    }
}
