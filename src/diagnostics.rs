// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! User-facing diagnostics (echo output and evaluation warnings)

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Severity of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Receiver for diagnostics produced during evaluation
pub trait DiagnosticsSink {
    fn emit(&self, level: Level, message: &str);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::Debug => debug!(target: "sdfscad::diagnostics", "{}", message),
            Level::Info => info!(target: "sdfscad::diagnostics", "{}", message),
            Level::Warning => warn!(target: "sdfscad::diagnostics", "{}", message),
            Level::Error => error!(target: "sdfscad::diagnostics", "{}", message),
        }
    }
}

/// Collects diagnostics in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<(Level, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded line with its level
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Recorded messages, in emission order
    pub fn messages(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Messages produced by `echo`
    pub fn echoes(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(_, m)| m.starts_with("ECHO: "))
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.lines.borrow().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl DiagnosticsSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.emit(Level::Info, "ECHO: 1");
        sink.emit(Level::Warning, "something odd");

        assert_eq!(handle.echoes(), vec!["ECHO: 1"]);
        assert_eq!(handle.count(Level::Warning), 1);
        handle.clear();
        assert!(sink.messages().is_empty());
    }
}
