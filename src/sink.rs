// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Presentation sinks
//!
//! A [`PresentationSink`] receives one clamped reading per channel per tick.
//! Display is best-effort: a sink with nothing registered for a key accepts
//! the update silently, and a failing update is reported back as a
//! [`SinkError`] for the engine to log.

use std::collections::{BTreeMap, HashMap};

use crate::error::SinkError;
use crate::event::ChannelKey;

/// Receives rate readings for display
pub trait PresentationSink {
    /// Show `value` on the display for `key`
    fn update(&mut self, key: &str, value: f64) -> Result<(), SinkError>;
}

impl<S: PresentationSink + ?Sized> PresentationSink for &mut S {
    fn update(&mut self, key: &str, value: f64) -> Result<(), SinkError> {
        (**self).update(key, value)
    }
}

impl<S: PresentationSink + ?Sized> PresentationSink for Box<S> {
    fn update(&mut self, key: &str, value: f64) -> Result<(), SinkError> {
        (**self).update(key, value)
    }
}

/// Discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn update(&mut self, _key: &str, _value: f64) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Logs every update at `info` level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn update(&mut self, key: &str, value: f64) -> Result<(), SinkError> {
        log::info!("{}: {:.2}", key, value);
        Ok(())
    }
}

/// In-memory sink for testing
#[derive(Debug, Default)]
pub struct MemorySink {
    latest: BTreeMap<ChannelKey, f64>,
    history: Vec<(ChannelKey, f64)>,
    failing: HashMap<ChannelKey, String>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every update for `key` fail with `reason`
    pub fn fail_on(mut self, key: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failing.insert(key.into(), reason.into());
        self
    }

    /// Latest value shown for a key
    pub fn latest(&self, key: &str) -> Option<f64> {
        self.latest.get(key).copied()
    }

    /// All latest values
    pub fn snapshot(&self) -> &BTreeMap<ChannelKey, f64> {
        &self.latest
    }

    /// Every accepted update in order
    pub fn history(&self) -> &[(ChannelKey, f64)] {
        &self.history
    }

    /// Number of accepted updates
    pub fn update_count(&self) -> usize {
        self.history.len()
    }

    /// Clear recorded updates
    pub fn clear(&mut self) {
        self.latest.clear();
        self.history.clear();
    }
}

impl PresentationSink for MemorySink {
    fn update(&mut self, key: &str, value: f64) -> Result<(), SinkError> {
        if let Some(reason) = self.failing.get(key) {
            return Err(SinkError::Rejected {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }
        self.latest.insert(key.to_string(), value);
        self.history.push((key.to_string(), value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemorySink::new();
        sink.update("a", 1.0).unwrap();
        sink.update("a", 2.0).unwrap();
        sink.update("b", 0.5).unwrap();

        assert_eq!(sink.latest("a"), Some(2.0));
        assert_eq!(sink.latest("b"), Some(0.5));
        assert_eq!(sink.update_count(), 3);

        sink.clear();
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn test_memory_sink_failure() {
        let mut sink = MemorySink::new().fail_on("b", "chart not ready");
        let err = sink.update("b", 1.0).unwrap_err();
        assert!(matches!(err, SinkError::Rejected { ref key, .. } if key == "b"));
        assert_eq!(sink.latest("b"), None);
    }

    #[test]
    fn test_boxed_sink() {
        let mut sink: Box<dyn PresentationSink> = Box::new(NullSink);
        assert!(sink.update("anything", 3.0).is_ok());
    }
}
