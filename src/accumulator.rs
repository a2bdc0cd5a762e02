// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-channel timestamp buffers
//!
//! A [`RateAccumulator`] is pure bookkeeping: it records event timestamps in
//! arrival order and drops old ones on request. No rate math lives here.

use std::collections::HashMap;

use crate::event::{ChannelKey, Timestamp};
use crate::registry::ChannelRegistry;

/// Append-only timestamp buffer for one channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateAccumulator {
    /// Insertion order is arrival order, not necessarily timestamp order
    buffer: Vec<Timestamp>,
}

impl RateAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event
    pub fn append(&mut self, timestamp: Timestamp) {
        self.buffer.push(timestamp);
    }

    /// Remove every entry `<= cutoff`, keeping survivors in order.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self, cutoff: Timestamp) -> usize {
        let before = self.buffer.len();
        self.buffer.retain(|&ts| ts > cutoff);
        before - self.buffer.len()
    }

    /// Number of buffered timestamps
    pub fn count(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Read-only view of the buffer in arrival order
    pub fn raw(&self) -> &[Timestamp] {
        &self.buffer
    }
}

/// One accumulator per declared channel
#[derive(Debug, Clone, Default)]
pub struct AccumulatorSet {
    accumulators: HashMap<ChannelKey, RateAccumulator>,
}

impl AccumulatorSet {
    /// Create an empty accumulator for every channel in the registry
    pub fn for_registry(registry: &ChannelRegistry) -> Self {
        Self {
            accumulators: registry
                .keys()
                .map(|key| (key.clone(), RateAccumulator::new()))
                .collect(),
        }
    }

    /// Append to a channel's buffer. Returns `false` if the channel is unknown.
    pub fn append(&mut self, key: &str, timestamp: Timestamp) -> bool {
        match self.accumulators.get_mut(key) {
            Some(acc) => {
                acc.append(timestamp);
                true
            }
            None => false,
        }
    }

    /// Get a channel's accumulator
    pub fn get(&self, key: &str) -> Option<&RateAccumulator> {
        self.accumulators.get(key)
    }

    /// Get a channel's accumulator mutably
    pub fn get_mut(&mut self, key: &str) -> Option<&mut RateAccumulator> {
        self.accumulators.get_mut(key)
    }

    /// Buffered count for a channel, 0 if unknown
    pub fn count(&self, key: &str) -> usize {
        self.get(key).map_or(0, RateAccumulator::count)
    }

    /// Total buffered timestamps across all channels
    pub fn total_count(&self) -> usize {
        self.accumulators.values().map(RateAccumulator::count).sum()
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    /// Check if there are no channels
    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;

    #[test]
    fn test_append_and_count() {
        let mut acc = RateAccumulator::new();
        assert!(acc.is_empty());
        acc.append(1.0);
        acc.append(2.0);
        assert_eq!(acc.count(), 2);
        assert_eq!(acc.raw(), &[1.0, 2.0]);
    }

    #[test]
    fn test_prune_keeps_order() {
        let mut acc = RateAccumulator::new();
        for ts in [5.0, 1.0, 7.0, 3.0, 9.0] {
            acc.append(ts);
        }
        let removed = acc.prune(3.0);
        assert_eq!(removed, 2);
        assert_eq!(acc.raw(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_prune_boundary_is_exclusive() {
        let mut acc = RateAccumulator::new();
        acc.append(10.0);
        acc.append(10.5);
        acc.prune(10.0);
        assert_eq!(acc.raw(), &[10.5]);
    }

    #[test]
    fn test_prune_idempotent() {
        let mut acc = RateAccumulator::new();
        for ts in [1.0, 2.0, 3.0, 4.0] {
            acc.append(ts);
        }
        acc.prune(2.0);
        let once = acc.clone();
        assert_eq!(acc.prune(2.0), 0);
        assert_eq!(acc, once);
    }

    #[test]
    fn test_set_for_registry() {
        let registry = ChannelRegistry::declare(vec![
            ChannelConfig::per_second("a"),
            ChannelConfig::per_minute("b"),
        ])
        .unwrap();
        let mut set = AccumulatorSet::for_registry(&registry);
        assert_eq!(set.len(), 2);

        assert!(set.append("a", 1.0));
        assert!(!set.append("zz", 1.0));
        assert_eq!(set.count("a"), 1);
        assert_eq!(set.count("b"), 0);
        assert_eq!(set.count("zz"), 0);
        assert_eq!(set.total_count(), 1);
    }
}
