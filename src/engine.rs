// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Rate estimation engine
//!
//! Once per tick the engine turns each channel's buffer into a displayable
//! rate. Every channel runs a one-way two-state machine:
//!
//! | Phase | When | Rate |
//! |-------|------|------|
//! | [`Phase::Bootstrap`] | elapsed < window | `count * unit / elapsed`, no pruning |
//! | [`Phase::Steady`] | elapsed >= window | prune to `(now - window, ..]`, then `count * unit / window` |
//!
//! where `unit` is the channel's [`UnitMode::seconds_per_unit`]. A channel
//! that has reached `Steady` never returns to `Bootstrap`.
//!
//! Every rate is clamped to `[0, capacity]` before it is published.

use std::collections::{BTreeMap, HashMap};

use crate::accumulator::AccumulatorSet;
use crate::error::{ConfigError, SessionError, SinkError};
use crate::event::{ChannelKey, Timestamp};
use crate::registry::{ChannelRegistry, UnitMode};
use crate::sink::PresentationSink;

/// Clamped readings produced by one tick
pub type Readings = BTreeMap<ChannelKey, f64>;

/// Estimation phase of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Less than a full window of history; extrapolate over elapsed time
    Bootstrap,
    /// Full window available; sliding window in effect
    Steady,
}

/// Rate over `span_secs`, expressed in `unit`. Zero for a non-positive span.
pub fn estimate_rate(count: usize, unit: UnitMode, span_secs: f64) -> f64 {
    if span_secs <= 0.0 || !span_secs.is_finite() {
        return 0.0;
    }
    count as f64 * unit.seconds_per_unit() / span_secs
}

/// Outcome of handing one tick's readings to a sink
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    /// Channels updated successfully
    pub updated: usize,
    /// Channels whose update failed
    pub failures: Vec<(ChannelKey, SinkError)>,
}

impl PublishReport {
    /// Check if every update succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Converts accumulators into per-channel rates
#[derive(Debug)]
pub struct EstimationEngine {
    registry: ChannelRegistry,
    window_secs: f64,
    session_start: Option<Timestamp>,
    phases: HashMap<ChannelKey, Phase>,
}

impl EstimationEngine {
    /// Create an engine over the given channels.
    ///
    /// # Errors
    ///
    /// Returns an error if `window_secs` is not a positive finite number.
    pub fn new(registry: ChannelRegistry, window_secs: f64) -> Result<Self, ConfigError> {
        if !(window_secs.is_finite() && window_secs > 0.0) {
            return Err(ConfigError::InvalidWindow(window_secs));
        }
        let phases = registry
            .keys()
            .map(|key| (key.clone(), Phase::Bootstrap))
            .collect();
        Ok(Self {
            registry,
            window_secs,
            session_start: None,
            phases,
        })
    }

    /// Mark the session start. Every channel begins in `Bootstrap`.
    pub fn begin(&mut self, session_start: Timestamp) {
        self.session_start = Some(session_start);
        for phase in self.phases.values_mut() {
            *phase = Phase::Bootstrap;
        }
    }

    /// Session start, if begun
    pub fn session_start(&self) -> Option<Timestamp> {
        self.session_start
    }

    /// Window length in seconds
    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    /// Channels being estimated
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Current phase of a channel
    pub fn phase(&self, key: &str) -> Option<Phase> {
        self.phases.get(key).copied()
    }

    /// Compute one clamped reading per channel, pruning steady channels.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotStarted`] if [`begin`](Self::begin) was
    /// never called.
    pub fn tick(
        &mut self,
        now: Timestamp,
        accumulators: &mut AccumulatorSet,
    ) -> Result<Readings, SessionError> {
        let start = self.session_start.ok_or(SessionError::NotStarted)?;
        let elapsed = now - start;
        let mut readings = Readings::new();

        for channel in self.registry.iter() {
            let phase = self
                .phases
                .entry(channel.key.clone())
                .or_insert(Phase::Bootstrap);

            if *phase == Phase::Bootstrap && elapsed >= self.window_secs {
                *phase = Phase::Steady;
                log::debug!(
                    "Channel {} entered steady phase after {:.1}s",
                    channel.key,
                    elapsed
                );
            }

            let rate = match accumulators.get_mut(&channel.key) {
                Some(acc) => match *phase {
                    Phase::Bootstrap => estimate_rate(acc.count(), channel.unit, elapsed),
                    Phase::Steady => {
                        let cutoff = now - self.window_secs;
                        acc.prune(cutoff);
                        debug_assert!(acc.raw().iter().all(|&ts| ts > cutoff));
                        estimate_rate(acc.count(), channel.unit, self.window_secs)
                    }
                },
                None => 0.0,
            };

            readings.insert(channel.key.clone(), channel.clamp(rate));
        }

        Ok(readings)
    }

    /// Hand readings to a sink, one update per channel.
    ///
    /// A failed update is logged and recorded; the remaining channels are
    /// still updated.
    pub fn publish<S>(&self, readings: &Readings, sink: &mut S) -> PublishReport
    where
        S: PresentationSink + ?Sized,
    {
        let mut report = PublishReport::default();
        for (key, &value) in readings {
            match sink.update(key, value) {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    log::warn!("Error updating display for {}: {}", key, e);
                    report.failures.push((key.clone(), e));
                }
            }
        }
        report
    }
}
