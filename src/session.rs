// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Rate-tracking session
//!
//! A [`Session`] owns the classifier, the per-channel accumulators and the
//! estimation engine. It is driven from a single thread of control: feed
//! callbacks call [`Session::ingest`] and the timer calls [`Session::tick`].
//! Neither call blocks.
//!
//! # Example
//!
//! ```rust
//! use wikispeed::{EventRecord, MemorySink, WikispeedConfig};
//!
//! let mut session = WikispeedConfig::default().build_session().unwrap();
//! session.start(0.0).unwrap();
//!
//! session.ingest(&EventRecord::new("bnwiki", 1.0).with_domain("bn.wikipedia.org"));
//!
//! let mut sink = MemorySink::new();
//! let report = session.tick(2.0, &mut sink).unwrap();
//! assert_eq!(report.readings["bnwiki"], 0.5);
//!
//! session.stop();
//! ```

use crate::accumulator::AccumulatorSet;
use crate::classifier::{ChannelSet, Classifier};
use crate::engine::{EstimationEngine, Phase, PublishReport, Readings};
use crate::error::{ConfigError, SessionError};
use crate::event::{EventRecord, Timestamp};
use crate::registry::ChannelRegistry;
use crate::sink::PresentationSink;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built, not yet started
    Idle,
    /// Accepting events and ticks
    Running,
    /// Torn down; terminal
    Stopped,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Time the tick was computed for
    pub now: Timestamp,
    /// Clamped reading per channel
    pub readings: Readings,
    /// Sink outcome
    pub publish: PublishReport,
}

/// Event counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Events seen while running
    pub events: u64,
    /// Events that matched at least one channel
    pub matched: u64,
    /// Canary events dropped
    pub canaries: u64,
    /// Events dropped because the session was not running
    pub ignored: u64,
    /// Ticks computed
    pub ticks: u64,
    /// Sink updates that failed
    pub render_failures: u64,
}

/// Owns all mutable rate-tracking state
#[derive(Debug)]
pub struct Session {
    classifier: Classifier,
    engine: EstimationEngine,
    accumulators: AccumulatorSet,
    state: SessionState,
    stats: SessionStats,
}

impl Session {
    /// Assemble a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is invalid or the classifier's
    /// aggregate channel is not in `registry`.
    pub fn new(
        registry: ChannelRegistry,
        classifier: Classifier,
        window_secs: f64,
    ) -> Result<Self, ConfigError> {
        if let Some(key) = classifier.aggregate_key() {
            registry.require(key)?;
        }
        let accumulators = AccumulatorSet::for_registry(&registry);
        let engine = EstimationEngine::new(registry, window_secs)?;
        Ok(Self {
            classifier,
            engine,
            accumulators,
            state: SessionState::Idle,
            stats: SessionStats::default(),
        })
    }

    /// Start the session clock at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is already running or was stopped.
    pub fn start(&mut self, now: Timestamp) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {
                self.engine.begin(now);
                self.state = SessionState::Running;
                log::info!(
                    "Session started with {} channels, {}s window",
                    self.engine.registry().len(),
                    self.engine.window_secs()
                );
                Ok(())
            }
            SessionState::Running => Err(SessionError::AlreadyStarted),
            SessionState::Stopped => Err(SessionError::Stopped),
        }
    }

    /// Classify one event and record it.
    ///
    /// Events arriving before `start` or after `stop` are dropped without
    /// touching any buffer.
    pub fn ingest(&mut self, event: &EventRecord) -> ChannelSet {
        if self.state != SessionState::Running {
            self.stats.ignored += 1;
            log::trace!("Ignoring event from {} ({:?})", event.origin_key, self.state);
            return ChannelSet::new();
        }

        self.stats.events += 1;
        if event.is_canary {
            self.stats.canaries += 1;
        }

        let keys = self.classifier.classify(event, &mut self.accumulators);
        if !keys.is_empty() {
            self.stats.matched += 1;
        }
        keys
    }

    /// Compute readings for `now` and push them to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not running.
    pub fn tick<S>(&mut self, now: Timestamp, sink: &mut S) -> Result<TickReport, SessionError>
    where
        S: PresentationSink + ?Sized,
    {
        let readings = self.estimate(now)?;
        let publish = self.engine.publish(&readings, sink);
        self.stats.render_failures += publish.failures.len() as u64;
        Ok(TickReport {
            now,
            readings,
            publish,
        })
    }

    /// Compute readings for `now` without publishing them.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not running.
    pub fn estimate(&mut self, now: Timestamp) -> Result<Readings, SessionError> {
        match self.state {
            SessionState::Idle => return Err(SessionError::NotStarted),
            SessionState::Stopped => return Err(SessionError::Stopped),
            SessionState::Running => {}
        }
        let readings = self.engine.tick(now, &mut self.accumulators)?;
        self.stats.ticks += 1;
        Ok(readings)
    }

    /// Stop the session. Safe to call any number of times.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn stop(&mut self) -> bool {
        if self.state == SessionState::Stopped {
            return false;
        }
        self.state = SessionState::Stopped;
        log::info!(
            "Session stopped after {} events, {} ticks",
            self.stats.events,
            self.stats.ticks
        );
        true
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the session accepts events and ticks
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Declared channels
    pub fn registry(&self) -> &ChannelRegistry {
        self.engine.registry()
    }

    /// Read-only view of the accumulators
    pub fn accumulators(&self) -> &AccumulatorSet {
        &self.accumulators
    }

    /// Current phase of a channel
    pub fn phase(&self, key: &str) -> Option<Phase> {
        self.engine.phase(key)
    }

    /// Window length in seconds
    pub fn window_secs(&self) -> f64 {
        self.engine.window_secs()
    }

    /// Event and tick counters
    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}
