// Wikispeed Monitor - Session driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Session driver.
//!
//! One task owns the [`Session`] and interleaves two sources: events from
//! the feed channel and a fixed-cadence tick timer. Each branch runs to
//! completion before the next is polled, so the session needs no locks.
//!
//! Teardown closes the feed channel (no further appends) and ends the timer
//! (no further ticks). [`Shutdown::stop`] may be called any number of times
//! from anywhere.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wikispeed::{Clock, EventRecord, Phase, Session, Timestamp};

use crate::board::GaugeBoard;
use crate::error::MonitorError;
use crate::metrics::{increment_events, record_render_failure, update_session_metrics};

/// Idempotent stop signal shared by the driver, the feed and the server.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create a signal in the running state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Receiver that observes the signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Signal stop. Safe to call repeatedly.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Check if stop was signalled.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once stop is signalled.
    pub async fn wait(self) {
        let mut rx = self.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Owns the session and drives it from the feed and the timer.
pub struct Driver<C: Clock> {
    session: Session,
    board: GaugeBoard,
    clock: C,
    tick_interval: Duration,
    started_at: Timestamp,
}

impl<C: Clock> Driver<C> {
    /// Create a driver ticking every `tick_interval`.
    pub fn new(session: Session, board: GaugeBoard, clock: C, tick_interval: Duration) -> Self {
        Self {
            session,
            board,
            clock,
            tick_interval,
            started_at: 0.0,
        }
    }

    /// Start the session and run until shutdown.
    ///
    /// Returns the stopped session. The feed closing its end of the
    /// channel counts as shutdown.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<EventRecord>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Session, MonitorError> {
        self.started_at = self.clock.now();
        self.session.start(self.started_at)?;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => self.tick(),
                event = events.recv() => match event {
                    Some(event) => {
                        self.session.ingest(&event);
                        increment_events();
                    }
                    None => {
                        info!("Feed closed, stopping session");
                        break;
                    }
                },
            }
        }

        // Unsubscribe first so the feed sees a closed channel
        events.close();
        self.session.stop();
        Ok(self.session)
    }

    fn tick(&mut self) {
        let now = self.clock.now();
        let report = match self.session.tick(now, &mut self.board) {
            Ok(report) => report,
            Err(e) => {
                warn!("Tick skipped: {}", e);
                return;
            }
        };

        for (key, _) in &report.publish.failures {
            record_render_failure(key);
        }
        if let Err(e) = self.board.mark_updated(now) {
            warn!("Error updating status board: {}", e);
        }

        let steady = self
            .session
            .registry()
            .keys()
            .filter(|key| self.session.phase(key) == Some(Phase::Steady))
            .count();
        update_session_metrics(now - self.started_at, steady);

        debug!(
            "Tick at {:.1}: {} channels, {} failures",
            now,
            report.readings.len(),
            report.publish.failures.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikispeed::{ManualClock, SessionState, WikispeedConfig};

    fn driver(clock: ManualClock) -> Driver<ManualClock> {
        let session = WikispeedConfig::default().build_session().unwrap();
        let board = GaugeBoard::new(session.registry());
        Driver::new(session, board, clock, Duration::from_millis(5))
    }

    fn edit(wiki: &str, ts: f64) -> EventRecord {
        EventRecord::new(wiki, ts).with_domain(format!("{}.wikipedia.org", &wiki[..2]))
    }

    #[test]
    fn test_shutdown_idempotent() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_stopped());
        shutdown.stop();
        shutdown.stop();
        assert!(shutdown.is_stopped());
    }

    #[tokio::test]
    async fn test_driver_ingests_and_stops() {
        let clock = ManualClock::new(1000.0);
        let driver = driver(clock.clone());
        let shared = driver.board.shared();
        let shutdown = Shutdown::new();
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(driver.run(rx, shutdown.subscribe()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        for ts in [1001.0, 1002.0, 1003.0] {
            tx.send(edit("bnwiki", ts)).await.unwrap();
        }
        clock.set(1003.0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.stop();
        shutdown.stop();
        let session = task.await.unwrap().unwrap();

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.accumulators().count("bnwiki"), 3);
        assert_eq!(session.accumulators().count("global"), 3);

        let board = shared.read().unwrap();
        assert_eq!(board.gauge("bnwiki").unwrap().value, 1.0);
        assert_eq!(board.updated_at, Some(1003.0));
    }

    #[tokio::test]
    async fn test_no_appends_after_stop() {
        let clock = ManualClock::new(0.0);
        let shutdown = Shutdown::new();
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(driver(clock).run(rx, shutdown.subscribe()));
        shutdown.stop();
        let mut session = task.await.unwrap().unwrap();
        let before = session.accumulators().total_count();

        // The feed side is unsubscribed...
        assert!(tx.send(edit("bnwiki", 1.0)).await.is_err());
        // ...and the session itself refuses events.
        session.ingest(&edit("bnwiki", 2.0));
        assert_eq!(session.accumulators().total_count(), before);
    }

    #[tokio::test]
    async fn test_feed_end_stops_session() {
        let clock = ManualClock::new(0.0);
        let shutdown = Shutdown::new();
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(driver(clock).run(rx, shutdown.subscribe()));
        tx.send(edit("bnwiki", 0.5)).await.unwrap();
        drop(tx);

        let session = task.await.unwrap().unwrap();
        assert!(!shutdown.is_stopped());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.accumulators().count("bnwiki"), 1);
    }

    #[tokio::test]
    async fn test_wait_resolves_after_stop() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(shutdown.clone().wait());
        shutdown.stop();
        waiter.await.unwrap();
    }
}
