// Wikispeed Monitor - Gauge board
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Gauge board sink.
//!
//! The [`GaugeBoard`] is the monitor's presentation sink: every reading goes
//! to the Prometheus gauges and to a shared status board served as JSON.
//! Channels start at 0 so the board is never blank.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use wikispeed::{ChannelRegistry, PresentationSink, SinkError, Timestamp, Zone};

use crate::metrics::{set_channel_capacity, update_channel_rate};

/// One gauge as shown on the status board.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GaugeReading {
    pub channel: String,
    pub title: String,
    pub unit: &'static str,
    pub capacity: f64,
    pub value: f64,
    pub zone: Zone,
}

/// Status board contents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardSnapshot {
    /// Time of the last tick, if any.
    pub updated_at: Option<Timestamp>,
    /// Gauges in declaration order.
    pub gauges: Vec<GaugeReading>,
}

impl BoardSnapshot {
    /// Look up a gauge by channel key.
    pub fn gauge(&self, channel: &str) -> Option<&GaugeReading> {
        self.gauges.iter().find(|g| g.channel == channel)
    }
}

/// Status board shared with the HTTP handlers.
pub type SharedBoard = Arc<RwLock<BoardSnapshot>>;

/// Presentation sink feeding Prometheus and the status board.
pub struct GaugeBoard {
    registry: ChannelRegistry,
    shared: SharedBoard,
}

impl GaugeBoard {
    /// Create a board with every channel at 0.
    pub fn new(registry: &ChannelRegistry) -> Self {
        let gauges = registry
            .iter()
            .map(|channel| {
                set_channel_capacity(&channel.key, channel.unit.label(), channel.capacity);
                GaugeReading {
                    channel: channel.key.clone(),
                    title: channel.display_name().to_string(),
                    unit: channel.unit.label(),
                    capacity: channel.capacity,
                    value: 0.0,
                    zone: Zone::Low,
                }
            })
            .collect();

        Self {
            registry: registry.clone(),
            shared: Arc::new(RwLock::new(BoardSnapshot {
                updated_at: None,
                gauges,
            })),
        }
    }

    /// Handle for readers.
    pub fn shared(&self) -> SharedBoard {
        Arc::clone(&self.shared)
    }

    /// Record the time of the tick just published.
    pub fn mark_updated(&self, now: Timestamp) -> Result<(), SinkError> {
        let mut board = self
            .shared
            .write()
            .map_err(|_| SinkError::Unavailable("status board lock poisoned".to_string()))?;
        board.updated_at = Some(now);
        Ok(())
    }
}

impl PresentationSink for GaugeBoard {
    fn update(&mut self, key: &str, value: f64) -> Result<(), SinkError> {
        // No display for this key: nothing to do
        let Some(channel) = self.registry.get(key) else {
            return Ok(());
        };
        let zone = channel.zone(value);

        update_channel_rate(key, channel.unit.label(), value, zone);

        let mut board = self
            .shared
            .write()
            .map_err(|_| SinkError::Unavailable("status board lock poisoned".to_string()))?;
        if let Some(gauge) = board.gauges.iter_mut().find(|g| g.channel == key) {
            gauge.value = value;
            gauge.zone = zone;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikispeed::WikispeedConfig;

    fn board() -> GaugeBoard {
        let registry = WikispeedConfig::default().registry().unwrap();
        GaugeBoard::new(&registry)
    }

    #[test]
    fn test_board_starts_at_zero() {
        let board = board();
        let shared = board.shared();
        let snapshot = shared.read().unwrap();
        assert_eq!(snapshot.gauges.len(), 8);
        assert!(snapshot.gauges.iter().all(|g| g.value == 0.0));
        assert_eq!(snapshot.gauges[0].channel, "global");
        assert_eq!(snapshot.gauge("global").unwrap().unit, "edits/min");
        assert!(snapshot.updated_at.is_none());
    }

    #[test]
    fn test_update_sets_value_and_zone() {
        let mut board = board();
        board.update("bnwiki", 8.0).unwrap();
        board.mark_updated(42.0).unwrap();

        let shared = board.shared();
        let snapshot = shared.read().unwrap();
        let gauge = snapshot.gauge("bnwiki").unwrap();
        assert_eq!(gauge.value, 8.0);
        assert_eq!(gauge.zone, Zone::High);
        assert_eq!(snapshot.updated_at, Some(42.0));
    }

    #[test]
    fn test_unknown_key_is_not_an_error() {
        let mut board = board();
        assert!(board.update("enwiki", 1.0).is_ok());
    }

    #[test]
    fn test_poisoned_board_reports_unavailable() {
        let mut board = board();
        let shared = board.shared();
        let _ = std::thread::spawn(move || {
            let _guard = shared.write().unwrap();
            panic!("poison the board");
        })
        .join();

        let result = board.update("bnwiki", 1.0);
        assert!(matches!(result, Err(SinkError::Unavailable(_))));
    }
}
