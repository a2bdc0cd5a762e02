// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Channel registry
//!
//! The [`ChannelRegistry`] maps each channel key to its unit mode and display
//! capacity. It is populated once, before streaming begins, and is immutable
//! afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ChannelConfig;
use crate::error::ConfigError;
use crate::event::ChannelKey;

/// Lower bound of the elevated band, as a fraction of capacity
pub const ELEVATED_FRACTION: f64 = 0.33;
/// Lower bound of the high band, as a fraction of capacity
pub const HIGH_FRACTION: f64 = 0.67;

/// How raw counts are expressed on the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    /// Events per second
    PerSecond,
    /// Events per minute
    PerMinute,
}

impl UnitMode {
    /// Length of one display unit in seconds.
    ///
    /// A rate in this unit is `count * seconds_per_unit / span_seconds`.
    pub fn seconds_per_unit(self) -> f64 {
        match self {
            UnitMode::PerSecond => 1.0,
            UnitMode::PerMinute => 60.0,
        }
    }

    /// Axis label for the gauge
    pub fn label(self) -> &'static str {
        match self {
            UnitMode::PerSecond => "edits/sec",
            UnitMode::PerMinute => "edits/min",
        }
    }
}

/// Display band of a reading relative to its channel's capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Low,
    Elevated,
    High,
}

impl Zone {
    /// Numeric code used by exported gauges
    pub fn as_code(self) -> u8 {
        match self {
            Zone::Low => 0,
            Zone::Elevated => 1,
            Zone::High => 2,
        }
    }
}

/// One tracked logical stream
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Unique key
    pub key: ChannelKey,
    /// Display unit
    pub unit: UnitMode,
    /// Maximum value the display can represent
    pub capacity: f64,
    /// Optional human-readable title
    pub title: Option<String>,
}

impl Channel {
    /// Clamp a computed rate to `[0, capacity]`. NaN maps to 0.
    pub fn clamp(&self, rate: f64) -> f64 {
        rate.max(0.0).min(self.capacity)
    }

    /// Band the given value falls in
    pub fn zone(&self, value: f64) -> Zone {
        let fraction = value / self.capacity;
        if fraction >= HIGH_FRACTION {
            Zone::High
        } else if fraction >= ELEVATED_FRACTION {
            Zone::Elevated
        } else {
            Zone::Low
        }
    }

    /// Title if set, otherwise the key
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.key)
    }
}

/// Immutable set of declared channels, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
    index: HashMap<ChannelKey, usize>,
}

impl ChannelRegistry {
    /// Build the registry from channel declarations.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Two declarations share a key
    /// - A key is empty
    /// - A capacity is not a positive finite number
    pub fn declare(configs: impl IntoIterator<Item = ChannelConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::default();

        for config in configs {
            if config.key.is_empty() {
                return Err(ConfigError::EmptyKey);
            }
            if !(config.capacity.is_finite() && config.capacity > 0.0) {
                return Err(ConfigError::InvalidCapacity {
                    key: config.key,
                    capacity: config.capacity,
                });
            }
            if registry.index.contains_key(&config.key) {
                return Err(ConfigError::DuplicateChannel(config.key));
            }

            registry
                .index
                .insert(config.key.clone(), registry.channels.len());
            registry.channels.push(Channel {
                key: config.key,
                unit: config.unit,
                capacity: config.capacity,
                title: config.title,
            });
        }

        Ok(registry)
    }

    /// Look up a channel
    pub fn get(&self, key: &str) -> Option<&Channel> {
        self.index.get(key).map(|&i| &self.channels[i])
    }

    /// Check if a channel is declared
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a channel that must exist
    pub fn require(&self, key: &str) -> Result<&Channel, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::UnknownChannel(key.to_string()))
    }

    /// Channels in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Channel keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &ChannelKey> {
        self.channels.iter().map(|c| &c.key)
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if no channels are declared
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
