// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for Wikispeed
//!
//! Configuration is static data supplied at startup: the channel list, the
//! aggregate channel's match rule, and the window and tick lengths. It can be
//! built in code or loaded from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::error::ConfigError;
use crate::event::{ChannelKey, EventRecord};
use crate::registry::{ChannelRegistry, UnitMode};
use crate::session::Session;

/// Default sliding window length in seconds
pub const DEFAULT_WINDOW_SECS: f64 = 60.0;

/// Default tick cadence in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Capacity of per-second gauges on the stock board (10 edits/sec)
pub const PER_SECOND_CAPACITY: f64 = 10.0;

/// Capacity of per-minute gauges on the stock board (600 edits/min)
pub const PER_MINUTE_CAPACITY: f64 = 600.0;

/// Key of the stock aggregate channel
pub const GLOBAL_CHANNEL: &str = "global";

/// Per-channel declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Unique channel key; for direct matches this is the event origin key
    pub key: ChannelKey,

    /// Display unit
    pub unit: UnitMode,

    /// Display ceiling; readings are clamped to it
    pub capacity: f64,

    /// Gauge title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChannelConfig {
    /// Create a declaration without a title
    pub fn new(key: impl Into<String>, unit: UnitMode, capacity: f64) -> Self {
        Self {
            key: key.into(),
            unit,
            capacity,
            title: None,
        }
    }

    /// Per-second channel with the stock capacity
    pub fn per_second(key: impl Into<String>) -> Self {
        Self::new(key, UnitMode::PerSecond, PER_SECOND_CAPACITY)
    }

    /// Per-minute channel with the stock capacity
    pub fn per_minute(key: impl Into<String>) -> Self {
        Self::new(key, UnitMode::PerMinute, PER_MINUTE_CAPACITY)
    }

    /// Set the gauge title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Data-driven match rule for the aggregate channel.
///
/// An event matches when its origin key is listed in `origin_keys`, or its
/// domain contains any of `domain_contains`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Aggregate channel key; must be declared
    pub channel: ChannelKey,

    /// Origin keys counted toward the aggregate
    #[serde(default)]
    pub origin_keys: Vec<String>,

    /// Domain substrings counted toward the aggregate
    #[serde(default)]
    pub domain_contains: Vec<String>,
}

impl AggregateConfig {
    /// Check whether an event counts toward the aggregate
    pub fn matches(&self, event: &EventRecord) -> bool {
        if self.origin_keys.iter().any(|k| *k == event.origin_key) {
            return true;
        }
        match event.domain.as_deref() {
            Some(domain) => self
                .domain_contains
                .iter()
                .any(|needle| domain.contains(needle.as_str())),
            None => false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikispeedConfig {
    /// Sliding window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,

    /// Tick cadence in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Tracked channels
    pub channels: Vec<ChannelConfig>,

    /// Aggregate channel rule (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateConfig>,
}

fn default_window_secs() -> f64 {
    DEFAULT_WINDOW_SECS
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl Default for WikispeedConfig {
    /// The stock board: Bengali-language projects plus Wikidata, Commons
    /// and an all-Wikipedia aggregate.
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            channels: vec![
                ChannelConfig::per_minute(GLOBAL_CHANNEL).with_title("All Wikipedias"),
                ChannelConfig::per_second("bnwiki").with_title("Bengali Wikipedia"),
                ChannelConfig::per_second("bnwikivoyage").with_title("Bengali Wikivoyage"),
                ChannelConfig::per_second("bnwiktionary").with_title("Bengali Wiktionary"),
                ChannelConfig::per_second("bnwikibooks").with_title("Bengali Wikibooks"),
                ChannelConfig::per_second("bnwikiquote").with_title("Bengali Wikiquote"),
                ChannelConfig::per_minute("wikidatawiki").with_title("Wikidata"),
                ChannelConfig::per_minute("commonswiki").with_title("Wikimedia Commons"),
            ],
            aggregate: Some(AggregateConfig {
                channel: GLOBAL_CHANNEL.to_string(),
                origin_keys: vec!["wikidatawiki".to_string(), "commonswiki".to_string()],
                domain_contains: vec!["wikipedia".to_string()],
            }),
        }
    }
}

impl WikispeedConfig {
    /// Parse a JSON config document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!(
            "Loaded config from {}: {} channels, {}s window",
            path.display(),
            config.channels.len(),
            config.window_secs
        );
        Ok(config)
    }

    /// Check the whole configuration without building a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry().map(|_| ())
    }

    /// Window length, validated
    pub fn window(&self) -> Result<f64, ConfigError> {
        if self.window_secs.is_finite() && self.window_secs > 0.0 {
            Ok(self.window_secs)
        } else {
            Err(ConfigError::InvalidWindow(self.window_secs))
        }
    }

    /// Build the channel registry, checking every cross-reference
    pub fn registry(&self) -> Result<ChannelRegistry, ConfigError> {
        self.window()?;
        if self.channels.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        let registry = ChannelRegistry::declare(self.channels.iter().cloned())?;
        if let Some(ref aggregate) = self.aggregate {
            registry.require(&aggregate.channel)?;
        }
        Ok(registry)
    }

    /// Build a classifier using the configured aggregate rule
    pub fn classifier(&self, registry: &ChannelRegistry) -> Result<Classifier, ConfigError> {
        let classifier = Classifier::new(registry);
        match self.aggregate.clone() {
            Some(aggregate) => {
                let key = aggregate.channel.clone();
                classifier.with_aggregate(key, aggregate)
            }
            None => Ok(classifier),
        }
    }

    /// Build a ready-to-start session
    pub fn build_session(&self) -> Result<Session, ConfigError> {
        let registry = self.registry()?;
        let classifier = self.classifier(&registry)?;
        Session::new(registry, classifier, self.window()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WikispeedConfig::default();
        assert_eq!(config.window_secs, 60.0);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.channels.len(), 8);
        assert!(config.validate().is_ok());

        let registry = config.registry().unwrap();
        assert_eq!(registry.get("global").unwrap().capacity, 600.0);
        assert_eq!(registry.get("bnwiki").unwrap().unit, UnitMode::PerSecond);
        assert_eq!(registry.get("bnwiki").unwrap().capacity, 10.0);
        assert_eq!(
            registry.get("commonswiki").unwrap().unit,
            UnitMode::PerMinute
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "channels": [
                {"key": "a", "unit": "per_second", "capacity": 10},
                {"key": "all", "unit": "per_minute", "capacity": 600, "title": "Everything"}
            ],
            "aggregate": {"channel": "all", "domain_contains": ["wikipedia"]}
        }"#;
        let config = WikispeedConfig::from_json(json).unwrap();
        assert_eq!(config.window_secs, DEFAULT_WINDOW_SECS);
        assert_eq!(config.channels[1].title.as_deref(), Some("Everything"));
        assert!(config.aggregate.unwrap().origin_keys.is_empty());
    }

    #[test]
    fn test_unknown_aggregate_channel() {
        let mut config = WikispeedConfig::default();
        config.aggregate = Some(AggregateConfig {
            channel: "nowhere".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_invalid_window() {
        let config = WikispeedConfig {
            window_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_empty_channels() {
        let config = WikispeedConfig {
            channels: vec![],
            aggregate: None,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyRegistry)));
    }

    #[test]
    fn test_bad_unit_is_parse_error() {
        let json = r#"{"channels": [{"key": "a", "unit": "per_hour", "capacity": 1}]}"#;
        assert!(matches!(
            WikispeedConfig::from_json(json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_aggregate_matches() {
        let rule = WikispeedConfig::default().aggregate.unwrap();

        let wikipedia = EventRecord::new("enwiki", 1.0).with_domain("en.wikipedia.org");
        let wikidata = EventRecord::new("wikidatawiki", 1.0).with_domain("www.wikidata.org");
        let voyage = EventRecord::new("bnwikivoyage", 1.0).with_domain("bn.wikivoyage.org");
        let bare = EventRecord::new("enwiki", 1.0);

        assert!(rule.matches(&wikipedia));
        assert!(rule.matches(&wikidata));
        assert!(!rule.matches(&voyage));
        assert!(!rule.matches(&bare));
    }
}
