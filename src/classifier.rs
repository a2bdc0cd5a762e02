// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Event classification
//!
//! This module decides which channels an event contributes to and routes its
//! timestamp into their accumulators. An event may match:
//!
//! - the channel whose key equals its origin key (direct match), and
//! - the aggregate channel, if the injected predicate accepts it.
//!
//! Canary events match nothing. An event matching nothing is a silent no-op.

use std::collections::{BTreeSet, HashSet};

use crate::accumulator::AccumulatorSet;
use crate::config::AggregateConfig;
use crate::error::ConfigError;
use crate::event::{ChannelKey, EventRecord};
use crate::registry::ChannelRegistry;

/// Set of channel keys an event contributes to
pub type ChannelSet = BTreeSet<ChannelKey>;

/// Decides whether an event counts toward the aggregate channel
pub trait AggregatePredicate: Send {
    /// Check whether the event belongs to the aggregate
    fn matches(&self, event: &EventRecord) -> bool;
}

impl<F> AggregatePredicate for F
where
    F: Fn(&EventRecord) -> bool + Send,
{
    fn matches(&self, event: &EventRecord) -> bool {
        self(event)
    }
}

impl AggregatePredicate for AggregateConfig {
    fn matches(&self, event: &EventRecord) -> bool {
        AggregateConfig::matches(self, event)
    }
}

/// Aggregate channel and its match rule
struct Aggregate {
    key: ChannelKey,
    predicate: Box<dyn AggregatePredicate>,
}

/// Maps events to channel keys
pub struct Classifier {
    /// Keys eligible for direct matching
    direct: HashSet<ChannelKey>,
    /// Aggregate channel, if configured
    aggregate: Option<Aggregate>,
}

impl Classifier {
    /// Create a classifier doing direct matches only
    pub fn new(registry: &ChannelRegistry) -> Self {
        Self {
            direct: registry.keys().cloned().collect(),
            aggregate: None,
        }
    }

    /// Designate an aggregate channel fed by `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is not a declared channel.
    pub fn with_aggregate(
        mut self,
        key: impl Into<String>,
        predicate: impl AggregatePredicate + 'static,
    ) -> Result<Self, ConfigError> {
        let key = key.into();
        if !self.direct.contains(&key) {
            return Err(ConfigError::UnknownChannel(key));
        }
        self.aggregate = Some(Aggregate {
            key,
            predicate: Box::new(predicate),
        });
        Ok(self)
    }

    /// Aggregate channel key, if any
    pub fn aggregate_key(&self) -> Option<&str> {
        self.aggregate.as_ref().map(|a| a.key.as_str())
    }

    /// Channels the event contributes to, without touching any buffer
    pub fn matches(&self, event: &EventRecord) -> ChannelSet {
        let mut keys = ChannelSet::new();
        if event.is_canary {
            return keys;
        }

        if self.direct.contains(&event.origin_key) {
            keys.insert(event.origin_key.clone());
        }

        if let Some(ref aggregate) = self.aggregate {
            if aggregate.predicate.matches(event) {
                keys.insert(aggregate.key.clone());
            }
        }

        keys
    }

    /// Classify an event and append its timestamp to every matched channel.
    ///
    /// Each matched channel receives exactly one append, even when the direct
    /// and aggregate matches name the same channel.
    pub fn classify(&self, event: &EventRecord, accumulators: &mut AccumulatorSet) -> ChannelSet {
        let keys = self.matches(event);
        for key in &keys {
            accumulators.append(key, event.timestamp);
        }
        keys
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("direct", &self.direct.len())
            .field("aggregate", &self.aggregate_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;

    fn registry() -> ChannelRegistry {
        ChannelRegistry::declare(vec![
            ChannelConfig::per_minute("global"),
            ChannelConfig::per_second("bnwiki"),
            ChannelConfig::per_minute("wikidatawiki"),
        ])
        .unwrap()
    }

    fn classifier() -> Classifier {
        Classifier::new(&registry())
            .with_aggregate("global", |e: &EventRecord| {
                e.domain.as_deref().map_or(false, |d| d.contains("wikipedia"))
                    || e.origin_key == "wikidatawiki"
            })
            .unwrap()
    }

    #[test]
    fn test_direct_and_aggregate() {
        let event = EventRecord::new("bnwiki", 10.0).with_domain("bn.wikipedia.org");
        let keys = classifier().matches(&event);
        let expected: ChannelSet = ["bnwiki", "global"].iter().map(|s| s.to_string()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_aggregate_only() {
        let event = EventRecord::new("enwiki", 10.0).with_domain("en.wikipedia.org");
        let keys = classifier().matches(&event);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("global"));
    }

    #[test]
    fn test_no_match() {
        let event = EventRecord::new("dewikivoyage", 10.0).with_domain("de.wikivoyage.org");
        assert!(classifier().matches(&event).is_empty());
    }

    #[test]
    fn test_canary_matches_nothing() {
        let event = EventRecord::new("bnwiki", 10.0)
            .with_domain("bn.wikipedia.org")
            .canary();
        let registry = registry();
        let mut accs = AccumulatorSet::for_registry(&registry);
        let keys = classifier().classify(&event, &mut accs);
        assert!(keys.is_empty());
        assert_eq!(accs.total_count(), 0);
    }

    #[test]
    fn test_classify_appends_once_per_channel() {
        let registry = registry();
        let mut accs = AccumulatorSet::for_registry(&registry);
        let event = EventRecord::new("wikidatawiki", 42.0).with_domain("www.wikidata.org");

        let keys = classifier().classify(&event, &mut accs);
        assert_eq!(keys.len(), 2);
        assert_eq!(accs.get("wikidatawiki").unwrap().raw(), &[42.0]);
        assert_eq!(accs.get("global").unwrap().raw(), &[42.0]);
        assert_eq!(accs.count("bnwiki"), 0);
    }

    #[test]
    fn test_aggregate_key_as_origin_not_duplicated() {
        let registry = registry();
        let mut accs = AccumulatorSet::for_registry(&registry);
        let classifier = Classifier::new(&registry)
            .with_aggregate("global", |_: &EventRecord| true)
            .unwrap();

        classifier.classify(&EventRecord::new("global", 1.0), &mut accs);
        assert_eq!(accs.count("global"), 1);
    }

    #[test]
    fn test_unknown_aggregate_key() {
        let result = Classifier::new(&registry()).with_aggregate("nope", |_: &EventRecord| true);
        assert!(matches!(result, Err(ConfigError::UnknownChannel(_))));
    }

    #[test]
    fn test_config_predicate() {
        let registry = registry();
        let rule = AggregateConfig {
            channel: "global".to_string(),
            origin_keys: vec!["wikidatawiki".to_string()],
            domain_contains: vec![],
        };
        let classifier = Classifier::new(&registry)
            .with_aggregate("global", rule)
            .unwrap();
        assert_eq!(classifier.aggregate_key(), Some("global"));
        assert!(classifier
            .matches(&EventRecord::new("wikidatawiki", 1.0))
            .contains("global"));
    }
}
