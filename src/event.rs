// Wikispeed - Live edit rate gauges
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Event records and feed line decoding
//!
//! An [`EventRecord`] is the ephemeral form of one upstream change: it is
//! classified, its timestamp is appended to the matching accumulators, and
//! then it is dropped.
//!
//! The upstream feed delivers recent-change records as JSON, either one per
//! line or framed as server-sent events (`data: {...}`). [`parse_feed_line`]
//! accepts both.

use serde::Deserialize;

use crate::error::FeedError;

/// Stable channel identifier
pub type ChannelKey = String;

/// Seconds since the unix epoch
pub type Timestamp = f64;

/// `meta.domain` value marking a synthetic liveness event
pub const CANARY_DOMAIN: &str = "canary";

/// One incoming event, as seen by the classifier
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Stream/source identifier used for direct channel matching
    pub origin_key: String,
    /// Event time from the record's own metadata, not local receipt time
    pub timestamp: Timestamp,
    /// Canary events are matched to no channel
    pub is_canary: bool,
    /// Broader origin attribute (host name) for aggregate matching
    pub domain: Option<String>,
}

impl EventRecord {
    /// Create a regular event
    pub fn new(origin_key: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            origin_key: origin_key.into(),
            timestamp,
            is_canary: false,
            domain: None,
        }
    }

    /// Attach a domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Mark as canary
    pub fn canary(mut self) -> Self {
        self.is_canary = true;
        self
    }

    /// Decode one recent-change JSON record
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        let raw: RecentChange = serde_json::from_str(json).map_err(|e| FeedError::Malformed {
            reason: e.to_string(),
        })?;
        raw.into_event()
    }
}

/// Wire shape of an upstream recent-change record. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RecentChange {
    wiki: Option<String>,
    timestamp: Option<f64>,
    server_name: Option<String>,
    meta: Option<RecordMeta>,
}

#[derive(Debug, Deserialize)]
struct RecordMeta {
    domain: Option<String>,
}

impl RecentChange {
    fn into_event(self) -> Result<EventRecord, FeedError> {
        let is_canary = self
            .meta
            .as_ref()
            .and_then(|m| m.domain.as_deref())
            .map_or(false, |d| d == CANARY_DOMAIN);

        // Canaries are dropped by the classifier anyway; don't reject them
        // for missing payload fields.
        if is_canary {
            return Ok(EventRecord {
                origin_key: self.wiki.unwrap_or_default(),
                timestamp: self.timestamp.unwrap_or(0.0),
                is_canary,
                domain: self.server_name,
            });
        }

        let origin_key = self.wiki.ok_or(FeedError::MissingField("wiki"))?;
        let timestamp = self.timestamp.ok_or(FeedError::MissingField("timestamp"))?;
        if !timestamp.is_finite() {
            return Err(FeedError::Malformed {
                reason: format!("non-finite timestamp {}", timestamp),
            });
        }

        Ok(EventRecord {
            origin_key,
            timestamp,
            is_canary,
            domain: self.server_name,
        })
    }
}

/// Decode one line of feed input.
///
/// Returns `Ok(None)` for lines that carry no record: blank lines, SSE
/// comments (`:`) and the `event:`, `id:` and `retry:` fields.
pub fn parse_feed_line(line: &str) -> Result<Option<EventRecord>, FeedError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    if let Some(data) = line.strip_prefix("data:") {
        return EventRecord::from_json(data.trim()).map(Some);
    }

    if line.starts_with('{') {
        return EventRecord::from_json(line).map(Some);
    }

    if ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
    {
        return Ok(None);
    }

    Err(FeedError::Malformed {
        reason: format!("unrecognized line: {}", truncate(line, 64)),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
