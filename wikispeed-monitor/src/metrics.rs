// Wikispeed Monitor - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for the rate gauges.
//!
//! This module defines all Prometheus metrics exposed by the monitor
//! and provides functions to update them.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Encoder, Gauge, GaugeVec, TextEncoder,
};
use wikispeed::Zone;

lazy_static! {
    // ============================================================
    // Per-channel gauges
    // ============================================================

    /// Current clamped rate per channel, in the channel's own unit.
    pub static ref CHANNEL_RATE: GaugeVec = register_gauge_vec!(
        "wikispeed_channel_rate",
        "Current event rate per channel (edits/sec or edits/min, see unit label)",
        &["channel", "unit"]
    ).unwrap();

    /// Display band per channel.
    /// Values: 0 = Low, 1 = Elevated, 2 = High
    pub static ref CHANNEL_ZONE: GaugeVec = register_gauge_vec!(
        "wikispeed_channel_zone",
        "Display band per channel (0=Low, 1=Elevated, 2=High)",
        &["channel"]
    ).unwrap();

    /// Display ceiling per channel.
    pub static ref CHANNEL_CAPACITY: GaugeVec = register_gauge_vec!(
        "wikispeed_channel_capacity",
        "Display ceiling per channel",
        &["channel", "unit"]
    ).unwrap();

    // ============================================================
    // Feed and session counters
    // ============================================================

    /// Events accepted from the feed.
    pub static ref EVENTS_TOTAL: Counter = register_counter!(
        "wikispeed_events_total",
        "Events received from the feed"
    ).unwrap();

    /// Feed lines that could not be decoded.
    pub static ref FEED_ERRORS_TOTAL: Counter = register_counter!(
        "wikispeed_feed_errors_total",
        "Feed lines that could not be decoded"
    ).unwrap();

    /// Failed display updates, by channel.
    pub static ref RENDER_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "wikispeed_render_failures_total",
        "Display updates that failed",
        &["channel"]
    ).unwrap();

    /// Seconds since the session started.
    pub static ref SESSION_ELAPSED_SECONDS: Gauge = register_gauge!(
        "wikispeed_session_elapsed_seconds",
        "Seconds since the session started"
    ).unwrap();

    /// Channels past their first full window.
    pub static ref STEADY_CHANNELS: Gauge = register_gauge!(
        "wikispeed_steady_channels",
        "Channels with a full window of history"
    ).unwrap();
}

/// Update a channel's rate and band.
pub fn update_channel_rate(channel: &str, unit: &str, rate: f64, zone: Zone) {
    CHANNEL_RATE.with_label_values(&[channel, unit]).set(rate);
    CHANNEL_ZONE
        .with_label_values(&[channel])
        .set(zone.as_code() as f64);
}

/// Publish a channel's display ceiling.
pub fn set_channel_capacity(channel: &str, unit: &str, capacity: f64) {
    CHANNEL_CAPACITY
        .with_label_values(&[channel, unit])
        .set(capacity);
}

/// Count one accepted feed event.
pub fn increment_events() {
    EVENTS_TOTAL.inc();
}

/// Count one undecodable feed line.
pub fn increment_feed_errors() {
    FEED_ERRORS_TOTAL.inc();
}

/// Count one failed display update.
pub fn record_render_failure(channel: &str) {
    RENDER_FAILURES_TOTAL.with_label_values(&[channel]).inc();
}

/// Update session-level gauges after a tick.
pub fn update_session_metrics(elapsed_secs: f64, steady: usize) {
    SESSION_ELAPSED_SECONDS.set(elapsed_secs.max(0.0));
    STEADY_CHANNELS.set(steady as f64);
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
