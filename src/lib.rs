//! # Wikispeed - Live edit rate gauges
//!
//! Ingests a continuous stream of timestamped change events, routes each one
//! to one or more named channels, and keeps a live estimate of every
//! channel's event rate for display on a gauge.
//!
//! ## Quick Start
//!
//! ```rust
//! use wikispeed::{
//!     ChannelConfig, ChannelRegistry, Classifier, EventRecord, MemorySink, Session,
//! };
//!
//! let registry = ChannelRegistry::declare(vec![
//!     ChannelConfig::per_second("bnwiki"),
//!     ChannelConfig::per_minute("global"),
//! ])
//! .unwrap();
//!
//! let classifier = Classifier::new(&registry)
//!     .with_aggregate("global", |e: &EventRecord| {
//!         e.domain.as_deref().map_or(false, |d| d.contains("wikipedia"))
//!     })
//!     .unwrap();
//!
//! let mut session = Session::new(registry, classifier, 60.0).unwrap();
//! session.start(0.0).unwrap();
//!
//! for ts in [1.0, 2.0, 3.0] {
//!     session.ingest(&EventRecord::new("bnwiki", ts).with_domain("bn.wikipedia.org"));
//! }
//!
//! let mut sink = MemorySink::new();
//! let report = session.tick(3.0, &mut sink).unwrap();
//! assert_eq!(report.readings["bnwiki"], 1.0);
//! assert_eq!(report.readings["global"], 60.0);
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: Channel declarations, unit modes, display bands
//! - [`classifier`]: Event-to-channel routing
//! - [`accumulator`]: Per-channel timestamp buffers
//! - [`engine`]: Two-phase rate estimation and publishing
//! - [`session`]: Lifecycle owner tying the above together
//! - [`event`]: Event records and feed line decoding
//! - [`sink`]: Presentation sinks
//! - [`config`]: Static configuration and the stock board
//! - [`clock`]: Time sources

pub mod accumulator;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod registry;
pub mod session;
pub mod sink;

// Re-exports for convenient access
pub use accumulator::{AccumulatorSet, RateAccumulator};
pub use classifier::{AggregatePredicate, ChannelSet, Classifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AggregateConfig, ChannelConfig, WikispeedConfig};
pub use engine::{estimate_rate, EstimationEngine, Phase, PublishReport, Readings};
pub use error::{ConfigError, FeedError, Result, SessionError, SinkError, WikispeedError};
pub use event::{parse_feed_line, ChannelKey, EventRecord, Timestamp};
pub use registry::{Channel, ChannelRegistry, UnitMode, Zone};
pub use session::{Session, SessionState, SessionStats, TickReport};
pub use sink::{LogSink, MemorySink, NullSink, PresentationSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
