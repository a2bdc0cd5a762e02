//! Error types for Wikispeed
//!
//! This module defines all error types used throughout the library.
//! Unmatched and canary events are not errors: classification simply
//! returns an empty set for them.

use thiserror::Error;

/// Result type alias for Wikispeed operations
pub type Result<T> = std::result::Result<T, WikispeedError>;

/// Main error type for Wikispeed operations
#[derive(Error, Debug)]
pub enum WikispeedError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Feed record error
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Presentation sink error
    #[error("Render failure: {0}")]
    Sink(#[from] SinkError),

    /// Session lifecycle error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Malformed or inconsistent channel declarations. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Two channels share a key
    #[error("Duplicate channel key: {0}")]
    DuplicateChannel(String),

    /// Capacity must be a positive, finite number
    #[error("Invalid capacity for channel '{key}': {capacity}")]
    InvalidCapacity { key: String, capacity: f64 },

    /// A referenced channel was never declared
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// Window length must be a positive, finite number of seconds
    #[error("Invalid window length: {0}s")]
    InvalidWindow(f64),

    /// Channel key must not be empty
    #[error("Channel key must not be empty")]
    EmptyKey,

    /// No channels declared at all
    #[error("No channels declared")]
    EmptyRegistry,

    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single presentation update failed. Recovered locally by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// The display rejected the value for this channel
    #[error("Display for '{key}' rejected update: {reason}")]
    Rejected { key: String, reason: String },

    /// The display backend is not usable at the moment
    #[error("Display unavailable: {0}")]
    Unavailable(String),
}

/// A raw feed record could not be turned into an event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Record is not valid JSON or has the wrong shape
    #[error("Malformed record: {reason}")]
    Malformed { reason: String },

    /// A required field is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Session lifecycle misuse
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Operation requires a started session
    #[error("Session not started")]
    NotStarted,

    /// `start` called twice
    #[error("Session already started")]
    AlreadyStarted,

    /// Session was stopped and cannot be restarted
    #[error("Session stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WikispeedError::Config(ConfigError::InvalidCapacity {
            key: "bnwiki".to_string(),
            capacity: -1.0,
        });
        let msg = format!("{}", err);
        assert!(msg.contains("capacity"));
        assert!(msg.contains("bnwiki"));
    }

    #[test]
    fn test_error_conversion() {
        let sink_err = SinkError::Unavailable("closed".to_string());
        let err: WikispeedError = sink_err.into();
        assert!(matches!(err, WikispeedError::Sink(_)));
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ConfigError = parse.into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
