// Wikispeed Monitor - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the monitor binary.

use thiserror::Error;

/// Fatal monitor errors
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Bad channel configuration
    #[error("Configuration error: {0}")]
    Config(#[from] wikispeed::ConfigError),

    /// Session lifecycle misuse
    #[error("Session error: {0}")]
    Session(#[from] wikispeed::SessionError),

    /// Input could not be opened or the server could not bind
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task panicked
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
