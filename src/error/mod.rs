//! Error types and Result aliases for fileindex.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fileindex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// File watching error.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Directory-scan errors.
///
/// Individual unreadable entries never surface here; a scan only fails as a
/// whole when its background worker does.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The background scan worker terminated abnormally.
    #[error("scan worker failed: {reason}")]
    WorkerFailed { reason: String },
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Failed to subscribe to a path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Failed to drop a subscription.
    #[error("failed to unwatch path '{path}': {reason}")]
    UnwatchFailed { path: String, reason: String },

    /// The watch backend could not be created.
    #[error("watch backend initialization failed: {reason}")]
    InitFailed { reason: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
