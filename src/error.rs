//! Error types for bizpulse.
//!
//! Read failures abort a run, dispatch failures never do. The split between
//! [`ReadError`] and [`SinkError`] keeps that distinction in the types.

use thiserror::Error;

/// A failure while reading a snapshot from a backend.
#[derive(Debug, Error)]
pub enum ReadError {
    /// SQLite query failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A row could not be turned into a model value
    #[error("invalid row: {0}")]
    Decode(String),

    /// Paging stopped before the backend's reported row count was reached
    #[error("incomplete read: expected {expected} rows, received {received}")]
    Incomplete { expected: usize, received: usize },
}

/// A failure while creating a single notification.
#[derive(Debug, Error)]
pub enum SinkError {
    /// SQLite insert failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend rejected the notification with a non-success status
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Any other rejection
    #[error("{0}")]
    Other(String),
}

/// A run-level failure. Surfaced to the caller as a failed run.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to read {entity}: {source}")]
    Read {
        entity: &'static str,
        #[source]
        source: ReadError,
    },
}

impl MonitorError {
    pub fn read(entity: &'static str) -> impl FnOnce(ReadError) -> Self {
        move |source| MonitorError::Read { entity, source }
    }
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is set but {missing} is missing")]
    Missing {
        name: &'static str,
        missing: &'static str,
    },

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
