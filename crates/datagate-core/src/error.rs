//! Error types for datagate.
//!
//! Not-found conditions are never errors here: missing files surface as
//! `Option::None` or `false`. Everything in this module is a real failure
//! that reaches the immediate caller without retries.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the datagate library.
#[derive(Debug, Error)]
pub enum DatagateError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid relative path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Gateway state errors
    #[error("No value to modify for {path}")]
    ValueAbsent { path: String },

    #[error("Lock poisoned for {path}")]
    LockPoisoned { path: String },

    // Async errors
    #[error("Background task failed: {message}")]
    Task { message: String },

    #[error("No tokio runtime available for a detached operation")]
    NoRuntime,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for datagate operations.
pub type Result<T> = std::result::Result<T, DatagateError>;

impl From<std::io::Error> for DatagateError {
    fn from(err: std::io::Error) -> Self {
        DatagateError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for DatagateError {
    fn from(err: serde_json::Error) -> Self {
        DatagateError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<tokio::task::JoinError> for DatagateError {
    fn from(err: tokio::task::JoinError) -> Self {
        DatagateError::Task {
            message: err.to_string(),
        }
    }
}

impl DatagateError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        DatagateError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DatagateError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the bytes on disk were present but could not be decoded.
    ///
    /// Callers use this to tell a corrupt document apart from a failing disk.
    pub fn is_malformed_payload(&self) -> bool {
        matches!(self, DatagateError::Json { .. })
    }
}
