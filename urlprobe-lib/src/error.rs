//! Error handling for probe runs.
//!
//! Only startup-phase failures surface as `ProbeError`. Failures of an
//! individual URL are classified into a [`crate::ProbeOutcome`] inside the
//! request executor and never propagate out of it.

use std::fmt;

/// Main error type for urlprobe operations.
#[derive(Debug, Clone)]
pub enum ProbeError {
    /// Invalid or missing configuration (e.g. no concurrency and not unrestricted)
    ConfigError { message: String },

    /// The URL source could not be opened or read
    FileError { path: String, message: String },

    /// A URL that cannot be turned into a request
    InvalidUrl { url: String, reason: String },

    /// Network-related errors (client construction, connection, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ProbeError {
    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid URL error.
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::InvalidUrl { url, reason } => {
                write!(f, "Invalid URL '{}': {}", url, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<tokio::task::JoinError> for ProbeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Task failed: {}", err))
    }
}
