// src/error.rs

//! Unified error handling for the coupon feed.

use std::fmt;

use thiserror::Error;

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Feed answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Network failure that is not a reqwest error (test doubles, custom clients)
    #[error("Network error: {0}")]
    Network(String),

    /// Every fetch attempt failed
    #[error("Fetch failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<AppError>,
    },

    /// Feed body could not be turned into records
    #[error("Parse error: {0}")]
    Parse(String),

    /// Cache persistence failed
    #[error("Storage error for {context}: {message}")]
    Storage { context: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Refresh aborted by shutdown while waiting on the network
    #[error("Cancelled while waiting on the feed")]
    Cancelled,
}

/// Coarse error classes used by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Parse,
    Storage,
    Config,
    Cancelled,
}

impl AppError {
    /// Create a network error.
    pub fn network(message: impl fmt::Display) -> Self {
        Self::Network(message.to_string())
    }

    /// Create a parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create a storage error with context.
    pub fn storage(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_)
            | Self::Status { .. }
            | Self::Network(_)
            | Self::RetriesExhausted { .. } => ErrorKind::Network,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Io(_) | Self::Json(_) | Self::Storage { .. } => ErrorKind::Storage,
            Self::Toml(_) | Self::Url(_) | Self::Config(_) | Self::Validation(_) => {
                ErrorKind::Config
            }
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_is_network() {
        let err = AppError::RetriesExhausted {
            attempts: 3,
            last: Box::new(AppError::network("connection refused")),
        };
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("3 attempt(s)"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(AppError::parse("bad utf-8").kind(), ErrorKind::Parse);
        assert_eq!(AppError::storage("cache", "disk full").kind(), ErrorKind::Storage);
        assert_eq!(AppError::validation("empty url").kind(), ErrorKind::Config);
    }
}
