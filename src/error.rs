//! Unified error handling for the chronod crate
//!
//! This module provides a unified error type that consolidates all
//! domain-specific errors into a single `Error` enum, while the individual
//! modules keep their own narrower error types for local handling.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::coordinator::authority::AuthorityError;
pub use crate::coordinator::client::ClientError;
pub use crate::coordinator::launcher::LaunchError;
pub use crate::coordinator::sync::SyncError;
pub use crate::node::clock::ClockError;

/// Unified error type for the chronod crate
///
/// This enum wraps all domain-specific errors, providing a single error type
/// that can be used across module boundaries while preserving the detailed
/// error information.
#[derive(Error, Debug)]
pub enum Error {
    /// Logical clock errors (invalid correction input)
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    /// Synchronization round errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Time authority errors
    #[error("Time authority error: {0}")]
    Authority(#[from] AuthorityError),

    /// Instance launcher errors
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Coordinator client errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Coordinator server errors
    #[error("Server error: {0}")]
    Server(#[from] crate::coordinator::server::ServerError),

    /// Node server errors
    #[error("Node server error: {0}")]
    NodeServer(#[from] crate::node::service::ServerError),

    /// Coordinator configuration errors
    #[error("Coordinator config error: {0}")]
    CoordinatorConfig(#[from] crate::coordinator::config::ConfigError),

    /// Node configuration errors
    #[error("Node config error: {0}")]
    NodeConfig(#[from] crate::node::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let clock_err = ClockError::InvalidInput;
        let unified: Error = clock_err.into();
        assert!(matches!(unified, Error::Clock(_)));
    }

    #[test]
    fn test_sync_error_conversion() {
        let sync_err = SyncError::NoInstancesAvailable;
        let unified: Error = sync_err.into();
        assert!(matches!(unified, Error::Sync(_)));
        assert!(unified.to_string().contains("Sync error"));
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("Something went wrong");
        assert_eq!(err.to_string(), "Something went wrong");
    }
}
