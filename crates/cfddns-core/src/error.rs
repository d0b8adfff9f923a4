//! Error types for the updater
//!
//! Three failure classes matter to the orchestration loop: the network
//! failed (transport, auth, bad status, bad body, timeout), the provider has
//! no record with the requested name, or the configuration is unusable.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Transport, authentication, non-success status or malformed response
    #[error("Network failure: {0}")]
    Network(String),

    /// An outbound call exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being attempted
        operation: String,
        /// The deadline that elapsed
        after: Duration,
    },

    /// No record with the exact requested name exists in the zone
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Configuration errors, including malformed credentials
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a network failure
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Timeouts count as network failures.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }

    /// True when no record with the exact name exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_a_network_failure() {
        let err = Error::timeout("resolve public IP", Duration::from_secs(30));
        assert!(err.is_network_failure());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "resolve public IP timed out after 30s");
    }

    #[test]
    fn not_found_is_not_a_network_failure() {
        let err = Error::not_found("home.example.com");
        assert!(err.is_not_found());
        assert!(!err.is_network_failure());
    }
}
