//! Error types for the dynamic DNS reconciler
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// No public IP provider produced a usable address
    ///
    /// `timed_out` is set when the race cap expired while requests were
    /// still pending, as opposed to every provider answering badly.
    #[error("All {attempted} public IP providers failed to resolve (timed out: {timed_out})")]
    AllProvidersFailed {
        /// Number of providers raced
        attempted: usize,
        /// Whether the race cap expired before a valid answer arrived
        timed_out: bool,
    },

    /// The record-id lookup returned nothing usable
    #[error(
        "Expected a record id for '{record_name}' in zone '{zone_id}' but received status {status} and body:\n{body}"
    )]
    RecordNotFound {
        /// Zone the lookup was issued against
        zone_id: String,
        /// Record name the lookup filtered on
        record_name: String,
        /// Literal HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The record write was rejected by the remote API
    #[error("DNS record update failed: status {status}, request: {request}, response: {response}")]
    RemoteUpdate {
        /// Literal HTTP status code
        status: u16,
        /// Request payload as sent
        request: String,
        /// Raw response body
        response: String,
    },

    /// Local resolution of the published record failed
    #[error("Failed to resolve '{record_name}' locally: {message}")]
    LocalResolution {
        /// Record name being resolved
        record_name: String,
        /// Resolver error message
        message: String,
    },

    /// The run was cancelled from outside
    #[error("Operation cancelled")]
    Cancelled,

    /// The run-wide deadline elapsed
    #[error("Run deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (transport level)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a "record not found" error from a lookup response
    pub fn record_not_found(
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::RecordNotFound {
            zone_id: zone_id.into(),
            record_name: record_name.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a local resolution error
    pub fn local_resolution(record_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LocalResolution {
            record_name: record_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports an interruption rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
