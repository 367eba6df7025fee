//! Error types for the Roster core library
//!
//! Construction and configuration problems surface as [`Error`]. The outcome
//! of an individual backend call is reported through
//! [`RequestFailure`](crate::http::RequestFailure) instead, because callers
//! need to match on the failure kind rather than just display it.

use thiserror::Error;

/// Main error type for Roster core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (bad base URL, invalid settings)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The underlying HTTP client could not be constructed
    #[error("HTTP client error: {message}")]
    HttpClient {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// JSON serialization errors while preparing a request body
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json {
            message: source.to_string(),
            source,
        }
    }
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;
