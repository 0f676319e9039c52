//! Error types for quill-ai

use thiserror::Error;

/// Result type alias using quill-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the completion endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint answered with a non-success status
    #[error("Failed to send completion request. {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Response parsed but did not carry what we need
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the endpoint rejected our credentials
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }
}
