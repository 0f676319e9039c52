//! Error types for quill-engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using quill-engine Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned synchronously by transcript operations
#[derive(Error, Debug)]
pub enum Error {
    /// Edit or copy target does not exist
    #[error("Invalid index {index}: only {len} available")]
    InvalidIndex { index: usize, len: usize },

    /// Retry requested but no user message is waiting for a reply
    #[error("Nothing to retry")]
    NothingToRetry,
}

/// Why the last request did not produce a reply.
///
/// Recorded on the engine instead of being returned, so an interactive
/// session can keep going after a failed turn.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RequestError {
    /// Upstream answered with a failure, or the transport broke
    #[error("{0}")]
    Failed(String),

    /// No response within the request timeout
    #[error("Timed out.")]
    Timeout,

    /// Aborted through the engine handle or superseded by a newer request
    #[error("Cancelled.")]
    Cancelled,
}

impl RequestError {
    /// Record a provider failure, pointing at the credentials when they were rejected
    pub fn from_provider(error: &quill_ai::Error) -> Self {
        if error.is_auth() {
            RequestError::Failed(format!("{} Check OPENAI_API_KEY.", error))
        } else {
            RequestError::Failed(error.to_string())
        }
    }

    /// Text for the `error` entry appended to the transcript, if any
    pub fn transcript_note(&self) -> Option<&'static str> {
        match self {
            RequestError::Failed(_) => Some("Something went wrong. Please try again."),
            RequestError::Timeout => Some("Timed out. Please try again."),
            RequestError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index_display() {
        let e = Error::InvalidIndex { index: 4, len: 2 };
        assert_eq!(e.to_string(), "Invalid index 4: only 2 available");
    }

    #[test]
    fn test_request_error_display() {
        assert_eq!(RequestError::Timeout.to_string(), "Timed out.");
        assert_eq!(
            RequestError::Failed("boom".into()).to_string(),
            "boom"
        );
    }

    #[test]
    fn test_rejected_credentials_get_a_hint() {
        let denied = RequestError::from_provider(&quill_ai::Error::api(401, "Unauthorized"));
        assert_eq!(
            denied,
            RequestError::Failed(
                "Failed to send completion request. Unauthorized (status: 401) Check OPENAI_API_KEY."
                    .into()
            )
        );

        let broken = RequestError::from_provider(&quill_ai::Error::api(500, "Internal Server Error"));
        assert_eq!(
            broken.to_string(),
            "Failed to send completion request. Internal Server Error (status: 500)"
        );
    }

    #[test]
    fn test_cancelled_leaves_no_transcript_note() {
        assert!(RequestError::Cancelled.transcript_note().is_none());
        assert!(RequestError::Timeout.transcript_note().is_some());
    }
}
