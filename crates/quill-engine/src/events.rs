//! Engine event types

use quill_ai::{Message, Usage};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Events emitted around each request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A request was handed to the provider
    RequestStart { messages: usize },

    /// The assistant replied
    RequestEnd {
        message: Message,
        total_usage: Usage,
    },

    /// The request failed, timed out or was cancelled
    Error { error: RequestError },
}

impl EngineEvent {
    /// Check if this event ends a request
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineEvent::RequestEnd { .. } | EngineEvent::Error { .. }
        )
    }
}
