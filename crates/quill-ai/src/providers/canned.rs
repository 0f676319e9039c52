//! Offline provider that answers every request with the same reply

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::CompletionProvider;
use crate::{
    error::Result,
    types::{ChatRequest, ChatResponse, Choice, Role, Usage, WireMessage},
};

pub const CANNED_ID: &str = "chatcmpl-6v7mkQj980V1yBec6ETrKPRqFjNw9";
pub const CANNED_CONTENT: &str = "Test response";
pub const CANNED_USAGE: Usage = Usage {
    prompt_tokens: 58,
    completion_tokens: 68,
    total_tokens: 126,
};

/// Replies `"Test response"` after a fixed delay
#[derive(Debug)]
pub struct CannedProvider {
    delay: Duration,
    calls: AtomicUsize,
}

impl CannedProvider {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_secs(1))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of requests that reached this provider
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl Default for CannedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for CannedProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(messages = request.messages.len(), "Canned completion");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ChatResponse {
            id: CANNED_ID.to_string(),
            usage: Some(CANNED_USAGE),
            choices: vec![Choice {
                message: WireMessage {
                    role: Role::Assistant,
                    content: CANNED_CONTENT.to_string(),
                },
                finish_reason: Some("stop".to_string()),
            }],
        })
    }
}
