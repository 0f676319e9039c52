//! Completion providers

pub mod azure;
pub mod canned;

use crate::{ChatRequest, ChatResponse, Result};
use async_trait::async_trait;

pub use azure::{AzureOpenAIProvider, Endpoint};
pub use canned::CannedProvider;

/// The completion boundary: one request in, one response out
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send the whole transcript and wait for the assistant reply
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
