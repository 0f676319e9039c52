//! Azure-style OpenAI deployment endpoint

use async_trait::async_trait;

use super::CompletionProvider;
use crate::{
    error::{Error, Result},
    types::{ChatRequest, ChatResponse},
};

/// API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "2023-05-15";

/// Where completion requests go and how they authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub api_version: String,
}

impl Endpoint {
    /// Create an endpoint, rejecting blank fields
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        if endpoint.api_base.trim().is_empty()
            || endpoint.api_key.trim().is_empty()
            || endpoint.model.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "Please set OPENAI_API_BASE, OPENAI_API_KEY and OPENAI_API_MODEL_NAME.".into(),
            ));
        }
        Ok(endpoint)
    }

    /// Override the api-version query parameter
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Full chat-completions URL for this deployment
    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            self.api_version
        )
    }
}

/// Chat-completions client for a single deployment
pub struct AzureOpenAIProvider {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl AzureOpenAIProvider {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAIProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint.url();
        tracing::debug!(
            model = %self.endpoint.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("api-key", &self.endpoint.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Completion request failed: {}", body);
            return Err(Error::api(status.as_u16(), reason));
        }

        let body: ChatResponse = response.json().await?;
        if body.choices.is_empty() {
            return Err(Error::UnexpectedResponse("response has no choices".into()));
        }
        tracing::debug!(id = %body.id, usage = ?body.usage, "Completion received");
        Ok(body)
    }
}
