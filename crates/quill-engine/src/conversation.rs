//! Conversation state: transcript, seed entries, usage and last error.

use quill_ai::{ChatRequest, Message, Role, Usage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, RequestError, Result};

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "Assistant is a large language model trained by OpenAI.";

/// Where the engine is in its request cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    Sending,
    Errored,
}

/// Transcript plus per-session bookkeeping.
///
/// The first `seed_len` entries are the system prompt and the optional
/// command prefix. They are never removed and never appear in [`view`].
///
/// [`view`]: Conversation::view
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    seed_len: usize,
    /// Total usage across all turns
    pub total_usage: Usage,
    /// Id of the last completion response
    pub chat_id: Option<String>,
    /// Last request failure, cleared by the next successful exchange
    pub error: Option<RequestError>,
    pub state: EngineState,
}

impl Conversation {
    /// Start a fresh transcript from its seed entries
    pub fn seeded(system_prompt: Option<&str>, command_prefix: Option<&str>) -> Self {
        let mut messages = vec![Message::system(
            system_prompt
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(DEFAULT_SYSTEM_PROMPT),
        )];
        if let Some(prefix) = command_prefix.filter(|p| !p.trim().is_empty()) {
            messages.push(Message::user(prefix));
        }
        Self {
            seed_len: messages.len(),
            messages,
            ..Default::default()
        }
    }

    /// Every entry, seeds included, in request order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Entries after the seeds
    pub fn view(&self) -> &[Message] {
        &self.messages[self.seed_len..]
    }

    pub fn seed_len(&self) -> usize {
        self.seed_len
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of user messages after the seeds
    pub fn user_count(&self) -> usize {
        self.view().iter().filter(|m| m.is_user()).count()
    }

    /// Absolute position of the `index`-th user message after the seeds
    fn user_position(&self, index: usize) -> Option<usize> {
        self.view()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_user())
            .nth(index)
            .map(|(i, _)| self.seed_len + i)
    }

    /// Overwrite the `index`-th user message and drop everything after it
    pub fn edit_user(&mut self, index: usize, content: impl Into<String>) -> Result<()> {
        let position = self.user_position(index).ok_or(Error::InvalidIndex {
            index,
            len: self.user_count(),
        })?;
        self.messages[position].content = content.into();
        self.messages.truncate(position + 1);
        Ok(())
    }

    /// Remove `error` entries at the end of the transcript
    pub fn drop_trailing_errors(&mut self) {
        while self.messages.len() > self.seed_len
            && self.messages.last().is_some_and(|m| m.role == Role::Error)
        {
            self.messages.pop();
        }
    }

    /// Whether the transcript ends in a user message that has no reply yet
    pub fn has_pending_user(&self) -> bool {
        self.view()
            .iter()
            .rev()
            .find(|m| m.role != Role::Error)
            .is_some_and(|m| m.is_user())
    }

    /// Replace everything after the seeds
    pub fn replace_view(&mut self, messages: Vec<Message>) {
        self.messages.truncate(self.seed_len);
        self.messages.extend(messages);
    }

    /// Request body for the current transcript
    pub fn to_request(&self) -> ChatRequest {
        ChatRequest::from_transcript(&self.messages)
    }
}
