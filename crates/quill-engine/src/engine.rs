//! Conversation engine: owns the transcript and runs the request cycle

use std::sync::Arc;
use std::time::Duration;

use quill_ai::{CompletionProvider, Message, Usage};
use tokio::sync::broadcast;

use crate::{
    conversation::{Conversation, EngineState},
    error::{Error, RequestError, Result},
    events::EngineEvent,
    handle::EngineHandle,
};

/// Upper bound on one outstanding request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// System prompt (default prompt when `None`)
    pub system_prompt: Option<String>,
    /// Fixed user message sent ahead of every conversation
    pub command_prefix: Option<String>,
    /// How long a request may stay outstanding
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            command_prefix: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Marks the request finished when dropped, including when the send
/// future itself is dropped before it completes.
struct InFlight<'a> {
    handle: &'a EngineHandle,
    state: &'a mut EngineState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if *self.state == EngineState::Sending {
            *self.state = EngineState::Idle;
        }
        self.handle.finish();
    }
}

/// Owns one session's transcript and talks to the completion provider.
///
/// Mutating operations take `&mut self`, so nothing can touch the transcript
/// while [`send_pending`](Engine::send_pending) is awaiting a reply. The only
/// thing reachable from other tasks is the [`EngineHandle`], which can abort
/// the outstanding request.
pub struct Engine {
    config: EngineConfig,
    conversation: Conversation,
    provider: Arc<dyn CompletionProvider>,
    event_tx: broadcast::Sender<EngineEvent>,
    handle: EngineHandle,
}

impl Engine {
    /// Create an engine already initialized from `config`
    pub fn new(config: EngineConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let conversation = Conversation::seeded(
            config.system_prompt.as_deref(),
            config.command_prefix.as_deref(),
        );
        Self {
            config,
            conversation,
            provider,
            event_tx,
            handle: EngineHandle::new(),
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting requests from outside
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Reset the transcript to its seed entries and clear all session state
    pub fn initialize(&mut self, system_prompt: Option<&str>, command_prefix: Option<&str>) {
        self.config.system_prompt = system_prompt.map(str::to_string);
        self.config.command_prefix = command_prefix.map(str::to_string);
        self.conversation = Conversation::seeded(system_prompt, command_prefix);
    }

    /// Append a user message without sending it
    pub fn append_user_message(&mut self, text: impl Into<String>) {
        self.conversation.push(Message::user(text));
    }

    /// Replace the `index`-th user message and drop every later entry
    pub fn edit_user_message(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        self.conversation.edit_user(index, text)?;
        tracing::debug!(index, "Edited user message, transcript truncated");
        Ok(())
    }

    /// Transcript without the seed entries
    pub fn conversation_view(&self) -> &[Message] {
        self.conversation.view()
    }

    /// Entry `index` of the conversation view
    pub fn entry(&self, index: usize) -> Result<&Message> {
        let view = self.conversation.view();
        view.get(index).ok_or(Error::InvalidIndex {
            index,
            len: view.len(),
        })
    }

    /// Number of user messages in the conversation view
    pub fn user_message_count(&self) -> usize {
        self.conversation.user_count()
    }

    /// Index of the most recent user message, counting user messages only
    pub fn last_user_index(&self) -> Option<usize> {
        self.user_message_count().checked_sub(1)
    }

    /// Running totals across all completed turns
    pub fn cumulative_usage(&self) -> Usage {
        self.conversation.total_usage
    }

    /// Why the last request failed, until the next successful one
    pub fn error(&self) -> Option<&RequestError> {
        self.conversation.error.as_ref()
    }

    pub fn state(&self) -> EngineState {
        self.conversation.state
    }

    /// Id of the last completion response
    pub fn chat_id(&self) -> Option<&str> {
        self.conversation.chat_id.as_deref()
    }

    /// Replace everything after the seed entries, e.g. from a saved file
    pub fn replace_conversation(&mut self, messages: Vec<Message>) {
        tracing::debug!(messages = messages.len(), "Replacing conversation");
        self.conversation.replace_view(messages);
        self.conversation.error = None;
        self.conversation.state = EngineState::Idle;
    }

    /// Re-send the last user message after a failed or cancelled request
    pub async fn retry(&mut self) -> Result<Option<Message>> {
        if !self.conversation.has_pending_user() {
            return Err(Error::NothingToRetry);
        }
        self.conversation.drop_trailing_errors();
        Ok(self.send_pending().await)
    }

    /// Send the transcript and append the reply.
    ///
    /// Returns the assistant message on success. On failure the reason is
    /// recorded (see [`error`](Engine::error)) and `None` is returned; the
    /// user message that was sent stays in place.
    pub async fn send_pending(&mut self) -> Option<Message> {
        let cancel = self.handle.begin();
        self.conversation.state = EngineState::Sending;

        let request = self.conversation.to_request();
        let guard = InFlight {
            handle: &self.handle,
            state: &mut self.conversation.state,
        };
        let _ = self.event_tx.send(EngineEvent::RequestStart {
            messages: request.messages.len(),
        });

        let provider = Arc::clone(&self.provider);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RequestError::Cancelled),
            result = tokio::time::timeout(self.config.request_timeout, provider.complete(&request)) => {
                match result {
                    Err(_) => Err(RequestError::Timeout),
                    Ok(Err(e)) => Err(RequestError::from_provider(&e)),
                    Ok(Ok(response)) => {
                        let id = response.id.clone();
                        response
                            .into_message()
                            .map(|message| (id, message))
                            .ok_or_else(|| RequestError::Failed("Response has no choices".into()))
                    }
                }
            }
        };

        drop(guard);

        match outcome {
            Ok((id, message)) => {
                if let Some(usage) = &message.usage {
                    self.conversation.total_usage.accumulate(usage);
                }
                if !id.is_empty() {
                    self.conversation.chat_id = Some(id);
                }
                self.conversation.push(message.clone());
                self.conversation.error = None;
                self.conversation.state = EngineState::Idle;
                let _ = self.event_tx.send(EngineEvent::RequestEnd {
                    message: message.clone(),
                    total_usage: self.conversation.total_usage,
                });
                Some(message)
            }
            Err(error) => {
                tracing::warn!("Request did not complete: {}", error);
                if let Some(note) = error.transcript_note() {
                    self.conversation.push(Message::error(note));
                }
                self.conversation.error = Some(error.clone());
                self.conversation.state = EngineState::Errored;
                let _ = self.event_tx.send(EngineEvent::Error { error });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use quill_ai::{CannedProvider, ChatRequest, ChatResponse, Role};

    fn canned_engine(system_prompt: &str) -> (Engine, Arc<CannedProvider>) {
        let provider = Arc::new(CannedProvider::with_delay(Duration::ZERO));
        let config = EngineConfig {
            system_prompt: Some(system_prompt.to_string()),
            ..Default::default()
        };
        (Engine::new(config, provider.clone()), provider)
    }

    /// Records every request and fails each one with a fixed status.
    struct FailingProvider {
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn complete(&self, request: &ChatRequest) -> quill_ai::Result<ChatResponse> {
            self.seen.lock().push(request.clone());
            Err(quill_ai::Error::api(500, "Internal Server Error"))
        }
    }

    #[tokio::test]
    async fn test_first_turn_returns_canned_reply() {
        let (mut engine, _) = canned_engine("You are helpful");
        engine.append_user_message("hi");
        let reply = engine.send_pending().await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Test response");
        assert_eq!(reply.usage, Some(Usage::new(58, 68, 126)));
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.error().is_none());
        assert_eq!(
            engine.chat_id(),
            Some("chatcmpl-6v7mkQj980V1yBec6ETrKPRqFjNw9")
        );
        assert_eq!(engine.conversation_view().len(), 2);
    }

    #[tokio::test]
    async fn test_send_never_touches_history() {
        let (mut engine, _) = canned_engine("sys");
        engine.append_user_message("one");
        engine.send_pending().await;
        let before = engine.conversation_view().to_vec();

        engine.append_user_message("two");
        engine.send_pending().await;

        let after = engine.conversation_view();
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(after.len(), before.len() + 2);
    }

    #[tokio::test]
    async fn test_view_hides_seed_entries() {
        let provider = Arc::new(CannedProvider::with_delay(Duration::ZERO));
        let config = EngineConfig {
            system_prompt: Some("sys".into()),
            command_prefix: Some("prefix".into()),
            ..Default::default()
        };
        let mut engine = Engine::new(config, provider);
        assert!(engine.conversation_view().is_empty());

        for text in ["a", "b", "c"] {
            engine.append_user_message(text);
            engine.send_pending().await;
            assert!(
                engine
                    .conversation_view()
                    .iter()
                    .all(|m| m.role != Role::System && m.content != "prefix")
            );
        }
        assert_eq!(engine.conversation_view().len(), 6);
    }

    #[tokio::test]
    async fn test_edit_after_two_turns_then_send() {
        let (mut engine, provider) = canned_engine("sys");
        engine.append_user_message("hello");
        engine.send_pending().await;
        engine.append_user_message("how are you");
        engine.send_pending().await;
        assert_eq!(engine.user_message_count(), 2);

        engine.edit_user_message(0, "hello again").unwrap();
        assert_eq!(engine.conversation_view(), &[Message::user("hello again")]);

        let reply = engine.send_pending().await.unwrap();
        assert_eq!(reply.content, "Test response");
        let view = engine.conversation_view();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0], Message::user("hello again"));
        assert_eq!(view[1].role, Role::Assistant);
        assert_eq!(provider.calls(), 3);
        assert_eq!(engine.cumulative_usage(), Usage::new(174, 204, 378));
    }

    #[tokio::test]
    async fn test_edit_out_of_range() {
        let (mut engine, _) = canned_engine("sys");
        engine.append_user_message("hello");
        engine.send_pending().await;
        let before = engine.conversation_view().to_vec();

        let err = engine.edit_user_message(1, "x").unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { index: 1, len: 1 }));
        assert_eq!(engine.conversation_view(), &before[..]);
    }

    #[tokio::test]
    async fn test_timeout_records_error_without_reply() {
        let provider = Arc::new(CannedProvider::with_delay(Duration::from_secs(5)));
        let config = EngineConfig {
            request_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let mut engine = Engine::new(config, provider);
        engine.append_user_message("hi");

        assert!(engine.send_pending().await.is_none());
        assert_eq!(engine.error(), Some(&RequestError::Timeout));
        assert_eq!(engine.state(), EngineState::Errored);
        assert!(
            engine
                .conversation_view()
                .iter()
                .all(|m| m.role != Role::Assistant)
        );
        assert_eq!(engine.conversation_view()[0], Message::user("hi"));
        assert!(!engine.handle().is_in_flight());
    }

    #[tokio::test]
    async fn test_failure_keeps_user_message() {
        let provider = Arc::new(FailingProvider {
            seen: Mutex::new(Vec::new()),
        });
        let mut engine = Engine::new(EngineConfig::default(), provider.clone());
        let mut events = engine.subscribe();
        engine.append_user_message("hi");

        assert!(engine.send_pending().await.is_none());
        assert!(matches!(engine.error(), Some(RequestError::Failed(_))));
        let view = engine.conversation_view();
        assert_eq!(view[0], Message::user("hi"));
        assert_eq!(view[1].role, Role::Error);

        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::RequestStart { messages: 2 }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::Error {
                error: RequestError::Failed(_)
            }
        ));

        // The error entry never goes upstream
        engine.retry().await.unwrap();
        let seen = provider.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_abort_through_handle_cancels() {
        let provider = Arc::new(CannedProvider::with_delay(Duration::from_secs(5)));
        let config = EngineConfig {
            request_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let mut engine = Engine::new(config, provider);
        engine.append_user_message("hi");

        let handle = engine.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.abort();
        });

        assert!(engine.send_pending().await.is_none());
        assert_eq!(engine.error(), Some(&RequestError::Cancelled));
        // Cancelling adds nothing to the transcript
        assert_eq!(engine.conversation_view(), &[Message::user("hi")]);
    }

    #[tokio::test]
    async fn test_dropped_send_leaves_engine_idle() {
        let provider = Arc::new(CannedProvider::with_delay(Duration::from_secs(5)));
        let config = EngineConfig {
            request_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let mut engine = Engine::new(config, provider);
        engine.append_user_message("hi");

        let dropped = tokio::time::timeout(Duration::from_millis(20), engine.send_pending()).await;
        assert!(dropped.is_err());
        assert!(!engine.handle().is_in_flight());
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.error().is_none());

        // The user message is still pending and the next send runs normally
        let handle = engine.handle();
        let aborter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.abort();
        });
        assert!(engine.retry().await.unwrap().is_none());
        assert_eq!(engine.error(), Some(&RequestError::Cancelled));
        assert!(!engine.handle().is_in_flight());
        aborter.await.unwrap();
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let provider = Arc::new(CannedProvider::with_delay(Duration::from_millis(200)));
        let config = EngineConfig {
            request_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let mut engine = Engine::new(config, provider);
        engine.append_user_message("hi");
        engine.send_pending().await;
        assert_eq!(engine.error(), Some(&RequestError::Timeout));

        engine.config.request_timeout = Duration::from_secs(5);
        let reply = engine.retry().await.unwrap().unwrap();
        assert_eq!(reply.content, "Test response");
        assert!(engine.error().is_none());
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.conversation_view().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_without_pending_user() {
        let (mut engine, _) = canned_engine("sys");
        assert!(matches!(engine.retry().await, Err(Error::NothingToRetry)));

        engine.append_user_message("hi");
        engine.send_pending().await;
        assert!(matches!(engine.retry().await, Err(Error::NothingToRetry)));
    }

    #[tokio::test]
    async fn test_entry_lookup() {
        let (mut engine, _) = canned_engine("sys");
        engine.append_user_message("hi");
        engine.send_pending().await;

        assert_eq!(engine.entry(0).unwrap().content, "hi");
        assert_eq!(engine.entry(1).unwrap().content, "Test response");
        assert!(matches!(
            engine.entry(2),
            Err(Error::InvalidIndex { index: 2, len: 2 })
        ));
    }

    #[tokio::test]
    async fn test_initialize_resets_session() {
        let (mut engine, _) = canned_engine("sys");
        engine.append_user_message("hi");
        engine.send_pending().await;

        engine.initialize(Some("new prompt"), Some("prefix"));
        assert!(engine.conversation_view().is_empty());
        assert_eq!(engine.cumulative_usage(), Usage::default());
        assert!(engine.chat_id().is_none());
        assert_eq!(engine.last_user_index(), None);

        let request = engine.conversation.to_request();
        assert_eq!(request.messages[0].content, "new prompt");
        assert_eq!(request.messages[1].content, "prefix");
    }

    #[tokio::test]
    async fn test_replace_conversation() {
        let (mut engine, _) = canned_engine("sys");
        engine.append_user_message("hi");
        engine.send_pending().await;

        engine.replace_conversation(vec![
            Message::user("saved question"),
            Message::assistant("saved answer"),
            Message::user("follow up"),
        ]);
        assert_eq!(engine.user_message_count(), 2);
        assert_eq!(engine.last_user_index(), Some(1));
        let reply = engine.send_pending().await.unwrap();
        assert_eq!(reply.content, "Test response");
        assert_eq!(engine.conversation_view().len(), 4);
    }

    #[tokio::test]
    async fn test_serialization_leaves_stored_usage() {
        let (mut engine, _) = canned_engine("sys");
        engine.append_user_message("hi");
        engine.send_pending().await;

        let json = serde_json::to_value(engine.conversation.to_request()).unwrap();
        assert!(json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m.get("usage").is_none()));
        assert_eq!(
            engine.conversation_view()[1].usage,
            Some(Usage::new(58, 68, 126))
        );
    }
}
