//! quill-engine: conversation state and request orchestration
//!
//! This crate turns raw input lines into intents and runs them against a
//! single session's transcript, including the request/response cycle with
//! its timeout and cancellation handling.

pub mod conversation;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod intent;

pub use conversation::{Conversation, DEFAULT_SYSTEM_PROMPT, EngineState};
pub use engine::{DEFAULT_REQUEST_TIMEOUT, Engine, EngineConfig};
pub use error::{Error, RequestError, Result};
pub use events::EngineEvent;
pub use handle::EngineHandle;
pub use intent::{Intent, IntentKind, parse_intent};
