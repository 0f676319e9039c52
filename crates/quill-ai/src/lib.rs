//! quill-ai: chat-completions wire types and the provider boundary
//!
//! This crate holds the transcript message types shared by the engine and
//! front ends, plus the providers that turn a transcript into a reply.

pub mod error;
pub mod providers;
pub mod types;

pub use error::{Error, Result};
pub use providers::{AzureOpenAIProvider, CannedProvider, CompletionProvider, Endpoint};
pub use types::*;
