//! Command dispatch for interactive mode

mod copy;
mod edit;
mod transcript;

pub use copy::CopyCommand;
pub use edit::EditCommand;
pub use transcript::{LoadCommand, SaveCommand};

use crate::clipboard::Clipboard;
use quill_engine::{Engine, Intent, IntentKind};
use std::path::Path;

/// Result of executing an intent
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// A user message was appended and should be sent
    Send,
    /// Re-send the pending user message
    Retry,
    /// A user message was rewritten; redraw from it and send
    Edited { index: usize },
    /// The conversation was replaced; redraw everything
    Loaded,
    /// Show a message to the user (not sent to the engine)
    Message(String),
    /// The command could not be carried out
    Error(String),
}

/// Apply a parsed intent to the engine
pub fn execute_intent(
    intent: Intent,
    engine: &mut Engine,
    clipboard: &dyn Clipboard,
    dir: &Path,
) -> CommandResult {
    match intent.kind {
        IntentKind::Message => {
            if intent.payload.trim().is_empty() {
                return CommandResult::Message(help_message());
            }
            engine.append_user_message(intent.payload);
            CommandResult::Send
        }
        IntentKind::Edit => EditCommand::execute(intent.index, intent.payload, engine),
        IntentKind::Copy => CopyCommand::execute(intent.index, engine, clipboard),
        IntentKind::Save => SaveCommand::execute(&intent.payload, engine, dir),
        IntentKind::Load => LoadCommand::execute(&intent.payload, engine, dir),
        IntentKind::Retry => CommandResult::Retry,
    }
}

pub fn help_message() -> String {
    r#"Type a message and press Enter to send it.

Commands:
  /e<N> <text>   Edit your N-th message and resend (latest if N is omitted)
  /c<N>          Copy entry N to the clipboard (last entry if N is omitted)
  /s [file]      Save the conversation as JSON
  /l <file>      Load a saved conversation
  /r             Retry the last request

Ctrl-C cancels a pending request. Ctrl-D exits."#
        .to_string()
}
