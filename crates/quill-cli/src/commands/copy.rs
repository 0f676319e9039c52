//! /c command - copy a conversation entry to the clipboard

use super::CommandResult;
use crate::clipboard::Clipboard;
use quill_engine::Engine;

pub struct CopyCommand;

impl CopyCommand {
    /// Execute /c command
    /// - No index: copy the last entry
    /// - With index: copy that view entry (any role)
    pub fn execute(index: Option<usize>, engine: &Engine, clipboard: &dyn Clipboard) -> CommandResult {
        let count = engine.conversation_view().len();
        let Some(index) = index.or_else(|| count.checked_sub(1)) else {
            return CommandResult::Message("Nothing to copy yet.".to_string());
        };

        let entry = match engine.entry(index) {
            Ok(entry) => entry,
            Err(e) => {
                return CommandResult::Error(format!(
                    "{}. Valid range: 0-{}",
                    e,
                    count.saturating_sub(1)
                ));
            }
        };

        match clipboard.copy(&entry.content) {
            Ok(()) => CommandResult::Message(format!("Copied #{} to clipboard.", index)),
            Err(e) => CommandResult::Error(format!("Could not copy to clipboard: {}", e)),
        }
    }
}
