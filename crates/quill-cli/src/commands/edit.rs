//! /e command - rewrite an earlier user message

use super::CommandResult;
use quill_engine::Engine;

pub struct EditCommand;

impl EditCommand {
    /// Execute /e command
    /// - No index: edit the most recent user message
    /// - With index: edit that user message (user messages only, from 0)
    pub fn execute(index: Option<usize>, text: String, engine: &mut Engine) -> CommandResult {
        let Some(index) = index.or_else(|| engine.last_user_index()) else {
            return CommandResult::Error("No messages to edit yet.".to_string());
        };

        match engine.edit_user_message(index, text) {
            Ok(()) => CommandResult::Edited { index },
            Err(e) => CommandResult::Error(format!(
                "{}. Valid range: 0-{}",
                e,
                engine.user_message_count().saturating_sub(1)
            )),
        }
    }
}
