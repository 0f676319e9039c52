//! /s and /l commands - conversation files

use super::CommandResult;
use crate::transcript;
use quill_engine::Engine;
use std::path::Path;

pub struct SaveCommand;

impl SaveCommand {
    pub fn execute(target: &str, engine: &Engine, dir: &Path) -> CommandResult {
        match transcript::save(engine.conversation_view(), target, engine.chat_id(), dir) {
            Ok(path) => CommandResult::Message(format!("Saved to {}", path.display())),
            Err(e) => CommandResult::Error(format!("Could not save conversation: {}", e)),
        }
    }
}

pub struct LoadCommand;

impl LoadCommand {
    pub fn execute(target: &str, engine: &mut Engine, dir: &Path) -> CommandResult {
        match transcript::load(target, dir) {
            Ok(messages) => {
                engine.replace_conversation(messages);
                CommandResult::Loaded
            }
            Err(e) => CommandResult::Error(format!("Could not load conversation: {}", e)),
        }
    }
}
