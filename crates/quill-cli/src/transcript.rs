//! Saving and loading conversations as JSON files

use quill_ai::Message;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: not a saved conversation ({source})")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// File name used when the user gives no target
pub fn default_file_name(chat_id: Option<&str>) -> String {
    let id = chat_id
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    format!("conversation-{}.json", id)
}

/// Write the conversation view to `target` (or a default name in `dir`)
pub fn save(
    messages: &[Message],
    target: &str,
    chat_id: Option<&str>,
    dir: &Path,
) -> Result<PathBuf, TranscriptError> {
    let target = target.trim();
    let path = if target.is_empty() {
        dir.join(default_file_name(chat_id))
    } else {
        dir.join(target)
    };

    let content = serde_json::to_string_pretty(messages).map_err(|source| TranscriptError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, content).map_err(|source| TranscriptError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), messages = messages.len(), "Saved conversation");
    Ok(path)
}

/// Read a conversation written by [`save`]
pub fn load(target: &str, dir: &Path) -> Result<Vec<Message>, TranscriptError> {
    let path = dir.join(target.trim());
    let content = fs::read_to_string(&path).map_err(|source| TranscriptError::Io {
        path: path.clone(),
        source,
    })?;
    let messages: Vec<Message> =
        serde_json::from_str(&content).map_err(|source| TranscriptError::Json {
            path: path.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), messages = messages.len(), "Loaded conversation");
    Ok(messages)
}
