//! System clipboard access

use std::io;

/// Something that can take text for pasting elsewhere
pub trait Clipboard {
    fn copy(&self, text: &str) -> io::Result<()>;
}

/// The desktop clipboard
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> io::Result<()> {
        let mut clipboard = arboard::Clipboard::new().map_err(io::Error::other)?;
        clipboard.set_text(text).map_err(io::Error::other)?;
        tracing::debug!(bytes = text.len(), "Copied to clipboard");
        Ok(())
    }
}
