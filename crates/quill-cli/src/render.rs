//! Plain terminal rendering
//!
//! Everything printed for the conversation goes through [`Renderer`], which
//! records it in a [`RenderCache`]. After an edit the cache tells how many
//! terminal rows sit below the edited message so they can be erased and the
//! new tail drawn in their place.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Stylize, StyledContent},
    terminal::{self, ClearType},
};
use quill_ai::{Message, Role, Usage};
use quill_engine::{EngineEvent, RequestError};
use tokio::sync::broadcast;
use unicode_width::UnicodeWidthStr;

/// Lines written for the conversation, tagged by the user message they belong to
#[derive(Debug, Default)]
pub struct RenderCache {
    lines: Vec<String>,
    /// (user message index, first line of that message)
    user_starts: Vec<(usize, usize)>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that user message `index` starts at the next line
    pub fn mark_user(&mut self, index: usize) {
        self.user_starts.retain(|(i, _)| *i < index);
        self.user_starts.push((index, self.lines.len()));
    }

    pub fn push_text(&mut self, text: &str) {
        self.lines.extend(text.split('\n').map(str::to_string));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.user_starts.clear();
    }

    /// Terminal rows from user message `index` to the end of the output
    pub fn rows_from_user(&self, index: usize, columns: u16) -> Option<usize> {
        let start = self
            .user_starts
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, line)| *line)?;
        Some(
            self.lines[start..]
                .iter()
                .map(|line| rows_for(line, columns))
                .sum(),
        )
    }

    /// Forget everything from user message `index` on
    pub fn truncate_from_user(&mut self, index: usize) {
        if let Some(pos) = self.user_starts.iter().position(|(i, _)| *i == index) {
            let line = self.user_starts[pos].1;
            self.lines.truncate(line);
            self.user_starts.truncate(pos);
        }
    }
}

/// Rows a single line takes once the terminal wraps it
fn rows_for(line: &str, columns: u16) -> usize {
    let columns = usize::from(columns.max(1));
    let width = UnicodeWidthStr::width(line);
    width.div_ceil(columns).max(1)
}

/// Writes conversation entries to a terminal
pub struct Renderer<W: Write> {
    out: W,
    cache: RenderCache,
    color: bool,
    /// Show `#N` and `[N]` indexes for `/e` and `/c`
    indexed: bool,
    /// Output is a terminal we may move the cursor around in
    tty: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool, indexed: bool, tty: bool) -> Self {
        Self {
            out,
            cache: RenderCache::new(),
            color,
            indexed,
            tty,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, style: fn(&str) -> StyledContent<&str>) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn label(&self, message: &Message, view_index: usize, user_index: Option<usize>) -> String {
        match (message.role, self.indexed) {
            (Role::User, true) => {
                let tag = format!("#{} You [{}]:", view_index, user_index.unwrap_or(0));
                self.paint(&tag, |s| s.cyan().bold())
            }
            (Role::User, false) => self.paint("You:", |s| s.cyan().bold()),
            (Role::Assistant, true) => {
                self.paint(&format!("#{} AI:", view_index), |s| s.green().bold())
            }
            (Role::Assistant, false) => String::new(),
            (Role::Error, _) => self.paint("Error:", |s| s.red().bold()),
            (Role::System, _) => self.paint("System:", |s| s.dark_grey()),
        }
    }

    fn write_cached(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.cache.push_text(text);
        self.out.flush()
    }

    /// Print one conversation entry
    pub fn message(
        &mut self,
        message: &Message,
        view_index: usize,
        user_index: Option<usize>,
    ) -> io::Result<()> {
        if let (Role::User, Some(index)) = (message.role, user_index) {
            self.cache.mark_user(index);
        }
        let label = self.label(message, view_index, user_index);
        let body = match message.role {
            Role::Assistant => self.paint(&message.content, |s| s.green()),
            Role::Error => self.paint(&message.content, |s| s.red()),
            _ => message.content.clone(),
        };
        if label.is_empty() {
            self.write_cached(&body)
        } else {
            self.write_cached(&format!("{} {}", label, body))
        }
    }

    /// Print the view from entry `start` on
    pub fn tail(&mut self, view: &[Message], start: usize) -> io::Result<()> {
        let mut users = view[..start.min(view.len())]
            .iter()
            .filter(|m| m.is_user())
            .count();
        for (i, message) in view.iter().enumerate().skip(start) {
            let user_index = message.is_user().then(|| {
                users += 1;
                users - 1
            });
            self.message(message, i, user_index)?;
        }
        Ok(())
    }

    /// Print a whole conversation view
    pub fn conversation(&mut self, view: &[Message]) -> io::Result<()> {
        self.tail(view, 0)
    }

    /// Erase the input line the user just typed after `prompt`
    pub fn erase_input(&mut self, prompt: &str, input: &str) -> io::Result<()> {
        if !self.tty {
            return Ok(());
        }
        let columns = terminal::size().map(|(c, _)| c).unwrap_or(80);
        let rows: usize = format!("{}{}", prompt, input)
            .split('\n')
            .map(|line| rows_for(line, columns))
            .sum();
        queue!(
            self.out,
            cursor::MoveToPreviousLine(u16::try_from(rows).unwrap_or(u16::MAX)),
            terminal::Clear(ClearType::FromCursorDown)
        )?;
        self.out.flush()
    }

    /// Redraw from user message `index` after an edit. Without cached
    /// output to erase the whole view is printed again.
    pub fn redraw_from_user(&mut self, index: usize, view: &[Message]) -> io::Result<()> {
        let columns = terminal::size().map(|(c, _)| c).unwrap_or(80);
        let rows = self.cache.rows_from_user(index, columns);
        match rows {
            Some(rows) if self.tty => {
                queue!(
                    self.out,
                    cursor::MoveToPreviousLine(u16::try_from(rows).unwrap_or(u16::MAX)),
                    terminal::Clear(ClearType::FromCursorDown)
                )?;
                self.cache.truncate_from_user(index);
                let start = view
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.is_user())
                    .nth(index)
                    .map(|(i, _)| i)
                    .unwrap_or(view.len());
                self.tail(view, start)
            }
            _ => {
                self.cache.clear();
                self.conversation(view)
            }
        }
    }

    /// Print a note that is not part of the conversation
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        let line = self.paint(text, |s| s.dark_grey());
        self.write_cached(&line)
    }

    /// Explain a recorded request error beyond its transcript entry
    pub fn request_error(&mut self, error: &RequestError) -> io::Result<()> {
        let line = match error {
            RequestError::Failed(reason) => format!("{} Use /r to retry.", reason),
            RequestError::Timeout => "Use /r to try again.".to_string(),
            RequestError::Cancelled => format!("{} Use /r to send it again.", error),
        };
        self.error(&line)
    }

    /// Print a failure that is not part of the conversation
    pub fn error(&mut self, text: &str) -> io::Result<()> {
        let line = self.paint(text, |s| s.red());
        self.write_cached(&line)
    }
}

/// One-line token summary
pub fn usage_line(usage: &Usage) -> String {
    format!(
        "[Tokens: {} prompt, {} completion, {} total]",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    )
}

/// Show a spinner on stderr while a request is outstanding
pub fn spawn_spinner(mut events: broadcast::Receiver<EngineEvent>) -> tokio::task::JoinHandle<()> {
    const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    tokio::spawn(async move {
        let mut spinning = false;
        let mut frame = 0usize;
        let mut tick = tokio::time::interval(Duration::from_millis(80));
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(EngineEvent::RequestStart { .. }) => spinning = true,
                    Ok(e) if e.is_terminal() => {
                        spinning = false;
                        eprint!("\r \r");
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = tick.tick(), if spinning => {
                    eprint!("\r{}", FRAMES[frame % FRAMES.len()]);
                    io::stderr().flush().ok();
                    frame += 1;
                }
            }
        }
    })
}
