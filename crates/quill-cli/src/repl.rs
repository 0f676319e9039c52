//! Interactive read-eval-print loop

use crate::clipboard::Clipboard;
use crate::commands::{self, CommandResult};
use crate::render::{Renderer, usage_line};
use quill_engine::{Engine, parse_intent};
use std::io::{self, Write};
use std::path::Path;

const PROMPT: &str = ">> ";

/// Abort the in-flight request on Ctrl-C; exit when nothing is pending
fn spawn_interrupt_watcher(engine: &Engine) -> tokio::task::JoinHandle<()> {
    let handle = engine.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_in_flight() {
                tracing::debug!("Ctrl-C: aborting request");
                handle.abort();
            } else {
                eprintln!();
                std::process::exit(130);
            }
        }
    })
}

/// Send whatever is pending and print what the engine appended
async fn send<W: Write>(engine: &mut Engine, renderer: &mut Renderer<W>) -> io::Result<()> {
    let start = engine.conversation_view().len();
    engine.send_pending().await;

    let view = engine.conversation_view();
    renderer.tail(view, start.min(view.len()))?;
    report(engine, renderer)
}

/// Re-send the pending message, replacing the failed attempt on screen
async fn retry<W: Write>(engine: &mut Engine, renderer: &mut Renderer<W>) -> io::Result<()> {
    if let Err(e) = engine.retry().await {
        return renderer.notice(&e.to_string());
    }
    if let Some(index) = engine.last_user_index() {
        renderer.redraw_from_user(index, engine.conversation_view())?;
    }
    report(engine, renderer)
}

/// Usage after a reply, or what went wrong
fn report<W: Write>(engine: &Engine, renderer: &mut Renderer<W>) -> io::Result<()> {
    match engine.error() {
        Some(error) => renderer.request_error(error),
        None => renderer.notice(&usage_line(&engine.cumulative_usage())),
    }
}

/// Run the interactive loop until end of input
pub async fn run<W: Write>(
    engine: &mut Engine,
    renderer: &mut Renderer<W>,
    clipboard: &dyn Clipboard,
    first_message: Option<String>,
) -> anyhow::Result<()> {
    let watcher = spawn_interrupt_watcher(engine);
    let dir = std::env::current_dir()?;

    renderer.notice("Type a message, or /e /c /s /l /r. Empty line for help, Ctrl-D to quit.")?;
    renderer.conversation(engine.conversation_view())?;

    if let Some(message) = first_message {
        engine.append_user_message(message);
        let view = engine.conversation_view();
        renderer.tail(view, view.len() - 1)?;
        send(engine, renderer).await?;
    }

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            println!();
            break;
        }
        let input = input.trim_end_matches(['\r', '\n']);
        renderer.erase_input(PROMPT, input)?;

        handle_line(input, engine, renderer, clipboard, &dir).await?;
    }

    watcher.abort();
    tracing::debug!(usage = ?engine.cumulative_usage(), "Session finished");
    Ok(())
}

/// Interpret one input line and carry it out
async fn handle_line<W: Write>(
    input: &str,
    engine: &mut Engine,
    renderer: &mut Renderer<W>,
    clipboard: &dyn Clipboard,
    dir: &Path,
) -> io::Result<()> {
    let intent = parse_intent(input);
    tracing::debug!(kind = ?intent.kind, index = ?intent.index, "Parsed input");

    match commands::execute_intent(intent, engine, clipboard, dir) {
        CommandResult::Send => {
            let view = engine.conversation_view();
            renderer.tail(view, view.len() - 1)?;
            send(engine, renderer).await
        }
        CommandResult::Retry => retry(engine, renderer).await,
        CommandResult::Edited { index } => {
            renderer.redraw_from_user(index, engine.conversation_view())?;
            send(engine, renderer).await
        }
        CommandResult::Loaded => {
            renderer.notice("Conversation loaded.")?;
            renderer.conversation(engine.conversation_view())
        }
        CommandResult::Message(text) => renderer.notice(&text),
        CommandResult::Error(text) => renderer.error(&text),
    }
}
