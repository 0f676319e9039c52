//! ai - chat with a hosted chat-completions deployment from the terminal

mod clipboard;
mod commands;
mod config;
mod input;
mod render;
mod repl;
mod transcript;

use clap::Parser;
use quill_ai::{AzureOpenAIProvider, CannedProvider, CompletionProvider};
use quill_engine::{DEFAULT_REQUEST_TIMEOUT, Engine, EngineConfig};
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

/// ai - ask a hosted language model from the command line
#[derive(Parser, Debug)]
#[command(name = "ai")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Message to send (piped stdin is appended to it)
    #[arg(short, long)]
    message: Option<String>,

    /// Message to send, as a positional argument
    #[arg(conflicts_with = "message")]
    text: Option<String>,

    /// Keep the conversation going after the first reply
    #[arg(short, long)]
    interactive: bool,

    /// System prompt for the conversation
    #[arg(short, long)]
    prompt: Option<String>,

    /// Instruction sent ahead of every conversation
    #[arg(long)]
    command_prompt: Option<String>,

    /// Seconds to wait for a reply
    #[arg(long)]
    timeout: Option<u64>,

    /// Answer with a canned reply instead of calling the API
    #[arg(long)]
    offline: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("quill_cli=debug,quill_engine=debug,quill_ai=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = config::Config::load();

    let piped = input::read_from_pipe()?;
    let message = input::compose_message(args.message.as_deref().or(args.text.as_deref()), &piped);
    if message.is_none() && !args.interactive {
        println!("{}", commands::help_message());
        println!("\nRun `ai --help` for options.");
        return Ok(());
    }

    let provider: Arc<dyn CompletionProvider> = if args.offline {
        tracing::info!("Offline mode: using canned replies");
        Arc::new(CannedProvider::new())
    } else {
        let endpoint = config.endpoint(|var| std::env::var(var).ok())?;
        tracing::debug!(url = %endpoint.url(), "Resolved endpoint");
        Arc::new(AzureOpenAIProvider::new(endpoint))
    };

    let system_prompt = args.prompt.or_else(|| config.system_prompt.clone());
    let engine_config = EngineConfig {
        system_prompt,
        command_prefix: args.command_prompt,
        request_timeout: args
            .timeout
            .map(Duration::from_secs)
            .or_else(|| config.timeout())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
    };
    let mut engine = Engine::new(engine_config, provider);

    let stdout = io::stdout();
    let tty = stdout.is_terminal();
    let color = tty && std::env::var_os("NO_COLOR").is_none();

    if args.interactive {
        let mut renderer = render::Renderer::new(stdout, color, true, tty);
        return repl::run(&mut engine, &mut renderer, &clipboard::SystemClipboard, message).await;
    }

    let Some(message) = message else {
        return Ok(());
    };
    let mut renderer = render::Renderer::new(stdout, color, false, tty);
    run_once(&mut engine, &mut renderer, message).await
}

/// Send one message, print the reply and exit
async fn run_once<W: io::Write>(
    engine: &mut Engine,
    renderer: &mut render::Renderer<W>,
    message: String,
) -> anyhow::Result<()> {
    let spinner = io::stderr()
        .is_terminal()
        .then(|| render::spawn_spinner(engine.subscribe()));

    let handle = engine.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });

    engine.append_user_message(message);
    let reply = engine.send_pending().await;

    interrupt.abort();
    if let Some(spinner) = spinner {
        spinner.abort();
        eprint!("\r \r");
    }

    if let Some(reply) = reply {
        renderer.message(&reply, engine.conversation_view().len() - 1, None)?;
        eprintln!("{}", render::usage_line(&engine.cumulative_usage()));
        return Ok(());
    }

    match engine.error() {
        Some(error) => anyhow::bail!("{}", error),
        None => anyhow::bail!("No reply received"),
    }
}
