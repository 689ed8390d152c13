//! Interactive chat application for chat completions endpoints.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; the key comes from $OPENAI_API_KEY
//! chatline
//!
//! # Ask a first question straight away
//! chatline what is the capital of France
//!
//! # Start in markdown mode against another model
//! chatline --markdown --model gpt-4o
//!
//! # Disable colors (useful for piping output)
//! chatline --no-color
//! ```
//!
//! # Commands
//!
//! - `/ns [message]` - Start a new streaming session
//! - `/nsm [message]` - Start a new markdown session
//! - `/quit` or an empty line - Exit the application

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use arrrg::CommandLine;
use biometrics::Collector;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use chatline::chat::{
    ChatArgs, ChatConfig, ChatSession, Control, PlainTextRenderer, Renderer, help_text,
};
use chatline::render::CLEAR_LINE;
use chatline::{CompletionClient, Completions, JsonLinesLogger, register_biometrics};

/// Exit status when the process is interrupted mid-request.
const INTERRUPTED: i32 = 130;

/// Main entry point for the chatline application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let (args, words) = ChatArgs::from_command_line_relaxed("chatline [OPTIONS] [PROMPT...]");
    let config = match ChatConfig::load(args, &words) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("chatline: {err}");
            return ExitCode::FAILURE;
        }
    };
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chatline: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ChatConfig) -> Result<(), Box<dyn std::error::Error>> {
    register_biometrics(Collector::new());

    let mut client = CompletionClient::with_options(
        config.api_key.clone(),
        config.model.clone(),
        Some(&config.endpoint),
        Some(config.timeout),
    )?;
    if let Some(path) = &config.log_file {
        client = client.with_logger(Arc::new(JsonLinesLogger::open(path)?));
    }

    let mut session = ChatSession::new(client, config.mode);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // The line editor handles Ctrl+C at the prompt; this fires mid-request.
    ctrlc::set_handler(|| {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{CLEAR_LINE}");
        let _ = stdout.flush();
        std::process::exit(INTERRUPTED);
    })?;

    println!(
        "chatline (model: {}, mode: {})",
        session.client().model(),
        session.mode()
    );
    for line in help_text().lines() {
        println!("    {line}");
    }
    println!();

    if let Some(prompt) = &config.initial_prompt {
        println!("You: {prompt}");
        if session.handle_line(prompt, &mut renderer).await == Control::Exit {
            return Ok(());
        }
    }

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.trim());
                }
                if session.handle_line(&line, &mut renderer).await == Control::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                return Err(err.into());
            }
        }
    }

    Ok(())
}
