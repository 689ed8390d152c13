//! Output rendering for chat replies.
//!
//! This module provides the [`Renderer`] trait the client and session write
//! through, a stdout implementation ([`PlainTextRenderer`]) and the
//! [`ProgressIndicator`] shown while a buffered request is in flight.

use std::io::{self, IsTerminal, Stdout, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::markdown::render_markdown;
use crate::types::Mode;

/// ANSI escape code for bold text (used for the reply label).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for dim text (used for informational messages).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Returns to column zero and erases the line.
pub const CLEAR_LINE: &str = "\r\x1b[2K";

/// Label written before a streamed reply.
pub const REPLY_LABEL: &str = "Assistant: ";

/// Glyphs cycled by the progress indicator.
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Time between two progress indicator frames.
pub const SPINNER_CADENCE: Duration = Duration::from_millis(80);

///////////////////////////////////////////// Renderer /////////////////////////////////////////////

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
pub trait Renderer: Send {
    /// Called before the first output of an assistant reply.
    fn start_reply(&mut self, mode: Mode);

    /// Print a chunk of streamed reply text, verbatim and immediately.
    fn print_text(&mut self, text: &str);

    /// Print a complete reply formatted as markdown.
    fn print_markdown(&mut self, markdown: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Start the progress indicator for a buffered request.
    ///
    /// The indicator runs until the returned guard is stopped or dropped.
    fn start_progress(&mut self) -> ProgressIndicator {
        ProgressIndicator::disabled()
    }

    /// Called when a streamed reply is complete.
    fn finish_response(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    show_progress: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    ///
    /// The progress indicator is only shown when stdout is a terminal.
    pub fn with_color(use_color: bool) -> Self {
        let stdout = io::stdout();
        let show_progress = stdout.is_terminal();
        Self {
            stdout,
            use_color,
            show_progress,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_reply(&mut self, mode: Mode) {
        if mode.is_streaming() {
            if self.use_color {
                print!("{ANSI_BOLD}{REPLY_LABEL}{ANSI_RESET}");
            } else {
                print!("{REPLY_LABEL}");
            }
            self.flush();
        }
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn print_markdown(&mut self, markdown: &str) {
        println!("{}", render_markdown(markdown, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("\n{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("\nError: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn start_progress(&mut self) -> ProgressIndicator {
        if self.show_progress {
            ProgressIndicator::start(Arc::new(Mutex::new(io::stdout())), SPINNER_CADENCE)
        } else {
            ProgressIndicator::disabled()
        }
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }
}

///////////////////////////////////////// ProgressIndicator ////////////////////////////////////////

/// Output shared between the indicator task and its guard.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// A rotating glyph drawn on a single line while a request is outstanding.
///
/// The glyph is redrawn by a tokio task.  Stopping or dropping the guard aborts
/// the task and erases the line, so the indicator is cleaned up on every exit
/// path of the request, including errors and early returns.
pub struct ProgressIndicator {
    task: Option<(JoinHandle<()>, SharedWriter)>,
}

impl ProgressIndicator {
    /// An indicator that draws nothing.
    pub fn disabled() -> Self {
        Self { task: None }
    }

    /// Starts drawing a frame to `writer` every `cadence`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(writer: SharedWriter, cadence: Duration) -> Self {
        let task_writer = Arc::clone(&writer);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cadence);
            for frame in SPINNER_FRAMES.iter().cycle() {
                interval.tick().await;
                if let Ok(mut out) = task_writer.lock() {
                    let _ = write!(out, "\r{frame} ");
                    let _ = out.flush();
                }
            }
        });
        Self {
            task: Some((handle, writer)),
        }
    }

    /// Returns true while the indicator task is owned by this guard.
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the indicator and erases its line.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some((handle, writer)) = self.task.take() {
            handle.abort();
            if let Ok(mut out) = writer.lock() {
                let _ = write!(out, "{CLEAR_LINE}");
                let _ = out.flush();
            }
        }
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.halt();
    }
}
