//! Classification of interactive input.
//!
//! A handful of exact command tokens control the session; every other line
//! (including unknown slash-prefixed text) is a chat message and is sent to the
//! endpoint unchanged.

use crate::types::Mode;

/// Starts a new streaming session, optionally followed by a first message.
pub const NEW_SESSION: &str = "/ns";

/// Starts a new markdown session, optionally followed by a first message.
pub const NEW_MARKDOWN_SESSION: &str = "/nsm";

/// Exits the chat.
pub const QUIT: &str = "/quit";

/// A parsed chat command.
///
/// These commands control the session and are not sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application.
    Quit,

    /// Discard the conversation and switch to `mode`.
    ///
    /// A non-empty `message` is sent as the first turn of the new session.
    NewSession {
        /// The mode of the new session.
        mode: Mode,
        /// Text that followed the command token, if any.
        message: Option<String>,
    },
}

/// Parses user input for session commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use chatline::chat::{ChatCommand, parse_command};
/// # use chatline::Mode;
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(
///     parse_command("/nsm"),
///     Some(ChatCommand::NewSession { mode: Mode::Rendered, message: None })
/// );
/// assert!(parse_command("/quit now").is_none());
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if input == QUIT {
        return Some(ChatCommand::Quit);
    }

    for (token, mode) in [
        (NEW_SESSION, Mode::Streaming),
        (NEW_MARKDOWN_SESSION, Mode::Rendered),
    ] {
        if input == token {
            return Some(ChatCommand::NewSession {
                mode,
                message: None,
            });
        }
        if let Some(rest) = input.strip_prefix(token).and_then(|s| s.strip_prefix(' ')) {
            let message = Some(rest.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            return Some(ChatCommand::NewSession { mode, message });
        }
    }

    None
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Commands:
  /ns [message]          Start a new streaming session
  /nsm [message]         Start a new markdown session
  /quit                  Exit the chat (an empty line also exits)"#
}
