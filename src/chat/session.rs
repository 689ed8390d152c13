//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct which owns the conversation
//! and the current [`Mode`], classifies each line of input, and runs chat turns
//! against a [`Completions`] implementation.

use crate::Result;
use crate::chat::commands::{ChatCommand, parse_command};
use crate::chat::conversation::Conversation;
use crate::client::Completions;
use crate::observability::{SESSION_RESETS, SESSION_TURN_FAILURES, SESSION_TURNS};
use crate::render::Renderer;
use crate::types::{Mode, Role};

/// What the input loop should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Prompt for the next line.
    Continue,
    /// Leave the input loop; the process exits successfully.
    Exit,
}

/// A chat session that manages conversation state and API interactions.
///
/// Turns are strictly sequential: each line is fully handled, including the
/// network round trip, before the next one is read.
pub struct ChatSession<C: Completions> {
    client: C,
    conversation: Conversation,
    mode: Mode,
}

impl<C: Completions> ChatSession<C> {
    /// Creates a new chat session with an empty conversation.
    pub fn new(client: C, mode: Mode) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
            mode,
        }
    }

    /// Returns the current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the model requests are made against.
    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Handles one line of user input.
    ///
    /// An empty line (after trimming) or `/quit` exits.  `/ns` and `/nsm`
    /// start a new session, sending any trailing text as its first turn.
    /// Everything else is sent verbatim as a chat turn in the current mode.
    /// Turn failures are reported through `renderer` and never end the loop.
    pub async fn handle_line(&mut self, line: &str, renderer: &mut dyn Renderer) -> Control {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Control::Exit;
        }
        match parse_command(trimmed) {
            Some(ChatCommand::Quit) => Control::Exit,
            Some(ChatCommand::NewSession { mode, message }) => {
                self.new_session(mode);
                renderer.print_info(&format!("New {mode} session."));
                if let Some(message) = message {
                    self.run_turn(&message, renderer).await;
                }
                Control::Continue
            }
            None => {
                self.run_turn(line, renderer).await;
                Control::Continue
            }
        }
    }

    /// Discards the conversation and switches to `mode`.
    pub fn new_session(&mut self, mode: Mode) {
        SESSION_RESETS.click();
        self.conversation.reset();
        self.mode = mode;
    }

    /// Sends `input` as a user turn in the current mode.
    ///
    /// The user message is appended before the request is made and stays in
    /// the conversation if the request fails.  The assistant reply is appended
    /// only when the request succeeds.
    pub async fn chat_turn(&mut self, input: &str, renderer: &mut dyn Renderer) -> Result<()> {
        SESSION_TURNS.click();
        self.conversation.append(Role::User, input);
        let reply = match self.mode {
            Mode::Streaming => {
                let reply = self
                    .client
                    .complete_streaming(self.conversation.snapshot(), renderer)
                    .await?;
                renderer.finish_response();
                reply
            }
            Mode::Rendered => {
                let reply = self
                    .client
                    .complete_buffered(self.conversation.snapshot(), renderer)
                    .await?;
                renderer.start_reply(Mode::Rendered);
                renderer.print_markdown(&reply);
                reply
            }
        };
        self.conversation.append(Role::Assistant, reply);
        Ok(())
    }

    async fn run_turn(&mut self, input: &str, renderer: &mut dyn Renderer) {
        if let Err(err) = self.chat_turn(input, renderer).await {
            SESSION_TURN_FAILURES.click();
            renderer.print_error(&err.to_string());
        }
    }
}
