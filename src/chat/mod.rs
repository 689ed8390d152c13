//! Chat application module for interactive conversations.
//!
//! This module provides the REPL behind the `chatline` binary:
//!
//! - Streaming responses with real-time token display
//! - Markdown sessions rendered once the complete reply arrives
//! - Slash commands that start new sessions or quit
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`conversation`]: The role-tagged message log
//! - [`session`]: Line classification and the chat turn lifecycle
//! - [`commands`]: Slash command parsing

pub mod commands;
pub mod config;
pub mod conversation;
pub mod session;

pub use crate::render::{PlainTextRenderer, ProgressIndicator, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ConfigFile};
pub use conversation::Conversation;
pub use session::{ChatSession, Control};
