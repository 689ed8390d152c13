//! A line-oriented terminal client for chat completions endpoints.
//!
//! The library holds everything behind the `chatline` binary: the HTTP client
//! and its server-sent-events decoder, the conversation and session logic, and
//! terminal rendering.

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod markdown;
pub mod observability;
pub mod render;
pub mod sse;
pub mod types;

// Re-exports
pub use client::{CompletionClient, Completions};
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use types::*;
