use serde::Serialize;

use crate::types::Message;

/// The JSON body POSTed to the completions endpoint on every turn.
///
/// `messages` is the whole conversation, verbatim, in order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest<'a> {
    /// The model identifier.
    pub model: &'a str,

    /// The full conversation so far.
    pub messages: &'a [Message],

    /// Whether the endpoint should stream the reply as `data: ` lines.
    pub stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    /// A request for a streamed reply.
    pub fn streaming(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages,
            stream: true,
        }
    }

    /// A request for a complete, buffered reply.
    pub fn buffered(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages,
            stream: false,
        }
    }
}
