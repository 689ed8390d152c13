/// One decoded unit of a streaming completion body.
///
/// Events are produced by [`crate::sse::EventStreamDecoder`] and consumed
/// immediately by the client; they are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental, non-empty fragment of assistant text.
    Token(String),

    /// The `[DONE]` sentinel; nothing after it belongs to the reply.
    Terminal,

    /// A `data: ` line without a usable token (heartbeat, partial frame,
    /// unparseable JSON).  Expected under normal operation and ignored.
    Malformed,
}

impl StreamEvent {
    /// Returns the token text, if this event carries one.
    pub fn token(&self) -> Option<&str> {
        match self {
            StreamEvent::Token(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true for the end-of-stream sentinel.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert_eq!(StreamEvent::Token("Hi".to_string()).token(), Some("Hi"));
        assert_eq!(StreamEvent::Terminal.token(), None);
        assert!(StreamEvent::Terminal.is_terminal());
        assert!(!StreamEvent::Malformed.is_terminal());
    }
}
