//! The in-memory conversation log.

use crate::types::{Message, Role};

/// An ordered log of role-tagged messages.
///
/// Alternation of user and assistant entries is not enforced, entries are
/// never edited or removed individually, and the log is not capped: every
/// entry is sent upstream on every turn until [`Conversation::reset`] is
/// called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Discards every message.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// The full ordered sequence, as sent in a request.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_conversation_is_empty() {
        let conversation = Conversation::new();
        assert!(conversation.is_empty());
        assert_eq!(conversation.snapshot(), &[] as &[Message]);
    }

    #[test]
    fn append_preserves_order_without_alternation() {
        let mut conversation = Conversation::new();
        conversation.append(Role::User, "one");
        conversation.append(Role::User, "two");
        conversation.append(Role::Assistant, "three");
        assert_eq!(
            conversation.snapshot(),
            &[
                Message::user("one"),
                Message::user("two"),
                Message::assistant("three"),
            ]
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let mut conversation = Conversation::new();
        conversation.append(Role::User, "hello");
        conversation.append(Role::Assistant, "hi");

        conversation.reset();
        let once = conversation.clone();
        conversation.reset();

        assert_eq!(conversation, once);
        assert!(conversation.is_empty());
        assert_eq!(conversation.len(), 0);
    }
}
