//! Append-only conversation log.
//!
//! A turn commits exactly two messages (user then assistant) atomically, so a
//! well-formed log always alternates roles and has even length. `render`
//! re-checks that invariant on every read: a violation means the session
//! state is corrupt, and the cycle must halt rather than display a wrong log.

use crate::error::ChatError;
use crate::types::{Message, Role};

/// The ordered, append-only sequence of committed messages for one session.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one completed turn: the user message followed by the assistant
    /// reply. This is the only mutator; partial turns cannot be committed.
    pub fn commit_turn(&mut self, user_content: String, assistant_content: String) {
        self.messages.push(Message::user(user_content));
        self.messages.push(Message::assistant(assistant_content));
    }

    /// The full ordered log, validated against the alternation invariant.
    ///
    /// Has no side effects. An empty log renders to an empty slice.
    pub fn render(&self) -> Result<&[Message], ChatError> {
        for (i, message) in self.messages.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            if message.role != expected {
                return Err(ChatError::LogRender(format!(
                    "message {} has role {:?}, expected {:?}",
                    i, message.role, expected
                )));
            }
        }
        if self.messages.len() % 2 != 0 {
            return Err(ChatError::LogRender(format!(
                "log holds {} messages; a committed log always has even length",
                self.messages.len()
            )));
        }
        Ok(&self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Build a log from raw messages, bypassing the turn commit path.
    #[cfg(test)]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

// =============================================================================
// Tests
// =============================================================================
