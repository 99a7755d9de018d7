//! Chat message types for the conversation view.

use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Message typed by the user.
    User,
    /// Reply produced by the bot.
    Bot,
}

/// A message in the conversation view.
///
/// While a bot reply is being revealed, `streaming` is true and `content`
/// grows as characters arrive. Finalizing clears the flag and refreshes
/// the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable identity, unique within a session (used for list diffing).
    pub id: MessageId,
    /// Role of this message.
    pub role: ChatRole,
    /// Message content. Grows during streaming.
    pub content: String,
    /// Unix timestamp (milliseconds) when the message was created or
    /// last finalized.
    pub timestamp_ms: i64,
    /// True while content is still being appended.
    pub streaming: bool,
}

impl ChatMessage {
    /// Create a new, finalized chat message.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            streaming: false,
        }
    }

    /// Create a finalized user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create a finalized bot message.
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Bot, content)
    }

    /// Create an empty bot message that is still streaming.
    pub fn bot_streaming() -> Self {
        Self {
            streaming: true,
            ..Self::new(ChatRole::Bot, "")
        }
    }

    /// Mark the message as complete and refresh its timestamp.
    pub fn finalize(&mut self) {
        self.streaming = false;
        self.timestamp_ms = chrono::Utc::now().timestamp_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_is_finalized() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");
        assert!(!msg.streaming);
        assert!(msg.timestamp_ms > 0);
    }

    #[test]
    fn test_bot_streaming_starts_empty() {
        let msg = ChatMessage::bot_streaming();
        assert_eq!(msg.role, ChatRole::Bot);
        assert!(msg.content.is_empty());
        assert!(msg.streaming);
    }

    #[test]
    fn test_finalize_clears_streaming() {
        let mut msg = ChatMessage::bot_streaming();
        msg.content.push_str("done");
        msg.finalize();
        assert!(!msg.streaming);
        assert_eq!(msg.content, "done");
    }
}
