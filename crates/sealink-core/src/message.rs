//! Chat message domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a chat session. Operations on distinct chats are fully
/// independent.
pub type ChatId = u64;

/// Identifier of a message, unique within its chat.
pub type MessageId = u64;

/// A single chat message as confirmed by the server.
///
/// `id` is unique within a chat: re-inserting a message with the same id
/// overwrites the stored row, it never duplicates it. The text is ciphertext
/// or plaintext per the upstream contract; this layer does not interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Chat-scoped unique identifier.
    pub id: MessageId,

    /// Chat this message belongs to.
    pub chat_id: ChatId,

    /// Sender's user id.
    pub sender_id: u64,

    /// Message body (opaque to this layer).
    pub text: String,

    /// Absolute instant the server assigned to the message.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Sort key giving a stable chronological order: primary by timestamp,
    /// ties broken by id so merges are deterministic.
    pub(crate) fn chrono_key(&self) -> (DateTime<Utc>, MessageId) {
        (self.timestamp, self.id)
    }
}
