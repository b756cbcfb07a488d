//! Redb-backed durable message store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. A
//! batch upsert is one write transaction, so a failed merge leaves the
//! table exactly as it was, and readers see each row either pre- or
//! post-batch, never half-written. All state survives process restarts.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::message::{ChatId, Message, MessageId};

use super::{MessageStore, StoreError, most_recent_ascending};

/// Table: messages
/// Key: (chat_id: u64, message_id: u64) as big-endian bytes [16 bytes]
/// Value: CBOR-encoded Message
///
/// Prefixing the key with the chat id makes a chat's rows one contiguous
/// range: chat-scoped queries never scan unrelated chats.
const MESSAGES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("messages");

/// Durable message store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
/// Shared secrets are deliberately not stored here; they live in the
/// session-scoped secret store, never in the durable message table.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(MESSAGES).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl MessageStore for RedbStore {
    fn upsert_batch(&self, chat_id: ChatId, messages: &[Message]) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(MESSAGES).map_err(|e| StoreError::Io(e.to_string()))?;

            for message in messages {
                let mut row = message.clone();
                row.chat_id = chat_id;

                let mut bytes = Vec::new();
                ciborium::into_writer(&row, &mut bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;

                let key = encode_message_key(chat_id, row.id);
                table
                    .insert(key.as_slice(), bytes.as_slice())
                    .map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        // Single commit: an error above abandons the transaction and the
        // table keeps its pre-batch state.
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::debug!(chat_id, count = messages.len(), "merged message batch");
        Ok(())
    }

    fn recent_messages(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Message>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(MESSAGES).map_err(|e| StoreError::Io(e.to_string()))?;

        let start_key = encode_message_key(chat_id, 0);
        let end_key = encode_message_key(chat_id, u64::MAX);

        let results = table
            .range(start_key.as_slice()..=end_key.as_slice())
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let mut messages = Vec::new();
        for result in results {
            let (_, value) = result.map_err(|e| StoreError::Io(e.to_string()))?;
            let message: Message = ciborium::from_reader(value.value())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            messages.push(message);
        }

        Ok(most_recent_ascending(messages, limit))
    }
}

/// Encode (chat_id, message_id) as a 16-byte big-endian key.
///
/// Big-endian layout makes lexicographic ordering match numeric ordering,
/// so a chat's messages form one contiguous key range.
fn encode_message_key(chat_id: ChatId, message_id: MessageId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&chat_id.to_be_bytes());
    key[8..].copy_from_slice(&message_id.to_be_bytes());
    key
}
