//! Local-first message store.
//!
//! Trait-based abstraction over a durable, chat-indexed message table. The
//! trait is synchronous; async callers treat store calls as cheap local work
//! the same way the rest of the codebase treats pure computation.

mod error;
mod memory;
mod redb;

pub use error::StoreError;
pub use memory::MemoryStore;

pub use self::redb::RedbStore;

use crate::message::{ChatId, Message};

/// Durable, chat-indexed message cache.
///
/// This trait must be:
/// - Clone: implementations share state via Arc, so clones observe the same
///   underlying table
/// - Send + Sync: safe to hand to concurrent chat sessions
/// - Synchronous: no async methods
///
/// # Isolation
///
/// Implementations provide at least read-committed isolation: a reader
/// running concurrently with `upsert_batch` sees each message either in its
/// pre-batch or post-batch state, never half-written.
pub trait MessageStore: Clone + Send + Sync + 'static {
    /// Insert or overwrite a batch of messages for a chat.
    ///
    /// Idempotent: a message whose id already exists is overwritten, never
    /// duplicated, and the order of the input sequence does not affect the
    /// final stored state. The batch applies all-or-nothing; on error the
    /// store is unchanged.
    ///
    /// Every stored row is stamped with `chat_id` regardless of what the
    /// input rows carry, since wire batches arrive without a chat id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Serialization`] if the
    /// persistence substrate fails; no partial state is left behind.
    fn upsert_batch(&self, chat_id: ChatId, messages: &[Message]) -> Result<(), StoreError>;

    /// Up to `limit` most recent messages of a chat, oldest first.
    ///
    /// The output contract is ascending chronological order truncated to
    /// the most recent `limit` entries: internally the retrieval sorts
    /// descending, truncates, then reverses.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Serialization`] if the
    /// persistence substrate fails.
    fn recent_messages(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Message>, StoreError>;
}

/// Shared post-processing for `recent_messages`: newest `limit` entries,
/// returned in ascending chronological order.
fn most_recent_ascending(mut messages: Vec<Message>, limit: usize) -> Vec<Message> {
    messages.sort_by_key(|b| std::cmp::Reverse(b.chrono_key()));
    messages.truncate(limit);
    messages.reverse();
    messages
}
