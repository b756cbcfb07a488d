//! In-memory message store for tests and simulation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::message::{ChatId, Message, MessageId};

use super::{MessageStore, StoreError, most_recent_ascending};

/// In-memory store implementation.
///
/// A `HashMap` per chat keyed by message id, wrapped in `Arc<Mutex<_>>` so
/// clones share state. Uses `lock().expect()` which panics on a poisoned
/// mutex - acceptable for test/simulation code. Not durable across process
/// restarts; production uses [`super::RedbStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<ChatId, HashMap<MessageId, Message>>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages stored for a chat. Useful in tests.
    #[allow(clippy::expect_used)]
    pub fn len(&self, chat_id: ChatId) -> usize {
        let inner = self.inner.lock().expect("invariant: store mutex not poisoned");
        inner.get(&chat_id).map_or(0, HashMap::len)
    }

    /// Whether a chat has no stored messages.
    pub fn is_empty(&self, chat_id: ChatId) -> bool {
        self.len(chat_id) == 0
    }
}

impl MessageStore for MemoryStore {
    #[allow(clippy::expect_used)]
    fn upsert_batch(&self, chat_id: ChatId, messages: &[Message]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("invariant: store mutex not poisoned");
        let chat = inner.entry(chat_id).or_default();

        for message in messages {
            let mut row = message.clone();
            row.chat_id = chat_id;
            chat.insert(row.id, row);
        }

        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn recent_messages(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().expect("invariant: store mutex not poisoned");
        let messages =
            inner.get(&chat_id).map(|chat| chat.values().cloned().collect()).unwrap_or_default();

        Ok(most_recent_ascending(messages, limit))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn message(id: MessageId, secs: i64) -> Message {
        Message {
            id,
            chat_id: 0,
            sender_id: 1,
            text: format!("msg-{id}"),
            timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
        }
    }

    #[test]
    fn empty_chat_returns_no_messages() {
        let store = MemoryStore::new();
        assert_eq!(store.recent_messages(1, 10).unwrap(), vec![]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let batch = vec![message(1, 100), message(2, 200)];

        store.upsert_batch(1, &batch).unwrap();
        let first = store.recent_messages(1, 10).unwrap();

        store.upsert_batch(1, &batch).unwrap();
        let second = store.recent_messages(1, 10).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(1), 2);
    }

    #[test]
    fn same_id_overwrites_instead_of_duplicating() {
        let store = MemoryStore::new();
        store.upsert_batch(1, &[message(1, 100)]).unwrap();

        let mut updated = message(1, 100);
        updated.text = "edited".to_string();
        store.upsert_batch(1, &[updated.clone()]).unwrap();

        let mut expected = updated;
        expected.chat_id = 1;
        assert_eq!(store.recent_messages(1, 10).unwrap(), vec![expected]);
    }

    #[test]
    fn recent_messages_returns_newest_in_ascending_order() {
        let store = MemoryStore::new();
        // Insert out of order: t4 t1 t5 t2 t3
        let batch =
            vec![message(4, 400), message(1, 100), message(5, 500), message(2, 200), message(3, 300)];
        store.upsert_batch(1, &batch).unwrap();

        let recent = store.recent_messages(1, 3).unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4, 5], "expected the newest three, oldest first");
    }

    #[test]
    fn batch_order_does_not_affect_stored_state() {
        let store_a = MemoryStore::new();
        let store_b = MemoryStore::new();

        let batch = vec![message(1, 100), message(2, 200), message(3, 300)];
        let mut reversed = batch.clone();
        reversed.reverse();

        store_a.upsert_batch(1, &batch).unwrap();
        store_b.upsert_batch(1, &reversed).unwrap();

        assert_eq!(
            store_a.recent_messages(1, 10).unwrap(),
            store_b.recent_messages(1, 10).unwrap()
        );
    }

    #[test]
    fn chats_are_isolated() {
        let store = MemoryStore::new();
        store.upsert_batch(1, &[message(1, 100)]).unwrap();
        store.upsert_batch(2, &[message(1, 999)]).unwrap();

        let chat_1 = store.recent_messages(1, 10).unwrap();
        assert_eq!(chat_1.len(), 1);
        assert_eq!(chat_1[0].chat_id, 1);

        let chat_2 = store.recent_messages(2, 10).unwrap();
        assert_eq!(chat_2.len(), 1);
        assert_eq!(chat_2[0].chat_id, 2);
    }

    #[test]
    fn rows_are_stamped_with_the_target_chat() {
        let store = MemoryStore::new();
        let mut foreign = message(7, 100);
        foreign.chat_id = 42; // wire rows carry no trustworthy chat id

        store.upsert_batch(5, &[foreign]).unwrap();
        let stored = store.recent_messages(5, 10).unwrap();
        assert_eq!(stored[0].chat_id, 5);
    }

    #[test]
    fn timestamp_ties_break_by_id() {
        let store = MemoryStore::new();
        store.upsert_batch(1, &[message(2, 100), message(1, 100)]).unwrap();

        let ids: Vec<_> = store.recent_messages(1, 10).unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
