//! Per-chat shared secret store.
//!
//! The session-scoped home of established secrets: one secret per chat,
//! held in memory for the lifetime of the application session (or until
//! explicitly cleared). Deliberately separate from the durable message
//! table - secrets are never written to disk by this layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sealink_core::ChatId;
use sealink_crypto::SharedSecret;

/// Shared-secret store keyed by chat.
///
/// Clones share state (Arc), so the handshake coordinator and downstream
/// cipher code can hold the same store.
#[derive(Clone, Default)]
pub struct SecretStore {
    inner: Arc<Mutex<HashMap<ChatId, SharedSecret>>>,
}

impl SecretStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock still holds a consistent map; recover it rather
    /// than propagating the panic.
    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, SharedSecret>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the secret for a chat, replacing any previous one.
    pub fn put(&self, chat_id: ChatId, secret: SharedSecret) {
        self.lock().insert(chat_id, secret);
    }

    /// The secret for a chat, if a handshake has established one.
    pub fn get(&self, chat_id: ChatId) -> Option<SharedSecret> {
        self.lock().get(&chat_id).cloned()
    }

    /// Whether a secret exists for a chat.
    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.lock().contains_key(&chat_id)
    }

    /// Drop the secret for a chat. Returns whether one was present.
    ///
    /// The removed value is zeroed on drop by [`SharedSecret`].
    pub fn clear(&self, chat_id: ChatId) -> bool {
        self.lock().remove(&chat_id).is_some()
    }
}
