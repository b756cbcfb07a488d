//! Send-then-refresh sync coordinator.
//!
//! Orchestrates the local-first message flow: outbound messages go to the
//! relay, then a fetch cycle merges the server's batch into the local store
//! and republishes the merged, chronologically ordered view. The store is
//! the source of truth for rendering; the relay is only ever a producer of
//! batches.
//!
//! At most one fetch runs per chat. A second request while one is in
//! flight is coalesced: it returns the current local view instead of
//! issuing a redundant network call whose merge could interleave with the
//! first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sealink_core::{ChatId, Message, MessageStore};
use thiserror::Error;

use crate::relay::Relay;

/// Errors surfaced by sync operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The relay did not accept the outbound message; it must not be
    /// assumed delivered.
    #[error("send rejected by relay: {reason}")]
    SendRejected {
        /// Underlying relay error.
        reason: String,
    },

    /// Fetching or merging the server batch failed. The local store is
    /// unchanged; the caller degrades to the last merged view.
    #[error("fetch failed: {reason}")]
    FetchFailed {
        /// Underlying relay or store error.
        reason: String,
    },
}

/// Sync tunables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum number of messages returned by a merged view.
    pub default_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { default_limit: 100 }
    }
}

/// Coordinates relay fetches and local-store merges per chat.
///
/// The fetch-in-flight set is explicit state owned by the instance, not
/// ambient module state, so separate sessions stay independently testable.
/// Clones share state.
pub struct SyncCoordinator<S: MessageStore, R: Relay> {
    store: S,
    relay: Arc<R>,
    config: SyncConfig,
    in_flight: Arc<Mutex<HashSet<ChatId>>>,
}

impl<S: MessageStore, R: Relay> Clone for SyncCoordinator<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            relay: Arc::clone(&self.relay),
            config: self.config.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S: MessageStore, R: Relay> SyncCoordinator<S, R> {
    /// Create a coordinator over a message store and a relay.
    pub fn new(store: S, relay: Arc<R>, config: SyncConfig) -> Self {
        Self { store, relay, config, in_flight: Arc::default() }
    }

    /// Submit an outbound message, then refresh and return the merged view.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SendRejected`] if the relay refuses the message; no
    ///   fetch cycle runs in that case
    /// - [`SyncError::FetchFailed`] if the follow-up refresh fails
    pub async fn send_and_sync(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> Result<Vec<Message>, SyncError> {
        self.relay
            .send_message(chat_id, text)
            .await
            .map_err(|e| SyncError::SendRejected { reason: e.to_string() })?;
        tracing::debug!(chat_id, "outbound message accepted by relay");

        self.fetch_and_merge(chat_id).await
    }

    /// Fetch the chat's batch from the relay, merge it into the store and
    /// return the merged, chronologically ordered view.
    ///
    /// If a fetch for this chat is already in flight the call is coalesced:
    /// it returns the current local view without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FetchFailed`] on relay or store failure; the
    /// merge is all-or-nothing, so the store is left unchanged.
    pub async fn fetch_and_merge(&self, chat_id: ChatId) -> Result<Vec<Message>, SyncError> {
        let Some(_guard) = FetchGuard::try_acquire(&self.in_flight, chat_id) else {
            tracing::debug!(chat_id, "fetch already in flight, returning local view");
            return self.local_view(chat_id);
        };

        let batch = self
            .relay
            .fetch_messages(chat_id)
            .await
            .map_err(|e| SyncError::FetchFailed { reason: e.to_string() })?;

        // The batch is fully received before any row is written; a store
        // failure here aborts the whole merge.
        self.store
            .upsert_batch(chat_id, &batch)
            .map_err(|e| SyncError::FetchFailed { reason: e.to_string() })?;
        tracing::debug!(chat_id, count = batch.len(), "merged relay batch");

        self.local_view(chat_id)
    }

    /// The current local view: most recent messages, oldest first, without
    /// touching the network. The render-from-disk path for instant UI
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FetchFailed`] if the store read fails.
    pub fn local_view(&self, chat_id: ChatId) -> Result<Vec<Message>, SyncError> {
        self.store
            .recent_messages(chat_id, self.config.default_limit)
            .map_err(|e| SyncError::FetchFailed { reason: e.to_string() })
    }
}

/// A poisoned lock still holds a consistent set; recover it rather than
/// propagating the panic.
fn lock(in_flight: &Mutex<HashSet<ChatId>>) -> MutexGuard<'_, HashSet<ChatId>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII occupancy of the fetch-in-flight set. Dropping releases the slot
/// on every exit path, including cancellation mid-fetch.
struct FetchGuard<'a> {
    in_flight: &'a Mutex<HashSet<ChatId>>,
    chat_id: ChatId,
}

impl<'a> FetchGuard<'a> {
    fn try_acquire(in_flight: &'a Mutex<HashSet<ChatId>>, chat_id: ChatId) -> Option<Self> {
        lock(in_flight).insert(chat_id).then(|| Self { in_flight, chat_id })
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.chat_id);
    }
}
