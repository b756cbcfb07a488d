//! Diffie-Hellman handshake coordinator.
//!
//! Drives one protocol run per chat against the relay:
//!
//! ```text
//! Idle → KeyPublished → PollingPeerKey → SecretEstablished
//!                              │
//!                              └──────→ Failed(reason)
//! ```
//!
//! Publishing and polling are the only suspension points; the key exchange
//! arithmetic itself is synchronous. Polling is bounded: a fixed interval
//! between attempts and a fixed attempt ceiling, after which the run fails
//! with `PeerKeyTimeout` - distinct from `RelayUnavailable`, because a
//! caller may retry a transport failure immediately but must not retry a
//! timeout without an external signal that the peer has acted.
//!
//! # Cancellation
//!
//! `establish` is cancel-safe. Dropping the future between suspension
//! points stops the poll loop, releases the per-chat in-flight flag and
//! zeroes the private exponent (via `KeyPair`'s drop). A cancelled run
//! never writes to the secret store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sealink_core::{ChatId, Environment};
use sealink_crypto::{
    CodecError, DhGroup, KeyExchangeError, KeyPair, decode_biguint, encode_biguint,
};
use thiserror::Error;

use crate::relay::Relay;
use crate::secret_store::SecretStore;

/// Errors terminating a handshake run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// A handshake for this chat is already in flight; running two would
    /// race on the persisted secret.
    #[error("handshake already in progress for chat {chat_id}")]
    AlreadyInProgress {
        /// Chat whose handshake is already active.
        chat_id: ChatId,
    },

    /// Transport failure talking to the relay. May be retried by the
    /// caller at whole-handshake granularity; never retried within a run.
    #[error("relay unavailable: {reason}")]
    RelayUnavailable {
        /// Underlying transport error.
        reason: String,
    },

    /// The peer did not publish within the bounded poll window.
    #[error("peer key not published within {attempts} poll attempts")]
    PeerKeyTimeout {
        /// Number of poll retries that were exhausted.
        attempts: u32,
    },

    /// The peer's published value could not be decoded.
    #[error("peer key undecodable: {0}")]
    MalformedPeerKey(#[from] CodecError),

    /// Key generation or shared-secret computation failed.
    #[error(transparent)]
    KeyExchange(#[from] KeyExchangeError),
}

impl HandshakeError {
    /// The terminal failure this error maps to, if any.
    ///
    /// `AlreadyInProgress` maps to none: the active run owns the phase.
    fn failure(&self) -> Option<HandshakeFailure> {
        match self {
            Self::AlreadyInProgress { .. } => None,
            Self::RelayUnavailable { .. } => Some(HandshakeFailure::RelayUnavailable),
            Self::PeerKeyTimeout { .. } => Some(HandshakeFailure::PeerKeyTimeout),
            Self::MalformedPeerKey(_) => Some(HandshakeFailure::MalformedPeerKey),
            Self::KeyExchange(KeyExchangeError::InvalidPeerKey) => {
                Some(HandshakeFailure::InvalidPeerKey)
            },
            Self::KeyExchange(KeyExchangeError::InsufficientEntropy) => {
                Some(HandshakeFailure::InsufficientEntropy)
            },
        }
    }
}

/// Why a handshake ended in the `Failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// Transport failure talking to the relay.
    RelayUnavailable,
    /// Bounded poll window exhausted without a peer key.
    PeerKeyTimeout,
    /// Peer key failed transport decoding.
    MalformedPeerKey,
    /// Peer key was a trivial-subgroup value.
    InvalidPeerKey,
    /// OS entropy source unavailable.
    InsufficientEntropy,
}

/// Observable state of a chat's handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// No handshake has run, or a cancelled run was rolled back.
    Idle,
    /// Local public key submitted to the relay.
    KeyPublished,
    /// Waiting for the peer's public key.
    PollingPeerKey,
    /// Shared secret computed and stored; chat traffic may flow.
    SecretEstablished,
    /// Terminal failure; chat access stays blocked for this session.
    Failed(HandshakeFailure),
}

impl HandshakePhase {
    /// Whether a run is currently between publish and completion.
    fn is_in_flight(self) -> bool {
        matches!(self, Self::KeyPublished | Self::PollingPeerKey)
    }
}

/// Handshake tunables.
///
/// The poll constants were hardcoded upstream; they are exposed here as a
/// deployment tunable (high-latency relays may want a wider window) with
/// the upstream values as defaults.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Fixed DH group shared by both parties.
    pub group: DhGroup,
    /// Bits of entropy drawn for the ephemeral exponent.
    pub bit_length: usize,
    /// Delay between poll attempts.
    pub poll_interval: Duration,
    /// Poll retries after the immediate first attempt.
    pub max_poll_attempts: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            group: DhGroup::rfc3526_group14(),
            bit_length: 2048,
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 10,
        }
    }
}

/// Per-chat handshake bookkeeping.
#[derive(Default)]
struct HandshakeRegistry {
    /// Chats with a run currently in flight (single-flight set).
    active: HashSet<ChatId>,
    /// Last observed phase per chat.
    phases: HashMap<ChatId, HandshakePhase>,
}

/// Coordinates Diffie-Hellman handshakes against a relay.
///
/// One coordinator serves all chats of a session; per-chat state is held in
/// an explicit registry owned by the instance, so multiple sessions remain
/// independently testable. Clones share state.
pub struct HandshakeCoordinator<E: Environment, R: Relay> {
    env: E,
    relay: Arc<R>,
    secrets: SecretStore,
    config: HandshakeConfig,
    registry: Arc<Mutex<HandshakeRegistry>>,
}

impl<E: Environment, R: Relay> Clone for HandshakeCoordinator<E, R> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            relay: Arc::clone(&self.relay),
            secrets: self.secrets.clone(),
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: Environment, R: Relay> HandshakeCoordinator<E, R> {
    /// Create a coordinator writing established secrets into `secrets`.
    pub fn new(env: E, relay: Arc<R>, secrets: SecretStore, config: HandshakeConfig) -> Self {
        Self { env, relay, secrets, config, registry: Arc::default() }
    }

    /// The secret store this coordinator writes to.
    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    /// Observable phase of a chat's handshake.
    pub fn phase(&self, chat_id: ChatId) -> HandshakePhase {
        lock(&self.registry).phases.get(&chat_id).copied().unwrap_or(HandshakePhase::Idle)
    }

    /// Run one full handshake for a chat.
    ///
    /// On success the shared secret is stored per chat and the phase is
    /// `SecretEstablished`. On failure the phase is `Failed(reason)` and
    /// no secret is written; the caller decides whether to restart the
    /// whole handshake.
    ///
    /// # Errors
    ///
    /// - [`HandshakeError::AlreadyInProgress`] if a run for this chat is
    ///   already in flight (the existing attempt is not disturbed)
    /// - [`HandshakeError::RelayUnavailable`] on any transport failure
    /// - [`HandshakeError::PeerKeyTimeout`] when the poll window closes
    /// - [`HandshakeError::MalformedPeerKey`] /
    ///   [`HandshakeError::KeyExchange`] on a bad peer value
    pub async fn establish(&self, chat_id: ChatId) -> Result<(), HandshakeError> {
        let guard = ActiveGuard::acquire(Arc::clone(&self.registry), chat_id)?;

        let result = self.run(chat_id).await;
        match &result {
            Ok(()) => self.set_phase(chat_id, HandshakePhase::SecretEstablished),
            Err(err) => {
                tracing::warn!(chat_id, error = %err, "handshake failed");
                if let Some(failure) = err.failure() {
                    self.set_phase(chat_id, HandshakePhase::Failed(failure));
                }
            },
        }

        // The guard drops after the terminal phase is recorded, so its
        // cancellation rollback leaves completed runs alone.
        drop(guard);
        result
    }

    async fn run(&self, chat_id: ChatId) -> Result<(), HandshakeError> {
        let pair = KeyPair::generate(&self.config.group, self.config.bit_length)?;
        let public_b64 = encode_biguint(pair.public_value());

        self.relay
            .publish_public_key(chat_id, &public_b64)
            .await
            .map_err(|e| HandshakeError::RelayUnavailable { reason: e.to_string() })?;
        self.set_phase(chat_id, HandshakePhase::KeyPublished);
        tracing::debug!(chat_id, "published local public key");

        self.set_phase(chat_id, HandshakePhase::PollingPeerKey);
        let peer_b64 = self.poll_peer_key(chat_id).await?;

        let peer_public = decode_biguint(&peer_b64)?;
        let secret = pair.into_shared_secret(&self.config.group, &peer_public)?;
        self.secrets.put(chat_id, secret);
        tracing::debug!(chat_id, "shared secret established");

        Ok(())
    }

    /// Fetch the peer key, retrying on "not yet available" up to the
    /// configured ceiling. Transport errors abort immediately.
    async fn poll_peer_key(&self, chat_id: ChatId) -> Result<String, HandshakeError> {
        if let Some(key) = self.fetch_once(chat_id).await? {
            return Ok(key);
        }

        for attempt in 1..=self.config.max_poll_attempts {
            self.env.sleep(self.config.poll_interval).await;
            tracing::debug!(chat_id, attempt, "polling for peer public key");

            if let Some(key) = self.fetch_once(chat_id).await? {
                return Ok(key);
            }
        }

        tracing::warn!(
            chat_id,
            attempts = self.config.max_poll_attempts,
            "peer key poll window exhausted"
        );
        Err(HandshakeError::PeerKeyTimeout { attempts: self.config.max_poll_attempts })
    }

    async fn fetch_once(&self, chat_id: ChatId) -> Result<Option<String>, HandshakeError> {
        self.relay
            .fetch_peer_public_key(chat_id)
            .await
            .map_err(|e| HandshakeError::RelayUnavailable { reason: e.to_string() })
    }

    fn set_phase(&self, chat_id: ChatId, phase: HandshakePhase) {
        lock(&self.registry).phases.insert(chat_id, phase);
    }
}

/// A poisoned registry lock still holds consistent bookkeeping; recover it
/// rather than propagating the panic.
fn lock(registry: &Mutex<HandshakeRegistry>) -> MutexGuard<'_, HandshakeRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII occupancy of the single-flight set.
///
/// Dropping the guard releases the chat's slot on every exit path,
/// including cancellation; a run abandoned mid-flight also rolls its
/// observable phase back to `Idle`.
struct ActiveGuard {
    registry: Arc<Mutex<HandshakeRegistry>>,
    chat_id: ChatId,
}

impl ActiveGuard {
    fn acquire(
        registry: Arc<Mutex<HandshakeRegistry>>,
        chat_id: ChatId,
    ) -> Result<Self, HandshakeError> {
        if !lock(&registry).active.insert(chat_id) {
            return Err(HandshakeError::AlreadyInProgress { chat_id });
        }
        Ok(Self { registry, chat_id })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        registry.active.remove(&self.chat_id);

        let cancelled_mid_run =
            registry.phases.get(&self.chat_id).is_some_and(|phase| phase.is_in_flight());
        if cancelled_mid_run {
            registry.phases.insert(self.chat_id, HandshakePhase::Idle);
        }
    }
}
