//! Relay contract.
//!
//! The backend acts only as a mailbox: it stores and forwards published
//! public keys and chat messages, and never holds plaintext secrets. This
//! trait captures the four endpoints the coordinators consume; protocol
//! logic stays out of implementations.

use async_trait::async_trait;
use sealink_core::{ChatId, Message};
use thiserror::Error;

/// Transport-level relay errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The relay could not be reached or the connection failed mid-request.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    /// The relay answered with a non-success status.
    #[error("relay rejected request: status {status}")]
    Rejected {
        /// HTTP-style status code returned by the relay.
        status: u16,
    },
}

/// Mailbox service mediating the key exchange and message traffic.
///
/// "Not yet available" on the peer-key endpoint is part of the contract,
/// not an error: it is reported as `Ok(None)` so callers can distinguish a
/// peer that simply has not published from a relay that is down.
#[async_trait]
pub trait Relay: Send + Sync + 'static {
    /// Publish the local public key for a chat.
    ///
    /// Idempotent per chat/user on the relay side.
    async fn publish_public_key(
        &self,
        chat_id: ChatId,
        public_key_b64: &str,
    ) -> Result<(), RelayError>;

    /// Fetch the peer's published public key for a chat.
    ///
    /// Returns `Ok(None)` when the peer has not published yet.
    async fn fetch_peer_public_key(&self, chat_id: ChatId) -> Result<Option<String>, RelayError>;

    /// Submit an outbound message to a chat.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), RelayError>;

    /// Retrieve the chat's current message batch.
    async fn fetch_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, RelayError>;
}
