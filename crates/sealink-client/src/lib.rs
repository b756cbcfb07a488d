//! Sealink Client
//!
//! Coordinators that make an end-to-end-encrypted chat session usable over
//! an untrusted relay:
//!
//! - [`HandshakeCoordinator`]: drives the Diffie-Hellman exchange against
//!   the relay's publish/fetch-one-key endpoints, with bounded polling for
//!   the peer's public value, and persists the resulting secret per chat.
//! - [`SyncCoordinator`]: send-then-refresh orchestration over the local
//!   message store, with at most one fetch in flight per chat.
//!
//! The relay is a contract ([`Relay`]), never trusted with secrets: it only
//! sees published public values and ciphertext traffic.
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`transport::HttpRelay`], a reqwest-backed implementation of the relay
//! contract against the backend's REST endpoints.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod handshake;
mod relay;
mod secret_store;
mod sync;
mod system_env;

#[cfg(feature = "transport")]
pub mod transport;

pub use handshake::{
    HandshakeConfig, HandshakeCoordinator, HandshakeError, HandshakeFailure, HandshakePhase,
};
pub use relay::{Relay, RelayError};
pub use sealink_core::{ChatId, Environment, Message};
pub use secret_store::SecretStore;
pub use sync::{SyncConfig, SyncCoordinator, SyncError};
pub use system_env::SystemEnv;
