//! Sealink Core
//!
//! Domain types and the local-first message store. The store is the piece
//! that lets the chat UI render instantly from disk: server-fetched batches
//! merge into it idempotently, and reads always come back in chronological
//! order regardless of how the batches arrived.
//!
//! # Components
//!
//! - [`Message`] / [`ChatId`]: chat-scoped domain types
//! - [`env::Environment`]: time abstraction for deterministic tests
//! - [`store::MessageStore`]: durable, chat-indexed message cache with
//!   [`store::MemoryStore`] and [`store::RedbStore`] implementations

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod message;
pub mod store;

pub use env::Environment;
pub use message::{ChatId, Message, MessageId};
pub use store::{MemoryStore, MessageStore, RedbStore, StoreError};
