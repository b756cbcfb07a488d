//! Store error types.

use thiserror::Error;

/// Errors that can occur during message-store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization or deserialization of a stored row failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the persistence substrate.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
