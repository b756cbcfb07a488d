//! Production Environment implementation using system time.
//!
//! `SystemEnv` backs the handshake poll loop with real wall-clock delays:
//! `std::time::Instant` for monotonic time and tokio's timer for async
//! sleeping. Tests substitute their own environment so the bounded poll
//! window runs without real delays.

use std::time::Duration;

use sealink_core::Environment;

/// Production environment using system time and tokio sleeps.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
