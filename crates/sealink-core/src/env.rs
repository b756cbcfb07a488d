//! Environment abstraction for deterministic testing.
//!
//! Decouples the handshake's polling loop from wall-clock time. Production
//! uses real time and tokio sleeps; tests substitute a virtual clock so a
//! bounded ten-attempt poll window runs in microseconds.

use std::time::Duration;

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single execution context
/// - `sleep()` is the only suspension point the environment introduces; it
///   must be cancel-safe (dropping the future abandons the wait)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; test environments
    /// may use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleep for the specified duration.
    ///
    /// The only async method in the trait; used by the handshake poll loop
    /// between attempts.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
