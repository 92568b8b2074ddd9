//! Clock context trait for master and slave loops.

use async_trait::async_trait;
use std::time::Duration;

/// The time source used by every pacing loop.
///
/// Transmitter ticks, replay pacing, and the slave's frame loop all sleep
/// through this trait, so a simulation can swap in a virtual clock and run
/// thousands of frames without waiting on the wall clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` (gesture_sim) - manually advanced virtual clock
#[async_trait]
pub trait NodeContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends the caller for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock and yields
    async fn sleep(&self, duration: Duration);
}
