//! Simulation context implementing NodeContext for deterministic runs.

use async_trait::async_trait;
use gesture_env::NodeContext;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Simulation context backed by a virtual clock.
///
/// `sleep` advances the clock instantly and yields to the scheduler, so a
/// master and a slave sharing one single-threaded runtime interleave
/// deterministically and a minute of installation time runs in
/// milliseconds.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derives an independent seed for one randomness stream (link loss,
    /// capture jitter), so changing one stream never shifts another.
    pub fn derive_seed(&self, stream: u64) -> u64 {
        self.seed.wrapping_mul(0x517cc1b727220a95) ^ stream
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl NodeContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
        tokio::task::yield_now().await;
    }
}
