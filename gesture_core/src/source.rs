//! Capture sources for the master.
//!
//! A motion-capture SDK is wrapped behind [`CaptureDevice`]. The master only
//! needs to connect once, poll a frame per tick, and read positions by
//! object name. Positions come back in millimetres, the unit capture
//! systems report natively.

use gesture_env::NodeContext;
use std::time::Duration;
use tracing::{info, warn};

/// Result of polling the device for a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A new frame is available for reading
    Ready,
    /// The device produced nothing this tick
    NoData,
}

/// A connected (or connectable) motion-capture device.
pub trait CaptureDevice: Send {
    /// Attempts to connect to `target` (host or host:port).
    fn connect(&mut self, target: &str) -> bool;

    fn is_connected(&self) -> bool;

    /// Pulls the next frame from the device.
    fn poll_frame(&mut self) -> FrameStatus;

    /// Global translation of an object in the last frame, in millimetres.
    fn position(&self, object: &str) -> Option<[f64; 3]>;

    /// Euler XYZ rotation of an object in the last frame, in degrees.
    fn rotation(&self, object: &str) -> Option<[f64; 3]>;
}

/// Connects with a bounded number of attempts, sleeping between them.
///
/// Exhausting the attempts is not an error: the master keeps polling and
/// every poll reports [`FrameStatus::NoData`].
pub async fn connect_with_retries<Ctx, D>(
    ctx: &Ctx,
    device: &mut D,
    target: &str,
    attempts: u32,
    retry_delay: Duration,
) -> bool
where
    Ctx: NodeContext,
    D: CaptureDevice + ?Sized,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        info!("connecting to capture device at {} (attempt {}/{})", target, attempt, attempts);
        if device.connect(target) {
            info!("capture device connected");
            return true;
        }
        if attempt < attempts {
            ctx.sleep(retry_delay).await;
        }
    }

    warn!("capture device at {} unreachable after {} attempts, giving up", target, attempts);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_env::TokioContext;

    /// Device that refuses the first `failures` connection attempts.
    struct Flaky {
        failures: u32,
        attempts: u32,
        connected: bool,
    }

    impl CaptureDevice for Flaky {
        fn connect(&mut self, _target: &str) -> bool {
            self.attempts += 1;
            self.connected = self.attempts > self.failures;
            self.connected
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn poll_frame(&mut self) -> FrameStatus {
            if self.connected {
                FrameStatus::Ready
            } else {
                FrameStatus::NoData
            }
        }

        fn position(&self, _object: &str) -> Option<[f64; 3]> {
            self.connected.then_some([1000.0, 0.0, 2000.0])
        }

        fn rotation(&self, _object: &str) -> Option<[f64; 3]> {
            None
        }
    }

    #[tokio::test]
    async fn test_connect_succeeds_on_retry() {
        let ctx = TokioContext::new();
        let mut device = Flaky { failures: 1, attempts: 0, connected: false };

        let ok = connect_with_retries(&ctx, &mut device, "localhost", 2, Duration::from_millis(1)).await;
        assert!(ok);
        assert_eq!(device.attempts, 2);
        assert_eq!(device.poll_frame(), FrameStatus::Ready);
    }

    #[tokio::test]
    async fn test_connect_gives_up() {
        let ctx = TokioContext::new();
        let mut device = Flaky { failures: 10, attempts: 0, connected: false };

        let ok = connect_with_retries(&ctx, &mut device, "localhost", 2, Duration::from_millis(1)).await;
        assert!(!ok);
        assert_eq!(device.attempts, 2);
        assert_eq!(device.poll_frame(), FrameStatus::NoData);
        assert_eq!(device.position("Hand"), None);
    }
}
