//! Frame-counted auto-exit for the slave.
//!
//! The render loop calls [`Liveness::on_frame`] once per frame; the receive
//! loop calls [`Liveness::note_packet`] for every datagram, valid or not.
//! Timeouts are measured in frames, so a stalled render loop never expires
//! a session on its own.

use crate::config::LivenessConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Why a slave session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEnd {
    /// The master went quiet after having sent something
    SessionEnded,
    /// Nothing ever arrived
    NeverConnected,
    /// The operator asked to quit
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    Alive,
    Expired(SessionEnd),
}

#[derive(Debug, Clone)]
pub struct Liveness {
    config: LivenessConfig,
    idle_frames: u32,
    packet_since_frame: bool,
    ever_received: bool,
    packets: u64,
}

impl Liveness {
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            idle_frames: 0,
            packet_since_frame: false,
            ever_received: false,
            packets: 0,
        }
    }

    /// Records that a datagram arrived.
    pub fn note_packet(&mut self) {
        self.packet_since_frame = true;
        self.ever_received = true;
        self.packets += 1;
    }

    /// Counts one rendered frame and checks both timeouts.
    pub fn on_frame(&mut self) -> LivenessVerdict {
        if self.packet_since_frame {
            self.idle_frames = 0;
            self.packet_since_frame = false;
        }
        self.idle_frames = self.idle_frames.saturating_add(1);

        if self.ever_received && self.idle_frames > self.config.session_timeout_frames {
            info!("no packets for {} frames, session over", self.idle_frames);
            return LivenessVerdict::Expired(SessionEnd::SessionEnded);
        }
        if !self.ever_received && self.idle_frames > self.config.connect_timeout_frames {
            info!("nothing received in {} frames, giving up", self.idle_frames);
            return LivenessVerdict::Expired(SessionEnd::NeverConnected);
        }
        LivenessVerdict::Alive
    }

    pub fn idle_frames(&self) -> u32 {
        self.idle_frames
    }

    pub fn ever_received(&self) -> bool {
        self.ever_received
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new(LivenessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_until_expiry(liveness: &mut Liveness, limit: u32) -> Option<(u32, SessionEnd)> {
        for frame in 1..=limit {
            if let LivenessVerdict::Expired(end) = liveness.on_frame() {
                return Some((frame, end));
            }
        }
        None
    }

    #[test]
    fn test_never_connected_after_900_frames() {
        let mut liveness = Liveness::default();
        assert_eq!(frames_until_expiry(&mut liveness, 2000), Some((901, SessionEnd::NeverConnected)));
    }

    #[test]
    fn test_session_ends_181_frames_after_last_packet() {
        let mut liveness = Liveness::default();
        for _ in 0..50 {
            liveness.note_packet();
            assert_eq!(liveness.on_frame(), LivenessVerdict::Alive);
        }
        assert_eq!(liveness.idle_frames(), 1);

        // The frame after the last packet counted as 1
        assert_eq!(frames_until_expiry(&mut liveness, 1000), Some((180, SessionEnd::SessionEnded)));
    }

    #[test]
    fn test_packets_keep_session_alive() {
        let mut liveness = Liveness::default();
        for frame in 0..5000 {
            if frame % 100 == 0 {
                liveness.note_packet();
            }
            assert_eq!(liveness.on_frame(), LivenessVerdict::Alive);
        }
        assert_eq!(liveness.packets(), 50);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut liveness = Liveness::new(LivenessConfig {
            session_timeout_frames: 2,
            connect_timeout_frames: 3,
        });
        assert_eq!(frames_until_expiry(&mut liveness, 10), Some((4, SessionEnd::NeverConnected)));

        let mut liveness = Liveness::new(LivenessConfig {
            session_timeout_frames: 2,
            connect_timeout_frames: 3,
        });
        liveness.note_packet();
        assert_eq!(frames_until_expiry(&mut liveness, 10), Some((3, SessionEnd::SessionEnded)));
    }
}
