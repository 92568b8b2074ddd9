//! Node configuration.
//!
//! Every knob has a default matching the installation as it runs in the
//! gallery. A JSON file can override any subset of fields; the CLI then
//! overrides individual values on top.

use crate::error::NodeError;
use crate::sample::AxisTransform;
use crate::wire::DecodePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the shared tick cursor decides a tick is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    /// One tick per full round: as many valid messages as known objects.
    #[default]
    RoundCount,

    /// Recorded files separate rounds with junk lines; every invalid
    /// message closes a tick and valid ones do not count.
    Delimited,
}

/// Slave-side trail store sizing and ingestion behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Ticks of raw history kept per object (default: 20)
    pub history_capacity: usize,

    /// Ghost points kept per object (default: 24)
    pub afterimage_capacity: usize,

    /// Every Nth ingested sample becomes an afterimage (default: 3)
    pub afterimage_stride: u64,

    /// Line segments kept per object before the oldest are overwritten (default: 200,000)
    pub segment_capacity: usize,

    /// Object count at which the mean-distance series is recorded (default: 4)
    pub expected_objects: usize,

    /// Tick-advancement rule (default: RoundCount)
    pub tick_mode: TickMode,

    /// Numeric field parsing policy (default: Lenient)
    pub decode_policy: DecodePolicy,

    /// Whether the receiver records segments at all (default: true)
    pub record_segments: bool,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            afterimage_capacity: 24,
            afterimage_stride: 3,
            segment_capacity: 200_000,
            expected_objects: 4,
            tick_mode: TickMode::RoundCount,
            decode_policy: DecodePolicy::Lenient,
            record_segments: true,
        }
    }
}

/// Master-side drawing gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Trigger height in metres above which the gate flips (default: 2.0)
    pub threshold_m: f64,

    /// Ticks after a flip during which no further flip is allowed (default: 360)
    pub hysteresis_ticks: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold_m: 2.0,
            hysteresis_ticks: 360,
        }
    }
}

/// Master-side emission and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    /// Emit positions only on every Kth tick (default: 120)
    pub emit_divider: u64,

    /// Pause between live ticks in ms (default: 10 = 100 Hz)
    pub tick_interval_ms: u64,

    /// Send an inert payload while drawing is disabled (default: true)
    pub keepalive: bool,

    /// Pause after each keep-alive in ms (default: 10)
    pub keepalive_interval_ms: u64,

    /// Pause between replayed lines in ms (default: 1)
    pub replay_pacing_ms: u64,

    /// Calibration applied after unit conversion (default: identity)
    pub transform: AxisTransform,

    /// Capture-device connection attempts before giving up (default: 2)
    pub connect_attempts: u32,

    /// Pause between connection attempts in ms (default: 1000)
    pub connect_retry_ms: u64,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            emit_divider: 120,
            tick_interval_ms: 10,
            keepalive: true,
            keepalive_interval_ms: 10,
            replay_pacing_ms: 1,
            transform: AxisTransform::identity(),
            connect_attempts: 2,
            connect_retry_ms: 1000,
        }
    }
}

impl TransmitConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn replay_pacing(&self) -> Duration {
        Duration::from_millis(self.replay_pacing_ms)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}

/// Slave auto-exit thresholds, in rendered frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Frames without a packet after at least one arrived (default: 180)
    pub session_timeout_frames: u32,

    /// Frames without any packet ever arriving (default: 900)
    pub connect_timeout_frames: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            session_timeout_frames: 180,
            connect_timeout_frames: 900,
        }
    }
}

/// Line colour oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorCycleConfig {
    /// Per-frame change of each channel (default: 0.0003, about one cycle a minute at 60 fps)
    pub step: f64,

    /// Starting RGB (default: 1.0, 0.5, 0.0)
    pub initial: [f64; 3],

    /// Starting direction per channel (default: -1, +1, +1)
    pub direction: [f64; 3],
}

impl Default for ColorCycleConfig {
    fn default() -> Self {
        Self {
            step: 0.0003,
            initial: [1.0, 0.5, 0.0],
            direction: [-1.0, 1.0, 1.0],
        }
    }
}

/// Slave frame loop and drawing style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frame rate of the render loop (default: 60)
    pub frame_rate_hz: u32,

    /// Base line thickness; actual width grows with depth (default: 5.0)
    pub line_thickness: f64,

    /// Radius of the current-position sphere (default: 0.1)
    pub sphere_radius: f64,

    /// Headless renderer logs statistics every N frames (default: 60)
    pub stats_every: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60,
            line_thickness: 5.0,
            sphere_radius: 0.1,
            stats_every: 60,
        }
    }
}

impl RenderConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }
}

/// Everything a master or slave needs, loadable from one JSON file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub trail: TrailConfig,
    pub gate: GateConfig,
    pub transmit: TransmitConfig,
    pub liveness: LivenessConfig,
    pub color_cycle: ColorCycleConfig,
    pub render: RenderConfig,
}

impl NodeConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, NodeError> {
        let config: NodeConfig =
            serde_json::from_str(text).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Rejects values that would make a ring or divider degenerate.
    pub fn validate(&self) -> Result<(), NodeError> {
        let checks = [
            (self.trail.history_capacity == 0, "trail.history_capacity must be at least 1"),
            (self.trail.afterimage_capacity == 0, "trail.afterimage_capacity must be at least 1"),
            (self.trail.afterimage_stride == 0, "trail.afterimage_stride must be at least 1"),
            (self.trail.segment_capacity == 0, "trail.segment_capacity must be at least 1"),
            (self.transmit.emit_divider == 0, "transmit.emit_divider must be at least 1"),
            (self.render.frame_rate_hz == 0, "render.frame_rate_hz must be at least 1"),
            (!self.color_cycle.step.is_finite(), "color_cycle.step must be finite"),
            (!self.gate.threshold_m.is_finite(), "gate.threshold_m must be finite"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(NodeError::Config((*message).to_string())),
            None => Ok(()),
        }
    }
}
