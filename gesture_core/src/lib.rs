//! Gesture Trails Core - bounded trail engine for a motion-capture drawing installation
//!
//! A master broadcasts `name~x~y~z` datagrams; every slave folds them into
//! per-object trails and draws them. This crate holds both sides:
//! 1. **Wire**: the `~`-delimited protocol, lenient or strict decoding
//! 2. **Trail Store**: tick-aligned histories, segment and afterimage rings,
//!    the mean-distance series that picks the drawing colour
//! 3. **Gesture Gate**: the height-triggered drawing toggle with hysteresis
//! 4. **Runtimes**: [`Transmitter`] (master) and [`SlaveNode`] (slave),
//!    generic over `gesture_env` context and transport

pub mod config;
pub mod error;
pub mod export;
pub mod gesture_gate;
pub mod liveness;
pub mod receiver;
pub mod render;
pub mod ring;
pub mod sample;
pub mod source;
pub mod stats;
pub mod trail_store;
pub mod transmitter;
pub mod wire;

// Re-export key types for convenience
pub use config::{
    ColorCycleConfig, GateConfig, LivenessConfig, NodeConfig, RenderConfig, TickMode, TrailConfig, TransmitConfig,
};
pub use error::{NodeError, WireError};
pub use export::{TrackExport, TrailExport};
pub use gesture_gate::{DrawingState, GestureGate};
pub use liveness::{Liveness, LivenessVerdict, SessionEnd};
pub use receiver::{lock_state, receive_loop, SharedState, SlaveNode, SlaveState};
pub use render::{FrameView, GhostPoint, Renderer, StatsRenderer};
pub use ring::{FifoRing, OverwriteRing, TickRing};
pub use sample::{AxisTransform, Rgb, Sample};
pub use source::{connect_with_retries, CaptureDevice, FrameStatus};
pub use stats::ColorCycle;
pub use trail_store::{FrameStats, IngestOutcome, MessageCounters, Segment, TrackRecord, TrailStore};
pub use transmitter::{TransmitStats, Transmitter};
pub use wire::{DecodePolicy, WireMessage};
