//! Gesture Trails deterministic simulation harness
//!
//! Runs a master and a slave against each other inside one process, with
//! every source of non-determinism under control:
//! - **Time**: a virtual clock that advances on every `sleep`
//! - **Network**: in-memory broadcast link with seeded loss and partitions
//! - **Capture**: a performer whose motion and jitter derive from the seed
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────── current-thread runtime ─────────────────────────┐
//! │                                                                          │
//! │  SimulatedCapture ──► Transmitter ──► SimNetwork ──► SlaveNode ──► Renderer│
//! │   (orbits, wand)       (gate, wire)    (loss, part.)   (trail store)      │
//! │                                                                          │
//! │                       SimContext: one virtual clock for both sides       │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gesture_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::LossyLink)?;
//! assert!(result.passed);
//! ```

pub mod capture;
mod context;
pub mod error;
mod network;
pub mod runner;
pub mod scenarios;
pub mod visualizer;

pub use capture::SimulatedCapture;
pub use context::SimContext;
pub use error::SimError;
pub use network::{LinkStats, SimNetwork, SimNetworkController};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use visualizer::RerunRenderer;
