//! The drawing gate: a trigger object raised above head height toggles
//! drawing on and off.
//!
//! ```text
//!            z > threshold, cooldown == 0
//!   DISABLED ─────────────────────────────► ENABLED
//!      ▲                                       │
//!      └───────────────────────────────────────┘
//!            z > threshold, cooldown == 0
//! ```
//!
//! After every flip the gate ignores the trigger for `hysteresis_ticks`
//! polls. A performer holding the trigger up, or marker noise around the
//! threshold, therefore produces one flip rather than a flicker.

use crate::config::GateConfig;
use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Whether the master is currently emitting positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawingState {
    Enabled,
    Disabled,
}

impl DrawingState {
    pub fn flipped(self) -> Self {
        match self {
            DrawingState::Enabled => DrawingState::Disabled,
            DrawingState::Disabled => DrawingState::Enabled,
        }
    }
}

/// Height-triggered toggle with a cooldown window.
#[derive(Debug, Clone)]
pub struct GestureGate {
    config: GateConfig,
    state: DrawingState,
    cooldown_ticks: u32,

    /// Total flips since creation
    flips: u64,
}

impl GestureGate {
    /// Creates a gate in the `Disabled` state with no cooldown pending.
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: DrawingState::Disabled,
            cooldown_ticks: 0,
            flips: 0,
        }
    }

    /// Evaluates one polling tick.
    ///
    /// `trigger` is the trigger object's current position, or `None` if the
    /// capture source has nothing for it this tick. A missing or all-zero
    /// position counts as below the threshold.
    ///
    /// Returns the new state when a flip happened.
    pub fn evaluate(&mut self, trigger: Option<Sample>) -> Option<DrawingState> {
        if self.cooldown_ticks > 0 {
            self.cooldown_ticks -= 1;
            return None;
        }

        let raised = trigger
            .filter(|s| !s.is_zero())
            .is_some_and(|s| s.z > self.config.threshold_m);
        if !raised {
            return None;
        }

        self.state = self.state.flipped();
        self.cooldown_ticks = self.config.hysteresis_ticks;
        self.flips += 1;
        Some(self.state)
    }

    pub fn state(&self) -> DrawingState {
        self.state
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state == DrawingState::Enabled
    }

    /// Ticks left before the trigger is looked at again.
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_ticks
    }

    pub fn flips(&self) -> u64 {
        self.flips
    }
}

impl Default for GestureGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_height(z: f64) -> Option<Sample> {
        Some(Sample::new(0.3, 0.2, z))
    }

    #[test]
    fn test_initial_state() {
        let gate = GestureGate::default();
        assert_eq!(gate.state(), DrawingState::Disabled);
        assert_eq!(gate.cooldown_remaining(), 0);
        assert!(!gate.is_enabled());
    }

    #[test]
    fn test_below_threshold_never_flips() {
        let mut gate = GestureGate::default();
        for _ in 0..1000 {
            assert_eq!(gate.evaluate(at_height(1.99)), None);
        }
        assert_eq!(gate.flips(), 0);
    }

    #[test]
    fn test_missing_or_zero_trigger_is_ignored() {
        let mut gate = GestureGate::new(GateConfig {
            threshold_m: -1.0,
            hysteresis_ticks: 5,
        });
        // Zero sample would exceed a negative threshold, but it means "no data"
        assert_eq!(gate.evaluate(Some(Sample::ZERO)), None);
        assert_eq!(gate.evaluate(None), None);
        assert_eq!(gate.state(), DrawingState::Disabled);
    }

    #[test]
    fn test_single_flip_then_hysteresis() {
        let window = 360;
        let mut gate = GestureGate::new(GateConfig {
            threshold_m: 2.0,
            hysteresis_ticks: window,
        });

        assert_eq!(gate.evaluate(at_height(1.5)), None);
        assert_eq!(gate.evaluate(at_height(2.2)), Some(DrawingState::Enabled));

        // Noisy trigger oscillating around the threshold during the window
        for tick in 0..window {
            let z = if tick % 2 == 0 { 2.05 } else { 1.95 };
            assert_eq!(gate.evaluate(at_height(z)), None, "flip inside window at tick {}", tick);
        }
        assert_eq!(gate.flips(), 1);
        assert_eq!(gate.cooldown_remaining(), 0);

        // First tick after the window may flip again
        assert_eq!(gate.evaluate(at_height(2.5)), Some(DrawingState::Disabled));
        assert_eq!(gate.flips(), 2);
    }

    #[test]
    fn test_cooldown_counts_down_without_trigger() {
        let mut gate = GestureGate::new(GateConfig {
            threshold_m: 2.0,
            hysteresis_ticks: 3,
        });
        gate.evaluate(at_height(3.0));
        assert_eq!(gate.cooldown_remaining(), 3);

        gate.evaluate(None);
        gate.evaluate(None);
        gate.evaluate(None);
        assert_eq!(gate.cooldown_remaining(), 0);
        assert!(gate.is_enabled());
    }
}
