//! Derived statistics: proximity, colour mapping, velocity, colour cycle.
//!
//! None of this feeds back into tracking. Proximity only picks a colour,
//! velocity is informational, and the colour cycle tints new segments.

use crate::config::ColorCycleConfig;
use crate::sample::{Rgb, Sample};
use nalgebra::Vector3;

/// Number of finite differences averaged by [`average_velocity`].
pub const VELOCITY_WINDOW: usize = 5;

/// Mean Euclidean distance over all unordered pairs.
///
/// Returns `None` for fewer than two points.
pub fn mean_pairwise_distance(points: &[Sample]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            total += a.distance_to(b);
            pairs += 1;
        }
    }

    Some(total / pairs as f64)
}

/// Maps a mean distance (metres) to a colour.
///
/// ```text
/// red   = d / 2
/// blue  = 1 - d / 2
/// green = |red - blue|
/// ```
///
/// every channel clamped to [0, 1]. Objects far apart read red, close
/// together read blue.
pub fn color_for_distance(distance: f64) -> Rgb {
    let red = (distance / 2.0).clamp(0.0, 1.0);
    let blue = (1.0 - distance / 2.0).clamp(0.0, 1.0);
    let green = (red - blue).abs().clamp(0.0, 1.0);
    Rgb::new(red, green, blue)
}

/// Mean per-tick displacement over the last [`VELOCITY_WINDOW`] ticks.
///
/// `history` is oldest → newest. Fewer than `VELOCITY_WINDOW + 1` samples
/// yields zero.
pub fn average_velocity(history: &[Sample]) -> Vector3<f64> {
    if history.len() < VELOCITY_WINDOW + 1 {
        return Vector3::zeros();
    }

    let window = &history[history.len() - (VELOCITY_WINDOW + 1)..];
    let sum = window
        .windows(2)
        .fold(Vector3::zeros(), |acc, pair| acc + (pair[1].position() - pair[0].position()));

    sum / VELOCITY_WINDOW as f64
}

/// Triangular-wave RGB oscillator.
///
/// Each channel moves by `step` per frame and reverses direction when it
/// reaches 0 or 1. Every segment recorded at a given moment takes the
/// current value, so the drawing shifts hue slowly over time.
#[derive(Debug, Clone)]
pub struct ColorCycle {
    value: [f64; 3],
    direction: [f64; 3],
    step: f64,
    frames: u64,
}

impl ColorCycle {
    pub fn new(config: &ColorCycleConfig) -> Self {
        Self {
            value: config.initial,
            direction: config.direction,
            step: config.step,
            frames: 0,
        }
    }

    /// Advances one frame.
    pub fn advance(&mut self) {
        for (value, direction) in self.value.iter_mut().zip(self.direction.iter_mut()) {
            *value += self.step * *direction;
            if *value <= 0.0 {
                *direction = 1.0;
            } else if *value >= 1.0 {
                *direction = -1.0;
            }
        }
        self.frames += 1;
    }

    /// Current colour, clamped into [0, 1].
    pub fn current(&self) -> Rgb {
        Rgb::new(self.value[0], self.value[1], self.value[2]).clamped()
    }

    /// Frames advanced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for ColorCycle {
    fn default() -> Self {
        Self::new(&ColorCycleConfig::default())
    }
}
