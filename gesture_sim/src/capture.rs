//! Simulated performer standing in for a motion-capture SDK.
//!
//! Each object orbits a fixed centre. The trigger object is held low and
//! lifted above the gate threshold during configured frame windows.
//! Positions are reported in millimetres with seeded Gaussian jitter.

use gesture_core::source::{CaptureDevice, FrameStatus};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::ops::Range;

/// Height the trigger is lifted to inside a raise window (mm).
pub const RAISED_HEIGHT_MM: f64 = 2400.0;

/// One orbiting object.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitSpec {
    pub name: String,
    /// Orbit centre (mm)
    pub center: [f64; 3],
    /// Orbit radius in the x/y plane (mm)
    pub radius: f64,
    /// Frames per revolution
    pub period_frames: f64,
    /// Starting angle (radians)
    pub phase: f64,
}

impl OrbitSpec {
    fn new(name: &str, center: [f64; 3], radius: f64, period_frames: f64, phase: f64) -> Self {
        Self {
            name: name.to_string(),
            center,
            radius,
            period_frames,
            phase,
        }
    }

    fn angle_at(&self, frame: u64) -> f64 {
        self.phase + TAU * frame as f64 / self.period_frames.max(1.0)
    }

    fn position_at(&self, frame: u64) -> [f64; 3] {
        let angle = self.angle_at(frame);
        [
            self.center[0] + self.radius * angle.cos(),
            self.center[1] + self.radius * angle.sin(),
            self.center[2],
        ]
    }
}

/// A deterministic capture device.
pub struct SimulatedCapture {
    objects: Vec<OrbitSpec>,
    trigger: String,
    raise_windows: Vec<Range<u64>>,
    dropouts: Vec<Range<u64>>,
    jitter: Option<Normal<f64>>,
    rng: ChaCha8Rng,

    /// Connection attempts refused before one succeeds
    connect_failures: u32,
    connect_attempts: u32,
    connected: bool,

    frame: u64,
    positions: HashMap<String, [f64; 3]>,
    rotations: HashMap<String, [f64; 3]>,
}

impl SimulatedCapture {
    /// Two hands, a head and a wand; the wand is the trigger.
    pub fn new(seed: u64) -> Self {
        let objects = vec![
            OrbitSpec::new("LeftHand", [-400.0, 1000.0, 1300.0], 300.0, 600.0, 0.0),
            OrbitSpec::new("RightHand", [400.0, 1000.0, 1300.0], 300.0, 600.0, TAU / 2.0),
            OrbitSpec::new("Head", [0.0, 0.0, 1700.0], 50.0, 1200.0, 0.0),
            OrbitSpec::new("Wand", [600.0, 200.0, 1200.0], 100.0, 400.0, TAU / 4.0),
        ];

        Self {
            objects,
            trigger: "Wand".to_string(),
            raise_windows: Vec::new(),
            dropouts: Vec::new(),
            jitter: Normal::new(0.0, 2.0).ok(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            connect_failures: 0,
            connect_attempts: 0,
            connected: false,
            frame: 0,
            positions: HashMap::new(),
            rotations: HashMap::new(),
        }
    }

    /// Frames during which the trigger is held above the gate threshold.
    pub fn with_raise_windows(mut self, windows: Vec<Range<u64>>) -> Self {
        self.raise_windows = windows;
        self
    }

    /// Frames during which the device reports no data.
    pub fn with_dropouts(mut self, dropouts: Vec<Range<u64>>) -> Self {
        self.dropouts = dropouts;
        self
    }

    /// Refuses the first `failures` connection attempts (`u32::MAX`: never connects).
    pub fn with_connect_failures(mut self, failures: u32) -> Self {
        self.connect_failures = failures;
        self
    }

    /// Standard deviation of the positional noise in mm (0 disables it).
    pub fn with_jitter_mm(mut self, sigma: f64) -> Self {
        self.jitter = if sigma > 0.0 { Normal::new(0.0, sigma).ok() } else { None };
        self
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Frames polled so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    fn in_any(windows: &[Range<u64>], frame: u64) -> bool {
        windows.iter().any(|w| w.contains(&frame))
    }

    fn noise(&mut self) -> f64 {
        match &self.jitter {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }

    fn capture(&mut self, frame: u64) {
        let raised = Self::in_any(&self.raise_windows, frame);
        let objects = self.objects.clone();

        for object in &objects {
            let mut position = object.position_at(frame);
            if raised && object.name == self.trigger {
                position[2] = RAISED_HEIGHT_MM;
            }
            for axis in &mut position {
                *axis += self.noise();
            }

            let yaw = object.angle_at(frame).to_degrees().rem_euclid(360.0);
            self.positions.insert(object.name.clone(), position);
            self.rotations.insert(object.name.clone(), [0.0, 0.0, yaw]);
        }
    }
}

impl CaptureDevice for SimulatedCapture {
    fn connect(&mut self, _target: &str) -> bool {
        self.connect_attempts = self.connect_attempts.saturating_add(1);
        if self.connect_attempts > self.connect_failures {
            self.connected = true;
        }
        self.connected
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn poll_frame(&mut self) -> FrameStatus {
        let frame = self.frame;
        self.frame += 1;

        if !self.connected || Self::in_any(&self.dropouts, frame) {
            // Last good frame stays readable
            return FrameStatus::NoData;
        }

        self.capture(frame);
        FrameStatus::Ready
    }

    fn position(&self, object: &str) -> Option<[f64; 3]> {
        self.positions.get(object).copied()
    }

    fn rotation(&self, object: &str) -> Option<[f64; 3]> {
        self.rotations.get(object).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_rises_inside_window() {
        let mut capture = SimulatedCapture::new(1).with_raise_windows(vec![2..3]);
        assert!(capture.connect("sim"));

        let mut heights = Vec::new();
        for _ in 0..4 {
            assert_eq!(capture.poll_frame(), FrameStatus::Ready);
            heights.push(capture.position("Wand").unwrap()[2]);
        }

        assert!(heights[1] < 1300.0);
        assert!((heights[2] - RAISED_HEIGHT_MM).abs() < 20.0);
        assert!(heights[3] < 1300.0);
    }

    #[test]
    fn test_no_positions_until_connected() {
        let mut capture = SimulatedCapture::new(1).with_connect_failures(1);
        assert_eq!(capture.poll_frame(), FrameStatus::NoData);
        assert_eq!(capture.position("Head"), None);

        assert!(!capture.connect("sim"));
        assert!(capture.connect("sim"));
        assert_eq!(capture.poll_frame(), FrameStatus::Ready);
        assert!(capture.position("Head").is_some());
        assert!(capture.rotation("Head").is_some());
        assert_eq!(capture.position("Nobody"), None);
    }

    #[test]
    fn test_dropout_keeps_last_frame() {
        let mut capture = SimulatedCapture::new(1).with_dropouts(vec![1..2]);
        capture.connect("sim");

        capture.poll_frame();
        let before = capture.position("LeftHand");
        assert_eq!(capture.poll_frame(), FrameStatus::NoData);
        assert_eq!(capture.position("LeftHand"), before);
        assert_eq!(capture.poll_frame(), FrameStatus::Ready);
        assert_eq!(capture.frames(), 3);
    }

    #[test]
    fn test_same_seed_same_motion() {
        let run = |seed| {
            let mut capture = SimulatedCapture::new(seed);
            capture.connect("sim");
            (0..50)
                .map(|_| {
                    capture.poll_frame();
                    capture.position("RightHand").unwrap()
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(5), run(5));
        assert_ne!(run(5), run(6));
    }

    #[test]
    fn test_noiseless_orbit_is_exact() {
        let mut capture = SimulatedCapture::new(1).with_jitter_mm(0.0);
        capture.connect("sim");
        capture.poll_frame();
        assert_eq!(capture.position("Head"), Some([50.0, 0.0, 1700.0]));
    }
}
