//! Positions, colours, and the master-side calibration transform.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One 3-D position in metres.
///
/// The all-zero sample doubles as the "no data" sentinel: capture systems
/// report an occluded marker at the origin, so a zero sample never starts a
/// trail segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub const ZERO: Sample = Sample { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Converts a capture-device position in millimetres to metres.
    pub fn from_millimetres(position: [f64; 3]) -> Self {
        Self::new(position[0] / 1000.0, position[1] / 1000.0, position[2] / 1000.0)
    }

    /// True for the all-zero sentinel.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean distance to another sample.
    pub fn distance_to(&self, other: &Sample) -> f64 {
        (self.position() - other.position()).norm()
    }
}

impl From<Vector3<f64>> for Sample {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// An RGB colour with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Clamps every channel into [0, 1].
    pub fn clamped(self) -> Self {
        Self::new(self.r.clamp(0.0, 1.0), self.g.clamp(0.0, 1.0), self.b.clamp(0.0, 1.0))
    }

    /// Packs into 8-bit channels.
    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Per-axis linear calibration applied by the master before encoding.
///
/// `out = in * scale + offset`, axis by axis. These are deployment
/// constants (room size, projector placement), not tracking logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTransform {
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl AxisTransform {
    pub fn identity() -> Self {
        Self {
            scale: [1.0, 1.0, 1.0],
            offset: [0.0, 0.0, 0.0],
        }
    }

    /// The calibration used for the gallery installation: X mirrored,
    /// Y stretched 1.5x, Z stretched 3.5x and lowered 2 m.
    pub fn gallery() -> Self {
        Self {
            scale: [-1.0, 1.5, 3.5],
            offset: [0.0, 0.0, -2.0],
        }
    }

    pub fn apply(&self, sample: Sample) -> Sample {
        Sample::new(
            sample.x * self.scale[0] + self.offset[0],
            sample.y * self.scale[1] + self.offset[1],
            sample.z * self.scale[2] + self.offset[2],
        )
    }
}

impl Default for AxisTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_millimetre_conversion() {
        let s = Sample::from_millimetres([1500.0, -250.0, 2000.0]);
        assert_relative_eq!(s.x, 1.5);
        assert_relative_eq!(s.y, -0.25);
        assert_relative_eq!(s.z, 2.0);
    }

    #[test]
    fn test_zero_sentinel() {
        assert!(Sample::ZERO.is_zero());
        assert!(!Sample::new(0.0, 0.0, 0.001).is_zero());
    }

    #[test]
    fn test_distance() {
        let a = Sample::new(0.0, 0.0, 0.0);
        let b = Sample::new(3.0, 4.0, 0.0);
        assert_relative_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_gallery_transform() {
        let t = AxisTransform::gallery();
        let out = t.apply(Sample::new(1.0, 2.0, 1.0));
        assert_relative_eq!(out.x, -1.0);
        assert_relative_eq!(out.y, 3.0);
        assert_relative_eq!(out.z, 1.5);

        assert_eq!(AxisTransform::identity().apply(Sample::new(1.0, 2.0, 3.0)), Sample::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rgb8_packing() {
        assert_eq!(Rgb::WHITE.to_rgb8(), [255, 255, 255]);
        assert_eq!(Rgb::new(-0.2, 0.5, 1.7).to_rgb8(), [0, 128, 255]);
    }
}
