#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-point scale of the wire angle (1/64 degree per step).
pub const ANGLE_STEPS_PER_DEGREE: f64 = 64.;
/// Fixed-point scale of the wire distance (1/4 mm per step).
pub const DISTANCE_STEPS_PER_MM: f64 = 4.;

/// One measurement decoded from a 5-byte scan frame.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanSample {
    /// Heading in degrees, clockwise.
    pub angle_degrees: f64,
    /// Distance to an object in millimetres.
    pub distance_mm: f64,
    /// 6-bit signal quality, never 0 for a delivered sample.
    pub quality: u8,
    /// First sample of a new 360 degree revolution.
    pub is_new_scan: bool,
}

impl ScanSample {
    pub fn angle_radian(&self) -> f64 {
        self.angle_degrees.to_radians()
    }

    /// Angle re-quantized to the 15-bit wire value.
    pub fn angle_q6(&self) -> u16 {
        (self.angle_degrees * ANGLE_STEPS_PER_DEGREE).round() as u16
    }

    /// Distance re-quantized to the 16-bit wire value.
    pub fn distance_q2(&self) -> u16 {
        (self.distance_mm * DISTANCE_STEPS_PER_MM).round() as u16
    }

    /// Cartesian position in millimetres, x pointing at 0 degrees.
    pub fn to_cartesian(&self) -> (f64, f64) {
        let theta = self.angle_radian();
        (
            self.distance_mm * f64::cos(theta),
            self.distance_mm * f64::sin(theta),
        )
    }
}

/// Samples of one lap of the sensor head.
#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Revolution {
    pub samples: Vec<ScanSample>,
    /// True if the lap starts at a new-scan marker and was closed by the
    /// next one. The lap in progress at start or stop is incomplete.
    pub complete: bool,
}

impl Revolution {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
