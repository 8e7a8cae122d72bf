//! Scanning volume size and the pinch gesture that scales it.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Smallest allowed volume edge, in metres.
pub const MIN_VOLUME_SIZE_M: f64 = 0.1;
/// Largest allowed volume edge, in metres.
pub const MAX_VOLUME_SIZE_M: f64 = 3.0;

const MIN_PINCH_SCALE: f64 = 0.01;
const MAX_PINCH_SCALE: f64 = 1000.0;

/// Clamp `value` into `[min, max]`. NaN maps to `min`.
pub fn keep_in_range(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Bounding box in which depth is fused. Always within
/// [`MIN_VOLUME_SIZE_M`, `MAX_VOLUME_SIZE_M`] on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpec {
    size_m: Vector3<f64>,
}

impl VolumeSpec {
    pub fn new(size_m: Vector3<f64>) -> Self {
        Self {
            size_m: size_m.map(|c| keep_in_range(c, MIN_VOLUME_SIZE_M, MAX_VOLUME_SIZE_M)),
        }
    }

    pub fn cube(edge_m: f64) -> Self {
        Self::new(Vector3::new(edge_m, edge_m, edge_m))
    }

    pub fn size(&self) -> Vector3<f64> {
        self.size_m
    }

    /// Volume scaled uniformly, clamped again.
    pub fn scaled(&self, scale: f64) -> Self {
        Self::new(self.size_m * scale)
    }

    /// Centre of the volume in its own frame.
    pub fn center(&self) -> Vector3<f64> {
        self.size_m * 0.5
    }
}

impl Default for VolumeSpec {
    fn default() -> Self {
        Self::cube(0.5)
    }
}

/// State of the pinch-to-scale gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchScale {
    current: f64,
    initial_pinch: f64,
}

impl Default for PinchScale {
    fn default() -> Self {
        Self {
            current: 1.0,
            initial_pinch: 1.0,
        }
    }
}

impl PinchScale {
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn began(&mut self, gesture_scale: f64) {
        self.initial_pinch = self.current / gesture_scale;
    }

    /// Update for a gesture step. Returns the new current scale, or `None`
    /// when the gesture started from a degenerate scale.
    pub fn changed(&mut self, gesture_scale: f64) -> Option<f64> {
        if !self.initial_pinch.is_finite() || self.initial_pinch <= 0.0 {
            return None;
        }
        self.current = keep_in_range(
            gesture_scale * self.initial_pinch,
            MIN_PINCH_SCALE,
            MAX_PINCH_SCALE,
        );
        Some(self.current)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
