//! Keyframe contract.

use serde::{Deserialize, Serialize};

use crate::geometry::SE3;
use crate::sensor::ColorFrame;

/// Colour image retained for colorizing, with the pose it was taken from.
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Colour camera pose in the volume frame.
    pub color_camera_pose: SE3,
    pub color_frame: ColorFrame,
    pub timestamp_s: f64,
}

/// Capacity and novelty thresholds of a keyframe manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframeManagerOptions {
    pub max_size: usize,
    /// A pose is new if it rotated at least this much from every stored
    /// keyframe...
    pub max_delta_rotation_rad: f64,
    /// ...or moved at least this far.
    pub max_delta_translation_m: f64,
}

/// Bounded collection of keyframes.
pub trait KeyframeManager: Send {
    /// Whether a keyframe taken from `color_camera_pose` would add a new
    /// viewpoint.
    fn would_admit(&self, color_camera_pose: &SE3) -> bool;

    fn admit(&mut self, keyframe: Keyframe);

    /// Copy of the retained keyframes, oldest first.
    fn keyframes(&self) -> Vec<Keyframe>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
