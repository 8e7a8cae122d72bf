//! In-memory keyframe store.
//!
//! Viewpoint novelty is a plain scan over stored poses; with a few dozen
//! keyframes this is cheaper than any index.

use std::collections::VecDeque;

use tracing::debug;

use crate::geometry::SE3;

use super::manager::{Keyframe, KeyframeManager, KeyframeManagerOptions};

pub struct KeyframeStore {
    options: KeyframeManagerOptions,
    entries: VecDeque<Keyframe>,
}

impl KeyframeStore {
    pub fn new(options: KeyframeManagerOptions) -> Self {
        Self {
            options,
            entries: VecDeque::with_capacity(options.max_size),
        }
    }

    pub fn options(&self) -> &KeyframeManagerOptions {
        &self.options
    }

    /// True when `pose` is within both thresholds of a stored keyframe.
    fn is_covered(&self, pose: &SE3) -> bool {
        self.entries.iter().any(|kf| {
            kf.color_camera_pose.rotation_angle_to(pose) < self.options.max_delta_rotation_rad
                && kf.color_camera_pose.translation_distance_to(pose)
                    < self.options.max_delta_translation_m
        })
    }
}

impl KeyframeManager for KeyframeStore {
    fn would_admit(&self, color_camera_pose: &SE3) -> bool {
        self.options.max_size > 0 && !self.is_covered(color_camera_pose)
    }

    fn admit(&mut self, keyframe: Keyframe) {
        if self.options.max_size == 0 {
            return;
        }
        while self.entries.len() >= self.options.max_size {
            if let Some(evicted) = self.entries.pop_front() {
                debug!("keyframe store full, evicting keyframe at {:.3}s", evicted.timestamp_s);
            }
        }
        self.entries.push_back(keyframe);
    }

    fn keyframes(&self) -> Vec<Keyframe> {
        self.entries.iter().cloned().collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
