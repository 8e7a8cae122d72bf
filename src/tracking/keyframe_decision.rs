//! Keyframe admission policy.
//!
//! Decides, for every tracked scanning frame, whether its colour image should
//! be kept for colorizing. Whether a viewpoint is new enough is the keyframe
//! manager's business; this policy adds the accuracy gate and rejects frames
//! taken while the camera rotates fast (motion blur, rolling shutter).

use tracing::debug;

use crate::config::ScannerOptions;
use crate::geometry::{SE3, delta_rotation_deg};
use crate::keyframes::{Keyframe, KeyframeManager};
use crate::sensor::{ColorFrame, DepthFrame};

use super::result::{Advisory, PoseAccuracy, TrackerReading};

/// Timing is only trusted when consecutive frames are closer than this many
/// nominal frame intervals.
const STALE_INTERVAL_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct KeyframeSelectorConfig {
    /// Minimum accuracy for a frame to be considered at all.
    pub min_accuracy: PoseAccuracy,
    /// Frames rotating at or above this speed are rejected.
    pub max_rotation_speed_deg_per_s: f64,
    pub nominal_frame_interval_s: f64,
}

impl Default for KeyframeSelectorConfig {
    fn default() -> Self {
        Self {
            min_accuracy: PoseAccuracy::Approximate,
            max_rotation_speed_deg_per_s: 1.0,
            nominal_frame_interval_s: 1.0 / 30.0,
        }
    }
}

impl From<&ScannerOptions> for KeyframeSelectorConfig {
    fn from(options: &ScannerOptions) -> Self {
        Self {
            min_accuracy: PoseAccuracy::Approximate,
            max_rotation_speed_deg_per_s: options.max_keyframe_rotation_speed_deg_per_s,
            nominal_frame_interval_s: options.nominal_frame_interval_s,
        }
    }
}

/// Everything the policy looks at for one frame.
pub struct KeyframeCandidate<'a> {
    /// Depth camera pose before this frame was tracked.
    pub pose_before: SE3,
    pub reading: &'a TrackerReading,
    pub depth: &'a DepthFrame,
    pub color: Option<&'a ColorFrame>,
}

impl KeyframeCandidate<'_> {
    /// Colour camera pose after tracking.
    pub fn color_camera_pose(&self) -> SE3 {
        self.reading
            .pose
            .compose(&self.depth.color_camera_pose_in_depth)
    }
}

/// Outcome of evaluating one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeDecision {
    /// No colour image to keep.
    NoColor,
    LowAccuracy,
    /// The keyframe manager already has a similar viewpoint.
    NotNewViewpoint,
    Admitted,
    /// Rotation speed at or above the threshold.
    TooFast,
    /// Elapsed time since the previous frame is not trustworthy.
    StaleTiming,
}

impl KeyframeDecision {
    pub fn is_admitted(self) -> bool {
        self == Self::Admitted
    }

    pub fn advisory(self) -> Option<Advisory> {
        match self {
            Self::TooFast | Self::StaleTiming => Some(Advisory::HoldStill),
            _ => None,
        }
    }
}

/// Keyframe gate. Holds only timing state; frames go to the manager.
pub struct KeyframeSelector {
    config: KeyframeSelectorConfig,
    /// Timestamp of the previous processed scanning frame.
    prev_frame_timestamp: Option<f64>,
    /// Keyframes admitted since the last reset.
    admitted: usize,
}

impl KeyframeSelector {
    pub fn new(config: KeyframeSelectorConfig) -> Self {
        Self {
            config,
            prev_frame_timestamp: None,
            admitted: 0,
        }
    }

    /// Evaluate a tracked frame and hand it to `manager` when admitted.
    pub fn evaluate(
        &mut self,
        candidate: &KeyframeCandidate<'_>,
        manager: &mut dyn KeyframeManager,
    ) -> KeyframeDecision {
        let Some(color) = candidate.color else {
            return KeyframeDecision::NoColor;
        };

        if candidate.reading.accuracy < self.config.min_accuracy {
            return KeyframeDecision::LowAccuracy;
        }

        let color_pose = candidate.color_camera_pose();
        if !manager.would_admit(&color_pose) {
            return KeyframeDecision::NotNewViewpoint;
        }

        let timestamp = candidate.depth.timestamp_s;
        let decision = if self.admitted == 0 {
            KeyframeDecision::Admitted
        } else {
            match self.prev_frame_timestamp {
                Some(prev) => {
                    let delta_deg = delta_rotation_deg(&candidate.pose_before, &candidate.reading.pose);
                    self.speed_gate(timestamp - prev, delta_deg)
                }
                None => KeyframeDecision::StaleTiming,
            }
        };

        if decision.is_admitted() {
            manager.admit(Keyframe {
                color_camera_pose: color_pose,
                color_frame: color.clone(),
                timestamp_s: timestamp,
            });
            self.admitted += 1;
            debug!("keyframe admitted at {:.3}s ({} total)", timestamp, manager.len());
        } else {
            debug!("keyframe rejected at {:.3}s: {:?}", timestamp, decision);
        }

        decision
    }

    /// Speed test for a non-first keyframe.
    pub fn speed_gate(&self, elapsed_s: f64, delta_rotation_deg: f64) -> KeyframeDecision {
        let max_elapsed = self.config.nominal_frame_interval_s * STALE_INTERVAL_FACTOR;
        if !(elapsed_s > 0.0 && elapsed_s < max_elapsed) {
            return KeyframeDecision::StaleTiming;
        }
        let speed = delta_rotation_deg / elapsed_s;
        if speed < self.config.max_rotation_speed_deg_per_s {
            KeyframeDecision::Admitted
        } else {
            KeyframeDecision::TooFast
        }
    }

    /// Record that a scanning frame went through the tracker, whether or not
    /// tracking succeeded.
    pub fn record_processed_frame(&mut self, timestamp_s: f64) {
        self.prev_frame_timestamp = Some(timestamp_s);
    }

    /// Forget all timing state; the next admissible frame is a first frame.
    pub fn reset(&mut self) {
        self.prev_frame_timestamp = None;
        self.admitted = 0;
    }

    pub fn admitted_count(&self) -> usize {
        self.admitted
    }

    pub fn config(&self) -> &KeyframeSelectorConfig {
        &self.config
    }
}
