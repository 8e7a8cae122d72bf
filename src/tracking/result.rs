//! Per-frame tracker output.
//!
//! A `TrackerReading` is produced once per processed frame and consumed
//! immediately. Only its pose survives, as the "previous pose" of the next
//! frame (and the tracker keeps that itself).

use thiserror::Error;

use crate::geometry::SE3;

/// Ordinal confidence attached to a tracked pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoseAccuracy {
    NotAvailable,
    VeryLow,
    Low,
    Approximate,
    High,
}

impl PoseAccuracy {
    /// Opacity of the live mesh overlay: the less we trust the pose, the
    /// fainter the model.
    pub fn mesh_alpha(self) -> f32 {
        match self {
            Self::High | Self::Approximate => 0.8,
            Self::Low => 0.4,
            Self::VeryLow | Self::NotAvailable => 0.1,
        }
    }
}

/// Descriptive hints reported by the tracker alongside the pose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerHints {
    pub tracker_is_lost: bool,
    pub model_out_of_view: bool,
    pub scene_is_too_close: bool,
}

impl TrackerHints {
    /// User-facing text for the most severe hint, if any.
    pub fn message(&self) -> Option<&'static str> {
        if self.tracker_is_lost {
            return Some("Tracking Lost! Please Realign or Press Reset.");
        }
        if self.model_out_of_view {
            return Some("Please put the model back in view.");
        }
        if self.scene_is_too_close {
            return Some("Too close to the scene! Please step back.");
        }
        None
    }
}

/// Result of tracking one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerReading {
    /// Depth camera pose after tracking (T_wc).
    pub pose: SE3,
    pub accuracy: PoseAccuracy,
    pub hints: TrackerHints,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("tracker has no initial pose")]
    NotInitialized,
    #[error("invalid input frame: {0}")]
    InvalidFrame(String),
    #[error("tracking failed: {0}")]
    Failed(String),
}

/// Text shown over the live view while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Hint reported by the tracker (lost, out of view, too close).
    TrackerHint(&'static str),
    /// The tracker failed on this frame.
    TrackingError(String),
    /// A keyframe was wanted but the camera moved too fast.
    HoldStill,
}

impl Advisory {
    pub fn text(&self) -> &str {
        match self {
            Self::TrackerHint(text) => text,
            Self::TrackingError(text) => text,
            Self::HoldStill => "Please hold still so we can capture a keyframe...",
        }
    }

    /// Tracking messages win over keyframe messages.
    pub fn by_priority(tracking: Option<Advisory>, keyframe: Option<Advisory>) -> Option<Advisory> {
        tracking.or(keyframe)
    }
}
