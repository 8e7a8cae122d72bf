//! Tracker and placement initializer that replay recorded poses.

use std::sync::Arc;

use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::SE3;
use crate::imu::MotionUpdate;
use crate::io::{ReplayDataset, ReplayEntry};
use crate::mapping::VolumeSpec;
use crate::sensor::{ColorFrame, DepthFrame};
use crate::tracking::{PoseInitializer, PoseTracker, TrackerError, TrackerReading};

/// Frames are matched to recorded entries within this many seconds.
const TIMESTAMP_TOLERANCE_S: f64 = 1e-3;

fn find_entry(dataset: &ReplayDataset, timestamp_s: f64) -> Option<&ReplayEntry> {
    let idx = dataset
        .entries
        .partition_point(|e| e.timestamp_s < timestamp_s - TIMESTAMP_TOLERANCE_S);
    dataset
        .entries
        .get(idx)
        .filter(|e| (e.timestamp_s - timestamp_s).abs() <= TIMESTAMP_TOLERANCE_S)
}

pub struct PlaybackTracker {
    dataset: Arc<ReplayDataset>,
    pose: SE3,
    motion_updates: usize,
}

impl PlaybackTracker {
    pub fn new(dataset: Arc<ReplayDataset>) -> Self {
        Self {
            dataset,
            pose: SE3::identity(),
            motion_updates: 0,
        }
    }
}

impl PoseTracker for PlaybackTracker {
    fn update_pose(
        &mut self,
        depth: &DepthFrame,
        _color: Option<&ColorFrame>,
    ) -> Result<TrackerReading, TrackerError> {
        let entry = find_entry(&self.dataset, depth.timestamp_s).ok_or_else(|| {
            TrackerError::InvalidFrame(format!("no recorded pose at {:.3}s", depth.timestamp_s))
        })?;
        self.pose = entry.reading.pose;
        Ok(entry.reading)
    }

    fn update_with_motion(&mut self, _motion: &MotionUpdate) {
        self.motion_updates += 1;
    }

    fn set_initial_pose(&mut self, pose: SE3) {
        self.pose = pose;
    }

    fn last_pose(&self) -> SE3 {
        self.pose
    }

    fn reset(&mut self) {
        debug!("playback tracker reset after {} motion updates", self.motion_updates);
        self.pose = SE3::identity();
        self.motion_updates = 0;
    }
}

/// Finds the placement once gravity is known; the camera pose is the first
/// recorded pose.
pub struct PlaybackInitializer {
    dataset: Arc<ReplayDataset>,
    volume: VolumeSpec,
    has_pose: bool,
}

impl PlaybackInitializer {
    pub fn new(dataset: Arc<ReplayDataset>, volume: VolumeSpec) -> Self {
        Self {
            dataset,
            volume,
            has_pose: false,
        }
    }

    pub fn volume(&self) -> VolumeSpec {
        self.volume
    }
}

impl PoseInitializer for PlaybackInitializer {
    fn update_with_gravity(
        &mut self,
        gravity: &Vector3<f64>,
        depth: &DepthFrame,
    ) -> Result<(), TrackerError> {
        if depth.depth_m.iter().all(|d| !d.is_finite() || *d <= 0.0) {
            self.has_pose = false;
            return Err(TrackerError::InvalidFrame("depth frame has no valid pixels".into()));
        }
        self.has_pose = !self.dataset.is_empty() && gravity.norm() > 0.0;
        Ok(())
    }

    fn has_valid_pose(&self) -> bool {
        self.has_pose
    }

    fn camera_pose(&self) -> SE3 {
        self.dataset
            .entries
            .first()
            .map_or_else(SE3::identity, |e| e.reading.pose)
    }

    fn has_support_plane(&self) -> bool {
        self.has_pose
    }

    fn set_volume_size(&mut self, volume: &VolumeSpec) {
        self.volume = *volume;
    }
}
