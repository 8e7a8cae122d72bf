//! Contracts of the external pose estimation components.

use nalgebra::Vector3;

use crate::geometry::SE3;
use crate::imu::MotionUpdate;
use crate::mapping::VolumeSpec;
use crate::sensor::{ColorFrame, DepthFrame};

use super::result::{TrackerError, TrackerReading};

/// Camera pose tracker of the reconstruction engine.
pub trait PoseTracker: Send {
    /// Estimate the pose of a new frame.
    fn update_pose(
        &mut self,
        depth: &DepthFrame,
        color: Option<&ColorFrame>,
    ) -> Result<TrackerReading, TrackerError>;

    /// Feed device motion; makes tracking more robust to fast moves.
    fn update_with_motion(&mut self, motion: &MotionUpdate);

    /// Seed the tracker before the first scanning frame.
    fn set_initial_pose(&mut self, pose: SE3);

    /// Pose of the last tracked frame.
    fn last_pose(&self) -> SE3;

    fn reset(&mut self);
}

/// Estimates where the scanning volume sits before scanning starts.
pub trait PoseInitializer: Send {
    fn update_with_gravity(
        &mut self,
        gravity: &Vector3<f64>,
        depth: &DepthFrame,
    ) -> Result<(), TrackerError>;

    fn has_valid_pose(&self) -> bool;

    /// Initial camera pose relative to the volume.
    fn camera_pose(&self) -> SE3;

    /// Whether a support plane (table top) was found under the volume.
    fn has_support_plane(&self) -> bool;

    fn set_volume_size(&mut self, volume: &VolumeSpec);
}
