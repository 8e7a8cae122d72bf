//! External collaborators of the session and how they are built.

use anyhow::Result;

use crate::colorize::Colorizer;
use crate::config::DynamicOptions;
use crate::keyframes::{KeyframeManager, KeyframeManagerOptions};
use crate::mapping::{SceneStore, VolumeMapper, VolumeSpec};
use crate::sensor::{DepthFrame, SensorControl};
use crate::tracking::{PoseInitializer, PoseTracker};

/// Handles of the reconstruction engine. Built together, dropped together;
/// the session holds `Option<SlamComponents>` and `None` means uninitialized.
pub struct SlamComponents {
    pub tracker: Box<dyn PoseTracker>,
    pub initializer: Box<dyn PoseInitializer>,
    pub mapper: Box<dyn VolumeMapper>,
    pub scene: Box<dyn SceneStore>,
    pub keyframes: Box<dyn KeyframeManager>,
}

/// Builds the SLAM components for the current options.
pub trait SlamFactory: Send {
    fn build(
        &mut self,
        dynamic: &DynamicOptions,
        volume: &VolumeSpec,
        keyframes: &KeyframeManagerOptions,
    ) -> Result<SlamComponents>;
}

/// Synchronous cube-placement rendering hooks.
pub trait PlacementPreview: Send {
    fn set_volume_size(&mut self, volume: &VolumeSpec);
    fn set_depth_frame(&mut self, depth: &DepthFrame);
    fn set_has_support_plane(&mut self, has_support_plane: bool);
}

/// Everything the session talks to besides its own state.
pub struct Collaborators {
    pub factory: Box<dyn SlamFactory>,
    pub sensor: Box<dyn SensorControl>,
    pub colorizer: Box<dyn Colorizer>,
    pub preview: Box<dyn PlacementPreview>,
}
