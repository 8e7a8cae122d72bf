//! Stand-ins for the sensor hardware and the placement renderer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::geometry::SE3;
use crate::io::ReplayEntry;
use crate::mapping::VolumeSpec;
use crate::sensor::{
    CalibrationType, ColorFrame, DepthFrame, FrameBundle, SensorControl, SensorError,
    StreamConfig,
};
use crate::system::PlacementPreview;

/// Distance of the synthetic depth surface from the camera.
const SYNTHETIC_DEPTH_M: f32 = 0.5;

/// Depth/colour pair for a recorded entry: a flat surface at a fixed
/// distance, coloured by time.
pub fn synthetic_frame(entry: &ReplayEntry, width: u32, height: u32) -> FrameBundle {
    let n = (width * height) as usize;
    let shade = ((entry.timestamp_s * 50.0) as u64 % 256) as u8;
    FrameBundle {
        depth: DepthFrame {
            timestamp_s: entry.timestamp_s,
            width,
            height,
            depth_m: Arc::from(vec![SYNTHETIC_DEPTH_M; n]),
            color_camera_pose_in_depth: SE3::identity(),
        },
        color: Some(ColorFrame {
            timestamp_s: entry.timestamp_s,
            width,
            height,
            rgb: Arc::from(vec![shade; n * 3]),
        }),
    }
}

/// Always-present sensor with a device-specific calibration.
pub struct PlaybackSensor {
    streaming: Option<StreamConfig>,
    exposure_locked: bool,
}

impl PlaybackSensor {
    pub fn new() -> Self {
        Self {
            streaming: None,
            exposure_locked: false,
        }
    }
}

impl Default for PlaybackSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorControl for PlaybackSensor {
    fn initialize_connection(&mut self) -> Result<CalibrationType, SensorError> {
        Ok(CalibrationType::DeviceSpecific)
    }

    fn is_connected_and_charged(&self) -> bool {
        true
    }

    fn supports_high_res_color(&self) -> bool {
        false
    }

    fn start_streaming(&mut self, config: StreamConfig) -> Result<(), SensorError> {
        info!("playback sensor streaming {:?}", config);
        self.streaming = Some(config);
        Ok(())
    }

    fn stop_streaming(&mut self) {
        if self.streaming.take().is_some() {
            info!("playback sensor stopped");
        }
    }

    fn set_color_exposure_locked(&mut self, locked: bool) {
        if self.exposure_locked != locked {
            debug!("colour exposure locked: {}", locked);
        }
        self.exposure_locked = locked;
    }

    fn apply_depth_correction(&mut self, _depth: &mut DepthFrame) -> bool {
        // Synthetic depth is already exact.
        true
    }
}

#[derive(Default)]
pub struct LoggingPreview {
    frames: usize,
}

impl PlacementPreview for LoggingPreview {
    fn set_volume_size(&mut self, volume: &VolumeSpec) {
        let size = volume.size();
        info!("volume {:.2} x {:.2} x {:.2} m", size.x, size.y, size.z);
    }

    fn set_depth_frame(&mut self, depth: &DepthFrame) {
        self.frames += 1;
        debug!("placement frame {} at {:.3}s", self.frames, depth.timestamp_s);
    }

    fn set_has_support_plane(&mut self, _has_support_plane: bool) {}
}
