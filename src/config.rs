//! Scanner configuration.
//!
//! `ScannerOptions` are static for the lifetime of a `ScanSystem`.
//! `DynamicOptions` are user toggles that are read when the SLAM components
//! are (re)built; changing them always goes through a full SLAM rebuild.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keyframes::KeyframeManagerOptions;

/// Quality preset forwarded to the texture-map colorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorizerQuality {
    Normal,
    #[default]
    High,
}

/// Errors reported by [`ScannerOptions::validate`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("initial volume size must be finite and positive, got {0:?}")]
    InvalidVolumeSize([f64; 3]),
    #[error("max_num_keyframes must be at least 1")]
    NoKeyframeCapacity,
    #[error("nominal frame interval must be positive, got {0}")]
    InvalidFrameInterval(f64),
    #[error("{name} must be non-negative, got {value}")]
    NegativeThreshold { name: &'static str, value: f64 },
    #[error("imu queue capacity must be at least 1")]
    NoImuQueueCapacity,
    #[error("expensive depth correction cannot be combined with registered depth")]
    CorrectionWithRegisteredDepth,
}

/// Static scanner options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerOptions {
    /// Initial scanning volume (X left-right, Y up-down, Z forward-back).
    pub init_volume_size_m: Vector3<f64>,

    /// Maximum number of keyframes kept for colorizing.
    pub max_num_keyframes: usize,

    pub colorizer_quality: ColorizerQuality,

    /// A candidate is a new keyframe if it rotated more than this from every
    /// stored keyframe...
    pub max_keyframe_rotation_rad: f64,

    /// ...or moved further than this.
    pub max_keyframe_translation_m: f64,

    /// Keyframes are only taken while the camera rotates slower than this,
    /// to avoid motion blur and rolling shutter.
    pub max_keyframe_rotation_speed_deg_per_s: f64,

    /// Nominal time between two sensor frames.
    pub nominal_frame_interval_s: f64,

    /// Use depth registered to the colour viewpoint by the sensor.
    pub use_hardware_registered_depth: bool,

    /// Per-frame depth refinement; incompatible with registered depth.
    pub apply_expensive_correction_to_depth: bool,

    /// Ask the colorizer to favour the appearance of the first keyframe.
    pub prioritize_first_frame_color: bool,

    /// Target face count of the final textured mesh.
    pub colorizer_target_num_faces: usize,

    /// Capacity of the IMU sample queue.
    pub imu_queue_capacity: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            init_volume_size_m: Vector3::new(0.5, 0.5, 0.5),
            max_num_keyframes: 48,
            colorizer_quality: ColorizerQuality::High,
            max_keyframe_rotation_rad: 20f64.to_radians(),
            max_keyframe_translation_m: 0.3,
            max_keyframe_rotation_speed_deg_per_s: 1.0,
            nominal_frame_interval_s: 1.0 / 30.0,
            use_hardware_registered_depth: false,
            apply_expensive_correction_to_depth: true,
            prioritize_first_frame_color: true,
            colorizer_target_num_faces: 30_000,
            imu_queue_capacity: 64,
        }
    }
}

impl ScannerOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open options file {}", path.display()))?;
        let options: ScannerOptions = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse options file {}", path.display()))?;
        options
            .validate()
            .with_context(|| format!("invalid options in {}", path.display()))?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = self.init_volume_size_m;
        if v.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(ConfigError::InvalidVolumeSize([v.x, v.y, v.z]));
        }
        if self.max_num_keyframes == 0 {
            return Err(ConfigError::NoKeyframeCapacity);
        }
        if !(self.nominal_frame_interval_s > 0.0) {
            return Err(ConfigError::InvalidFrameInterval(self.nominal_frame_interval_s));
        }
        for (name, value) in [
            ("max_keyframe_rotation_rad", self.max_keyframe_rotation_rad),
            ("max_keyframe_translation_m", self.max_keyframe_translation_m),
            (
                "max_keyframe_rotation_speed_deg_per_s",
                self.max_keyframe_rotation_speed_deg_per_s,
            ),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeThreshold { name, value });
            }
        }
        if self.imu_queue_capacity == 0 {
            return Err(ConfigError::NoImuQueueCapacity);
        }
        if self.apply_expensive_correction_to_depth && self.use_hardware_registered_depth {
            return Err(ConfigError::CorrectionWithRegisteredDepth);
        }
        Ok(())
    }

    pub fn keyframe_manager_options(&self) -> KeyframeManagerOptions {
        KeyframeManagerOptions {
            max_size: self.max_num_keyframes,
            max_delta_rotation_rad: self.max_keyframe_rotation_rad,
            max_delta_translation_m: self.max_keyframe_translation_m,
        }
    }
}

/// Toggles read at SLAM (re)initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicOptions {
    /// Depth+colour tracker when on, depth-only tracker when off.
    pub new_tracker_is_on: bool,
    pub new_tracker_switch_enabled: bool,

    pub high_res_coloring: bool,
    pub high_res_coloring_switch_enabled: bool,

    /// New mapper when on, legacy mapper when off.
    pub new_mapper_is_on: bool,
    pub new_mapper_switch_enabled: bool,

    pub high_res_mapping: bool,
    pub high_res_mapping_switch_enabled: bool,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            new_tracker_is_on: true,
            new_tracker_switch_enabled: true,
            high_res_coloring: false,
            high_res_coloring_switch_enabled: false,
            new_mapper_is_on: true,
            new_mapper_switch_enabled: true,
            high_res_mapping: true,
            high_res_mapping_switch_enabled: true,
        }
    }
}

impl DynamicOptions {
    /// Adjust the toggles to what the connected sensor can do.
    ///
    /// User choices are left alone whenever the hardware supports them.
    pub fn adapt_to_sensor(&mut self, use_color_camera: bool, high_res_color_supported: bool) {
        if use_color_camera {
            self.new_tracker_switch_enabled = true;
            self.high_res_coloring_switch_enabled = high_res_color_supported;
            if !high_res_color_supported {
                self.high_res_coloring = false;
            }
        } else {
            self.new_tracker_switch_enabled = false;
            self.new_tracker_is_on = false;
            self.high_res_coloring = false;
            self.high_res_coloring_switch_enabled = false;
        }
        self.new_mapper_switch_enabled = true;
        self.high_res_mapping_switch_enabled = true;
    }
}
