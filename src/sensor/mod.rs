//! Sensor-side types: frames delivered by the depth/colour sensor, lifecycle
//! events, and the control surface used to start and stop streaming.
//!
//! The session never talks to hardware directly. A driver implements
//! [`SensorControl`] and pushes frames and events into a
//! [`FrameSourceListener`] (normally a `SessionHandle`).

use std::sync::Arc;

use thiserror::Error;

use crate::geometry::SE3;

/// Depth image in metres, row-major.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// Capture time in seconds (sensor clock).
    pub timestamp_s: f64,
    pub width: u32,
    pub height: u32,
    pub depth_m: Arc<[f32]>,
    /// Pose of the colour camera expressed in the depth camera frame.
    pub color_camera_pose_in_depth: SE3,
}

/// Colour image, packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub timestamp_s: f64,
    pub width: u32,
    pub height: u32,
    pub rgb: Arc<[u8]>,
}

/// Depth frame with its synchronized colour frame, if any.
#[derive(Debug, Clone)]
pub struct FrameBundle {
    pub depth: DepthFrame,
    pub color: Option<ColorFrame>,
}

impl FrameBundle {
    pub fn timestamp_s(&self) -> f64 {
        self.depth.timestamp_s
    }
}

/// Why the sensor stopped streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    AppWillResignActive,
    Unknown,
}

/// Lifecycle events reported by the sensor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    Connected,
    Disconnected,
    BatteryNeedsCharging,
    LeftLowPowerMode,
    StreamingStopped(StopReason),
}

/// Calibration between the depth sensor and the colour camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationType {
    None,
    Approximate,
    DeviceSpecific,
}

impl CalibrationType {
    /// Colour can only be used when depth and colour are calibrated.
    pub fn supports_color(self) -> bool {
        matches!(self, Self::Approximate | Self::DeviceSpecific)
    }
}

/// Streaming configuration requested by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Synchronize depth with the colour camera.
    pub sync_color: bool,
    /// Depth registered to the colour viewpoint.
    pub registered_depth: bool,
    pub high_res_color: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("no sensor found")]
    NotFound,
    #[error("failed to open sensor")]
    OpenFailed,
    #[error("sensor is still waking up")]
    WakingUp,
    #[error("failed to start streaming: {0}")]
    StreamStart(String),
}

/// Control surface of the sensor driver.
pub trait SensorControl: Send {
    /// Try to connect. Returns the calibration of the connected sensor.
    fn initialize_connection(&mut self) -> Result<CalibrationType, SensorError>;

    fn is_connected_and_charged(&self) -> bool;

    fn supports_high_res_color(&self) -> bool;

    fn start_streaming(&mut self, config: StreamConfig) -> Result<(), SensorError>;

    /// Stop depth and colour streaming.
    fn stop_streaming(&mut self);

    /// Lock colour exposure/white balance (used while scanning).
    fn set_color_exposure_locked(&mut self, locked: bool);

    /// Refine a depth frame in place with the driver's slow correction.
    /// Returns `false` when the device cannot do it (old firmware).
    fn apply_depth_correction(&mut self, depth: &mut DepthFrame) -> bool;
}

/// Receiver of everything a frame source produces.
pub trait FrameSourceListener: Send + Sync {
    fn on_frame(&self, frame: FrameBundle);
    fn on_sensor_event(&self, event: SensorEvent);
}
