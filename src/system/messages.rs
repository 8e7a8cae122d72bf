//! Inter-thread message types.
//!
//! Everything that reaches the session thread is a `SessionCommand`;
//! everything the session tells the outside world is a `SessionEvent`.

use crossbeam_channel::Sender;
use nalgebra::Vector3;

use crate::colorize::ColorizeEvent;
use crate::config::DynamicOptions;
use crate::imu::MotionUpdate;
use crate::mapping::{Mesh, VolumeSpec};
use crate::sensor::{FrameBundle, SensorEvent};

use super::state::SessionState;

/// Work item for the session thread. Processed strictly in arrival order.
pub enum SessionCommand {
    Frame(FrameBundle),
    Motion(MotionUpdate),
    Sensor(SensorEvent),
    Colorize(ColorizeEvent),

    StartScanning,
    FinishScanning,
    Reset,
    PinchBegan(f64),
    PinchChanged(f64),
    ApplyOptions(DynamicOptions),
    MemoryPressure,
    AcknowledgeMemoryWarning,
    AppBecameActive,
    /// Start colorizing the viewed mesh. The reply tells whether it started.
    RequestColorize { reply: Option<Sender<bool>> },
    DismissViewer,

    /// Leave the session loop.
    Shutdown,
}

/// Notification published by the session thread.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// Advisory text over the live view; `None` hides it.
    Advisory(Option<String>),
    /// Whether the placement is good enough to start scanning.
    ScanAvailable(bool),
    VolumeChanged(VolumeSpec),
    /// Overall colorize progress in percent.
    ColorizeProgress(u8),
    ColorizeProgressHidden,
    /// Displayed mesh changed; `None` clears it.
    MeshChanged {
        mesh: Option<Mesh>,
        center: Vector3<f64>,
    },
    /// One-shot low-memory alert.
    MemoryWarning(&'static str),
    /// Status overlay text; `None` hides it.
    StatusMessage(Option<&'static str>),
}
