//! Read-only view of the session shared with other threads.
//!
//! Only the session thread writes the snapshot; renderers and the UI clone
//! it whenever they need it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::Vector3;
use parking_lot::RwLock;

use crate::mapping::{Mesh, VolumeSpec};

use super::state::SessionState;

/// Counters kept by the session thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_received: usize,
    pub frames_tracked: usize,
    pub tracking_errors: usize,
    pub keyframes_admitted: usize,
    pub scans_completed: usize,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub volume: VolumeSpec,
    pub mesh: Option<Mesh>,
    pub mesh_center: Vector3<f64>,
    pub mesh_alpha: f32,
    pub advisory: Option<String>,
    pub colorize_percent: Option<u8>,
    pub scan_available: bool,
    pub status_message: Option<&'static str>,
    /// Keep the device awake (sensor streaming and needed).
    pub keep_awake: bool,
    pub memory_warning_active: bool,
    pub keyframe_count: usize,
    pub stats: SessionStats,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        let volume = VolumeSpec::default();
        Self {
            state: SessionState::CubePlacement,
            volume,
            mesh: None,
            mesh_center: volume.center(),
            mesh_alpha: 0.8,
            advisory: None,
            colorize_percent: None,
            scan_available: false,
            status_message: None,
            keep_awake: false,
            memory_warning_active: false,
            keyframe_count: 0,
            stats: SessionStats::default(),
        }
    }
}

pub struct SharedState {
    snapshot: RwLock<SessionSnapshot>,

    /// Request the session thread to exit.
    shutdown_requested: AtomicBool,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    pub fn publish(&self, snapshot: SessionSnapshot) {
        *self.snapshot.write() = snapshot;
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            snapshot: RwLock::new(SessionSnapshot::default()),
            shutdown_requested: AtomicBool::new(false),
        }
    }
}
