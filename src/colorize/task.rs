//! Colorize task types and the colorizer contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::config::ColorizerQuality;
use crate::keyframes::Keyframe;
use crate::mapping::Mesh;

/// Share of the overall progress bar taken by the preview phase.
const PREVIEW_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorizePhase {
    /// Fast per-vertex colouring.
    Preview,
    /// Slow texture-mapped colouring.
    Enhanced,
}

impl ColorizePhase {
    pub fn mode(self) -> ColorizeMode {
        match self {
            Self::Preview => ColorizeMode::PerVertex,
            Self::Enhanced => ColorizeMode::TextureMap,
        }
    }

    /// Map phase progress in [0, 1] to the overall percentage: preview covers
    /// 0..=20, enhanced 20..=100.
    pub fn overall_percent(self, progress: f64) -> u8 {
        let p = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        let percent = match self {
            Self::Preview => p * PREVIEW_PERCENT,
            Self::Enhanced => PREVIEW_PERCENT + p * (100.0 - PREVIEW_PERCENT),
        };
        percent.round() as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorizeMode {
    PerVertex,
    TextureMap,
}

/// Identifies one colorize task. Ids are never reused within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Cooperative cancellation flag shared between the session and a task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Colorizer tuning forwarded with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorizeSettings {
    pub quality: ColorizerQuality,
    pub target_num_faces: usize,
    pub prioritize_first_frame_color: bool,
    pub high_res_color: bool,
}

#[derive(Debug, Clone)]
pub struct ColorizeRequest {
    pub task: TaskId,
    pub phase: ColorizePhase,
    pub mesh: Mesh,
    pub keyframes: Vec<Keyframe>,
    pub settings: ColorizeSettings,
    pub cancel: CancelToken,
}

impl ColorizeRequest {
    pub fn mode(&self) -> ColorizeMode {
        self.phase.mode()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorizeError {
    #[error("a colorize task is already running")]
    Busy,
    #[error("enhanced colorizing needs a completed preview")]
    PreviewNotApplied,
    #[error("no keyframes to colorize with")]
    NoKeyframes,
    #[error("colorizer failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum ColorizeOutcome {
    Completed(Mesh),
    Failed(ColorizeError),
    Cancelled,
}

/// Progress and completion reported by a colorizer, marshalled to the
/// session thread.
#[derive(Debug, Clone)]
pub enum ColorizeEvent {
    Progress {
        task: TaskId,
        phase: ColorizePhase,
        progress: f64,
    },
    Finished {
        task: TaskId,
        phase: ColorizePhase,
        outcome: ColorizeOutcome,
    },
}

/// Receiver of colorize reports. Called from colorizer threads.
pub trait ColorizeListener: Send + Sync {
    fn on_progress(&self, task: TaskId, phase: ColorizePhase, progress: f64);
    fn on_finished(&self, task: TaskId, phase: ColorizePhase, outcome: ColorizeOutcome);
}

/// External mesh colorizer.
///
/// `start` returns immediately; the work runs elsewhere and reports through
/// the listener exactly once via `on_finished`, unless starting failed.
pub trait Colorizer: Send {
    fn start(
        &mut self,
        request: ColorizeRequest,
        listener: Arc<dyn ColorizeListener>,
    ) -> Result<(), ColorizeError>;
}
