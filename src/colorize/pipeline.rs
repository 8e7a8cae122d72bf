//! Two-phase colorize pipeline.
//!
//! Preview (per-vertex) runs first; its completion unlocks the enhanced
//! (texture map) phase. At most one task runs at a time, and every report is
//! matched against the active task id so late reports from cancelled or
//! superseded tasks are dropped.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::keyframes::Keyframe;
use crate::mapping::Mesh;

use super::task::{
    CancelToken, ColorizeError, ColorizeListener, ColorizeOutcome, ColorizePhase,
    ColorizeRequest, ColorizeSettings, Colorizer, TaskId,
};

#[derive(Debug, Clone)]
struct ActiveTask {
    id: TaskId,
    cancel: CancelToken,
}

/// What the session has to do after a task finished.
#[derive(Debug, Clone)]
pub enum PipelineEffect {
    /// Preview done: swap the mesh in and continue with the enhanced phase.
    PreviewReady(Mesh),
    /// Enhanced done: swap the mesh in; keyframes are no longer needed.
    FinalReady(Mesh),
    Failed(ColorizePhase, ColorizeError),
    /// Stale, cancelled or unknown task.
    Ignored,
}

#[derive(Debug, Default)]
pub struct ColorizePipeline {
    next_id: u64,
    preview: Option<ActiveTask>,
    enhanced: Option<ActiveTask>,
    preview_completed: bool,
}

impl ColorizePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.preview.is_none() && self.enhanced.is_none()
    }

    pub fn is_active(&self, phase: ColorizePhase) -> bool {
        self.slot(phase).is_some()
    }

    pub fn preview_completed(&self) -> bool {
        self.preview_completed
    }

    /// Launch a task for `phase`. Rejected while any phase is active, and for
    /// the enhanced phase until a preview completion has been applied.
    pub fn start(
        &mut self,
        phase: ColorizePhase,
        mesh: Mesh,
        keyframes: Vec<Keyframe>,
        settings: ColorizeSettings,
        colorizer: &mut dyn Colorizer,
        listener: Arc<dyn ColorizeListener>,
    ) -> Result<TaskId, ColorizeError> {
        if !self.is_idle() {
            return Err(ColorizeError::Busy);
        }
        match phase {
            ColorizePhase::Preview => self.preview_completed = false,
            ColorizePhase::Enhanced if !self.preview_completed => {
                return Err(ColorizeError::PreviewNotApplied);
            }
            ColorizePhase::Enhanced => {}
        }
        if keyframes.is_empty() {
            return Err(ColorizeError::NoKeyframes);
        }

        self.next_id += 1;
        let id = TaskId(self.next_id);
        let cancel = CancelToken::new();
        let request = ColorizeRequest {
            task: id,
            phase,
            mesh,
            keyframes,
            settings,
            cancel: cancel.clone(),
        };

        colorizer.start(request, listener).inspect_err(|e| {
            error!("failed to start {:?} colorizing: {}", phase, e);
        })?;

        info!("{:?} colorizing started as task {}", phase, id.0);
        *self.slot_mut(phase) = Some(ActiveTask { id, cancel });
        Ok(id)
    }

    /// Overall percentage for a progress report, or `None` if the report is
    /// stale.
    pub fn on_progress(&self, task: TaskId, phase: ColorizePhase, progress: f64) -> Option<u8> {
        let active = self.slot(phase)?;
        if active.id != task || active.cancel.is_cancelled() {
            return None;
        }
        Some(phase.overall_percent(progress))
    }

    pub fn on_finished(
        &mut self,
        task: TaskId,
        phase: ColorizePhase,
        outcome: ColorizeOutcome,
    ) -> PipelineEffect {
        let matches = self
            .slot(phase)
            .is_some_and(|a| a.id == task && !a.cancel.is_cancelled());
        if !matches {
            debug!("ignoring report of stale {:?} task {}", phase, task.0);
            return PipelineEffect::Ignored;
        }
        *self.slot_mut(phase) = None;

        match (phase, outcome) {
            (ColorizePhase::Preview, ColorizeOutcome::Completed(mesh)) => {
                self.preview_completed = true;
                PipelineEffect::PreviewReady(mesh)
            }
            (ColorizePhase::Enhanced, ColorizeOutcome::Completed(mesh)) => {
                PipelineEffect::FinalReady(mesh)
            }
            (_, ColorizeOutcome::Failed(e)) => {
                error!("{:?} colorizing failed: {}", phase, e);
                PipelineEffect::Failed(phase, e)
            }
            (_, ColorizeOutcome::Cancelled) => PipelineEffect::Ignored,
        }
    }

    /// Cancel the task of `phase`, if any. Returns whether one was running.
    pub fn cancel(&mut self, phase: ColorizePhase) -> bool {
        match self.slot_mut(phase).take() {
            Some(active) => {
                active.cancel.cancel();
                info!("{:?} colorizing task {} cancelled", phase, active.id.0);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.cancel(ColorizePhase::Preview);
        self.cancel(ColorizePhase::Enhanced);
    }

    /// Cancel everything and forget the preview completion.
    pub fn reset(&mut self) {
        self.cancel_all();
        self.preview_completed = false;
    }

    fn slot(&self, phase: ColorizePhase) -> Option<&ActiveTask> {
        match phase {
            ColorizePhase::Preview => self.preview.as_ref(),
            ColorizePhase::Enhanced => self.enhanced.as_ref(),
        }
    }

    fn slot_mut(&mut self, phase: ColorizePhase) -> &mut Option<ActiveTask> {
        match phase {
            ColorizePhase::Preview => &mut self.preview,
            ColorizePhase::Enhanced => &mut self.enhanced,
        }
    }
}
