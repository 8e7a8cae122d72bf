//! Threaded colorizer that simulates work in fixed steps.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::colorize::{
    ColorizeListener, ColorizeMode, ColorizeOutcome, ColorizeRequest, Colorizer, ColorizeError,
};
use crate::mapping::MeshColoring;

const NUM_STEPS: usize = 10;

pub struct SimulatedColorizer {
    step_delay: Duration,
}

impl SimulatedColorizer {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Colorizer for SimulatedColorizer {
    fn start(
        &mut self,
        request: ColorizeRequest,
        listener: Arc<dyn ColorizeListener>,
    ) -> Result<(), ColorizeError> {
        if request.keyframes.is_empty() {
            return Err(ColorizeError::NoKeyframes);
        }
        let delay = self.step_delay;
        thread::Builder::new()
            .name(format!("colorize-{}", request.task.0))
            .spawn(move || run(request, listener, delay))
            .map_err(|e| ColorizeError::Failed(e.to_string()))?;
        Ok(())
    }
}

fn run(request: ColorizeRequest, listener: Arc<dyn ColorizeListener>, delay: Duration) {
    let ColorizeRequest {
        task,
        phase,
        mesh,
        keyframes,
        settings,
        cancel,
    } = request;
    info!(
        "{:?} colorizing {} vertices with {} keyframes ({:?})",
        phase,
        mesh.num_vertices(),
        keyframes.len(),
        settings.quality
    );

    for step in 1..=NUM_STEPS {
        if cancel.is_cancelled() {
            debug!("colorize task {} cancelled at step {}", task.0, step);
            listener.on_finished(task, phase, ColorizeOutcome::Cancelled);
            return;
        }
        thread::sleep(delay);
        listener.on_progress(task, phase, step as f64 / NUM_STEPS as f64);
    }

    let coloring = match phase.mode() {
        ColorizeMode::PerVertex => MeshColoring::PerVertex,
        ColorizeMode::TextureMap => MeshColoring::Textured,
    };
    listener.on_finished(task, phase, ColorizeOutcome::Completed(mesh.with_coloring(coloring)));
}
