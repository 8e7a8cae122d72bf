//! Background mesh colorizing.

pub mod pipeline;
pub mod task;

pub use pipeline::{ColorizePipeline, PipelineEffect};
pub use task::{
    CancelToken, ColorizeError, ColorizeEvent, ColorizeListener, ColorizeMode, ColorizeOutcome,
    ColorizePhase, ColorizeRequest, ColorizeSettings, Colorizer, TaskId,
};
