//! Replay implementations of every external collaborator, used by the
//! binary to drive a full session without hardware.

pub mod colorizer;
pub mod device;
pub mod factory;
pub mod mapper;
pub mod tracker;

pub use colorizer::SimulatedColorizer;
pub use device::{LoggingPreview, PlaybackSensor, synthetic_frame};
pub use factory::PlaybackFactory;
pub use mapper::{PlaybackScene, PointCloudMapper, SharedScene};
pub use tracker::{PlaybackInitializer, PlaybackTracker};
