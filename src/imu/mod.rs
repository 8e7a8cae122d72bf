//! Device motion: sample types, gyro integration and the serial IMU queue.

pub mod preintegration;
pub mod queue;
pub mod sample;

pub use preintegration::GyroIntegrator;
pub use queue::{ImuQueue, MotionSink};
pub use sample::{GyroBias, ImuSample, MotionUpdate};
