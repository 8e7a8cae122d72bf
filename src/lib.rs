pub mod colorize;
pub mod config;
pub mod geometry;
pub mod imu;
pub mod io;
pub mod keyframes;
pub mod mapping;
pub mod playback;
pub mod sensor;
pub mod system;
pub mod tracking;
