//! Keyframes retained for colorizing.

pub mod manager;
pub mod store;

pub use manager::{Keyframe, KeyframeManager, KeyframeManagerOptions};
pub use store::KeyframeStore;
