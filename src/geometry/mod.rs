//! Geometry utilities: rigid transforms.

pub mod se3;

pub use se3::{SE3, delta_rotation_deg};
