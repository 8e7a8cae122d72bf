//! Dataset loading.

pub mod replay;

pub use replay::{ReplayDataset, ReplayEntry};
