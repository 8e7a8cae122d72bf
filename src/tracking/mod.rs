//! Tracking side of the session: the tracker contracts, per-frame readings
//! and the keyframe admission policy.
//!
//! The tracker itself is external. What lives here:
//! - `PoseTracker` / `PoseInitializer` traits
//! - `TrackerReading` and the advisory texts derived from it
//! - `KeyframeSelector`, which decides which frames become keyframes

pub mod keyframe_decision;
pub mod result;
pub mod tracker;

pub use keyframe_decision::{
    KeyframeCandidate, KeyframeDecision, KeyframeSelector, KeyframeSelectorConfig,
};
pub use result::{Advisory, PoseAccuracy, TrackerError, TrackerHints, TrackerReading};
pub use tracker::{PoseInitializer, PoseTracker};
