//! Session orchestration and thread management.
//!
//! This module contains the `ScanSystem` that spawns the session thread and
//! the IMU worker, the `ScanSession` state machine itself, the shared
//! snapshot, and the command/event types exchanged with the outside world.

pub mod backend;
pub mod messages;
mod scan_system;
pub mod session;
pub mod shared_state;
pub mod state;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{Collaborators, PlacementPreview, SlamComponents, SlamFactory};
pub use messages::{SessionCommand, SessionEvent};
pub use scan_system::{ScanSystem, SessionHandle};
pub use session::ScanSession;
pub use shared_state::{SessionSnapshot, SessionStats, SharedState};
pub use state::SessionState;
pub use status::{AppStatus, SensorStatus};
