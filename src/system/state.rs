//! Scanning session states.

/// Exactly one state is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Placing the scanning volume over the object.
    #[default]
    CubePlacement,
    /// Tracking and fusing frames.
    Scanning,
    /// Inspecting (and colorizing) the finished mesh.
    Viewing,
}

impl SessionState {
    /// Whether the sensor has to stream in this state.
    pub fn needs_sensor(self) -> bool {
        matches!(self, Self::CubePlacement | Self::Scanning)
    }
}
