//! Sensor status shown to the user.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorStatus {
    #[default]
    Ok,
    NeedsUserToConnect,
    NeedsUserToCharge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppStatus {
    pub sensor_status: SensorStatus,
    /// Set while viewing a mesh; no status overlay then.
    pub status_messages_disabled: bool,
}

impl AppStatus {
    /// Text of the status overlay, if one should be shown.
    pub fn message(&self) -> Option<&'static str> {
        if self.status_messages_disabled {
            return None;
        }
        match self.sensor_status {
            SensorStatus::Ok => None,
            SensorStatus::NeedsUserToConnect => Some("Please connect Structure Sensor."),
            SensorStatus::NeedsUserToCharge => Some("Please charge Structure Sensor."),
        }
    }
}
