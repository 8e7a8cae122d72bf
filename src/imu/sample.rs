use nalgebra::{UnitQuaternion, Vector3};

/// Raw device-motion sample.
#[derive(Debug, Clone, Copy)]
pub struct ImuSample {
    pub timestamp_s: f64,
    /// Angular rate (rad/s), device frame.
    pub gyro: Vector3<f64>,
    /// User acceleration (m/s^2), device frame.
    pub accel: Vector3<f64>,
    /// Gravity direction estimated by the device, in units of g.
    pub gravity: Vector3<f64>,
}

/// Gyroscope bias.
#[derive(Debug, Clone, Copy)]
pub struct GyroBias {
    pub gyro: Vector3<f64>,
}

impl GyroBias {
    pub fn zero() -> Self {
        Self {
            gyro: Vector3::zeros(),
        }
    }
}

/// Motion information forwarded to the session after integration.
#[derive(Debug, Clone, Copy)]
pub struct MotionUpdate {
    pub timestamp_s: f64,
    pub gravity: Vector3<f64>,
    /// Bias-corrected angular rate (rad/s).
    pub rotation_rate: Vector3<f64>,
    /// Rotation since the previous sample.
    pub delta_rotation: UnitQuaternion<f64>,
    /// Rotation accumulated since the integrator was last reset.
    pub attitude: UnitQuaternion<f64>,
}
