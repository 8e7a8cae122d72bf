use nalgebra::{UnitQuaternion, Vector3};

use super::sample::{GyroBias, ImuSample, MotionUpdate};

/// Integrates gyroscope samples into relative rotations.
///
/// Each sample is integrated against the previous one with the midpoint
/// rule; the first sample after a reset produces an identity delta.
pub struct GyroIntegrator {
    pub bias: GyroBias,
    attitude: UnitQuaternion<f64>,
    last: Option<ImuSample>,
}

impl GyroIntegrator {
    pub fn new(bias: GyroBias) -> Self {
        Self {
            bias,
            attitude: UnitQuaternion::identity(),
            last: None,
        }
    }

    pub fn reset(&mut self) {
        self.attitude = UnitQuaternion::identity();
        self.last = None;
    }

    /// Integrate one sample and build the update to forward.
    pub fn integrate(&mut self, curr: ImuSample) -> MotionUpdate {
        let rate_curr = curr.gyro - self.bias.gyro;
        let mut delta_rotation = UnitQuaternion::identity();
        let mut rotation_rate = rate_curr;

        if let Some(prev) = self.last {
            let dt = curr.timestamp_s - prev.timestamp_s;
            // Out-of-order or duplicated samples only refresh gravity.
            if dt > 0.0 {
                let rate_prev = prev.gyro - self.bias.gyro;
                let omega: Vector3<f64> = 0.5 * (rate_prev + rate_curr);
                delta_rotation = UnitQuaternion::from_scaled_axis(omega * dt);
                self.attitude *= delta_rotation;
                rotation_rate = omega;
            }
        }
        self.last = Some(curr);

        MotionUpdate {
            timestamp_s: curr.timestamp_s,
            gravity: curr.gravity,
            rotation_rate,
            delta_rotation,
            attitude: self.attitude,
        }
    }

    pub fn attitude(&self) -> UnitQuaternion<f64> {
        self.attitude
    }
}

impl Default for GyroIntegrator {
    fn default() -> Self {
        Self::new(GyroBias::zero())
    }
}
