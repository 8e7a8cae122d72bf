//! SE3: 6-DOF rigid transformation (rotation + translation).
//!
//! Poses exchanged with the reconstruction engine are 4x4 homogeneous
//! matrices; internally they are kept as a unit quaternion plus a translation
//! so that deltas and compositions stay well conditioned.

use nalgebra::{Isometry3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Rigid transformation. Transforms points as: p' = R * p + t
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    /// Identity transformation.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Construct from quaternion (w, x, y, z) and translation.
    ///
    /// The quaternion is normalized, so recorded values with limited
    /// precision are accepted.
    pub fn from_quaternion(qw: f64, qx: f64, qy: f64, qz: f64, translation: Vector3<f64>) -> Self {
        let rotation = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(qw, qx, qy, qz));
        Self {
            rotation,
            translation,
        }
    }

    /// Construct from a homogeneous 4x4 matrix of form [R | t; 0 | 1].
    pub fn from_matrix(mat: &Matrix4<f64>) -> Self {
        let r_block = mat.fixed_view::<3, 3>(0, 0).into_owned();
        let translation = Vector3::new(mat[(0, 3)], mat[(1, 3)], mat[(2, 3)]);
        let rot3 = Rotation3::from_matrix_unchecked(r_block);
        Self {
            rotation: UnitQuaternion::from_rotation_matrix(&rot3),
            translation,
        }
    }

    /// Convert to a homogeneous 4x4 matrix.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation).to_homogeneous()
    }

    /// Compose: `self * other` (apply `other` first).
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.translation + self.rotation * other.translation,
        }
    }

    pub fn inverse(&self) -> SE3 {
        let rotation = self.rotation.inverse();
        SE3 {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation * p + self.translation
    }

    /// Rotation angle (radians) of the relative rotation between two poses.
    pub fn rotation_angle_to(&self, other: &SE3) -> f64 {
        (self.rotation.inverse() * other.rotation).angle()
    }

    /// Euclidean distance between the two translations.
    pub fn translation_distance_to(&self, other: &SE3) -> f64 {
        (other.translation - self.translation).norm()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.coords.iter().all(|c| c.is_finite())
            && self.translation.iter().all(|c| c.is_finite())
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Angle of the rotation between two poses, in degrees.
///
/// Only the rotation part is considered; translations are ignored.
pub fn delta_rotation_deg(previous: &SE3, current: &SE3) -> f64 {
    previous.rotation_angle_to(current).to_degrees()
}
