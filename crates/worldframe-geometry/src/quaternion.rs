//! Unit quaternions (w, x, y, z convention).

use serde::{Deserialize, Serialize};

use crate::matrix::Rotation;
use crate::vector::Vector;
use crate::{EPSILON, GeometryError, approx};

/// A quaternion; rotations are represented by unit quaternions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion when it is meant to represent a rotation.
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn from_axis_angle(axis: &Vector, angle: f64) -> Result<Self, GeometryError> {
        let k = axis.normalize()?;
        let (s, c) = (angle * 0.5).sin_cos();
        Ok(Self::new(c, k.x * s, k.y * s, k.z * s))
    }

    /// Convert a rotation matrix (Shepperd's method, picking the numerically
    /// largest pivot).
    pub fn from_rotation(rotation: &Rotation) -> Self {
        let r = &rotation.matrix().rows;
        let trace = r[0][0] + r[1][1] + r[2][2];
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(0.25 * s, (r[2][1] - r[1][2]) / s, (r[0][2] - r[2][0]) / s, (r[1][0] - r[0][1]) / s)
        } else if r[0][0] > r[1][1] && r[0][0] > r[2][2] {
            let s = (1.0 + r[0][0] - r[1][1] - r[2][2]).sqrt() * 2.0;
            Self::new((r[2][1] - r[1][2]) / s, 0.25 * s, (r[0][1] + r[1][0]) / s, (r[0][2] + r[2][0]) / s)
        } else if r[1][1] > r[2][2] {
            let s = (1.0 + r[1][1] - r[0][0] - r[2][2]).sqrt() * 2.0;
            Self::new((r[0][2] - r[2][0]) / s, (r[0][1] + r[1][0]) / s, 0.25 * s, (r[1][2] + r[2][1]) / s)
        } else {
            let s = (1.0 + r[2][2] - r[0][0] - r[1][1]).sqrt() * 2.0;
            Self::new((r[1][0] - r[0][1]) / s, (r[0][2] + r[2][0]) / s, (r[1][2] + r[2][1]) / s, 0.25 * s)
        };
        q.normalize()
    }

    pub fn to_rotation(&self) -> Rotation {
        Rotation::from_quaternion(self)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(&self, rhs: &Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scale to unit length; a zero quaternion becomes the identity.
    pub fn normalize(&self) -> Self {
        let n = self.norm();
        if n < f64::EPSILON {
            return Self::IDENTITY;
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(&self, v: &Vector) -> Vector {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(&p).mul(&self.conjugate());
        Vector::new(rotated.x, rotated.y, rotated.z)
    }

    /// Rotation axis and angle, with the angle in `[0, π]`.
    ///
    /// Near the identity the axis is undefined; `(Vector::X, 0.0)` is
    /// returned instead.
    pub fn axis_angle(&self) -> (Vector, f64) {
        let mut q = self.normalize();
        if q.w < 0.0 {
            q = Self::new(-q.w, -q.x, -q.y, -q.z);
        }
        let s = (1.0 - q.w * q.w).max(0.0).sqrt();
        if s < EPSILON {
            return (Vector::X, 0.0);
        }
        let angle = 2.0 * q.w.clamp(-1.0, 1.0).acos();
        (Vector::new(q.x / s, q.y / s, q.z / s), angle)
    }

    /// `true` when both quaternions describe the same rotation (`q` and `-q`
    /// are equivalent).
    pub fn same_rotation(&self, other: &Self) -> bool {
        let dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        approx(dot.abs(), 1.0)
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        approx(self.w, other.w) && approx(self.x, other.x) && approx(self.y, other.y) && approx(self.z, other.z)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    #[test]
    fn quaternion_identity_rotate_is_noop() {
        let v = Vector::new(1.0, 2.0, 3.0);
        assert!(Quaternion::IDENTITY.rotate(&v).approx_eq(&v));
    }

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        assert!(q.rotate(&Vector::X).approx_eq(&Vector::Y));
    }

    #[test]
    fn quaternion_conjugate_is_inverse() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        assert!(q.mul(&q.conjugate()).approx_eq(&Quaternion::IDENTITY));
    }

    #[test]
    fn matrix_conversion_agrees_with_direct_rotation() {
        for (a, b, c) in [(0.3, 0.2, -0.1), (2.9, -1.0, 0.5), (PI, 0.0, 0.0), (0.0, PI, 0.0)] {
            let r = Rotation::from_abc(a, b, c);
            let q = r.to_quaternion();
            let v = Vector::new(0.3, -1.2, 2.0);
            assert!(q.rotate(&v).approx_eq(&r.apply(&v)), "abc = {a} {b} {c}");
            assert!(q.to_rotation().approx_eq(&r));
        }
    }

    #[test]
    fn axis_angle_near_identity_is_special_cased() {
        let (axis, angle) = Quaternion::IDENTITY.axis_angle();
        assert_eq!(axis, Vector::X);
        assert_eq!(angle, 0.0);

        let tiny = Quaternion::from_axis_angle(&Vector::Y, 1e-9).unwrap();
        let (_, angle) = tiny.axis_angle();
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn axis_angle_roundtrip() {
        let axis = Vector::new(1.0, 1.0, 0.0).normalize().unwrap();
        let q = Quaternion::from_axis_angle(&axis, 2.0).unwrap();
        let (a2, angle) = q.axis_angle();
        assert!(a2.approx_eq(&axis));
        assert!(approx(angle, 2.0));
    }

    #[test]
    fn negated_quaternion_is_same_rotation() {
        let q = Quaternion::from_axis_angle(&Vector::Z, 0.7).unwrap();
        let neg = Quaternion::new(-q.w, -q.x, -q.y, -q.z);
        assert!(q.same_rotation(&neg));
        assert!(!q.approx_eq(&neg));
    }
}
