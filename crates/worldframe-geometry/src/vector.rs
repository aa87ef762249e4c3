//! Three-dimensional vectors.

use serde::{Deserialize, Serialize};

use crate::{GeometryError, approx};

/// An immutable 3-D vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Create a new vector.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(&self, rhs: &Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// The negated vector.
    pub fn invert(&self) -> Self {
        self.scale(-1.0)
    }

    pub fn dot(&self, rhs: &Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector pointing in the same direction.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroLength`] for (near-)zero vectors.
    pub fn normalize(&self) -> Result<Self, GeometryError> {
        let len = self.length();
        if len < f64::EPSILON {
            return Err(GeometryError::ZeroLength);
        }
        Ok(self.scale(1.0 / len))
    }

    /// Exact comparison against [`Vector::ZERO`].
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Component-wise comparison with tolerance [`crate::EPSILON`].
    pub fn approx_eq(&self, other: &Self) -> bool {
        approx(self.x, other.x) && approx(self.y, other.y) && approx(self.z, other.z)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vector {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(4.0, 5.0, 6.0);
        assert_eq!(a.add(&b), Vector::new(5.0, 7.0, 9.0));
        assert_eq!(b.sub(&a), Vector::new(3.0, 3.0, 3.0));
        assert_eq!(a.scale(2.0), Vector::new(2.0, 4.0, 6.0));
        assert_eq!(a.invert(), Vector::new(-1.0, -2.0, -3.0));
        assert!((a.dot(&b) - 32.0).abs() < 1e-12);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vector::X.cross(&Vector::Y), Vector::Z);
        assert_eq!(Vector::Y.cross(&Vector::Z), Vector::X);
        assert_eq!(Vector::Z.cross(&Vector::X), Vector::Y);
    }

    #[test]
    fn normalize_zero_vector_fails() {
        assert_eq!(Vector::ZERO.normalize(), Err(GeometryError::ZeroLength));
        let n = Vector::new(3.0, 0.0, 4.0).normalize().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert!(n.approx_eq(&Vector::new(0.6, 0.0, 0.8)));
    }

    #[test]
    fn approx_eq_respects_epsilon() {
        let a = Vector::new(1.0, 1.0, 1.0);
        assert!(a.approx_eq(&Vector::new(1.0 + 9e-6, 1.0, 1.0 - 9e-6)));
        assert!(!a.approx_eq(&Vector::new(1.0, 1.0 + 2e-5, 1.0)));
        assert_ne!(a, Vector::new(1.0 + 9e-6, 1.0, 1.0));
    }

    #[test]
    fn zero_sentinel() {
        assert!(Vector::ZERO.is_zero());
        assert!(!Vector::new(0.0, 1e-12, 0.0).is_zero());
    }
}
