//! Twists: instantaneous linear + angular velocity.
//!
//! A twist is only meaningful together with the point it is measured at
//! (the *pivot*) and the orientation its vectors are expressed in.  Two twists
//! can be summed only after both have been re-expressed to the same pivot and
//! orientation with [`Twist::change_pivot`] and [`Twist::change_orientation`].

use serde::{Deserialize, Serialize};

use crate::matrix::Rotation;
use crate::vector::Vector;

/// Linear and angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector,
    pub angular: Vector,
}

impl Twist {
    /// No motion.
    pub const ZERO: Self = Self {
        linear: Vector::ZERO,
        angular: Vector::ZERO,
    };

    pub const fn new(linear: Vector, angular: Vector) -> Self {
        Self { linear, angular }
    }

    pub fn add(&self, rhs: &Self) -> Self {
        Self::new(self.linear.add(&rhs.linear), self.angular.add(&rhs.angular))
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        Self::new(self.linear.sub(&rhs.linear), self.angular.sub(&rhs.angular))
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.linear.scale(factor), self.angular.scale(factor))
    }

    pub fn negate(&self) -> Self {
        self.scale(-1.0)
    }

    /// Move the pivot by `offset` (new pivot minus old pivot, in the twist's
    /// orientation): `v' = v + ω × offset`.
    pub fn change_pivot(&self, offset: &Vector) -> Self {
        Self::new(self.linear.add(&self.angular.cross(offset)), self.angular)
    }

    /// Re-express both parts through `rotation` (maps the current
    /// orientation's coordinates into the new one's).
    pub fn change_orientation(&self, rotation: &Rotation) -> Self {
        Self::new(rotation.apply(&self.linear), rotation.apply(&self.angular))
    }

    pub fn is_zero(&self) -> bool {
        self.linear.is_zero() && self.angular.is_zero()
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.linear.approx_eq(&other.linear) && self.angular.approx_eq(&other.angular)
    }
}

impl Default for Twist {
    fn default() -> Self {
        Self::ZERO
    }
}
