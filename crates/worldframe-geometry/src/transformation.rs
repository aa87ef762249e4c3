//! Rigid-body transformations.

use serde::{Deserialize, Serialize};

use crate::matrix::Rotation;
use crate::vector::Vector;

/// A rigid-body transformation: rotation plus translation.
///
/// Describes the pose of frame B relative to frame A: a point expressed in
/// B is converted to A by rotating it with `rotation` and adding
/// `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    rotation: Rotation,
    translation: Vector,
}

impl Transformation {
    /// The identity transformation.  Composition with it is a no-op fast
    /// path.
    pub const IDENTITY: Self = Self {
        rotation: Rotation::IDENTITY,
        translation: Vector::ZERO,
    };

    pub fn new(rotation: Rotation, translation: Vector) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: Vector) -> Self {
        Self::new(Rotation::IDENTITY, translation)
    }

    pub fn from_rotation(rotation: Rotation) -> Self {
        Self::new(rotation, Vector::ZERO)
    }

    /// Translation `(x, y, z)` and yaw-pitch-roll angles `(a, b, c)`.
    pub fn from_abc(x: f64, y: f64, z: f64, a: f64, b: f64, c: f64) -> Self {
        Self::new(Rotation::from_abc(a, b, c), Vector::new(x, y, z))
    }

    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector {
        &self.translation
    }

    /// Exact comparison with [`Transformation::IDENTITY`].
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compose two transformations: `self` applied first, then `other`
    /// expressed in `self`'s frame.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.  The
    /// operation is not commutative.
    pub fn multiply(&self, other: &Self) -> Self {
        if self.is_identity() {
            return *other;
        }
        if other.is_identity() {
            return *self;
        }
        Self::new(
            self.rotation.multiply(&other.rotation),
            self.translation.add(&self.rotation.apply(&other.translation)),
        )
    }

    /// T_B_A for `self` = T_A_B.
    pub fn invert(&self) -> Self {
        if self.is_identity() {
            return *self;
        }
        let inv = self.rotation.invert();
        Self::new(inv, inv.apply(&self.translation).invert())
    }

    /// Map a point from the child frame into the parent frame.
    pub fn apply(&self, point: &Vector) -> Vector {
        self.translation.add(&self.rotation.apply(point))
    }

    /// Map a free vector (direction) from the child frame into the parent
    /// frame; translation does not apply.
    pub fn apply_rotation(&self, vector: &Vector) -> Vector {
        self.rotation.apply(vector)
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.rotation.approx_eq(&other.rotation) && self.translation.approx_eq(&other.translation)
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn transform_identity_compose_is_noop() {
        let t = Transformation::from_translation(Vector::new(1.0, 2.0, 3.0));
        assert_eq!(Transformation::IDENTITY.multiply(&t), t);
        assert_eq!(t.multiply(&Transformation::IDENTITY), t);
    }

    #[test]
    fn transform_compose_translations_add() {
        let t1 = Transformation::from_translation(Vector::new(1.0, 0.0, 0.0));
        let t2 = Transformation::from_translation(Vector::new(2.0, 0.0, 0.0));
        assert!(t1.multiply(&t2).translation().approx_eq(&Vector::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn compose_respects_rotation() {
        // B is rotated 90° about Z; C is 1 m along B's +X.
        let a_b = Transformation::from_rotation(Rotation::from_abc(FRAC_PI_2, 0.0, 0.0));
        let b_c = Transformation::from_translation(Vector::X);
        let a_c = a_b.multiply(&b_c);
        assert!(a_c.translation().approx_eq(&Vector::Y));
        // Reversed order gives a different result.
        assert!(!b_c.multiply(&a_b).approx_eq(&a_c));
    }

    #[test]
    fn invert_composes_to_identity() {
        let t = Transformation::from_abc(0.3, -1.0, 2.0, 0.4, 0.1, -0.9);
        assert!(t.multiply(&t.invert()).approx_eq(&Transformation::IDENTITY));
        assert!(t.invert().multiply(&t).approx_eq(&Transformation::IDENTITY));
        assert!(t.invert().invert().approx_eq(&t));
    }

    #[test]
    fn apply_vs_apply_rotation() {
        let t = Transformation::from_abc(1.0, 0.0, 0.0, FRAC_PI_2, 0.0, 0.0);
        assert!(t.apply(&Vector::X).approx_eq(&Vector::new(1.0, 1.0, 0.0)));
        assert!(t.apply_rotation(&Vector::X).approx_eq(&Vector::Y));
    }

    #[test]
    fn approx_eq_epsilon_boundary() {
        let t = Transformation::from_translation(Vector::new(1.0, 0.0, 0.0));
        let close = Transformation::from_translation(Vector::new(1.0 + 5e-6, 0.0, 0.0));
        let far = Transformation::from_translation(Vector::new(1.0 + 2e-5, 0.0, 0.0));
        assert!(t.approx_eq(&close));
        assert!(!t.approx_eq(&far));
    }
}
