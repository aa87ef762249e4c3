//! `worldframe-geometry` – geometric algebra for the world model.
//!
//! All types are small immutable `Copy` values over `f64`.  Equality comes in
//! two flavours: exact (`PartialEq`) and epsilon-tolerant (`approx_eq`, using
//! [`EPSILON`]).
//!
//! # Modules
//!
//! - [`vector`] – [`Vector`][vector::Vector]: 3-D vector arithmetic.
//! - [`matrix`] – [`Matrix3x3`][matrix::Matrix3x3] and the orthonormal
//!   [`Rotation`][matrix::Rotation].
//! - [`quaternion`] – [`Quaternion`][quaternion::Quaternion]: unit
//!   quaternions and axis/angle extraction.
//! - [`transformation`] – [`Transformation`][transformation::Transformation]:
//!   rigid rotation + translation with non-commutative composition.
//! - [`twist`] – [`Twist`][twist::Twist]: linear + angular velocity with
//!   pivot and orientation re-expression.
//!
//! # Example
//!
//! ```rust
//! use worldframe_geometry::{Transformation, Vector};
//!
//! let a = Transformation::from_translation(Vector::new(1.0, 0.0, 0.0));
//! let b = Transformation::from_abc(0.0, 2.0, 0.0, 0.0, 0.0, 0.0);
//! let ab = a.multiply(&b);
//! assert!(ab.translation().approx_eq(&Vector::new(1.0, 2.0, 0.0)));
//! assert!(ab.multiply(&ab.invert()).approx_eq(&Transformation::IDENTITY));
//! ```

pub mod matrix;
pub mod quaternion;
pub mod transformation;
pub mod twist;
pub mod vector;

pub use matrix::{Matrix3x3, Rotation};
pub use quaternion::Quaternion;
pub use transformation::Transformation;
pub use twist::Twist;
pub use vector::Vector;

use thiserror::Error;

/// Tolerance used by every `approx_eq`: differences `< EPSILON` are equal,
/// differences `>= EPSILON` are not.
pub const EPSILON: f64 = 1e-5;

/// Returns `true` when `a` and `b` differ by less than [`EPSILON`].
pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Malformed geometric construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("matrix is not a proper rotation (orthonormal, determinant 1)")]
    NotOrthonormal,

    #[error("vector has zero length")]
    ZeroLength,
}
