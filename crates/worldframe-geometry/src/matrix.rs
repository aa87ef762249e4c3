//! 3x3 matrices and orthonormal rotations.
//!
//! [`Rotation`] is a [`Matrix3x3`] that has been checked to be a proper
//! rotation (orthonormal columns, determinant +1).  Because of that
//! invariant its inverse is simply the transpose; general matrices go through
//! [`Matrix3x3::inverse`].

use serde::{Deserialize, Serialize};

use crate::quaternion::Quaternion;
use crate::vector::Vector;
use crate::{EPSILON, GeometryError, approx};

// ────────────────────────────────────────────────────────────────────────────
// Matrix3x3
// ────────────────────────────────────────────────────────────────────────────

/// A general 3x3 real matrix, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3x3 {
    pub rows: [[f64; 3]; 3],
}

impl Matrix3x3 {
    pub const IDENTITY: Self = Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub const fn new(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    /// Build a matrix whose columns are `x`, `y` and `z`.
    pub fn from_columns(x: &Vector, y: &Vector, z: &Vector) -> Self {
        Self::new([[x.x, y.x, z.x], [x.y, y.y, z.y], [x.z, y.z, z.z]])
    }

    pub fn transpose(&self) -> Self {
        let r = &self.rows;
        Self::new([
            [r[0][0], r[1][0], r[2][0]],
            [r[0][1], r[1][1], r[2][1]],
            [r[0][2], r[1][2], r[2][2]],
        ])
    }

    pub fn multiply(&self, rhs: &Self) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Self::new(out)
    }

    pub fn multiply_vector(&self, v: &Vector) -> Vector {
        let r = &self.rows;
        Vector::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }

    pub fn determinant(&self) -> f64 {
        let r = &self.rows;
        r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0])
    }

    /// General inverse via the adjugate.  Returns `None` for singular
    /// matrices.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let r = &self.rows;
        let cof = |a: usize, b: usize, c: usize, d: usize| r[a][b] * r[c][d] - r[a][d] * r[c][b];
        let adj = [
            [cof(1, 1, 2, 2), -cof(0, 1, 2, 2), cof(0, 1, 1, 2)],
            [-cof(1, 0, 2, 2), cof(0, 0, 2, 2), -cof(0, 0, 1, 2)],
            [cof(1, 0, 2, 1), -cof(0, 0, 2, 1), cof(0, 0, 1, 1)],
        ];
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = adj[i][j] / det;
            }
        }
        Some(Self::new(out))
    }

    /// `true` when columns are unit length and mutually orthogonal and the
    /// determinant is +1, all within [`EPSILON`].
    pub fn is_rotation(&self) -> bool {
        self.transpose().multiply(self).approx_eq(&Self::IDENTITY) && approx(self.determinant(), 1.0)
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.rows
            .iter()
            .flatten()
            .zip(other.rows.iter().flatten())
            .all(|(a, b)| approx(*a, *b))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rotation
// ────────────────────────────────────────────────────────────────────────────

/// A proper 3-D rotation.
///
/// Angles follow the yaw-pitch-roll convention used across the workspace:
/// `from_abc(a, b, c)` is a rotation of `a` about Z, then `b` about the new Y,
/// then `c` about the new X (`Rz(a)·Ry(b)·Rx(c)`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Matrix3x3", into = "Matrix3x3")]
pub struct Rotation {
    matrix: Matrix3x3,
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        matrix: Matrix3x3::IDENTITY,
    };

    /// Wrap `matrix` after checking that it is a proper rotation.
    ///
    /// # Errors
    ///
    /// [`GeometryError::NotOrthonormal`] when the check fails.
    pub fn try_from_matrix(matrix: Matrix3x3) -> Result<Self, GeometryError> {
        if matrix.is_rotation() {
            Ok(Self { matrix })
        } else {
            Err(GeometryError::NotOrthonormal)
        }
    }

    /// Rotation whose columns are the images of the X, Y and Z axes.
    pub fn from_unit_vectors(x: &Vector, y: &Vector, z: &Vector) -> Result<Self, GeometryError> {
        Self::try_from_matrix(Matrix3x3::from_columns(x, y, z))
    }

    pub fn from_abc(a: f64, b: f64, c: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        let (sb, cb) = b.sin_cos();
        let (sc, cc) = c.sin_cos();
        Self {
            matrix: Matrix3x3::new([
                [ca * cb, ca * sb * sc - sa * cc, ca * sb * cc + sa * sc],
                [sa * cb, sa * sb * sc + ca * cc, sa * sb * cc - ca * sc],
                [-sb, cb * sc, cb * cc],
            ]),
        }
    }

    /// Rotation of `angle` radians about `axis` (Rodrigues' formula).
    pub fn from_axis_angle(axis: &Vector, angle: f64) -> Result<Self, GeometryError> {
        let k = axis.normalize()?;
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Ok(Self {
            matrix: Matrix3x3::new([
                [t * k.x * k.x + c, t * k.x * k.y - s * k.z, t * k.x * k.z + s * k.y],
                [t * k.x * k.y + s * k.z, t * k.y * k.y + c, t * k.y * k.z - s * k.x],
                [t * k.x * k.z - s * k.y, t * k.y * k.z + s * k.x, t * k.z * k.z + c],
            ]),
        })
    }

    pub fn from_quaternion(q: &Quaternion) -> Self {
        let q = q.normalize();
        let (w, x, y, z) = (q.w, q.x, q.y, q.z);
        Self {
            matrix: Matrix3x3::new([
                [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - w * z), 2.0 * (x * z + w * y)],
                [2.0 * (x * y + w * z), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - w * x)],
                [2.0 * (x * z - w * y), 2.0 * (y * z + w * x), 1.0 - 2.0 * (x * x + y * y)],
            ]),
        }
    }

    pub fn matrix(&self) -> &Matrix3x3 {
        &self.matrix
    }

    /// Inverse rotation (transpose).
    pub fn invert(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// `self` followed by `rhs` expressed in `self`'s rotated axes.
    pub fn multiply(&self, rhs: &Self) -> Self {
        Self {
            matrix: self.matrix.multiply(&rhs.matrix),
        }
    }

    pub fn apply(&self, v: &Vector) -> Vector {
        self.matrix.multiply_vector(v)
    }

    /// Decompose into `(a, b, c)` yaw-pitch-roll angles.
    ///
    /// At gimbal lock (`b = ±π/2`) the roll is folded into the yaw and `c`
    /// is reported as zero.
    pub fn to_abc(&self) -> (f64, f64, f64) {
        let r = &self.matrix.rows;
        let cb = (r[0][0] * r[0][0] + r[1][0] * r[1][0]).sqrt();
        let b = (-r[2][0]).atan2(cb);
        if cb > EPSILON {
            (r[1][0].atan2(r[0][0]), b, r[2][1].atan2(r[2][2]))
        } else {
            ((-r[0][1]).atan2(r[1][1]), b, 0.0)
        }
    }

    pub fn to_quaternion(&self) -> Quaternion {
        Quaternion::from_rotation(self)
    }

    /// `(axis, angle)` with `angle ∈ [0, π]`; identity yields `(X, 0)`.
    pub fn to_axis_angle(&self) -> (Vector, f64) {
        self.to_quaternion().axis_angle()
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.matrix.approx_eq(&other.matrix)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<Matrix3x3> for Rotation {
    type Error = GeometryError;

    fn try_from(matrix: Matrix3x3) -> Result<Self, Self::Error> {
        Self::try_from_matrix(matrix)
    }
}

impl From<Rotation> for Matrix3x3 {
    fn from(rotation: Rotation) -> Self {
        rotation.matrix
    }
}
