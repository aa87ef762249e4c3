//! Frame-relative points, orientations and poses.
//!
//! Every value is tagged with the frame it is expressed relative to.  A
//! *local* value (reference `None`) is relative to whatever body encloses it
//! and can only be resolved through a [`Pose`] of that body; converting it on
//! its own fails with [`TransformationError::LocalValue`].
//!
//! Conversion to another reference frame follows the same three steps for
//! every representation:
//!
//! 1. rotate out of the current expression orientation into the reference
//!    frame's own orientation,
//! 2. re-base through the transformation between the old and new reference
//!    frames,
//! 3. rotate into the new expression orientation.

use serde::{Deserialize, Serialize};
use worldframe_geometry::{Rotation, Transformation, Vector};
use worldframe_types::{FrameId, TransformationError};

use crate::topology::Topology;
use crate::world::World;

/// Transformation of `frame` relative to `target`.
fn rebase(world: &World, topology: &Topology, target: FrameId, frame: FrameId) -> Result<Transformation, TransformationError> {
    if target == frame {
        return Ok(Transformation::IDENTITY);
    }
    world
        .frame(target)
        .ok_or(TransformationError::NoPath { from: target, to: frame })?
        .transformation_to(frame, topology)
}

// ────────────────────────────────────────────────────────────────────────────
// Point
// ────────────────────────────────────────────────────────────────────────────

/// A position, in the coordinates of its reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    reference: Option<FrameId>,
    vector: Vector,
}

impl Point {
    pub fn new(reference: FrameId, vector: Vector) -> Self {
        Self {
            reference: Some(reference),
            vector,
        }
    }

    /// A point relative to an enclosing body.
    pub fn local(vector: Vector) -> Self {
        Self { reference: None, vector }
    }

    pub fn reference(&self) -> Option<FrameId> {
        self.reference
    }

    pub fn vector(&self) -> &Vector {
        &self.vector
    }

    pub fn is_local(&self) -> bool {
        self.reference.is_none()
    }

    /// The same point in `target`'s coordinates.
    pub fn convert_to(&self, world: &World, target: FrameId, topology: &Topology) -> Result<Self, TransformationError> {
        let reference = self.reference.ok_or(TransformationError::LocalValue {
            from: None,
            to: Some(target),
        })?;
        let t = rebase(world, topology, target, reference)?;
        Ok(Self::new(target, t.apply(&self.vector)))
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.reference == other.reference && self.vector.approx_eq(&other.vector)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orientation
// ────────────────────────────────────────────────────────────────────────────

/// A rotation relative to its reference frame's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    reference: Option<FrameId>,
    rotation: Rotation,
}

impl Orientation {
    pub fn new(reference: FrameId, rotation: Rotation) -> Self {
        Self {
            reference: Some(reference),
            rotation,
        }
    }

    pub fn local(rotation: Rotation) -> Self {
        Self {
            reference: None,
            rotation,
        }
    }

    /// The enclosing body's own orientation.
    pub fn natural() -> Self {
        Self::local(Rotation::IDENTITY)
    }

    pub fn reference(&self) -> Option<FrameId> {
        self.reference
    }

    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    pub fn is_local(&self) -> bool {
        self.reference.is_none()
    }

    pub fn convert_to(&self, world: &World, target: FrameId, topology: &Topology) -> Result<Self, TransformationError> {
        let reference = self.reference.ok_or(TransformationError::LocalValue {
            from: None,
            to: Some(target),
        })?;
        let t = rebase(world, topology, target, reference)?;
        Ok(Self::new(target, t.rotation().multiply(&self.rotation)))
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.reference == other.reference && self.rotation.approx_eq(&other.rotation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// The placement of a body relative to a reference frame.
///
/// `transformation` is expressed in `orientation`: its translation is given
/// in that orientation's axes and its rotation relative to it.  A local
/// `orientation` means the reference frame's own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    reference: FrameId,
    orientation: Orientation,
    transformation: Transformation,
}

impl Pose {
    /// A pose expressed in the reference frame's own orientation.
    pub fn new(reference: FrameId, transformation: Transformation) -> Self {
        Self {
            reference,
            orientation: Orientation::natural(),
            transformation,
        }
    }

    pub fn with_orientation(reference: FrameId, orientation: Orientation, transformation: Transformation) -> Self {
        Self {
            reference,
            orientation,
            transformation,
        }
    }

    pub fn reference(&self) -> FrameId {
        self.reference
    }

    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Rotation of an orientation relative to `frame`'s own.  Local means
    /// `frame`'s own.
    fn rotation_in(world: &World, orientation: &Orientation, frame: FrameId, topology: &Topology) -> Result<Rotation, TransformationError> {
        if orientation.is_local() {
            return Ok(orientation.rotation);
        }
        Ok(orientation.convert_to(world, frame, topology)?.rotation)
    }

    /// The transformation of the body relative to the reference frame, in the
    /// reference frame's own orientation.
    pub fn natural_transformation(&self, world: &World, topology: &Topology) -> Result<Transformation, TransformationError> {
        let expressed_in = Self::rotation_in(world, &self.orientation, self.reference, topology)?;
        Ok(Transformation::from_rotation(expressed_in).multiply(&self.transformation))
    }

    /// The same placement relative to `reference`, expressed in
    /// `orientation` (local meaning `reference`'s own).
    pub fn convert_to(
        &self,
        world: &World,
        reference: FrameId,
        orientation: Orientation,
        topology: &Topology,
    ) -> Result<Self, TransformationError> {
        // (1) out of the current expression orientation
        let natural = self.natural_transformation(world, topology)?;
        // (2) re-base
        let rebased = rebase(world, topology, reference, self.reference)?.multiply(&natural);
        // (3) into the new expression orientation
        let expressed_in = Self::rotation_in(world, &orientation, reference, topology)?;
        let transformation = Transformation::from_rotation(expressed_in.invert()).multiply(&rebased);
        Ok(Self::with_orientation(reference, orientation, transformation))
    }

    /// The same placement relative to `reference`, in its own orientation.
    pub fn convert_to_frame(&self, world: &World, reference: FrameId, topology: &Topology) -> Result<Self, TransformationError> {
        self.convert_to(world, reference, Orientation::natural(), topology)
    }

    /// Position of the body as a point in the reference frame.
    pub fn position(&self, world: &World, topology: &Topology) -> Result<Point, TransformationError> {
        let natural = self.natural_transformation(world, topology)?;
        Ok(Point::new(self.reference, *natural.translation()))
    }

    /// Express `point` relative to this pose's reference frame.  A local
    /// point is taken relative to the posed body.
    pub fn resolve_point(&self, world: &World, point: &Point, topology: &Topology) -> Result<Point, TransformationError> {
        if point.is_local() {
            let natural = self.natural_transformation(world, topology)?;
            return Ok(Point::new(self.reference, natural.apply(&point.vector)));
        }
        point.convert_to(world, self.reference, topology)
    }

    /// Express `orientation` relative to this pose's reference frame.  A local
    /// orientation is taken relative to the posed body.
    pub fn resolve_orientation(
        &self,
        world: &World,
        orientation: &Orientation,
        topology: &Topology,
    ) -> Result<Orientation, TransformationError> {
        if orientation.is_local() {
            let natural = self.natural_transformation(world, topology)?;
            return Ok(Orientation::new(
                self.reference,
                natural.rotation().multiply(&orientation.rotation),
            ));
        }
        orientation.convert_to(world, self.reference, topology)
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.reference == other.reference
            && self.orientation.approx_eq(&other.orientation)
            && self.transformation.approx_eq(&other.transformation)
    }
}
