//! Velocities: a twist together with where and how it is expressed.

use serde::{Deserialize, Serialize};
use worldframe_geometry::{Rotation, Twist, Vector};
use worldframe_types::{FrameId, VelocityError};

use crate::representation::{Orientation, Point, Pose};
use crate::topology::Topology;
use crate::world::World;

/// Motion of some body relative to `reference`.
///
/// The linear part is the velocity of the body point at `pivot`; both parts
/// are expressed in `orientation`.  A local pivot or orientation is relative
/// to the moving body itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    reference: FrameId,
    pivot: Point,
    orientation: Orientation,
    twist: Twist,
}

impl Velocity {
    pub fn new(reference: FrameId, pivot: Point, orientation: Orientation, twist: Twist) -> Self {
        Self {
            reference,
            pivot,
            orientation,
            twist,
        }
    }

    pub fn reference(&self) -> FrameId {
        self.reference
    }

    pub fn pivot(&self) -> &Point {
        &self.pivot
    }

    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    pub fn twist(&self) -> &Twist {
        &self.twist
    }

    fn is_local(&self) -> bool {
        self.pivot.is_local() && self.orientation.is_local()
    }

    /// Move to another pivot and orientation, both relative to the moving
    /// body, without consulting the world.
    ///
    /// # Errors
    ///
    /// [`VelocityError::NotLocal`] unless the current and the requested
    /// pivot and orientation are all local.
    pub fn re_expressed(&self, pivot: Point, orientation: Orientation) -> Result<Self, VelocityError> {
        if !self.is_local() || !pivot.is_local() || !orientation.is_local() {
            return Err(VelocityError::NotLocal);
        }
        let twist = Self::move_twist(
            &self.twist,
            self.orientation.rotation(),
            self.pivot.vector(),
            orientation.rotation(),
            pivot.vector(),
        );
        Ok(Self::new(self.reference, pivot, orientation, twist))
    }

    /// Move to another pivot and orientation, resolving frame-relative values
    /// through `topology` and local ones through `body`, the moving body's
    /// pose.  The reference frame stays the same; see
    /// [`Velocity::convert_to_reference`] for changing it.
    ///
    /// # Errors
    ///
    /// [`VelocityError::LocalWithoutPose`] when a local value is involved and
    /// `body` is `None` (unless everything is local, which needs no pose),
    /// [`VelocityError::Transformation`] when a frame cannot be resolved.
    pub fn convert_to(
        &self,
        world: &World,
        body: Option<&Pose>,
        pivot: Point,
        orientation: Orientation,
        topology: &Topology,
    ) -> Result<Self, VelocityError> {
        if body.is_none() && self.is_local() && pivot.is_local() && orientation.is_local() {
            return self.re_expressed(pivot, orientation);
        }
        let current_rotation = self.rotation_in_reference(world, body, &self.orientation, topology)?;
        let current_pivot = self.point_in_reference(world, body, &self.pivot, topology)?;
        let new_rotation = self.rotation_in_reference(world, body, &orientation, topology)?;
        let new_pivot = self.point_in_reference(world, body, &pivot, topology)?;

        let twist = Self::move_twist(&self.twist, &current_rotation, &current_pivot, &new_rotation, &new_pivot);
        Ok(Self::new(self.reference, pivot, orientation, twist))
    }

    /// The same motion seen from `new_reference`, keeping pivot and
    /// orientation.
    ///
    /// The motion of the old reference relative to the new one is moved to
    /// this velocity's pivot and orientation and added on top.  `body` is
    /// only needed when the pivot or orientation is local.
    ///
    /// # Errors
    ///
    /// Whatever [`Frame::velocity_of`](crate::Frame::velocity_of) reports for
    /// the old reference seen from the new one,
    /// [`VelocityError::LocalWithoutPose`] for a local value without `body`,
    /// [`VelocityError::Transformation`] when a frame cannot be resolved.
    pub fn convert_to_reference(
        &self,
        world: &World,
        body: Option<&Pose>,
        new_reference: FrameId,
        topology: &Topology,
    ) -> Result<Self, VelocityError> {
        if new_reference == self.reference {
            return Ok(*self);
        }
        let carrier = world.frame(new_reference).ok_or(VelocityError::NoPath {
            from: new_reference,
            to: self.reference,
        })?;
        // Pivot at the old reference's origin, axes of the new reference.
        let carried = carrier.velocity_of(self.reference, topology)?;
        let new_axes = carrier
            .transformation_to(self.reference, topology)?
            .rotation()
            .invert();

        let pivot = self.point_in_reference(world, body, &self.pivot, topology)?;
        let rotation = self.rotation_in_reference(world, body, &self.orientation, topology)?;
        let frame_motion = Self::move_twist(carried.twist(), &new_axes, &Vector::ZERO, &rotation, &pivot);

        Ok(Self::new(
            new_reference,
            self.pivot,
            self.orientation,
            self.twist.add(&frame_motion),
        ))
    }

    /// Re-express `twist` from (`from_rotation`, `from_pivot`) to
    /// (`to_rotation`, `to_pivot`), all relative to one common frame.
    fn move_twist(
        twist: &Twist,
        from_rotation: &Rotation,
        from_pivot: &Vector,
        to_rotation: &Rotation,
        to_pivot: &Vector,
    ) -> Twist {
        twist
            .change_orientation(from_rotation)
            .change_pivot(&to_pivot.sub(from_pivot))
            .change_orientation(&to_rotation.invert())
    }

    fn point_in_reference(
        &self,
        world: &World,
        body: Option<&Pose>,
        point: &Point,
        topology: &Topology,
    ) -> Result<Vector, VelocityError> {
        let point = if point.is_local() {
            body.ok_or(VelocityError::LocalWithoutPose)?
                .resolve_point(world, point, topology)?
        } else {
            *point
        };
        Ok(*point.convert_to(world, self.reference, topology)?.vector())
    }

    fn rotation_in_reference(
        &self,
        world: &World,
        body: Option<&Pose>,
        orientation: &Orientation,
        topology: &Topology,
    ) -> Result<Rotation, VelocityError> {
        let orientation = if orientation.is_local() {
            body.ok_or(VelocityError::LocalWithoutPose)?
                .resolve_orientation(world, orientation, topology)?
        } else {
            *orientation
        };
        Ok(*orientation.convert_to(world, self.reference, topology)?.rotation())
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.reference == other.reference
            && self.pivot.approx_eq(&other.pivot)
            && self.orientation.approx_eq(&other.orientation)
            && self.twist.approx_eq(&other.twist)
    }
}
