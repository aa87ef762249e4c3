//! Frames: named spatial anchors and their query API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use worldframe_geometry::{Rotation, Transformation, Twist, Vector};
use worldframe_types::{DeviceId, FrameId, RelationId, TransformationError, VelocityError};

use crate::chain::{TransformationHandle, TwistHandle};
use crate::relation::Relation;
use crate::representation::{Orientation, Point, Pose};
use crate::search;
use crate::topology::Topology;
use crate::velocity::Velocity;
use crate::world::World;

/// A hint stored on a frame for teaching a device: which frame of the device
/// moves to it and the joint configuration to prefer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingInfo {
    pub motion_center: FrameId,
    pub hint_joints: Vec<f64>,
}

impl TeachingInfo {
    pub fn new(motion_center: FrameId, hint_joints: Vec<f64>) -> Self {
        Self {
            motion_center,
            hint_joints,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FrameData {
    pub(crate) name: String,
    pub(crate) temporary: bool,
    pub(crate) teaching: BTreeMap<DeviceId, Vec<TeachingInfo>>,
}

impl FrameData {
    pub(crate) fn new(name: String, temporary: bool) -> Self {
        Self {
            name,
            temporary,
            teaching: BTreeMap::new(),
        }
    }
}

/// A borrowed view of one frame of a [`World`].
///
/// Every query takes the [`Topology`] it should be answered in; the frame
/// itself has no notion of a current view.
#[derive(Clone, Copy)]
pub struct Frame<'w> {
    world: &'w World,
    id: FrameId,
    data: &'w FrameData,
}

impl std::fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("name", &self.data.name)
            .finish()
    }
}

impl<'w> Frame<'w> {
    pub(crate) fn new(world: &'w World, id: FrameId, data: &'w FrameData) -> Self {
        Self { world, id, data }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn name(&self) -> &'w str {
        &self.data.name
    }

    pub fn is_temporary(&self) -> bool {
        self.data.temporary
    }

    pub fn teaching_infos(&self, device: &DeviceId) -> &'w [TeachingInfo] {
        self.data
            .teaching
            .get(device)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Devices this frame carries teaching hints for.
    pub fn taught_devices(&self) -> impl Iterator<Item = &'w DeviceId> {
        self.data.teaching.keys()
    }

    /// Relations touching this frame that are visible in `topology`.
    pub fn relations(&self, topology: &Topology) -> Vec<&'w Relation> {
        topology.visible_relations(self.world, self.id)
    }

    /// A shortest relation path from this frame to `to`.  `Some(vec![])`
    /// when `to` is this frame.
    pub fn relations_to(&self, to: FrameId, topology: &Topology) -> Option<Vec<RelationId>> {
        search::relations_to(self.world, topology, self.id, to)
    }

    /// Frames reachable from this one, nearest first; this frame excluded.
    pub fn connected_frames(&self, topology: &Topology) -> Vec<FrameId> {
        search::connected_frames(self.world, topology, self.id)
    }

    /// A handle on the transformation of `to` relative to this frame, or
    /// `None` when the frames are not connected.
    pub fn transformation_source_to(&self, to: FrameId, topology: &Topology) -> Option<TransformationHandle> {
        let path = self.relations_to(to, topology)?;
        TransformationHandle::new(self.world, topology, self.id, to, &path)
    }

    /// The transformation of `to` relative to this frame, read now.
    ///
    /// # Errors
    ///
    /// [`TransformationError::NoPath`] when the frames are not connected,
    /// otherwise whatever reading the chain reports.
    pub fn transformation_to(&self, to: FrameId, topology: &Topology) -> Result<Transformation, TransformationError> {
        self.transformation_source_to(to, topology)
            .ok_or(TransformationError::NoPath { from: self.id, to })?
            .current_value()
    }

    /// A handle on the twist of `moving` relative to this frame.
    pub fn twist_source_of(&self, moving: FrameId, topology: &Topology) -> Option<TwistHandle> {
        let path = self.relations_to(moving, topology)?;
        TwistHandle::new(self.world, topology, self.id, moving, &path)
    }

    /// Twist of `moving` relative to this frame, pivot at `moving`'s origin,
    /// expressed in this frame's orientation.  `None` when the frames are
    /// not connected or a twist on the way is unavailable.
    pub fn twist_of(&self, moving: FrameId, topology: &Topology) -> Option<Twist> {
        self.twist_source_of(moving, topology)?.current_value().ok()
    }

    /// Like [`Frame::twist_of`], wrapped into a [`Velocity`] with reasons for
    /// failure.
    pub fn velocity_of(&self, moving: FrameId, topology: &Topology) -> Result<Velocity, VelocityError> {
        let twist = self
            .twist_source_of(moving, topology)
            .ok_or(VelocityError::NoPath { from: self.id, to: moving })?
            .current_value()?;
        Ok(Velocity::new(
            self.id,
            Point::local(Vector::ZERO),
            Orientation::new(self.id, Rotation::IDENTITY),
            twist,
        ))
    }

    /// This frame's own pose: identity relative to itself.
    pub fn as_pose(&self) -> Pose {
        Pose::new(self.id, Transformation::IDENTITY)
    }

    pub fn as_point(&self) -> Point {
        Point::new(self.id, Vector::ZERO)
    }

    pub fn as_orientation(&self) -> Orientation {
        Orientation::new(self.id, Rotation::IDENTITY)
    }
}
