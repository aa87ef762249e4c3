//! Relations: directed, typed edges between two frames.
//!
//! The set of relation kinds is closed ([`RelationKind`]).  Everything that
//! carries geometry is reachable through the [`Geometric`] capability trait,
//! so topologies never need to know which concrete kind they are looking at.
//!
//! | Kind | Family | Value |
//! |---|---|---|
//! | [`RelationKind::Static`] | Geometric | constant transformation, zero twist |
//! | [`RelationKind::Dynamic`] | Geometric | commanded and measured [`ValueSource`]s |
//! | [`RelationKind::Observation`] | Observation | a sensed value, measured view only |
//! | [`RelationKind::Logical`] | Logical | none; values only via substitution |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use worldframe_geometry::{Transformation, Twist};
use worldframe_types::{FrameId, RelationId};

use crate::topology::View;
use crate::value::{Resolved, ValueSource};
use crate::world::World;

// ────────────────────────────────────────────────────────────────────────────
// Kinds
// ────────────────────────────────────────────────────────────────────────────

/// Coarse relation family, used by `Topology::specialized` and as the
/// tie-break order among relations that connect the same frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RelationFamily {
    Geometric,
    Observation,
    Logical,
}

/// The value sources of one view of a dynamic relation.
#[derive(Debug, Clone)]
pub struct DynamicValues {
    pub transformation: Arc<dyn ValueSource<Transformation>>,
    /// `None` when the driver cannot report a velocity.
    pub twist: Option<Arc<dyn ValueSource<Twist>>>,
}

impl DynamicValues {
    pub fn new(transformation: Arc<dyn ValueSource<Transformation>>) -> Self {
        Self {
            transformation,
            twist: None,
        }
    }

    pub fn with_twist(mut self, twist: Arc<dyn ValueSource<Twist>>) -> Self {
        self.twist = Some(twist);
        self
    }

    fn resolve(&self) -> (Option<Resolved<Transformation>>, Option<Resolved<Twist>>) {
        (
            Some(Resolved::Live(self.transformation.clone())),
            self.twist.clone().map(Resolved::Live),
        )
    }
}

/// What a relation means.
#[derive(Debug, Clone)]
pub enum RelationKind {
    /// Rigid, never-changing connection.
    Static(Transformation),
    /// A moving connection (joint, mobile base).  The commanded values are
    /// what the controller targets; the measured ones what sensors report.
    Dynamic {
        commanded: DynamicValues,
        measured: DynamicValues,
    },
    /// A sensed relation (e.g. a camera detecting a marker).
    Observation(DynamicValues),
    /// A semantic link without intrinsic geometry.
    Logical { variable: bool, persistent: bool },
}

/// Capability of carrying a transformation and twist.
pub trait Geometric {
    /// `true` when the transformation never changes.
    fn is_constant(&self) -> bool;

    /// Transformation of `to` relative to `from` as seen in `view`.
    fn transformation(&self, view: View) -> Option<Resolved<Transformation>>;

    /// Twist of `to` relative to `from`, pivot at `to`'s origin, expressed in
    /// `from`'s orientation.
    fn twist(&self, view: View) -> Option<Resolved<Twist>>;
}

impl Geometric for RelationKind {
    fn is_constant(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    fn transformation(&self, view: View) -> Option<Resolved<Transformation>> {
        self.values(view).0
    }

    fn twist(&self, view: View) -> Option<Resolved<Twist>> {
        self.values(view).1
    }
}

impl RelationKind {
    pub fn family(&self) -> RelationFamily {
        match self {
            Self::Static(_) | Self::Dynamic { .. } => RelationFamily::Geometric,
            Self::Observation(_) => RelationFamily::Observation,
            Self::Logical { .. } => RelationFamily::Logical,
        }
    }

    /// The [`Geometric`] view of this kind, `None` for logical relations.
    pub fn as_geometric(&self) -> Option<&dyn Geometric> {
        match self {
            Self::Logical { .. } => None,
            other => Some(other),
        }
    }

    pub(crate) fn values(&self, view: View) -> (Option<Resolved<Transformation>>, Option<Resolved<Twist>>) {
        match self {
            Self::Static(t) => (Some(Resolved::Constant(*t)), Some(Resolved::Constant(Twist::ZERO))),
            Self::Dynamic { commanded, measured } => match view {
                View::Commanded => commanded.resolve(),
                View::Measured => measured.resolve(),
            },
            Self::Observation(values) => values.resolve(),
            Self::Logical { .. } => (None, None),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Relation
// ────────────────────────────────────────────────────────────────────────────

/// A directed edge `from → to` stored in the [`World`] arena.
#[derive(Debug, Clone)]
pub struct Relation {
    id: RelationId,
    from: FrameId,
    to: FrameId,
    kind: RelationKind,
}

impl Relation {
    pub(crate) fn new(id: RelationId, from: FrameId, to: FrameId, kind: RelationKind) -> Self {
        Self { id, from, to, kind }
    }

    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn from(&self) -> FrameId {
        self.from
    }

    pub fn to(&self) -> FrameId {
        self.to
    }

    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }

    pub fn family(&self) -> RelationFamily {
        self.kind.family()
    }

    pub fn touches(&self, frame: FrameId) -> bool {
        self.from == frame || self.to == frame
    }

    /// The endpoint opposite to `frame`, `None` when `frame` is not an
    /// endpoint.
    pub fn other_end(&self, frame: FrameId) -> Option<FrameId> {
        if frame == self.from {
            Some(self.to)
        } else if frame == self.to {
            Some(self.from)
        } else {
            None
        }
    }

    pub fn as_geometric(&self) -> Option<&dyn Geometric> {
        self.kind.as_geometric()
    }

    /// Logical relation whose meaning may change over time.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, RelationKind::Logical { variable: true, .. })
    }

    /// Logical relation that must survive reconfiguration.
    pub fn is_persistent(&self) -> bool {
        matches!(self.kind, RelationKind::Logical { persistent: true, .. })
    }

    /// Part of the dynamic world: moving geometry, observations and variable
    /// logical links.
    pub fn is_dynamic(&self) -> bool {
        match &self.kind {
            RelationKind::Static(_) => false,
            RelationKind::Dynamic { .. } | RelationKind::Observation(_) => true,
            RelationKind::Logical { variable, .. } => *variable,
        }
    }

    /// Whether this relation may be removed as part of `changes`.
    pub fn can_remove(&self, _changes: &ChangeSet) -> Result<(), ChangeRejection> {
        if self.is_persistent() {
            return Err(ChangeRejection::Persistent(self.id));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Change sets
// ────────────────────────────────────────────────────────────────────────────

/// A relation proposed for insertion.
#[derive(Debug, Clone)]
pub struct NewRelation {
    pub from: FrameId,
    pub to: FrameId,
    pub kind: RelationKind,
}

impl NewRelation {
    pub fn new(from: FrameId, to: FrameId, kind: RelationKind) -> Self {
        Self { from, to, kind }
    }

    /// Whether this relation may be established as part of `changes`.
    ///
    /// Geometric relations must not close a cycle in the geometric subgraph
    /// that results from applying `changes`.  When `self` is one of
    /// `changes.establish` it is not counted twice; a relation proposed
    /// outside `changes` is checked against all of its additions.
    pub fn can_establish(&self, world: &World, changes: &ChangeSet) -> Result<(), ChangeRejection> {
        for endpoint in [self.from, self.to] {
            if !world.contains_frame(endpoint) {
                return Err(ChangeRejection::MissingEndpoint(endpoint));
            }
        }
        if self.from == self.to {
            return Err(ChangeRejection::SelfLoop(self.from));
        }
        if self.kind.family() != RelationFamily::Geometric {
            return Ok(());
        }

        let removed: HashSet<RelationId> = changes.remove.iter().copied().collect();
        let mut components = Components::default();
        world
            .relations()
            .filter(|r| r.family() == RelationFamily::Geometric && !removed.contains(&r.id()))
            .for_each(|r| components.union(r.from(), r.to()));
        changes
            .establish
            .iter()
            .filter(|other| !std::ptr::eq(*other, self) && other.kind.family() == RelationFamily::Geometric)
            .for_each(|other| components.union(other.from, other.to));

        if components.find(self.from) == components.find(self.to) {
            return Err(ChangeRejection::GeometricCycle {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }
}

/// A batch of relation insertions and removals applied atomically by
/// [`World::apply`].
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub establish: Vec<NewRelation>,
    pub remove: Vec<RelationId>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn establish(mut self, from: FrameId, to: FrameId, kind: RelationKind) -> Self {
        self.establish.push(NewRelation::new(from, to, kind));
        self
    }

    pub fn remove(mut self, relation: RelationId) -> Self {
        self.remove.push(relation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.establish.is_empty() && self.remove.is_empty()
    }
}

/// Reason a relation change was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeRejection {
    #[error("endpoint {0} does not exist")]
    MissingEndpoint(FrameId),

    #[error("a relation cannot connect {0} to itself")]
    SelfLoop(FrameId),

    #[error("a geometric relation between {from} and {to} would close a geometric cycle")]
    GeometricCycle { from: FrameId, to: FrameId },

    #[error("{0} is persistent and cannot be removed")]
    Persistent(RelationId),
}

/// Union-find over frame ids.
#[derive(Default)]
struct Components {
    parent: HashMap<FrameId, FrameId>,
}

impl Components {
    fn find(&mut self, frame: FrameId) -> FrameId {
        let parent = *self.parent.entry(frame).or_insert(frame);
        if parent == frame {
            return frame;
        }
        let root = self.find(parent);
        self.parent.insert(frame, root);
        root
    }

    fn union(&mut self, a: FrameId, b: FrameId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }
}
