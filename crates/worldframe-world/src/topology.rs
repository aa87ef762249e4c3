//! Topologies: composable, immutable views over the relation graph.
//!
//! A [`Topology`] decides which relations are visible and what value each of
//! them has.  It is an ordered pipeline of [`Stage`]s on top of a base
//! [`View`]; every combinator returns a new topology with one more stage and
//! leaves the receiver untouched, so views can be built per query and
//! combined freely:
//!
//! ```rust
//! use worldframe_world::{Topology, World, RelationKind};
//! use worldframe_geometry::{Transformation, Vector};
//!
//! let mut world = World::new();
//! let base = world.add_frame("base");
//! let tool = world.add_frame("tool");
//! let r = world
//!     .add_relation(base, tool, RelationKind::Static(Transformation::from_translation(Vector::Z)))
//!     .unwrap();
//!
//! let static_view = Topology::commanded().without_dynamic();
//! assert!(static_view.is_visible(&world, r));
//! assert!(!static_view.without_relations([r]).is_visible(&world, r));
//! ```
//!
//! Stages are evaluated in insertion order, so a substitution followed by
//! `for_runtime` sees the substituted (constant) value, while the opposite
//! order filters on the original one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use worldframe_geometry::{Transformation, Twist};
use worldframe_types::{FrameId, ReadError, RelationId, RuntimeId};

use crate::relation::{Relation, RelationFamily, RelationKind};
use crate::value::{Resolved, ValueSource};
use crate::world::World;

/// Which semantic view of a mechanism values are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// What the controller is commanding.
    Commanded,
    /// What sensors currently measure.
    Measured,
}

/// Default tie-break order among relations connecting the same frames.
const DEFAULT_PREFERENCE: [RelationFamily; 3] = [
    RelationFamily::Geometric,
    RelationFamily::Observation,
    RelationFamily::Logical,
];

type FramePredicate = Arc<dyn Fn(FrameId) -> bool + Send + Sync>;
type RelationPredicate = Arc<dyn Fn(&Relation) -> bool + Send + Sync>;

/// Values overlaid by [`Topology::with_substitution`].
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    pub transformations: HashMap<RelationId, Transformation>,
    pub twists: HashMap<RelationId, Twist>,
}

#[derive(Clone)]
enum Stage {
    Specialize(RelationFamily),
    FrameFilter(FramePredicate),
    RelationFilter(RelationPredicate),
    WithoutFrames(Arc<HashSet<FrameId>>),
    WithoutRelations(Arc<HashSet<RelationId>>),
    WithoutDynamic,
    ForRuntime(RuntimeId),
    WithoutRuntime(RuntimeId),
    Substitute(Arc<Substitution>),
    Snapshot(Arc<SnapshotCache>),
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specialize(family) => write!(f, "Specialize({family:?})"),
            Self::FrameFilter(_) => f.write_str("FrameFilter"),
            Self::RelationFilter(_) => f.write_str("RelationFilter"),
            Self::WithoutFrames(frames) => write!(f, "WithoutFrames({})", frames.len()),
            Self::WithoutRelations(relations) => write!(f, "WithoutRelations({})", relations.len()),
            Self::WithoutDynamic => f.write_str("WithoutDynamic"),
            Self::ForRuntime(r) => write!(f, "ForRuntime({r})"),
            Self::WithoutRuntime(r) => write!(f, "WithoutRuntime({r})"),
            Self::Substitute(s) => write!(
                f,
                "Substitute({} transformations, {} twists)",
                s.transformations.len(),
                s.twists.len()
            ),
            Self::Snapshot(_) => f.write_str("Snapshot"),
        }
    }
}

/// The values a visible relation has in a topology.
#[derive(Debug, Clone)]
pub struct ResolvedRelation {
    /// `None` when the relation carries no transformation (logical).
    pub transformation: Option<Resolved<Transformation>>,
    /// `None` when no twist is available.
    pub twist: Option<Resolved<Twist>>,
}

impl ResolvedRelation {
    /// Runtime of the relation's live values, if any.
    pub fn runtime(&self) -> Option<RuntimeId> {
        self.transformation
            .as_ref()
            .and_then(Resolved::runtime)
            .or_else(|| self.twist.as_ref().and_then(Resolved::runtime))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Topology
// ────────────────────────────────────────────────────────────────────────────

/// An immutable view over the relations of a [`World`].
#[derive(Debug, Clone)]
pub struct Topology {
    view: View,
    preference: Arc<[RelationFamily]>,
    stages: Vec<Stage>,
}

impl Topology {
    /// An unfiltered topology over `view`.
    ///
    /// The commanded view hides observations; the measured view shows them.
    pub fn new(view: View) -> Self {
        Self {
            view,
            preference: Arc::from(DEFAULT_PREFERENCE.as_slice()),
            stages: Vec::new(),
        }
    }

    /// The control-target view.
    pub fn commanded() -> Self {
        Self::new(View::Commanded)
    }

    /// The sensed-actual view.
    pub fn measured() -> Self {
        Self::new(View::Measured)
    }

    pub fn view(&self) -> View {
        self.view
    }

    fn with_stage(&self, stage: Stage) -> Self {
        let mut next = self.clone();
        next.stages.push(stage);
        next
    }

    /// Hide every relation outside `family`.
    pub fn specialized(&self, family: RelationFamily) -> Self {
        self.with_stage(Stage::Specialize(family))
    }

    /// Keep only relations whose both endpoints satisfy `keep`.
    pub fn with_frame_filter(&self, keep: impl Fn(FrameId) -> bool + Send + Sync + 'static) -> Self {
        self.with_stage(Stage::FrameFilter(Arc::new(keep)))
    }

    /// Keep only relations satisfying `keep`.
    pub fn with_relation_filter(&self, keep: impl Fn(&Relation) -> bool + Send + Sync + 'static) -> Self {
        self.with_stage(Stage::RelationFilter(Arc::new(keep)))
    }

    /// Hide every relation touching one of `frames`.
    pub fn without_frames(&self, frames: impl IntoIterator<Item = FrameId>) -> Self {
        self.with_stage(Stage::WithoutFrames(Arc::new(frames.into_iter().collect())))
    }

    pub fn without_relations(&self, relations: impl IntoIterator<Item = RelationId>) -> Self {
        self.with_stage(Stage::WithoutRelations(Arc::new(relations.into_iter().collect())))
    }

    /// Hide non-constant geometric relations, observations and variable
    /// logical relations, leaving the static subgraph.
    pub fn without_dynamic(&self) -> Self {
        self.with_stage(Stage::WithoutDynamic)
    }

    /// Hide relations whose live value belongs to a runtime other than
    /// `runtime`.  Runtime-independent relations stay visible.
    pub fn for_runtime(&self, runtime: RuntimeId) -> Self {
        self.with_stage(Stage::ForRuntime(runtime))
    }

    /// Hide relations whose live value belongs to `runtime`.
    pub fn without_runtime(&self, runtime: RuntimeId) -> Self {
        self.with_stage(Stage::WithoutRuntime(runtime))
    }

    /// Overlay constant values for the given relations.  The world itself is
    /// never modified; every other relation keeps its value.
    pub fn with_substitution(
        &self,
        transformations: HashMap<RelationId, Transformation>,
        twists: HashMap<RelationId, Twist>,
    ) -> Self {
        self.with_stage(Stage::Substitute(Arc::new(Substitution {
            transformations,
            twists,
        })))
    }

    /// Freeze each relation's value the first time it is read.
    ///
    /// The cache belongs to the returned topology (and its clones); values
    /// read through different relations are not taken at the same instant.
    /// Use one snapshot per reader.
    pub fn lazy_snapshot(&self) -> Self {
        self.with_stage(Stage::Snapshot(Arc::new(SnapshotCache::default())))
    }

    /// Replace the tie-break order among same-endpoint relation families.
    /// Families not listed sort last.
    pub fn with_preference(&self, families: impl IntoIterator<Item = RelationFamily>) -> Self {
        let mut next = self.clone();
        next.preference = families.into_iter().collect();
        next
    }

    // ── Resolution ──────────────────────────────────────────────────────────

    /// Run `relation` through the pipeline.  `None` means hidden.
    pub fn resolve(&self, world: &World, relation: RelationId) -> Option<ResolvedRelation> {
        let relation = world.relation(relation)?;
        self.resolve_relation(world, relation)
    }

    fn resolve_relation(&self, world: &World, relation: &Relation) -> Option<ResolvedRelation> {
        if !world.contains_frame(relation.from()) || !world.contains_frame(relation.to()) {
            return None;
        }
        if self.view == View::Commanded && relation.family() == RelationFamily::Observation {
            return None;
        }

        let (transformation, twist) = relation.kind().values(self.view);
        let mut resolved = ResolvedRelation { transformation, twist };

        for stage in &self.stages {
            match stage {
                Stage::Specialize(family) => {
                    if relation.family() != *family {
                        return None;
                    }
                }
                Stage::FrameFilter(keep) => {
                    if !keep(relation.from()) || !keep(relation.to()) {
                        return None;
                    }
                }
                Stage::RelationFilter(keep) => {
                    if !keep(relation) {
                        return None;
                    }
                }
                Stage::WithoutFrames(frames) => {
                    if frames.contains(&relation.from()) || frames.contains(&relation.to()) {
                        return None;
                    }
                }
                Stage::WithoutRelations(relations) => {
                    if relations.contains(&relation.id()) {
                        return None;
                    }
                }
                Stage::WithoutDynamic => {
                    if relation.is_dynamic() {
                        return None;
                    }
                }
                Stage::ForRuntime(runtime) => {
                    if resolved.runtime().is_some_and(|r| r != *runtime) {
                        return None;
                    }
                }
                Stage::WithoutRuntime(runtime) => {
                    if resolved.runtime() == Some(*runtime) {
                        return None;
                    }
                }
                Stage::Substitute(substitution) => {
                    if let Some(t) = substitution.transformations.get(&relation.id()) {
                        resolved.transformation = Some(Resolved::Constant(*t));
                    }
                    if let Some(t) = substitution.twists.get(&relation.id()) {
                        resolved.twist = Some(Resolved::Constant(*t));
                    }
                }
                Stage::Snapshot(cache) => {
                    resolved.transformation = resolved
                        .transformation
                        .map(|value| cache.wrap(relation.id(), value));
                    resolved.twist = resolved.twist.map(|value| cache.wrap(relation.id(), value));
                }
            }
        }
        Some(resolved)
    }

    pub fn is_visible(&self, world: &World, relation: RelationId) -> bool {
        self.resolve(world, relation).is_some()
    }

    /// Transformation of a visible relation (`to` relative to `from`).
    pub fn transformation_of(&self, world: &World, relation: RelationId) -> Option<Resolved<Transformation>> {
        self.resolve(world, relation)?.transformation
    }

    /// Twist of a visible relation (`to` relative to `from`, pivot at `to`,
    /// expressed in `from`'s orientation).
    pub fn twist_of(&self, world: &World, relation: RelationId) -> Option<Resolved<Twist>> {
        self.resolve(world, relation)?.twist
    }

    /// Visible relations touching `frame`, ordered by family preference
    /// (stable with respect to insertion order).
    pub fn visible_relations<'w>(&self, world: &'w World, frame: FrameId) -> Vec<&'w Relation> {
        let mut visible: Vec<&Relation> = world
            .relations_of(frame)
            .iter()
            .filter_map(|id| world.relation(*id))
            .filter(|relation| self.resolve_relation(world, relation).is_some())
            .collect();
        visible.sort_by_key(|relation| self.rank(relation.family()));
        visible
    }

    /// Number of visible relations touching `frame`.
    pub fn degree(&self, world: &World, frame: FrameId) -> usize {
        self.visible_relations(world, frame).len()
    }

    fn rank(&self, family: RelationFamily) -> usize {
        self.preference
            .iter()
            .position(|f| *f == family)
            .unwrap_or(self.preference.len())
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::commanded()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot cache
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SnapshotCache {
    transformations: Mutex<HashMap<RelationId, Transformation>>,
    twists: Mutex<HashMap<RelationId, Twist>>,
}

/// Values that have a slot in the snapshot cache.
trait Snapshotted: Copy + Send + Sync + fmt::Debug + 'static {
    fn slot(cache: &SnapshotCache) -> &Mutex<HashMap<RelationId, Self>>;
}

impl Snapshotted for Transformation {
    fn slot(cache: &SnapshotCache) -> &Mutex<HashMap<RelationId, Self>> {
        &cache.transformations
    }
}

impl Snapshotted for Twist {
    fn slot(cache: &SnapshotCache) -> &Mutex<HashMap<RelationId, Self>> {
        &cache.twists
    }
}

impl SnapshotCache {
    fn wrap<T: Snapshotted>(self: &Arc<Self>, relation: RelationId, value: Resolved<T>) -> Resolved<T> {
        match value {
            Resolved::Constant(_) => value,
            Resolved::Live(inner) => Resolved::Live(Arc::new(SnapshotSource {
                relation,
                inner,
                cache: Arc::clone(self),
            })),
        }
    }
}

#[derive(Debug)]
struct SnapshotSource<T> {
    relation: RelationId,
    inner: Arc<dyn ValueSource<T>>,
    cache: Arc<SnapshotCache>,
}

impl<T: Snapshotted> ValueSource<T> for SnapshotSource<T> {
    fn runtime(&self) -> Option<RuntimeId> {
        self.inner.runtime()
    }

    fn current_value(&self) -> Result<T, ReadError> {
        let mut slot = T::slot(&self.cache).lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.get(&self.relation) {
            return Ok(*value);
        }
        let value = self.inner.current_value()?;
        slot.insert(self.relation, value);
        Ok(value)
    }
}
