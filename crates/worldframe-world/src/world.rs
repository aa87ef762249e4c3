//! The [`World`] arena: frames, relations and relation-change listeners.
//!
//! Frames and relations are stored by stable id.  Relations hold endpoint
//! ids, never references, so the graph can contain cycles of any kind
//! without shared ownership.  The world does no locking of its own; wrap it
//! in an `RwLock` when lookups and mutations happen on different threads.

use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};
use worldframe_types::{DeviceId, FrameId, ListenerError, ListenerId, RelationId, WorldError};

use crate::frame::{Frame, FrameData, TeachingInfo};
use crate::naming::FrameNamer;
use crate::relation::{ChangeSet, Relation, RelationKind};

/// Name of the root frame every world starts with.
pub const ORIGIN_NAME: &str = "World origin";

/// Receives relation changes on one frame.
///
/// Callbacks run synchronously on the mutating thread, after the change has
/// been applied.  A listener that returns an error or panics is logged and
/// skipped; the remaining listeners still run.
pub trait RelationListener: Send + Sync {
    fn relation_added(&self, frame: FrameId, relation: &Relation) -> Result<(), ListenerError>;

    fn relation_removed(&self, frame: FrameId, relation: &Relation) -> Result<(), ListenerError>;
}

#[derive(Debug, Clone, Copy)]
enum RelationEvent {
    Added,
    Removed,
}

struct RegisteredListener {
    id: ListenerId,
    listener: Arc<dyn RelationListener>,
}

/// Graph of frames connected by relations.
///
/// # Example
///
/// ```rust
/// use worldframe_world::{RelationKind, Topology, World};
/// use worldframe_geometry::{Transformation, Vector};
///
/// let mut world = World::new();
/// let table = world.add_frame("table");
/// world
///     .add_relation(
///         world.origin(),
///         table,
///         RelationKind::Static(Transformation::from_translation(Vector::new(1.0, 0.0, 0.0))),
///     )
///     .unwrap();
///
/// let origin = world.frame(world.origin()).unwrap();
/// let t = origin.transformation_to(table, &Topology::commanded()).unwrap();
/// assert!(t.translation().approx_eq(&Vector::new(1.0, 0.0, 0.0)));
/// ```
pub struct World {
    frames: BTreeMap<FrameId, FrameData>,
    relations: BTreeMap<RelationId, Relation>,
    adjacency: HashMap<FrameId, Vec<RelationId>>,
    listeners: HashMap<FrameId, Vec<RegisteredListener>>,
    next_frame: u64,
    next_relation: u64,
    next_listener: u64,
    namer: FrameNamer,
    origin: FrameId,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("frames", &self.frames.len())
            .field("relations", &self.relations.len())
            .field("origin", &self.origin)
            .finish()
    }
}

impl World {
    /// An empty world containing only the permanent origin frame.
    pub fn new() -> Self {
        let origin = FrameId(0);
        let mut frames = BTreeMap::new();
        frames.insert(origin, FrameData::new(ORIGIN_NAME.to_string(), false));
        Self {
            frames,
            relations: BTreeMap::new(),
            adjacency: HashMap::new(),
            listeners: HashMap::new(),
            next_frame: 1,
            next_relation: 1,
            next_listener: 1,
            namer: FrameNamer::new(),
            origin,
        }
    }

    pub fn origin(&self) -> FrameId {
        self.origin
    }

    // ── Frames ──────────────────────────────────────────────────────────────

    fn insert_frame(&mut self, name: String, temporary: bool) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        debug!(frame = %id, name = %name, temporary, "frame added");
        self.frames.insert(id, FrameData::new(name, temporary));
        id
    }

    /// Add a permanent frame.  Names are display metadata and need not be
    /// unique.
    pub fn add_frame(&mut self, name: impl Into<String>) -> FrameId {
        self.insert_frame(name.into(), false)
    }

    /// Add a permanent frame named `"Frame N"`.
    pub fn add_unnamed_frame(&mut self) -> FrameId {
        let name = self.namer.next_name();
        self.insert_frame(name, false)
    }

    /// Add a temporary frame.  Temporary frames without relations are
    /// dropped by [`World::collect_temporary_frames`].
    pub fn add_temporary_frame(&mut self) -> FrameId {
        let name = self.namer.next_name();
        self.insert_frame(name, true)
    }

    pub fn make_permanent(&mut self, frame: FrameId) -> Result<(), WorldError> {
        self.frame_data_mut(frame)?.temporary = false;
        Ok(())
    }

    pub fn rename_frame(&mut self, frame: FrameId, name: impl Into<String>) -> Result<(), WorldError> {
        self.frame_data_mut(frame)?.name = name.into();
        Ok(())
    }

    /// Remove a frame together with all of its relations.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the frame is unknown, is the
    /// origin, or carries a persistent relation.
    pub fn remove_frame(&mut self, frame: FrameId) -> Result<Vec<RelationId>, WorldError> {
        if frame == self.origin {
            return Err(WorldError::OriginRemoval);
        }
        if !self.contains_frame(frame) {
            return Err(WorldError::UnknownFrame(frame));
        }
        let relations = self.relations_of(frame).to_vec();
        let changes = relations
            .iter()
            .fold(ChangeSet::new(), |changes, relation| changes.remove(*relation));
        self.apply(changes)?;
        self.frames.remove(&frame);
        self.adjacency.remove(&frame);
        self.listeners.remove(&frame);
        debug!(frame = %frame, "frame removed");
        Ok(relations)
    }

    /// Drop every temporary frame that has no relations left.
    pub fn collect_temporary_frames(&mut self) -> Vec<FrameId> {
        let collectible: Vec<FrameId> = self
            .frames
            .iter()
            .filter(|(id, data)| data.temporary && self.relations_of(**id).is_empty())
            .map(|(id, _)| *id)
            .collect();
        for id in &collectible {
            self.frames.remove(id);
            self.listeners.remove(id);
        }
        if !collectible.is_empty() {
            debug!(count = collectible.len(), "temporary frames collected");
        }
        collectible
    }

    pub fn contains_frame(&self, frame: FrameId) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn frame(&self, frame: FrameId) -> Option<Frame<'_>> {
        self.frames
            .get(&frame)
            .map(|data| Frame::new(self, frame, data))
    }

    /// All frames in creation order.
    pub fn frames(&self) -> impl Iterator<Item = Frame<'_>> {
        self.frames.iter().map(|(id, data)| Frame::new(self, *id, data))
    }

    /// First frame (in creation order) carrying `name`.
    pub fn frame_by_name(&self, name: &str) -> Option<Frame<'_>> {
        self.frames().find(|frame| frame.name() == name)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame_data_mut(&mut self, frame: FrameId) -> Result<&mut FrameData, WorldError> {
        self.frames.get_mut(&frame).ok_or(WorldError::UnknownFrame(frame))
    }

    // ── Relations ───────────────────────────────────────────────────────────

    pub fn relation(&self, relation: RelationId) -> Option<&Relation> {
        self.relations.get(&relation)
    }

    /// All relations in insertion order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Ids of the relations touching `frame`, in insertion order.
    pub fn relations_of(&self, frame: FrameId) -> &[RelationId] {
        self.adjacency.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Establish a single relation `from → to`.
    pub fn add_relation(&mut self, from: FrameId, to: FrameId, kind: RelationKind) -> Result<RelationId, WorldError> {
        let added = self.apply(ChangeSet::new().establish(from, to, kind))?;
        added
            .first()
            .copied()
            .ok_or_else(|| WorldError::ChangeRejected {
                relation: format!("{from} -> {to}"),
                reason: "relation was not established".to_string(),
            })
    }

    pub fn remove_relation(&mut self, relation: RelationId) -> Result<(), WorldError> {
        self.apply(ChangeSet::new().remove(relation)).map(|_| ())
    }

    /// Apply a change set atomically.
    ///
    /// Every removal and insertion is validated against the whole set first;
    /// if any is rejected nothing changes.  Listeners are notified after the
    /// world is consistent again.  Returns the ids of the new relations in
    /// the order of `changes.establish`.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownRelation`] for a removal of an unknown relation,
    /// [`WorldError::ChangeRejected`] when a relation refuses the change.
    pub fn apply(&mut self, changes: ChangeSet) -> Result<Vec<RelationId>, WorldError> {
        for id in &changes.remove {
            let relation = self.relation(*id).ok_or(WorldError::UnknownRelation(*id))?;
            relation
                .can_remove(&changes)
                .map_err(|rejection| WorldError::ChangeRejected {
                    relation: id.to_string(),
                    reason: rejection.to_string(),
                })?;
        }
        for proposed in &changes.establish {
            proposed
                .can_establish(self, &changes)
                .map_err(|rejection| WorldError::ChangeRejected {
                    relation: format!("{} -> {}", proposed.from, proposed.to),
                    reason: rejection.to_string(),
                })?;
        }

        let mut removed = Vec::new();
        for id in &changes.remove {
            if let Some(relation) = self.relations.remove(id) {
                for endpoint in [relation.from(), relation.to()] {
                    if let Some(ids) = self.adjacency.get_mut(&endpoint) {
                        ids.retain(|r| r != id);
                    }
                }
                removed.push(relation);
            }
        }

        let mut added = Vec::with_capacity(changes.establish.len());
        for proposed in changes.establish {
            let id = RelationId(self.next_relation);
            self.next_relation += 1;
            for endpoint in [proposed.from, proposed.to] {
                self.adjacency.entry(endpoint).or_default().push(id);
            }
            self.relations
                .insert(id, Relation::new(id, proposed.from, proposed.to, proposed.kind));
            added.push(id);
        }
        debug!(added = added.len(), removed = removed.len(), "change set applied");

        for relation in &removed {
            self.notify(relation, RelationEvent::Removed);
        }
        for id in &added {
            if let Some(relation) = self.relations.get(id) {
                self.notify(relation, RelationEvent::Added);
            }
        }
        Ok(added)
    }

    // ── Listeners ───────────────────────────────────────────────────────────

    /// Register `listener` for relation changes touching `frame`.
    pub fn add_relation_listener(
        &mut self,
        frame: FrameId,
        listener: Arc<dyn RelationListener>,
    ) -> Result<ListenerId, WorldError> {
        if !self.contains_frame(frame) {
            return Err(WorldError::UnknownFrame(frame));
        }
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners
            .entry(frame)
            .or_default()
            .push(RegisteredListener { id, listener });
        Ok(id)
    }

    /// Returns `true` if the listener was registered on `frame`.
    pub fn remove_relation_listener(&mut self, frame: FrameId, listener: ListenerId) -> bool {
        let Some(registered) = self.listeners.get_mut(&frame) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|r| r.id != listener);
        registered.len() != before
    }

    fn notify(&self, relation: &Relation, event: RelationEvent) {
        for frame in [relation.from(), relation.to()] {
            let Some(registered) = self.listeners.get(&frame) else {
                continue;
            };
            for entry in registered {
                let outcome = catch_unwind(AssertUnwindSafe(|| match event {
                    RelationEvent::Added => entry.listener.relation_added(frame, relation),
                    RelationEvent::Removed => entry.listener.relation_removed(frame, relation),
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(
                        frame = %frame,
                        relation = %relation.id(),
                        listener = entry.id.0,
                        ?event,
                        "relation listener failed: {e}"
                    ),
                    Err(_) => warn!(
                        frame = %frame,
                        relation = %relation.id(),
                        listener = entry.id.0,
                        ?event,
                        "relation listener panicked"
                    ),
                }
            }
        }
    }

    // ── Teaching info ───────────────────────────────────────────────────────

    pub fn add_teaching_info(
        &mut self,
        frame: FrameId,
        device: DeviceId,
        info: TeachingInfo,
    ) -> Result<(), WorldError> {
        self.frame_data_mut(frame)?
            .teaching
            .entry(device)
            .or_default()
            .push(info);
        Ok(())
    }

    /// Remove one matching entry.  Returns `true` if something was removed.
    pub fn remove_teaching_info(
        &mut self,
        frame: FrameId,
        device: &DeviceId,
        info: &TeachingInfo,
    ) -> Result<bool, WorldError> {
        let teaching = &mut self.frame_data_mut(frame)?.teaching;
        let Some(infos) = teaching.get_mut(device) else {
            return Ok(false);
        };
        let Some(index) = infos.iter().position(|i| i == info) else {
            return Ok(false);
        };
        infos.remove(index);
        if infos.is_empty() {
            teaching.remove(device);
        }
        Ok(true)
    }

    pub fn clear_teaching_infos(&mut self, frame: FrameId, device: &DeviceId) -> Result<(), WorldError> {
        self.frame_data_mut(frame)?.teaching.remove(device);
        Ok(())
    }
}
