//! Registering frames under unique names.
//!
//! The world identifies frames by id only.  A [`FrameStore`] adds the
//! name → frame registry an application uses to look frames up again, and
//! keeps names unique among the frames it knows.

use std::collections::BTreeMap;

use worldframe_types::{FrameId, WorldError};

use crate::world::World;

/// A registry of named frames on top of a [`World`].
pub trait FrameStore {
    fn has_frame(&self, name: &str) -> bool;

    fn get_frame(&self, name: &str) -> Option<FrameId>;

    /// The frame registered as `name`, created and registered when missing.
    fn get_or_create_frame(&mut self, world: &mut World, name: &str) -> FrameId;

    /// Create a permanent frame and register it as `name`.
    ///
    /// # Errors
    ///
    /// [`WorldError::DuplicateName`] when `name` is already registered.
    fn create_and_register(&mut self, world: &mut World, name: &str) -> Result<FrameId, WorldError>;

    /// Register an existing frame as `name` and make it permanent.
    fn register(&mut self, world: &mut World, frame: FrameId, name: &str) -> Result<(), WorldError>;

    /// Rename a registered frame, in the registry and in the world.
    fn rename(&mut self, world: &mut World, old: &str, new: &str) -> Result<(), WorldError>;

    /// Unregister `name` and remove its frame from the world.
    fn delete(&mut self, world: &mut World, name: &str) -> Result<FrameId, WorldError>;
}

/// In-memory [`FrameStore`].
#[derive(Debug, Default, Clone)]
pub struct NamedFrameStore {
    names: BTreeMap<String, FrameId>,
}

impl NamedFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the world's origin registered under its own name.
    pub fn for_world(world: &World) -> Self {
        let mut names = BTreeMap::new();
        if let Some(origin) = world.frame(world.origin()) {
            names.insert(origin.name().to_string(), origin.id());
        }
        Self { names }
    }

    /// Registered `(name, frame)` pairs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FrameId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FrameStore for NamedFrameStore {
    fn has_frame(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn get_frame(&self, name: &str) -> Option<FrameId> {
        self.names.get(name).copied()
    }

    fn get_or_create_frame(&mut self, world: &mut World, name: &str) -> FrameId {
        if let Some(id) = self.get_frame(name) {
            return id;
        }
        let id = world.add_frame(name);
        self.names.insert(name.to_string(), id);
        id
    }

    fn create_and_register(&mut self, world: &mut World, name: &str) -> Result<FrameId, WorldError> {
        if self.has_frame(name) {
            return Err(WorldError::DuplicateName(name.to_string()));
        }
        let id = world.add_frame(name);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    fn register(&mut self, world: &mut World, frame: FrameId, name: &str) -> Result<(), WorldError> {
        if self.has_frame(name) {
            return Err(WorldError::DuplicateName(name.to_string()));
        }
        world.make_permanent(frame)?;
        world.rename_frame(frame, name)?;
        self.names.insert(name.to_string(), frame);
        Ok(())
    }

    fn rename(&mut self, world: &mut World, old: &str, new: &str) -> Result<(), WorldError> {
        let id = self
            .get_frame(old)
            .ok_or_else(|| WorldError::UnknownName(old.to_string()))?;
        if old == new {
            return Ok(());
        }
        if self.has_frame(new) {
            return Err(WorldError::DuplicateName(new.to_string()));
        }
        world.rename_frame(id, new)?;
        self.names.remove(old);
        self.names.insert(new.to_string(), id);
        Ok(())
    }

    fn delete(&mut self, world: &mut World, name: &str) -> Result<FrameId, WorldError> {
        let id = self
            .get_frame(name)
            .ok_or_else(|| WorldError::UnknownName(name.to_string()))?;
        world.remove_frame(id)?;
        self.names.remove(name);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationKind;
    use crate::world::ORIGIN_NAME;

    #[test]
    fn origin_is_preregistered() {
        let world = World::new();
        let store = NamedFrameStore::for_world(&world);
        assert_eq!(store.get_frame(ORIGIN_NAME), Some(world.origin()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut world = World::new();
        let mut store = NamedFrameStore::new();
        let a = store.get_or_create_frame(&mut world, "tcp");
        let b = store.get_or_create_frame(&mut world, "tcp");
        assert_eq!(a, b);
        assert_eq!(world.frame_count(), 2);
    }

    #[test]
    fn names_stay_unique() {
        let mut world = World::new();
        let mut store = NamedFrameStore::new();
        store.create_and_register(&mut world, "a").unwrap();
        store.create_and_register(&mut world, "b").unwrap();
        assert_eq!(
            store.create_and_register(&mut world, "a"),
            Err(WorldError::DuplicateName("a".to_string()))
        );
        assert_eq!(
            store.rename(&mut world, "a", "b"),
            Err(WorldError::DuplicateName("b".to_string()))
        );
        assert_eq!(
            store.rename(&mut world, "missing", "c"),
            Err(WorldError::UnknownName("missing".to_string()))
        );
    }

    #[test]
    fn rename_updates_world_and_registry() {
        let mut world = World::new();
        let mut store = NamedFrameStore::new();
        let id = store.create_and_register(&mut world, "old").unwrap();
        store.rename(&mut world, "old", "new").unwrap();
        assert!(!store.has_frame("old"));
        assert_eq!(store.get_frame("new"), Some(id));
        assert_eq!(world.frame(id).unwrap().name(), "new");
    }

    #[test]
    fn register_makes_temporary_frames_permanent() {
        let mut world = World::new();
        let mut store = NamedFrameStore::new();
        let tmp = world.add_temporary_frame();
        store.register(&mut world, tmp, "kept").unwrap();
        assert!(!world.frame(tmp).unwrap().is_temporary());
        assert!(world.collect_temporary_frames().is_empty());
    }

    #[test]
    fn delete_removes_the_frame() {
        let mut world = World::new();
        let mut store = NamedFrameStore::for_world(&world);
        let id = store.create_and_register(&mut world, "part").unwrap();
        world
            .add_relation(
                world.origin(),
                id,
                RelationKind::Logical {
                    variable: false,
                    persistent: false,
                },
            )
            .unwrap();
        assert_eq!(store.delete(&mut world, "part"), Ok(id));
        assert!(!world.contains_frame(id));
        assert!(world.relations_of(world.origin()).is_empty());
        assert_eq!(store.delete(&mut world, ORIGIN_NAME), Err(WorldError::OriginRemoval));
        assert!(store.has_frame(ORIGIN_NAME));
    }
}
