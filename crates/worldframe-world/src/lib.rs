//! `worldframe-world` – the frame/relation graph of a robot cell.
//!
//! A [`World`] stores frames (named spatial anchors) and directed relations
//! between them.  Queries go through a [`Frame`] handle and always name the
//! [`Topology`] they are asked in: the commanded or measured view of the
//! mechanism, narrowed by filters, overlaid with what-if values or frozen by
//! a snapshot.
//!
//! ```rust
//! use std::collections::HashMap;
//! use worldframe_geometry::{Transformation, Vector};
//! use worldframe_world::{DynamicValues, RelationKind, SharedValue, Topology, World};
//!
//! let mut world = World::new();
//! let base = world.add_frame("robot base");
//! let flange = world.add_frame("flange");
//! world
//!     .add_relation(
//!         world.origin(),
//!         base,
//!         RelationKind::Static(Transformation::from_translation(Vector::new(0.5, 0.0, 0.0))),
//!     )
//!     .unwrap();
//!
//! let commanded = SharedValue::new(Transformation::from_translation(Vector::Z), None);
//! let measured = SharedValue::new(Transformation::from_translation(Vector::new(0.0, 0.0, 0.99)), None);
//! let axis = world
//!     .add_relation(
//!         base,
//!         flange,
//!         RelationKind::Dynamic {
//!             commanded: DynamicValues::new(commanded),
//!             measured: DynamicValues::new(measured),
//!         },
//!     )
//!     .unwrap();
//!
//! let origin = world.frame(world.origin()).unwrap();
//! let target = origin.transformation_to(flange, &Topology::commanded()).unwrap();
//! let actual = origin.transformation_to(flange, &Topology::measured()).unwrap();
//! assert!(target.translation().approx_eq(&Vector::new(0.5, 0.0, 1.0)));
//! assert!(!actual.approx_eq(&target));
//!
//! // What if the axis were at its home position?
//! let home = Topology::commanded()
//!     .with_substitution(HashMap::from([(axis, Transformation::IDENTITY)]), HashMap::new());
//! let at_home = origin.transformation_to(flange, &home).unwrap();
//! assert!(at_home.translation().approx_eq(&Vector::new(0.5, 0.0, 0.0)));
//! ```

pub mod chain;
pub mod frame;
pub mod naming;
pub mod relation;
pub mod representation;
pub mod search;
pub mod store;
pub mod topology;
pub mod value;
pub mod velocity;
pub mod world;

pub use chain::{TransformationHandle, TwistHandle};
pub use frame::{Frame, TeachingInfo};
pub use naming::FrameNamer;
pub use relation::{
    ChangeRejection, ChangeSet, DynamicValues, Geometric, NewRelation, Relation, RelationFamily,
    RelationKind,
};
pub use representation::{Orientation, Point, Pose};
pub use store::{FrameStore, NamedFrameStore};
pub use topology::{ResolvedRelation, Substitution, Topology, View};
pub use value::{Resolved, SharedValue, ValueSource};
pub use velocity::Velocity;
pub use world::{ORIGIN_NAME, RelationListener, World};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use worldframe_geometry::{Transformation, Vector};
    use worldframe_types::{FrameId, RelationId};

    /// A random static tree hanging off the origin.
    fn random_tree(rng: &mut StdRng, size: usize) -> (World, Vec<FrameId>) {
        let mut world = World::new();
        let mut frames = vec![world.origin()];
        for i in 0..size {
            let frame = world.add_frame(format!("f{i}"));
            let parent = frames[rng.gen_range(0..frames.len())];
            let t = Transformation::from_abc(
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-1.5..1.5),
                rng.gen_range(-3.0..3.0),
            );
            // Store some edges child → parent so paths walk both directions.
            let (from, to, t) = if rng.gen_bool(0.5) {
                (parent, frame, t)
            } else {
                (frame, parent, t.invert())
            };
            world.add_relation(from, to, RelationKind::Static(t)).unwrap();
            frames.push(frame);
        }
        (world, frames)
    }

    #[test]
    fn chain_and_inverse_consistency_on_random_trees() {
        let mut rng = StdRng::seed_from_u64(42);
        let t = Topology::measured().without_dynamic();
        for _ in 0..20 {
            let (world, frames) = random_tree(&mut rng, 10);
            for _ in 0..20 {
                let a = frames[rng.gen_range(0..frames.len())];
                let b = frames[rng.gen_range(0..frames.len())];
                let c = frames[rng.gen_range(0..frames.len())];
                let ab = world.frame(a).unwrap().transformation_to(b, &t).unwrap();
                let bc = world.frame(b).unwrap().transformation_to(c, &t).unwrap();
                let ac = world.frame(a).unwrap().transformation_to(c, &t).unwrap();
                let ba = world.frame(b).unwrap().transformation_to(a, &t).unwrap();
                assert!(ab.multiply(&bc).approx_eq(&ac));
                assert!(ab.invert().approx_eq(&ba));
            }
        }
    }

    #[test]
    fn filter_monotonicity() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut world = World::new();
        let frames: Vec<FrameId> = (0..10).map(|i| world.add_frame(format!("f{i}"))).collect();
        let mut relations = Vec::new();
        for _ in 0..25 {
            let a = frames[rng.gen_range(0..10)];
            let b = frames[rng.gen_range(0..10)];
            if a != b {
                let kind = RelationKind::Logical {
                    variable: false,
                    persistent: false,
                };
                relations.push(world.add_relation(a, b, kind).unwrap());
            }
        }
        let excluded: Vec<RelationId> = relations.iter().copied().step_by(3).collect();
        let excluded_frame = frames[4];
        let t = Topology::commanded()
            .without_relations(excluded.clone())
            .without_frames([excluded_frame]);

        for &a in &frames {
            for &b in &frames {
                let Some(path) = world.frame(a).unwrap().relations_to(b, &t) else {
                    continue;
                };
                for relation in &path {
                    assert!(!excluded.contains(relation));
                    assert!(!world.relation(*relation).unwrap().touches(excluded_frame));
                }
            }
        }
    }

    #[test]
    fn substitution_precedence_end_to_end() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        let t1 = Transformation::from_translation(Vector::X);
        let t2 = Transformation::from_translation(Vector::Y);
        let r1 = world.add_relation(a, b, RelationKind::Static(t1)).unwrap();
        let r2 = world.add_relation(b, c, RelationKind::Static(t2)).unwrap();
        let v = Transformation::from_translation(Vector::Z);

        let what_if = Topology::commanded().with_substitution(HashMap::from([(r1, v)]), HashMap::new());
        assert_eq!(what_if.transformation_of(&world, r1).unwrap().current_value(), Ok(v));
        assert_eq!(what_if.transformation_of(&world, r2).unwrap().current_value(), Ok(t2));
        let a_c = world.frame(a).unwrap().transformation_to(c, &what_if).unwrap();
        assert!(a_c.approx_eq(&v.multiply(&t2)));
        // The world still reports the stored value.
        let a_c = world.frame(a).unwrap().transformation_to(c, &Topology::commanded()).unwrap();
        assert!(a_c.approx_eq(&t1.multiply(&t2)));
    }

    #[test]
    fn snapshot_scenario() {
        let mut world = World::new();
        let base = world.add_frame("base");
        let tool = world.add_frame("tool");
        let live = SharedValue::new(Transformation::from_translation(Vector::X), None);
        world
            .add_relation(
                base,
                tool,
                RelationKind::Dynamic {
                    commanded: DynamicValues::new(live.clone()),
                    measured: DynamicValues::new(live.clone()),
                },
            )
            .unwrap();

        let snapshot = Topology::measured().lazy_snapshot();
        let frame = world.frame(base).unwrap();
        let first = frame.transformation_to(tool, &snapshot).unwrap();
        live.set(Transformation::from_translation(Vector::Y));
        let second = frame.transformation_to(tool, &snapshot).unwrap();
        assert_eq!(first, second);

        let clone = snapshot.clone();
        assert_eq!(frame.transformation_to(tool, &clone).unwrap(), first);
        assert!(
            frame
                .transformation_to(tool, &Topology::measured())
                .unwrap()
                .translation()
                .approx_eq(&Vector::Y)
        );
    }
}
