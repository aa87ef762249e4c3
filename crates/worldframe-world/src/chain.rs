//! Folding a relation path into one transformation or twist.

use worldframe_geometry::{Transformation, Twist};
use worldframe_types::{FrameId, RelationId, RuntimeId, TransformationError, VelocityError};

use crate::topology::{ResolvedRelation, Topology};
use crate::value::Resolved;
use crate::world::World;

/// One relation of a path, with the direction it is walked in.
#[derive(Debug, Clone)]
struct Link {
    relation: RelationId,
    /// Walked from its `to` end towards its `from` end.
    inverted: bool,
    /// `None` when hidden or without a value in the topology.
    values: Option<ResolvedRelation>,
}

impl Link {
    fn transformation(&self) -> Option<&Resolved<Transformation>> {
        self.values.as_ref()?.transformation.as_ref()
    }

    fn twist(&self) -> Option<&Resolved<Twist>> {
        self.values.as_ref()?.twist.as_ref()
    }

    fn runtime(&self) -> Option<RuntimeId> {
        self.values.as_ref()?.runtime()
    }
}

fn links(world: &World, topology: &Topology, from: FrameId, path: &[RelationId]) -> Option<Vec<Link>> {
    let mut current = from;
    let mut links = Vec::with_capacity(path.len());
    for id in path {
        let relation = world.relation(*id)?;
        let next = relation.other_end(current)?;
        links.push(Link {
            relation: *id,
            inverted: relation.to() == current,
            values: topology.resolve(world, *id),
        });
        current = next;
    }
    Some(links)
}

/// The transformation of one frame relative to another along a fixed path.
///
/// Holding a handle does not read anything; [`current_value`] reads every
/// relation on the path and composes the result.
///
/// [`current_value`]: TransformationHandle::current_value
#[derive(Debug, Clone)]
pub struct TransformationHandle {
    from: FrameId,
    to: FrameId,
    links: Vec<Link>,
}

impl TransformationHandle {
    /// `None` when `path` does not lead from `from` through the world.
    pub fn new(world: &World, topology: &Topology, from: FrameId, to: FrameId, path: &[RelationId]) -> Option<Self> {
        Some(Self {
            from,
            to,
            links: links(world, topology, from, path)?,
        })
    }

    pub fn from(&self) -> FrameId {
        self.from
    }

    pub fn to(&self) -> FrameId {
        self.to
    }

    pub fn relations(&self) -> impl Iterator<Item = RelationId> + '_ {
        self.links.iter().map(|link| link.relation)
    }

    /// The runtime the composed value belongs to, if any relation on the
    /// path is runtime-bound.
    pub fn runtime(&self) -> Option<RuntimeId> {
        self.links.iter().find_map(Link::runtime)
    }

    /// `true` when every relation on the path has a constant value.
    pub fn is_constant(&self) -> bool {
        self.links
            .iter()
            .all(|link| link.transformation().is_some_and(Resolved::is_constant))
    }

    /// Read and compose the path.  An empty path yields the identity.
    ///
    /// # Errors
    ///
    /// [`TransformationError::Unresolved`] when a relation has no value in
    /// the topology, [`TransformationError::ReadFailure`] when reading one
    /// fails.
    pub fn current_value(&self) -> Result<Transformation, TransformationError> {
        let mut composed: Option<Transformation> = None;
        for link in &self.links {
            let edge = link.transformation().ok_or(TransformationError::Unresolved {
                from: self.from,
                to: self.to,
                relation: link.relation,
            })?;
            let edge = edge
                .current_value()
                .map_err(|source| TransformationError::ReadFailure {
                    from: self.from,
                    to: self.to,
                    source,
                })?;
            let edge = if link.inverted { edge.invert() } else { edge };
            composed = Some(match composed {
                None => edge,
                Some(previous) => previous.multiply(&edge),
            });
        }
        Ok(composed.unwrap_or(Transformation::IDENTITY))
    }
}

/// The twist of one frame relative to another along a fixed path.
#[derive(Debug, Clone)]
pub struct TwistHandle {
    from: FrameId,
    to: FrameId,
    links: Vec<Link>,
}

impl TwistHandle {
    pub fn new(world: &World, topology: &Topology, from: FrameId, to: FrameId, path: &[RelationId]) -> Option<Self> {
        Some(Self {
            from,
            to,
            links: links(world, topology, from, path)?,
        })
    }

    pub fn from(&self) -> FrameId {
        self.from
    }

    pub fn to(&self) -> FrameId {
        self.to
    }

    pub fn runtime(&self) -> Option<RuntimeId> {
        self.links.iter().find_map(Link::runtime)
    }

    fn unresolved(&self, relation: RelationId) -> VelocityError {
        VelocityError::Unresolved {
            from: self.from,
            to: self.to,
            relation,
        }
    }

    fn read<T: Copy>(&self, value: &Resolved<T>) -> Result<T, VelocityError> {
        value.current_value().map_err(|source| VelocityError::ReadFailure {
            from: self.from,
            to: self.to,
            source,
        })
    }

    /// Twist of `to` relative to `from`, pivot at `to`'s origin, expressed in
    /// `from`'s orientation.
    ///
    /// Each relation contributes the twist of its far frame relative to its
    /// near frame.  Those are rotated into `from`'s orientation, moved to
    /// `to`'s origin and summed.
    ///
    /// # Errors
    ///
    /// [`VelocityError::Unresolved`] when a relation has no twist or
    /// transformation in the topology, [`VelocityError::ReadFailure`] when
    /// reading one fails.
    pub fn current_value(&self) -> Result<Twist, VelocityError> {
        // (pose of the near frame, pose of the far frame, local twist) per link.
        let mut steps = Vec::with_capacity(self.links.len());
        let mut near = Transformation::IDENTITY;
        for link in &self.links {
            let transformation = link
                .transformation()
                .ok_or_else(|| self.unresolved(link.relation))?;
            let twist = link.twist().ok_or_else(|| self.unresolved(link.relation))?;
            let stored = self.read(transformation)?;
            let stored_twist = self.read(twist)?;

            let (edge, local) = if link.inverted {
                // Motion of the stored parent seen from the stored child.
                let local = stored_twist
                    .negate()
                    .change_pivot(&stored.translation().invert())
                    .change_orientation(&stored.rotation().invert());
                (stored.invert(), local)
            } else {
                (stored, stored_twist)
            };
            let far = near.multiply(&edge);
            steps.push((near, far, local));
            near = far;
        }

        let end = *near.translation();
        Ok(steps.iter().fold(Twist::ZERO, |sum, (near, far, local)| {
            let offset = end.sub(far.translation());
            sum.add(&local.change_orientation(near.rotation()).change_pivot(&offset))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{DynamicValues, RelationKind};
    use crate::value::SharedValue;
    use std::f64::consts::FRAC_PI_2;
    use worldframe_geometry::Vector;

    fn joint(transformation: Transformation, twist: Twist) -> RelationKind {
        let values = DynamicValues::new(SharedValue::new(transformation, None)).with_twist(SharedValue::new(twist, None));
        RelationKind::Dynamic {
            commanded: values.clone(),
            measured: values,
        }
    }

    fn path(world: &World, from: FrameId, to: FrameId) -> Vec<RelationId> {
        crate::search::find_path(world, &Topology::commanded(), from, to).unwrap()
    }

    #[test]
    fn empty_path_is_identity() {
        let world = World::new();
        let handle =
            TransformationHandle::new(&world, &Topology::commanded(), world.origin(), world.origin(), &[]).unwrap();
        assert_eq!(handle.current_value(), Ok(Transformation::IDENTITY));
        assert!(handle.is_constant());
        assert_eq!(handle.runtime(), None);
    }

    #[test]
    fn inverted_edges_compose() {
        // a → b and c → b stored; walking a → b → c inverts the second one.
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        let ab = Transformation::from_abc(1.0, 0.0, 0.0, FRAC_PI_2, 0.0, 0.0);
        let cb = Transformation::from_abc(0.0, 1.0, 0.0, 0.0, 0.2, 0.0);
        world.add_relation(a, b, RelationKind::Static(ab)).unwrap();
        world.add_relation(c, b, RelationKind::Static(cb)).unwrap();

        let handle = TransformationHandle::new(&world, &Topology::commanded(), a, c, &path(&world, a, c)).unwrap();
        assert!(handle.current_value().unwrap().approx_eq(&ab.multiply(&cb.invert())));
        assert_eq!(handle.relations().count(), 2);
    }

    #[test]
    fn chain_consistency_on_static_tree() {
        let mut world = World::new();
        let root = world.origin();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        world
            .add_relation(root, a, RelationKind::Static(Transformation::from_abc(1.0, 2.0, 3.0, 0.1, 0.2, 0.3)))
            .unwrap();
        world
            .add_relation(b, root, RelationKind::Static(Transformation::from_abc(-1.0, 0.5, 0.0, 1.0, -0.4, 0.0)))
            .unwrap();
        world
            .add_relation(b, c, RelationKind::Static(Transformation::from_abc(0.0, 0.0, 2.0, -0.7, 0.0, 0.9)))
            .unwrap();
        let t = Topology::commanded().without_dynamic();
        let frame = |id| world.frame(id).unwrap();

        for (x, y, z) in [(a, b, c), (c, root, a), (b, a, c)] {
            let xy = frame(x).transformation_to(y, &t).unwrap();
            let yz = frame(y).transformation_to(z, &t).unwrap();
            let xz = frame(x).transformation_to(z, &t).unwrap();
            assert!(xy.multiply(&yz).approx_eq(&xz));
            assert!(xz.invert().approx_eq(&frame(z).transformation_to(x, &t).unwrap()));
        }
    }

    #[test]
    fn twists_along_a_chain_sum_at_the_moving_frame() {
        // base → upper arm rotating about Z at 1 rad/s, then a fixed 1 m link
        // along X.  The tip moves along +Y at 1 m/s.
        let mut world = World::new();
        let base = world.add_frame("base");
        let arm = world.add_frame("arm");
        let tip = world.add_frame("tip");
        world
            .add_relation(base, arm, joint(Transformation::IDENTITY, Twist::new(Vector::ZERO, Vector::Z)))
            .unwrap();
        world
            .add_relation(arm, tip, RelationKind::Static(Transformation::from_translation(Vector::X)))
            .unwrap();

        let handle = TwistHandle::new(&world, &Topology::commanded(), base, tip, &path(&world, base, tip)).unwrap();
        let twist = handle.current_value().unwrap();
        assert!(twist.linear.approx_eq(&Vector::Y));
        assert!(twist.angular.approx_eq(&Vector::Z));
    }

    #[test]
    fn reversed_query_gives_the_inverse_motion() {
        // Joint rotated 90° about Z, spinning about Z, child offset along X.
        let mut world = World::new();
        let base = world.add_frame("base");
        let link = world.add_frame("link");
        let pose = Transformation::from_abc(1.0, 0.0, 0.0, FRAC_PI_2, 0.0, 0.0);
        let spin = Twist::new(Vector::new(0.0, 0.5, 0.0), Vector::Z);
        world.add_relation(base, link, joint(pose, spin)).unwrap();

        let forward = TwistHandle::new(&world, &Topology::commanded(), base, link, &path(&world, base, link))
            .unwrap()
            .current_value()
            .unwrap();
        let backward = TwistHandle::new(&world, &Topology::commanded(), link, base, &path(&world, link, base))
            .unwrap()
            .current_value()
            .unwrap();

        // Moving the forward twist to base's origin and into link's
        // orientation, then negating, must give the backward one.
        let expected = forward
            .change_pivot(&pose.translation().invert())
            .change_orientation(&pose.rotation().invert())
            .negate();
        assert!(backward.approx_eq(&expected));
    }

    #[test]
    fn missing_twist_is_unresolved() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let r = world
            .add_relation(
                a,
                b,
                RelationKind::Logical {
                    variable: false,
                    persistent: false,
                },
            )
            .unwrap();
        let handle = TwistHandle::new(&world, &Topology::commanded(), a, b, &[r]).unwrap();
        assert_eq!(
            handle.current_value(),
            Err(VelocityError::Unresolved {
                from: a,
                to: b,
                relation: r
            })
        );
    }
}
