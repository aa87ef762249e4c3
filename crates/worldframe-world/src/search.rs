//! Path search over the relations visible in a topology.
//!
//! [`find_path`] is a bidirectional breadth-first search.  Both frontiers
//! grow one whole level at a time, the smaller one first, and each keeps a
//! predecessor map (frame → discovering relation) that doubles as its visited
//! set.  The first frame discovered by both sides ends the search.
//!
//! A newly discovered frame is only queued for expansion when it is the far
//! endpoint or has more than one visible relation.  A frame with a single
//! relation is a dead end: its only neighbour is the frame it was reached
//! from.  Interior frames of a shortest path always have at least two
//! relations, so the pruning never hides one, and because frontiers are
//! level-complete the first meeting yields a shortest path.  The randomised
//! test below checks this against an exhaustive breadth-first search.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;
use worldframe_types::{FrameId, RelationId};

use crate::topology::Topology;
use crate::world::World;

type Predecessors = HashMap<FrameId, Option<RelationId>>;

/// Visible `(relation, neighbour)` pairs per frame, computed once per search.
struct Neighbours<'a> {
    world: &'a World,
    topology: &'a Topology,
    cache: HashMap<FrameId, Vec<(RelationId, FrameId)>>,
}

impl<'a> Neighbours<'a> {
    fn new(world: &'a World, topology: &'a Topology) -> Self {
        Self {
            world,
            topology,
            cache: HashMap::new(),
        }
    }

    fn of(&mut self, frame: FrameId) -> &[(RelationId, FrameId)] {
        let (world, topology) = (self.world, self.topology);
        self.cache.entry(frame).or_insert_with(|| {
            topology
                .visible_relations(world, frame)
                .into_iter()
                .filter_map(|relation| relation.other_end(frame).map(|other| (relation.id(), other)))
                .collect()
        })
    }

    fn degree(&mut self, frame: FrameId) -> usize {
        self.of(frame).len()
    }
}

/// A shortest relation path `from → to` in `topology`.
///
/// Returns `Some(vec![])` when `from == to` and `None` when either frame is
/// unknown or they are not connected.  Among equally short paths the one
/// found first wins; same-endpoint relations are tried in the topology's
/// family preference order.
pub fn find_path(world: &World, topology: &Topology, from: FrameId, to: FrameId) -> Option<Vec<RelationId>> {
    if !world.contains_frame(from) || !world.contains_frame(to) {
        return None;
    }
    if from == to {
        return Some(Vec::new());
    }

    let mut neighbours = Neighbours::new(world, topology);
    let mut forward: Predecessors = HashMap::from([(from, None)]);
    let mut backward: Predecessors = HashMap::from([(to, None)]);
    let mut forward_frontier = vec![from];
    let mut backward_frontier = vec![to];

    while !forward_frontier.is_empty() && !backward_frontier.is_empty() {
        let meeting = if forward_frontier.len() <= backward_frontier.len() {
            expand(&mut neighbours, &mut forward_frontier, &mut forward, &backward, to)
        } else {
            expand(&mut neighbours, &mut backward_frontier, &mut backward, &forward, from)
        };
        if let Some(meeting) = meeting {
            return reconstruct(world, &forward, &backward, from, to, meeting);
        }
    }
    None
}

/// Expand one full level of `frontier`.  Returns the meeting frame once a
/// discovered frame is already known to the other side.
fn expand(
    neighbours: &mut Neighbours<'_>,
    frontier: &mut Vec<FrameId>,
    visited: &mut Predecessors,
    other_side: &Predecessors,
    far_end: FrameId,
) -> Option<FrameId> {
    let mut next = Vec::new();
    for frame in std::mem::take(frontier) {
        let candidates = neighbours.of(frame).to_vec();
        for (relation, neighbour) in candidates {
            if visited.contains_key(&neighbour) {
                continue;
            }
            visited.insert(neighbour, Some(relation));
            if other_side.contains_key(&neighbour) {
                return Some(neighbour);
            }
            if neighbour == far_end || neighbours.degree(neighbour) > 1 {
                next.push(neighbour);
            }
        }
    }
    *frontier = next;
    None
}

fn reconstruct(
    world: &World,
    forward: &Predecessors,
    backward: &Predecessors,
    from: FrameId,
    to: FrameId,
    meeting: FrameId,
) -> Option<Vec<RelationId>> {
    let mut path = Vec::new();
    let mut frame = meeting;
    while frame != from {
        let relation = (*forward.get(&frame)?)?;
        path.push(relation);
        frame = world.relation(relation)?.other_end(frame)?;
    }
    path.reverse();

    let mut frame = meeting;
    while frame != to {
        let relation = (*backward.get(&frame)?)?;
        path.push(relation);
        frame = world.relation(relation)?.other_end(frame)?;
    }
    Some(path)
}

/// [`find_path`], re-derived inside a single runtime.
///
/// If the path crosses a relation whose value belongs to a runtime, the
/// search is repeated in `topology.for_runtime(r)` for the first such
/// runtime so one composed value never mixes runtimes.  The first path is
/// kept when it already lies entirely in that runtime.
pub fn relations_to(world: &World, topology: &Topology, from: FrameId, to: FrameId) -> Option<Vec<RelationId>> {
    let path = find_path(world, topology, from, to)?;
    let runtime = path
        .iter()
        .find_map(|relation| topology.resolve(world, *relation)?.runtime());
    let Some(runtime) = runtime else {
        debug!(%from, %to, hops = path.len(), "path found");
        return Some(path);
    };

    let scoped = topology.for_runtime(runtime);
    if path.iter().all(|relation| scoped.is_visible(world, *relation)) {
        debug!(%from, %to, hops = path.len(), %runtime, "path found within one runtime");
        return Some(path);
    }
    let rederived = find_path(world, &scoped, from, to);
    debug!(
        %from,
        %to,
        %runtime,
        found = rederived.is_some(),
        "path crossed runtimes, re-derived"
    );
    rederived
}

/// Frames reachable from `frame`, in breadth-first order, `frame` excluded.
pub fn connected_frames(world: &World, topology: &Topology, frame: FrameId) -> Vec<FrameId> {
    if !world.contains_frame(frame) {
        return Vec::new();
    }
    let mut neighbours = Neighbours::new(world, topology);
    let mut seen = HashSet::from([frame]);
    let mut queue = VecDeque::from([frame]);
    let mut reached = Vec::new();
    while let Some(current) = queue.pop_front() {
        let candidates = neighbours.of(current).to_vec();
        for (_, neighbour) in candidates {
            if seen.insert(neighbour) {
                reached.push(neighbour);
                queue.push_back(neighbour);
            }
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{DynamicValues, RelationKind};
    use crate::value::SharedValue;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use worldframe_geometry::{Transformation, Vector};
    use worldframe_types::RuntimeId;

    fn logical() -> RelationKind {
        RelationKind::Logical {
            variable: false,
            persistent: false,
        }
    }

    fn fixed() -> RelationKind {
        RelationKind::Static(Transformation::from_translation(Vector::X))
    }

    fn live(runtime: u32) -> RelationKind {
        let value = DynamicValues::new(SharedValue::new(Transformation::IDENTITY, Some(RuntimeId(runtime))));
        RelationKind::Dynamic {
            commanded: value.clone(),
            measured: value,
        }
    }

    /// Reference: plain BFS distance.
    fn bfs_distance(world: &World, topology: &Topology, from: FrameId, to: FrameId) -> Option<usize> {
        let mut dist = HashMap::from([(from, 0_usize)]);
        let mut queue = VecDeque::from([from]);
        while let Some(frame) = queue.pop_front() {
            if frame == to {
                return dist.get(&frame).copied();
            }
            let d = dist[&frame];
            for relation in topology.visible_relations(world, frame) {
                if let Some(next) = relation.other_end(frame) {
                    if !dist.contains_key(&next) {
                        dist.insert(next, d + 1);
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    fn assert_valid_path(world: &World, from: FrameId, to: FrameId, path: &[RelationId]) {
        let mut frame = from;
        for relation in path {
            frame = world.relation(*relation).unwrap().other_end(frame).unwrap();
        }
        assert_eq!(frame, to);
    }

    #[test]
    fn matches_exhaustive_bfs_on_random_graphs() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let topology = Topology::commanded();
        for _ in 0..200 {
            let mut world = World::new();
            let count = rng.gen_range(2..14);
            let frames: Vec<FrameId> = (0..count).map(|i| world.add_frame(format!("f{i}"))).collect();
            let edges = rng.gen_range(0..count * 2);
            for _ in 0..edges {
                let a = frames[rng.gen_range(0..count)];
                let b = frames[rng.gen_range(0..count)];
                if a != b {
                    world.add_relation(a, b, logical()).unwrap();
                }
            }
            for &from in &frames {
                for &to in &frames {
                    let expected = bfs_distance(&world, &topology, from, to);
                    let found = find_path(&world, &topology, from, to);
                    assert_eq!(found.as_ref().map(Vec::len), expected, "{from} -> {to}");
                    if let Some(path) = found {
                        assert_valid_path(&world, from, to, &path);
                    }
                }
            }
        }
    }

    #[test]
    fn symmetric_existence() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut world = World::new();
        let frames: Vec<FrameId> = (0..12).map(|i| world.add_frame(format!("f{i}"))).collect();
        for _ in 0..10 {
            let a = frames[rng.gen_range(0..12)];
            let b = frames[rng.gen_range(0..12)];
            if a != b {
                world.add_relation(a, b, logical()).unwrap();
            }
        }
        let t = Topology::commanded();
        for &a in &frames {
            for &b in &frames {
                assert_eq!(
                    relations_to(&world, &t, a, b).is_some(),
                    relations_to(&world, &t, b, a).is_some()
                );
            }
        }
    }

    #[test]
    fn unknown_frames_have_no_path() {
        let world = World::new();
        let t = Topology::commanded();
        assert_eq!(find_path(&world, &t, world.origin(), FrameId(42)), None);
        assert!(connected_frames(&world, &t, FrameId(42)).is_empty());
    }

    #[test]
    fn long_chain_through_degree_two_frames() {
        let mut world = World::new();
        let frames: Vec<FrameId> = (0..20).map(|i| world.add_frame(format!("f{i}"))).collect();
        let relations: Vec<RelationId> = frames
            .windows(2)
            .map(|pair| world.add_relation(pair[0], pair[1], fixed()).unwrap())
            .collect();
        // Dead-end spurs hanging off the chain.
        for frame in &frames[1..19] {
            let spur = world.add_frame("spur");
            world.add_relation(*frame, spur, fixed()).unwrap();
        }
        let path = find_path(&world, &Topology::commanded(), frames[0], frames[19]).unwrap();
        assert_eq!(path, relations);
        let back = find_path(&world, &Topology::commanded(), frames[19], frames[0]).unwrap();
        assert_eq!(back.len(), 19);
    }

    #[test]
    fn dead_end_target_is_reached() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let leaf = world.add_frame("leaf");
        world.add_relation(a, b, fixed()).unwrap();
        let r = world.add_relation(b, leaf, fixed()).unwrap();
        let path = find_path(&world, &Topology::commanded(), a, leaf).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], r);
    }

    #[test]
    fn excluded_relations_and_frames_are_never_used() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        let d = world.add_frame("d");
        let direct = world.add_relation(a, d, logical()).unwrap();
        world.add_relation(a, b, logical()).unwrap();
        world.add_relation(b, d, logical()).unwrap();
        world.add_relation(a, c, logical()).unwrap();
        world.add_relation(c, d, logical()).unwrap();

        let t = Topology::commanded();
        assert_eq!(find_path(&world, &t, a, d), Some(vec![direct]));

        let without_direct = t.without_relations([direct]);
        let path = find_path(&world, &without_direct, a, d).unwrap();
        assert_eq!(path.len(), 2);
        assert!(!path.contains(&direct));

        let without_b = without_direct.without_frames([b]);
        let path = find_path(&world, &without_b, a, d).unwrap();
        for relation in &path {
            assert!(!world.relation(*relation).unwrap().touches(b));
        }

        let isolated = without_b.without_frames([c]);
        assert_eq!(find_path(&world, &isolated, a, d), None);
    }

    #[test]
    fn preference_breaks_ties_between_parallel_relations() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let link = world.add_relation(a, b, logical()).unwrap();
        let geo = world.add_relation(a, b, fixed()).unwrap();
        let t = Topology::commanded();
        assert_eq!(find_path(&world, &t, a, b), Some(vec![geo]));
        let prefer_logical = t.with_preference([crate::RelationFamily::Logical]);
        assert_eq!(find_path(&world, &prefer_logical, a, b), Some(vec![link]));
    }

    #[test]
    fn path_is_rederived_within_one_runtime() {
        // a ─(rt1)─ b ─(rt2)─ d   is shorter than
        // a ─(rt1)─ b ─(rt1)─ c ─(rt1)─ d
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        let d = world.add_frame("d");
        let ab = world.add_relation(a, b, live(1)).unwrap();
        let bd = world.add_relation(b, d, live(2)).unwrap();
        let bc = world.add_relation(b, c, logical()).unwrap();
        let cd = world.add_relation(c, d, logical()).unwrap();
        let t = Topology::commanded();

        assert_eq!(find_path(&world, &t, a, d), Some(vec![ab, bd]));
        assert_eq!(relations_to(&world, &t, a, d), Some(vec![ab, bc, cd]));
    }

    #[test]
    fn runtime_free_path_is_kept() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let r = world.add_relation(a, b, fixed()).unwrap();
        assert_eq!(relations_to(&world, &Topology::commanded(), a, b), Some(vec![r]));
    }

    #[test]
    fn connected_frames_is_breadth_first() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        world.add_relation(a, b, fixed()).unwrap();
        world.add_relation(b, c, fixed()).unwrap();
        let _lonely = world.add_frame("lonely");
        assert_eq!(connected_frames(&world, &Topology::commanded(), a), vec![b, c]);
    }
}
