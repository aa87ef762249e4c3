//! Scene files: a TOML description of frames and relations.
//!
//! ```toml
//! [[frames]]
//! name = "table"
//!
//! [[relations]]
//! from = "World origin"
//! to = "table"
//! kind = "static"
//! translation = [1.0, 0.0, 0.0]
//! abc = [0.0, 0.0, 0.0]          # yaw, pitch, roll in degrees
//!
//! [[relations]]
//! from = "table"
//! to = "slide"
//! kind = "dynamic"
//! runtime = 1
//! commanded = { translation = [0.2, 0.0, 0.0] }
//! measured = { translation = [0.19, 0.0, 0.0] }
//! twist = { linear = [0.1, 0.0, 0.0] }
//!
//! [[relations]]
//! from = "table"
//! to = "part"
//! kind = "logical"
//! variable = true
//! ```
//!
//! Frames named in relations but not declared are created on the fly.
//! Dynamic and observation values are fixed at their initial values; a scene
//! file has no driver behind it.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use worldframe_geometry::{Transformation, Twist, Vector};
use worldframe_types::{RuntimeId, WorldError};
use worldframe_world::{DynamicValues, FrameStore, NamedFrameStore, RelationKind, SharedValue, World};

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("relation {from} -> {to}: {source}")]
    Relation {
        from: String,
        to: String,
        #[source]
        source: WorldError,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneFile {
    #[serde(default)]
    frames: Vec<FrameEntry>,
    #[serde(default)]
    relations: Vec<RelationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RelationEntry {
    from: String,
    to: String,
    #[serde(flatten)]
    kind: KindEntry,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum KindEntry {
    Static {
        #[serde(default)]
        translation: [f64; 3],
        #[serde(default)]
        abc: [f64; 3],
    },
    Dynamic {
        commanded: PoseEntry,
        /// Defaults to the commanded value.
        measured: Option<PoseEntry>,
        twist: Option<TwistEntry>,
        runtime: Option<u32>,
    },
    Observation {
        value: PoseEntry,
        runtime: Option<u32>,
    },
    Logical {
        #[serde(default)]
        variable: bool,
        #[serde(default)]
        persistent: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoseEntry {
    #[serde(default)]
    translation: [f64; 3],
    #[serde(default)]
    abc: [f64; 3],
}

impl PoseEntry {
    fn transformation(&self) -> Transformation {
        pose(self.translation, self.abc)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TwistEntry {
    #[serde(default)]
    linear: [f64; 3],
    #[serde(default)]
    angular: [f64; 3],
}

fn pose(translation: [f64; 3], abc_degrees: [f64; 3]) -> Transformation {
    let [x, y, z] = translation;
    let [a, b, c] = abc_degrees.map(f64::to_radians);
    Transformation::from_abc(x, y, z, a, b, c)
}

fn values(
    transformation: Transformation,
    twist: Option<TwistEntry>,
    runtime: Option<RuntimeId>,
) -> DynamicValues {
    let values = DynamicValues::new(SharedValue::new(transformation, runtime));
    match twist {
        Some(t) => values.with_twist(SharedValue::new(
            Twist::new(Vector::from(t.linear), Vector::from(t.angular)),
            runtime,
        )),
        None => values,
    }
}

impl KindEntry {
    fn into_kind(self) -> RelationKind {
        match self {
            Self::Static { translation, abc } => RelationKind::Static(pose(translation, abc)),
            Self::Dynamic {
                commanded,
                measured,
                twist,
                runtime,
            } => {
                let runtime = runtime.map(RuntimeId);
                let measured = measured.unwrap_or(commanded);
                RelationKind::Dynamic {
                    commanded: values(commanded.transformation(), twist, runtime),
                    measured: values(measured.transformation(), twist, runtime),
                }
            }
            Self::Observation { value, runtime } => {
                RelationKind::Observation(values(value.transformation(), None, runtime.map(RuntimeId)))
            }
            Self::Logical { variable, persistent } => RelationKind::Logical { variable, persistent },
        }
    }
}

/// A loaded scene: the world and the names its frames are registered under.
#[derive(Debug)]
pub struct Scene {
    pub world: World,
    pub store: NamedFrameStore,
}

impl Scene {
    /// A world holding only its origin.
    pub fn empty() -> Self {
        let world = World::new();
        let store = NamedFrameStore::for_world(&world);
        Self { world, store }
    }
}

pub fn load(path: &Path) -> Result<Scene, SceneError> {
    let raw = fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let scene = parse(&raw)?;
    info!(
        path = %path.display(),
        frames = scene.world.frame_count(),
        relations = scene.world.relations().count(),
        "scene loaded"
    );
    Ok(scene)
}

pub fn parse(raw: &str) -> Result<Scene, SceneError> {
    let file: SceneFile = toml::from_str(raw)?;
    let mut scene = Scene::empty();
    let Scene { world, store } = &mut scene;

    for frame in &file.frames {
        store.get_or_create_frame(world, &frame.name);
    }
    for entry in file.relations {
        let from = store.get_or_create_frame(world, &entry.from);
        let to = store.get_or_create_frame(world, &entry.to);
        world
            .add_relation(from, to, entry.kind.into_kind())
            .map_err(|source| SceneError::Relation {
                from: entry.from.clone(),
                to: entry.to.clone(),
                source,
            })?;
    }
    Ok(scene)
}
