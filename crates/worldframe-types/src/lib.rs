//! `worldframe-types` – identifiers and error types shared across the
//! worldframe workspace.
//!
//! Frames and relations live in an arena owned by
//! `worldframe_world::World`; everything else refers to them through the
//! small `Copy` identifiers defined here.  Identity is the id, never the
//! name: two frames may carry the same display name and still be different
//! frames.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Stable identifier of a frame inside a `World` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Stable identifier of a relation inside a `World` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub u64);

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relation#{}", self.0)
    }
}

/// Opaque tag of the execution runtime a live value belongs to.
///
/// Values from different runtimes cannot be composed directly; topologies
/// use the tag for `for_runtime` / `without_runtime` filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeId(pub u32);

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime#{}", self.0)
    }
}

/// Identifier of a device that frames can carry teaching hints for
/// (e.g. `"lbr_iiwa"`, `"gripper"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned when registering a relation listener; pass it back to
/// remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Failure of an external value source (sensor read, stale runtime value).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("value read failed: {0}")]
pub struct ReadError(pub String);

/// Failure to produce a concrete transformation between two frames.
///
/// Always carries the offending frame pair.  `None` stands for a local
/// (reference-less) value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformationError {
    #[error("no path from {from} to {to}")]
    NoPath { from: FrameId, to: FrameId },

    #[error("{relation} on the path from {from} to {to} has no value in this topology")]
    Unresolved {
        from: FrameId,
        to: FrameId,
        relation: RelationId,
    },

    #[error("reading the transformation from {from} to {to} failed: {source}")]
    ReadFailure {
        from: FrameId,
        to: FrameId,
        #[source]
        source: ReadError,
    },

    #[error("cannot convert local value ({from:?} -> {to:?}) without an enclosing pose")]
    LocalValue {
        from: Option<FrameId>,
        to: Option<FrameId>,
    },
}

impl TransformationError {
    /// The `(from, to)` frame pair the failure refers to, when both are known.
    pub fn frames(&self) -> Option<(FrameId, FrameId)> {
        match self {
            Self::NoPath { from, to }
            | Self::Unresolved { from, to, .. }
            | Self::ReadFailure { from, to, .. } => Some((*from, *to)),
            Self::LocalValue { from, to } => from.zip(*to),
        }
    }
}

/// Failure to produce or re-express a velocity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VelocityError {
    #[error("no path from {from} to {to}")]
    NoPath { from: FrameId, to: FrameId },

    #[error("twist of {relation} between {from} and {to} is unavailable")]
    Unresolved {
        from: FrameId,
        to: FrameId,
        relation: RelationId,
    },

    #[error("reading the twist from {from} to {to} failed: {source}")]
    ReadFailure {
        from: FrameId,
        to: FrameId,
        #[source]
        source: ReadError,
    },

    #[error("local pivot or orientation cannot be converted without an enclosing pose")]
    LocalWithoutPose,

    #[error("velocity is not local; use a topology-backed conversion")]
    NotLocal,

    #[error(transparent)]
    Transformation(#[from] TransformationError),
}

/// Failure of a mutation on the world graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    #[error("unknown frame {0}")]
    UnknownFrame(FrameId),

    #[error("unknown relation {0}")]
    UnknownRelation(RelationId),

    #[error("a frame named '{0}' is already registered")]
    DuplicateName(String),

    #[error("no frame named '{0}' is registered")]
    UnknownName(String),

    #[error("change rejected for {relation}: {reason}")]
    ChangeRejected { relation: String, reason: String },

    #[error("the world origin cannot be removed")]
    OriginRemoval,
}

/// Error a relation listener may report; it is logged and never propagated.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);
