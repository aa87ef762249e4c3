//! Runtime-scoped value sources.
//!
//! Dynamic relations do not store their transformation or twist; they hold a
//! [`ValueSource`] that is asked for the current value on demand.  A source
//! may belong to an execution runtime ([`RuntimeId`]) and may fail to read
//! (stale sensor, disconnected controller).

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use worldframe_types::{ReadError, RuntimeId};

/// A possibly time-varying value that can be materialised on demand.
pub trait ValueSource<T>: Send + Sync + fmt::Debug {
    /// Runtime the value belongs to, `None` for runtime-independent values.
    fn runtime(&self) -> Option<RuntimeId>;

    /// Read the value right now.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when the underlying value cannot be read.
    fn current_value(&self) -> Result<T, ReadError>;
}

/// A value as seen through a topology: either frozen or still live.
#[derive(Debug, Clone)]
pub enum Resolved<T> {
    Constant(T),
    Live(Arc<dyn ValueSource<T>>),
}

impl<T: Copy> Resolved<T> {
    pub fn runtime(&self) -> Option<RuntimeId> {
        match self {
            Self::Constant(_) => None,
            Self::Live(source) => source.runtime(),
        }
    }

    pub fn current_value(&self) -> Result<T, ReadError> {
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Live(source) => source.current_value(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SharedValue
// ────────────────────────────────────────────────────────────────────────────

/// A settable, thread-safe [`ValueSource`].
///
/// Drivers (or tests) keep an `Arc<SharedValue<T>>`, update it with
/// [`SharedValue::set`] and hand a clone to a relation.  [`SharedValue::fail`]
/// makes subsequent reads fail until the next `set`.
///
/// # Example
///
/// ```rust
/// use worldframe_world::value::{SharedValue, ValueSource};
///
/// let joint = SharedValue::new(0.5_f64, None);
/// assert_eq!(joint.current_value().unwrap(), 0.5);
/// joint.set(1.0);
/// assert_eq!(joint.current_value().unwrap(), 1.0);
/// joint.fail("encoder timeout");
/// assert!(joint.current_value().is_err());
/// ```
#[derive(Debug)]
pub struct SharedValue<T> {
    value: RwLock<Result<T, ReadError>>,
    runtime: Option<RuntimeId>,
}

impl<T> SharedValue<T> {
    pub fn new(initial: T, runtime: Option<RuntimeId>) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(Ok(initial)),
            runtime,
        })
    }

    pub fn set(&self, value: T) {
        self.replace(Ok(value));
    }

    /// Mark the value as unreadable.
    pub fn fail(&self, reason: impl Into<String>) {
        self.replace(Err(ReadError(reason.into())));
    }

    // Writes are whole assignments, so a poisoned lock still holds a valid
    // value.
    fn replace(&self, value: Result<T, ReadError>) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl<T: Copy + Send + Sync + fmt::Debug> ValueSource<T> for SharedValue<T> {
    fn runtime(&self) -> Option<RuntimeId> {
        self.runtime
    }

    fn current_value(&self) -> Result<T, ReadError> {
        self.value.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
