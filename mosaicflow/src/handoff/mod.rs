//! Run-scoped handoff slots.
//!
//! A stage publishes its result to a named slot; a dependent stage reads it
//! back. Slots are write-once within a run. Ordering reads after writes is
//! left to the orchestrator's dependency graph.

mod memory;

pub use memory::InMemoryHandoffStore;

use crate::errors::{HandoffConflictError, MosaicflowError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot key used by the search stage.
pub const SEARCHED_PRODUCTS: &str = "searched_products";

/// Slot key used by the download stage.
pub const DOWNLOADED_PRODUCTS: &str = "downloaded_products";

/// Slot key used by push stages.
pub const MESSAGE: &str = "message";

/// Identifies one slot inside a run: the producing task and a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    /// Producing task name.
    pub task: String,
    /// Key within the task's slots.
    pub key: String,
}

impl SlotKey {
    /// Creates a slot key.
    #[must_use]
    pub fn new(task: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task, self.key)
    }
}

/// Key/value handoff between stages of one run.
pub trait HandoffStore: Send + Sync {
    /// Publishes a value.
    ///
    /// # Errors
    ///
    /// Returns `HandoffConflictError` if the slot already holds a value.
    fn put(&self, slot: &SlotKey, value: serde_json::Value) -> Result<(), HandoffConflictError>;

    /// Reads a value, `None` when the slot was never written.
    fn get(&self, slot: &SlotKey) -> Option<serde_json::Value>;
}

/// Serializes and publishes a value.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or the slot is taken.
pub fn put_typed<T: Serialize>(store: &dyn HandoffStore, slot: &SlotKey, value: &T) -> Result<(), MosaicflowError> {
    let value = serde_json::to_value(value)?;
    store.put(slot, value)?;
    Ok(())
}

/// Reads and deserializes a value.
///
/// A slot holding JSON `null` reads as absent.
///
/// # Errors
///
/// Returns an error if the stored value has the wrong shape.
pub fn get_typed<T: DeserializeOwned>(store: &dyn HandoffStore, slot: &SlotKey) -> Result<Option<T>, MosaicflowError> {
    match store.get(slot) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}
