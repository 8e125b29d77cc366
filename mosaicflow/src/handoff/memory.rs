//! In-memory handoff store.

use super::{HandoffStore, SlotKey};
use crate::context::RunIdentity;
use crate::errors::HandoffConflictError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Thread-safe handoff store scoped to one run.
#[derive(Debug, Default)]
pub struct InMemoryHandoffStore {
    run: RunIdentity,
    slots: DashMap<SlotKey, serde_json::Value>,
}

impl InMemoryHandoffStore {
    /// Creates a store for a fresh run.
    #[must_use]
    pub fn new() -> Self {
        Self::for_run(RunIdentity::new())
    }

    /// Creates a store for the given run.
    #[must_use]
    pub fn for_run(run: RunIdentity) -> Self {
        Self {
            run,
            slots: DashMap::new(),
        }
    }

    /// The run this store belongs to.
    #[must_use]
    pub fn run(&self) -> &RunIdentity {
        &self.run
    }

    /// Returns true if the slot has been written.
    #[must_use]
    pub fn contains(&self, slot: &SlotKey) -> bool {
        self.slots.contains_key(slot)
    }

    /// Returns the number of written slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl HandoffStore for InMemoryHandoffStore {
    fn put(&self, slot: &SlotKey, value: serde_json::Value) -> Result<(), HandoffConflictError> {
        match self.slots.entry(slot.clone()) {
            Entry::Occupied(_) => Err(HandoffConflictError::new(slot.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(value);
                debug!(run_id = ?self.run.pipeline_run_id, slot = %slot, "Published handoff slot");
                Ok(())
            }
        }
    }

    fn get(&self, slot: &SlotKey) -> Option<serde_json::Value> {
        self.slots.get(slot).map(|v| v.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_put_then_get() {
        let store = InMemoryHandoffStore::new();
        let slot = SlotKey::new("dhus_search_task", "searched_products");

        store.put(&slot, serde_json::json!({"a": 1})).unwrap();

        assert!(store.contains(&slot));
        assert_eq!(store.get(&slot), Some(serde_json::json!({"a": 1})));
        // Reads leave the value in place.
        assert_eq!(store.get(&slot), Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_second_put_conflicts() {
        let store = InMemoryHandoffStore::new();
        let slot = SlotKey::new("t", "k");
        store.put(&slot, serde_json::json!(1)).unwrap();

        let err = store.put(&slot, serde_json::json!(2)).unwrap_err();
        assert_eq!(err.slot, "t/k");
        assert_eq!(store.get(&slot), Some(serde_json::json!(1)));
    }

    #[test]
    fn test_slots_are_per_task() {
        let store = InMemoryHandoffStore::new();
        store.put(&SlotKey::new("a", "k"), serde_json::json!(1)).unwrap();
        store.put(&SlotKey::new("b", "k"), serde_json::json!(2)).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get(&SlotKey::new("c", "k")).is_none());
    }

    #[test]
    fn test_stores_are_run_scoped() {
        let first = InMemoryHandoffStore::new();
        let second = InMemoryHandoffStore::new();
        first.put(&SlotKey::new("t", "k"), serde_json::json!(1)).unwrap();

        assert!(second.is_empty());
        assert_ne!(first.run().pipeline_run_id, second.run().pipeline_run_id);
    }

    #[tokio::test]
    async fn test_concurrent_writers_single_winner() {
        let store = Arc::new(InMemoryHandoffStore::new());
        let slot = SlotKey::new("t", "k");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let slot = slot.clone();
                tokio::spawn(async move { store.put(&slot, serde_json::json!(i)).is_ok() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
