//! Execution context handed to a running stage.

use super::RunIdentity;
use crate::events::{EventSink, NoOpEventSink};
use crate::handoff::{HandoffStore, InMemoryHandoffStore, SlotKey};
use std::sync::Arc;
use std::time::Duration;

/// Everything a stage may touch while it runs.
///
/// Cross-stage data goes through the handoff store only.
#[derive(Clone)]
pub struct StageContext {
    /// Run identity.
    run: RunIdentity,
    /// The stage (task) name.
    stage_name: String,
    /// Handoff slots of this run.
    handoff: Arc<dyn HandoffStore>,
    /// Event sink for emitting events.
    event_sink: Arc<dyn EventSink>,
    /// Execution deadline.
    deadline: Option<Duration>,
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run", &self.run)
            .field("stage_name", &self.stage_name)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl StageContext {
    /// Creates a stage context.
    #[must_use]
    pub fn new(run: RunIdentity, stage_name: impl Into<String>, handoff: Arc<dyn HandoffStore>) -> Self {
        Self {
            run,
            stage_name: stage_name.into(),
            handoff,
            event_sink: Arc::new(NoOpEventSink),
            deadline: None,
        }
    }

    /// Creates a context over a fresh in-memory store, mostly for tests and
    /// one-off runs.
    #[must_use]
    pub fn standalone(stage_name: impl Into<String>) -> Self {
        let store = InMemoryHandoffStore::new();
        let run = store.run().clone();
        Self::new(run, stage_name, Arc::new(store))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the execution deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run(&self) -> &RunIdentity {
        &self.run
    }

    /// Returns the handoff store.
    #[must_use]
    pub fn handoff(&self) -> &dyn HandoffStore {
        self.handoff.as_ref()
    }

    /// Returns the execution deadline.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// This stage's own slot for `key`.
    #[must_use]
    pub fn own_slot(&self, key: &str) -> SlotKey {
        SlotKey::new(&self.stage_name, key)
    }

    /// Emits an event tagged with the run and stage.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            for (key, value) in self.run.to_dict() {
                if !value.is_null() {
                    map.insert(key, value);
                }
            }
            map.insert("stage".to_string(), serde_json::json!(&self.stage_name));
        }

        self.event_sink.try_emit(event_type, Some(enriched));
    }
}
