//! Run identity for correlating stages of one workflow run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RunIdentity {
    /// The unique ID for this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_run_id: Option<Uuid>,

    /// The orchestrator's own run identifier, when it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestrator_run_id: Option<String>,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline_run_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_pipeline_run_id(pipeline_run_id: Uuid) -> Self {
        Self {
            pipeline_run_id: Some(pipeline_run_id),
            ..Default::default()
        }
    }

    /// Sets the orchestrator's run identifier.
    #[must_use]
    pub fn with_orchestrator_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.orchestrator_run_id = Some(run_id.into());
        self
    }

    /// Converts to a map of string values (or null), for event payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert(
            "pipeline_run_id".to_string(),
            self.pipeline_run_id
                .map_or(serde_json::Value::Null, |id| serde_json::json!(id.to_string())),
        );
        map.insert(
            "orchestrator_run_id".to_string(),
            self.orchestrator_run_id
                .as_ref()
                .map_or(serde_json::Value::Null, |id| serde_json::json!(id)),
        );
        map
    }

    /// Returns the run ID as a string, or None.
    #[must_use]
    pub fn pipeline_run_id_str(&self) -> Option<String> {
        self.pipeline_run_id.map(|id| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identity_new() {
        let identity = RunIdentity::new();
        assert!(identity.pipeline_run_id.is_some());
        assert!(identity.orchestrator_run_id.is_none());
    }

    #[test]
    fn test_run_identity_to_dict() {
        let identity = RunIdentity::new().with_orchestrator_run_id("scheduled__2017-03-01T00:00:00");
        let dict = identity.to_dict();

        assert!(!dict["pipeline_run_id"].is_null());
        assert_eq!(dict["orchestrator_run_id"], serde_json::json!("scheduled__2017-03-01T00:00:00"));
    }

    #[test]
    fn test_run_identity_serialization() {
        let identity = RunIdentity::new().with_orchestrator_run_id("manual__1");
        let json = serde_json::to_string(&identity).unwrap();
        let back: RunIdentity = serde_json::from_str(&json).unwrap();

        assert_eq!(identity, back);
    }
}
