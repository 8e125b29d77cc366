//! Stage output type with factory methods.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Count of what a stage attempted and what it achieved.
///
/// Every stage reports one, even on partial failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageSummary {
    /// Units of work attempted (products queried, fetches tried, ...).
    pub attempted: usize,
    /// Units of work that succeeded.
    pub achieved: usize,
}

impl StageSummary {
    /// Creates a new summary.
    #[must_use]
    pub fn new(attempted: usize, achieved: usize) -> Self {
        Self { attempted, achieved }
    }

    /// Number of attempts that did not succeed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.achieved)
    }
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempted {}, achieved {}", self.attempted, self.achieved)
    }
}

/// The output of a stage execution.
///
/// `StageOutput` is immutable once created and provides factory methods
/// for creating outputs with different statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// The output data (for successful executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, serde_json::Value>>,

    /// Attempted/achieved counts.
    #[serde(default)]
    pub summary: StageSummary,

    /// Error message (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Whether the orchestrator may retry the stage.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::ok_empty()
    }
}

impl StageOutput {
    fn with_status(status: StageStatus) -> Self {
        Self {
            status,
            data: None,
            summary: StageSummary::default(),
            error: None,
            skip_reason: None,
            retryable: false,
        }
    }

    /// Creates a successful output with data.
    #[must_use]
    pub fn ok(data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            data: Some(data),
            ..Self::with_status(StageStatus::Ok)
        }
    }

    /// Creates a successful output with no data.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::with_status(StageStatus::Ok)
    }

    /// Creates a successful output with a single value.
    #[must_use]
    pub fn ok_value(key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut data = HashMap::new();
        data.insert(key.into(), value);
        Self::ok(data)
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            ..Self::with_status(StageStatus::Skip)
        }
    }

    /// Creates a failure output with an error message.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::with_status(StageStatus::Fail)
        }
    }

    /// Creates a failure output the orchestrator may retry.
    #[must_use]
    pub fn fail_retryable(error: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::fail(error)
        }
    }

    /// Creates a timeout output. Partial results are never attached.
    #[must_use]
    pub fn timeout(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            retryable: true,
            ..Self::with_status(StageStatus::Timeout)
        }
    }

    /// Attaches the attempted/achieved summary.
    #[must_use]
    pub fn with_summary(mut self, summary: StageSummary) -> Self {
        self.summary = summary;
        self
    }

    /// Returns true if the output indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the output indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Gets a value from the data.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }

    /// Human-readable one-line summary of the output.
    #[must_use]
    pub fn summary_line(&self) -> String {
        match &self.error {
            Some(error) => format!("{}: {} ({})", self.status, self.summary, error),
            None => format!("{}: {}", self.status, self.summary),
        }
    }
}
