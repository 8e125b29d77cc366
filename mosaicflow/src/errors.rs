//! Error types for mosaicflow.
//!
//! The taxonomy separates fatal assembly-time problems from stage-entry
//! failures and from per-item failures that a stage absorbs itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// The main error type for mosaicflow operations.
#[derive(Debug, Error)]
pub enum MosaicflowError {
    /// Bad assembly-time or stage-configuration parameters.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The catalog could not be reached or rejected the credentials.
    #[error("{0}")]
    CatalogUnavailable(#[from] CatalogUnavailableError),

    /// A stage exceeded its execution deadline.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    /// A single product fetch failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// A handoff slot was written twice in the same run.
    #[error("{0}")]
    HandoffConflict(#[from] HandoffConflictError),

    /// The stage graph is invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MosaicflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl MosaicflowError {
    /// Returns true if the orchestrator may reasonably retry the stage.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CatalogUnavailable(_) | Self::Timeout(_))
    }
}

/// Metadata about an error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONFIG-001-MISSING").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised for bad assembly-time parameters.
///
/// Always fatal; surfaced immediately and never retried.
#[derive(Debug, Clone, Error)]
#[error("Configuration error: {message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// The offending field, when one can be named.
    pub field: Option<String>,
    /// Diagnostic info.
    pub error_info: ContractErrorInfo,
}

impl ConfigurationError {
    /// A required field is absent or blank.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("required field '{field}' is missing or blank"),
            error_info: ContractErrorInfo::new(
                "CONFIG-001-MISSING",
                format!("Missing required configuration value '{field}'"),
            )
            .with_fix_hint("Supply the value in the configuration record."),
            field: Some(field),
        }
    }

    /// A field holds a value outside its allowed range.
    #[must_use]
    pub fn out_of_range(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self {
            error_info: ContractErrorInfo::new("CONFIG-002-RANGE", message.clone())
                .with_context_entry("field", field.clone()),
            message,
            field: Some(field),
        }
    }

    /// The configuration source could not be parsed.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error_info: ContractErrorInfo::new("CONFIG-003-PARSE", message.clone())
                .with_fix_hint("Check the configuration file is valid JSON."),
            message,
            field: None,
        }
    }
}

/// What went wrong when reaching the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableKind {
    /// Network-level failure (DNS, refused connection, transport timeout).
    Connect,
    /// The catalog rejected the credentials.
    Auth,
    /// The catalog answered with something unusable.
    Protocol,
}

/// Error raised when the catalog cannot be used at stage entry.
#[derive(Debug, Clone, Error)]
#[error("Catalog unavailable at {endpoint} ({kind:?}): {reason}")]
pub struct CatalogUnavailableError {
    /// The endpoint that was contacted.
    pub endpoint: String,
    /// Failure category.
    pub kind: UnavailableKind,
    /// Human-readable reason.
    pub reason: String,
}

impl CatalogUnavailableError {
    /// Creates a connectivity failure.
    #[must_use]
    pub fn connect(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(endpoint, UnavailableKind::Connect, reason)
    }

    /// Creates an authentication failure.
    #[must_use]
    pub fn auth(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(endpoint, UnavailableKind::Auth, reason)
    }

    /// Creates a protocol failure.
    #[must_use]
    pub fn protocol(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(endpoint, UnavailableKind::Protocol, reason)
    }

    /// Creates a failure of the given kind.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, kind: UnavailableKind, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind,
            reason: reason.into(),
        }
    }
}

/// Error raised when a stage exceeds its deadline.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' exceeded its deadline of {}s", deadline.as_secs_f64())]
pub struct TimeoutError {
    /// The stage that timed out.
    pub stage: String,
    /// The deadline that was exceeded.
    pub deadline: Duration,
}

impl TimeoutError {
    /// Creates a new timeout error.
    #[must_use]
    pub fn new(stage: impl Into<String>, deadline: Duration) -> Self {
        Self {
            stage: stage.into(),
            deadline,
        }
    }
}

/// Error raised when a single product could not be fetched or verified.
#[derive(Debug, Clone, Error)]
#[error("Fetch failed for product '{product_id}': {reason}")]
pub struct FetchError {
    /// The product identifier.
    pub product_id: String,
    /// Why the fetch failed.
    pub reason: String,
}

impl FetchError {
    /// Creates a new fetch error.
    #[must_use]
    pub fn new(product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a handoff slot is written twice.
#[derive(Debug, Clone, Error)]
#[error("Handoff conflict: slot '{slot}' already holds a value")]
pub struct HandoffConflictError {
    /// The slot that was already written.
    pub slot: String,
}

impl HandoffConflictError {
    /// Creates a new handoff conflict error.
    #[must_use]
    pub fn new(slot: impl Into<String>) -> Self {
        Self { slot: slot.into() }
    }
}

/// Error raised when stage graph validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}

/// Error raised when a cycle is detected in the stage graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
    /// Diagnostic info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            "CONTRACT-004-CYCLE",
            format!("Pipeline contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for PipelineValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            stages: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Provides default suggestions for error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONFIG-001-MISSING" => Some(
                "Every endpoint, credential and path must be supplied by configuration; \
                 none have built-in values.",
            ),
            "CONFIG-002-RANGE" => Some("Use an instance count of at least 1."),
            "CONFIG-003-PARSE" => Some("Validate the configuration file against the documented layout."),
            "CONTRACT-004-CYCLE" => Some(
                "Check your stage dependencies for circular references. \
                 Use a linear chain or fan-out pattern instead.",
            ),
            "CONTRACT-004-MISSING_DEP" => Some(
                "Ensure all dependencies reference stages that exist in the pipeline. \
                 Check for typos in stage names.",
            ),
            "CONTRACT-004-CONFLICT" => Some(
                "Two sub-workflows being composed have conflicting stage definitions. \
                 Either rename stages or ensure they have identical configurations.",
            ),
            "CONTRACT-004-EMPTY" => Some("Add at least one stage to the pipeline before building."),
            _ => None,
        }
    }
}
