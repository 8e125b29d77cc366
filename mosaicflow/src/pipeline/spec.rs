//! Stage descriptors and pipeline instances.

use crate::core::{ParamValue, StageKind};
use crate::errors::PipelineValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Immutable description of one stage, handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The kind of stage.
    pub kind: StageKind,
    /// Pipeline instance index (1-based), `None` outside the mosaic chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Parameters passed to the external step.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    /// Names of stages that must complete first.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Execution deadline the orchestrator should enforce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            index: None,
            params: BTreeMap::new(),
            dependencies: BTreeSet::new(),
            timeout: None,
        }
    }

    /// Sets the instance index.
    #[must_use]
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    /// Sets the execution deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Gets a parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the stage depends on itself.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Stage name cannot be empty"));
        }
        if self.dependencies.contains(&self.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' cannot depend on itself",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        Ok(())
    }
}

/// One instance of the mosaic chain: stages sharing an index, each
/// depending on the one before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInstance {
    /// The shared 1-based index.
    pub index: u32,
    /// Stages in execution order.
    pub stages: Vec<StageSpec>,
}

impl PipelineInstance {
    /// Chains stages linearly: every stage after the first depends on its
    /// predecessor and nothing else.
    #[must_use]
    pub fn chain(index: u32, stages: impl IntoIterator<Item = StageSpec>) -> Self {
        let mut chained: Vec<StageSpec> = Vec::new();
        for stage in stages {
            let stage = match chained.last() {
                Some(previous) => stage.with_dependencies([previous.name.clone()]),
                None => stage.with_dependencies(std::iter::empty::<String>()),
            };
            chained.push(stage);
        }
        Self {
            index,
            stages: chained,
        }
    }

    /// Stage names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// Precedence edges as `(upstream, downstream)` pairs.
    #[must_use]
    pub fn edges(&self) -> Vec<(String, String)> {
        self.stages
            .windows(2)
            .map(|pair| (pair[0].name.clone(), pair[1].name.clone()))
            .collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the instance has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
