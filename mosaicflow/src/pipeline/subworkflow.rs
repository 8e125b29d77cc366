//! Named sub-workflows embedded in a parent workflow.

use super::{PipelineBuilder, StageGraph, StageSpec};
use crate::errors::PipelineValidationError;
use std::collections::HashMap;

/// Name of a sub-workflow nested under `parent`: `parent.child`.
#[must_use]
pub fn subworkflow_name(parent: &str, child: &str) -> String {
    format!("{parent}.{child}")
}

/// A validated graph registered under a sub-workflow name.
#[derive(Debug, Clone)]
pub struct SubWorkflow {
    /// Fully qualified name (`parent.child`).
    pub name: String,
    /// The stage graph.
    pub graph: StageGraph,
}

impl SubWorkflow {
    /// Validates the stages and packages them under `parent.child`.
    ///
    /// An empty stage list yields an empty sub-workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if a stage is invalid or the dependencies form a cycle.
    pub fn from_stages(
        parent: &str,
        child: &str,
        stages: impl IntoIterator<Item = StageSpec>,
    ) -> Result<Self, PipelineValidationError> {
        let name = subworkflow_name(parent, child);
        let mut builder = PipelineBuilder::new(&name);
        for spec in stages {
            builder.add_stage_spec(spec)?;
        }

        let graph = if builder.stage_count() == 0 {
            StageGraph::new(name.clone(), HashMap::new(), Vec::new())
        } else {
            builder.build()?
        };
        Ok(Self { name, graph })
    }

    /// Returns true if the sub-workflow has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.stage_count() == 0
    }
}
