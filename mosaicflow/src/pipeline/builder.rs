//! Pipeline builder with validation.

use super::{PipelineInstance, StageGraph, StageSpec};
use crate::core::StageKind;
use crate::errors::{ContractErrorInfo, CycleDetectedError, PipelineValidationError};
use std::collections::{HashMap, HashSet};

/// Builder for validated stage graphs.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stage specifications.
    stages: HashMap<String, StageSpec>,
    /// Insertion order for stages.
    stage_order: Vec<String>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: HashMap::new(),
            stage_order: Vec::new(),
        }
    }

    /// Adds a parameterless stage.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (missing dependency, cycle, etc.)
    pub fn stage(
        mut self,
        name: impl Into<String>,
        kind: StageKind,
        dependencies: &[&str],
    ) -> Result<Self, PipelineValidationError> {
        let spec = StageSpec::new(name, kind).with_dependencies(dependencies.iter().copied());
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Adds a stage with a specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken, a dependency is unknown, or the
    /// stage closes a cycle.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.stages.contains_key(&spec.name) {
            return Err(PipelineValidationError::new(format!("Stage '{}' is defined twice", spec.name))
                .with_stages(vec![spec.name.clone()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-004-CONFLICT",
                        format!("Stage '{}' already exists", spec.name),
                    )
                    .with_fix_hint("Stage names must be unique within a pipeline."),
                ));
        }

        for dep in &spec.dependencies {
            if !self.stages.contains_key(dep) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    spec.name, dep
                ))
                .with_stages(vec![spec.name.clone(), dep.clone()])
                .with_error_info(
                    ContractErrorInfo::new("CONTRACT-004-MISSING_DEP", format!("Dependency '{dep}' not found"))
                        .with_fix_hint("Ensure the dependency is added before the stage that depends on it."),
                ));
            }
        }

        self.stage_order.push(spec.name.clone());
        self.stages.insert(spec.name.clone(), spec);

        self.detect_cycles()?;
        Ok(())
    }

    /// Adds every stage of a mosaic instance, in chain order.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails validation.
    pub fn add_instance(&mut self, instance: &PipelineInstance) -> Result<(), PipelineValidationError> {
        for spec in &instance.stages {
            self.add_stage_spec(spec.clone())?;
        }
        Ok(())
    }

    /// Composes this builder with another.
    ///
    /// Stages present in both must be identical.
    ///
    /// # Errors
    ///
    /// Returns an error if there are conflicting stage definitions.
    pub fn compose(mut self, other: Self) -> Result<Self, PipelineValidationError> {
        self.name = format!("{}+{}", self.name, other.name);

        for name in other.stage_order {
            let Some(other_spec) = other.stages.get(&name) else {
                continue;
            };
            if let Some(existing) = self.stages.get(&name) {
                if existing != other_spec {
                    return Err(PipelineValidationError::new(format!(
                        "Conflicting stage definitions for '{name}'"
                    ))
                    .with_stages(vec![name.clone()])
                    .with_error_info(
                        ContractErrorInfo::new(
                            "CONTRACT-004-CONFLICT",
                            format!("Stage '{name}' has different definitions in composed pipelines"),
                        )
                        .with_fix_hint("Rename one of the stages or ensure they have identical configurations."),
                    ));
                }
            } else {
                self.stage_order.push(name.clone());
                self.stages.insert(name, other_spec.clone());
            }
        }

        Ok(self)
    }

    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages.
    pub fn build(self) -> Result<StageGraph, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages").with_error_info(
                ContractErrorInfo::new("CONTRACT-004-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }

        Ok(StageGraph::new(self.name, self.stages, self.stage_order))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in &self.stage_order {
            if !visited.contains(name) {
                if let Some(cycle) = self.dfs_cycle(name, &mut visited, &mut rec_stack, &mut path) {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(spec) = self.stages.get(node) {
            for dep in &spec.dependencies {
                if !visited.contains(dep) {
                    if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(dep) {
                    let start = path.iter().position(|n| n == dep).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }
}
