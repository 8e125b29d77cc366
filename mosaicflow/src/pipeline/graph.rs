//! Validated stage graph handed to the orchestrator.
//!
//! The graph only describes precedence; the orchestrator schedules it.

use super::StageSpec;
use std::collections::{HashMap, HashSet};

/// A directed acyclic graph of stage descriptors.
#[derive(Debug, Clone)]
pub struct StageGraph {
    /// The graph name.
    name: String,
    /// Stage specifications.
    stages: HashMap<String, StageSpec>,
    /// Topologically sorted stage names.
    execution_order: Vec<String>,
}

impl StageGraph {
    /// Creates a stage graph. The stages must already be validated.
    #[must_use]
    pub fn new(name: String, stages: HashMap<String, StageSpec>, stage_order: Vec<String>) -> Self {
        let execution_order = topological_sort(&stages, &stage_order);
        Self {
            name,
            stages,
            execution_order,
        }
    }

    /// Returns the graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Stage names in a deterministic order compatible with every dependency.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Gets a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.stages.get(name)
    }

    /// Stages in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &StageSpec> {
        self.execution_order.iter().filter_map(|n| self.stages.get(n))
    }

    /// All `(upstream, downstream)` edges, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .stages
            .values()
            .flat_map(|spec| spec.dependencies.iter().map(|dep| (dep.clone(), spec.name.clone())))
            .collect();
        edges.sort();
        edges
    }

    /// Stages without dependencies, in execution order.
    #[must_use]
    pub fn roots(&self) -> Vec<&str> {
        self.stages()
            .filter(|spec| spec.dependencies.is_empty())
            .map(|spec| spec.name.as_str())
            .collect()
    }

    /// Stages that depend directly on `name`, in execution order.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.stages()
            .filter(|spec| spec.dependencies.contains(name))
            .map(|spec| spec.name.as_str())
            .collect()
    }
}

fn topological_sort(stages: &HashMap<String, StageSpec>, stage_order: &[String]) -> Vec<String> {
    fn visit(
        node: &str,
        stages: &HashMap<String, StageSpec>,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) {
        if visited.contains(node) || temp_visited.contains(node) {
            return;
        }
        temp_visited.insert(node.to_string());

        if let Some(spec) = stages.get(node) {
            for dep in &spec.dependencies {
                visit(dep, stages, visited, temp_visited, result);
            }
        }

        temp_visited.remove(node);
        visited.insert(node.to_string());
        result.push(node.to_string());
    }

    let mut result = Vec::new();
    let mut visited = HashSet::new();
    let mut temp_visited = HashSet::new();

    // Insertion order keeps the result deterministic.
    for name in stage_order {
        visit(name, stages, &mut visited, &mut temp_visited, &mut result);
    }

    result
}
