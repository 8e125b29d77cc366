//! Fan-out assembly: a variable number of independent push stages.

use super::{StageSpec, SubWorkflow};
use crate::core::StageKind;
use crate::errors::PipelineValidationError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Exclusive upper bound of a random fan-out width.
pub const RANDOM_WIDTH_UPPER: u32 = 10;

/// How wide a fan-out should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutWidth {
    /// A fixed width.
    Fixed(u32),
    /// A uniform draw from `1..RANDOM_WIDTH_UPPER`.
    Random,
}

impl FanoutWidth {
    /// Resolves the width, drawing from `rng` when random.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        match self {
            Self::Fixed(width) => width,
            Self::Random => rng.gen_range(1..RANDOM_WIDTH_UPPER),
        }
    }
}

/// Builds the push stages for a fan-out, using the thread-local RNG.
///
/// A width of `w` yields `w - 1` stages named `task_push1 .. task_push{w-1}`;
/// width 1 yields none.
#[must_use]
pub fn build_fanout(width: FanoutWidth, message: &str) -> Vec<StageSpec> {
    build_fanout_with_rng(width, message, &mut rand::thread_rng())
}

/// Builds the push stages for a fan-out with an injected RNG.
#[must_use]
pub fn build_fanout_with_rng<R: Rng + ?Sized>(width: FanoutWidth, message: &str, rng: &mut R) -> Vec<StageSpec> {
    let width = width.resolve(rng);
    (1..width)
        .map(|i| {
            let spec = StageSpec::new(StageKind::Push.task_name(i), StageKind::Push).with_param("a_msg", message);
            info!(stage = %spec.name, width, "Added fan-out stage");
            spec
        })
        .collect()
}

/// Wraps a fan-out into the `parent.child` sub-workflow.
///
/// # Errors
///
/// Returns an error if the produced stages fail validation.
pub fn fanout_subworkflow(
    parent: &str,
    child: &str,
    width: FanoutWidth,
    message: &str,
) -> Result<SubWorkflow, PipelineValidationError> {
    SubWorkflow::from_stages(parent, child, build_fanout(width, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParamValue;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(stages: &[StageSpec]) -> Vec<&str> {
        stages.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_width_one_yields_no_stages() {
        assert!(build_fanout(FanoutWidth::Fixed(1), "m").is_empty());
        assert!(build_fanout(FanoutWidth::Fixed(0), "m").is_empty());
    }

    #[test]
    fn test_fixed_width() {
        let stages = build_fanout(FanoutWidth::Fixed(4), "message number 1");

        assert_eq!(names(&stages), vec!["task_push1", "task_push2", "task_push3"]);
        for stage in &stages {
            assert!(stage.dependencies.is_empty());
            assert_eq!(stage.kind, StageKind::Push);
            assert_eq!(stage.param("a_msg"), Some(&ParamValue::from("message number 1")));
        }
    }

    #[test]
    fn test_random_width_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let width = FanoutWidth::Random.resolve(&mut rng);
            assert!((1..=9).contains(&width));
        }
    }

    #[test]
    fn test_random_fanout_reproducible() {
        let first = build_fanout_with_rng(FanoutWidth::Random, "m", &mut StdRng::seed_from_u64(42));
        let second = build_fanout_with_rng(FanoutWidth::Random, "m", &mut StdRng::seed_from_u64(42));

        assert_eq!(first, second);
        assert!(first.len() <= 8);
    }

    #[test]
    fn test_fanout_subworkflow() {
        let sub = fanout_subworkflow("parent", "pushers", FanoutWidth::Fixed(3), "m").unwrap();

        assert_eq!(sub.name, "parent.pushers");
        assert_eq!(sub.graph.execution_order(), ["task_push1", "task_push2"]);
        assert!(sub.graph.edges().is_empty());
    }
}
