//! Stage graph assembly.
//!
//! This module provides:
//! - Stage descriptors and linear pipeline instances
//! - A pipeline builder with dependency and cycle validation
//! - The mosaic and fan-out assemblers
//! - Sub-workflow naming
//!
//! Nothing here executes stages; the graphs are handed to an orchestrator.

mod builder;
mod fanout;
mod graph;
mod mosaic;
mod spec;
mod subworkflow;

pub use builder::PipelineBuilder;
pub use fanout::{build_fanout, build_fanout_with_rng, fanout_subworkflow, FanoutWidth, RANDOM_WIDTH_UPPER};
pub use graph::StageGraph;
pub use mosaic::{build_mosaic_pipeline, mosaic_subworkflow};
pub use spec::{PipelineInstance, StageSpec};
pub use subworkflow::{subworkflow_name, SubWorkflow};
