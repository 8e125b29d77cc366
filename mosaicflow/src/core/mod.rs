//! Core domain model types for mosaicflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage status and kind enums
//! - Stage configuration values
//! - Stage output type with factory methods

mod output;
mod status;
mod value;

pub use output::{StageOutput, StageSummary};
pub use status::{StageKind, StageStatus};
pub use value::ParamValue;
