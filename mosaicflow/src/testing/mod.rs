//! Testing utilities for mosaicflow stages.
//!
//! This module provides:
//! - Fixture records and configurations
//! - An in-memory catalog double
//! - Assertions for stage outputs

mod assertions;
pub mod fixtures;
mod mocks;

pub use assertions::{
    assert_output_failed, assert_output_retryable, assert_output_status, assert_output_succeeded,
    assert_output_summary, assert_output_value,
};
pub use mocks::MockCatalog;
