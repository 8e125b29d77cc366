//! Stage trait and implementations.
//!
//! Stages are the units an orchestrator schedules. Each one runs against a
//! [`StageContext`], publishes what it produced to its own handoff slots and
//! returns a [`StageOutput`] with a summary.

mod download;
mod push;
mod runtime;
mod search;

#[cfg(test)]
mod flow_tests;

pub use download::{
    download, download_report, order_candidates, DownloadReport, DownloadSource, DownloadStage, DOWNLOAD_TASK,
};
pub use push::PushStage;
pub use runtime::{run_with_deadline, TimedResult};
pub use search::{search, SearchStage, SEARCH_TASK};

use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the task name of the stage.
    fn name(&self) -> &str;

    /// Returns the kind of work the stage performs.
    fn kind(&self) -> StageKind;

    /// Executes the stage.
    ///
    /// Failures are reported through the returned output, never by panicking.
    async fn execute(&self, ctx: &StageContext) -> StageOutput;
}
