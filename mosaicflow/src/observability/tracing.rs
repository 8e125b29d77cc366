//! Stage spans and timing.

use crate::context::StageContext;
use crate::core::{StageKind, StageOutput, StageStatus, StageSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::Span;

/// Attributes recorded for one stage execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage (task) name.
    pub stage_name: String,
    /// Stage kind.
    pub stage_kind: StageKind,
    /// Run the stage belongs to.
    pub pipeline_run_id: Option<String>,
    /// Final status.
    pub status: Option<StageStatus>,
    /// Attempted/achieved counts.
    pub summary: Option<StageSummary>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if the stage did not succeed.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Attributes known before the stage runs.
    #[must_use]
    pub fn new(ctx: &StageContext, kind: StageKind) -> Self {
        Self {
            stage_name: ctx.stage_name().to_string(),
            stage_kind: kind,
            pipeline_run_id: ctx.run().pipeline_run_id_str(),
            status: None,
            summary: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Fills in the result of the execution.
    #[must_use]
    pub fn with_output(mut self, output: &StageOutput, duration_ms: f64) -> Self {
        self.status = Some(output.status);
        self.summary = Some(output.summary);
        self.duration_ms = Some(duration_ms);
        self.error.clone_from(&output.error);
        self
    }

    /// Flattens the attributes into dotted keys.
    #[must_use]
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("stage.name".to_string(), self.stage_name.clone());
        fields.insert("stage.kind".to_string(), self.stage_kind.to_string());
        if let Some(ref v) = self.pipeline_run_id {
            fields.insert("pipeline.run_id".to_string(), v.clone());
        }
        if let Some(v) = self.status {
            fields.insert("stage.status".to_string(), v.to_string());
        }
        if let Some(v) = self.summary {
            fields.insert("stage.attempted".to_string(), v.attempted.to_string());
            fields.insert("stage.achieved".to_string(), v.achieved.to_string());
        }
        if let Some(v) = self.duration_ms {
            fields.insert("stage.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            fields.insert("stage.error".to_string(), v.clone());
        }
        fields
    }

    /// Logs the finished stage at a level matching its status.
    pub fn log_finished(&self) {
        let attempted = self.summary.map_or(0, |s| s.attempted);
        let achieved = self.summary.map_or(0, |s| s.achieved);
        let duration_ms = self.duration_ms.unwrap_or_default();
        match self.status {
            Some(status) if status.is_success() => tracing::info!(
                stage = %self.stage_name,
                %status,
                attempted,
                achieved,
                duration_ms,
                "Stage finished"
            ),
            status => tracing::warn!(
                stage = %self.stage_name,
                status = ?status,
                attempted,
                achieved,
                duration_ms,
                error = self.error.as_deref().unwrap_or(""),
                "Stage did not succeed"
            ),
        }
    }
}

/// Span wrapping one stage execution.
#[must_use]
pub fn stage_span(ctx: &StageContext, kind: StageKind) -> Span {
    let run_id = ctx.run().pipeline_run_id_str().unwrap_or_default();
    tracing::info_span!("stage", stage = %ctx.stage_name(), kind = %kind, pipeline_run_id = %run_id)
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
