//! Fan-out leaf stage.

use super::runtime::{failed, traced};
use super::Stage;
use crate::context::StageContext;
use crate::core::{ParamValue, StageKind, StageOutput, StageSummary};
use crate::handoff::{put_typed, MESSAGE};
use crate::pipeline::StageSpec;
use async_trait::async_trait;
use tracing::info;

/// Publishes a fixed message to its task's `message` slot.
#[derive(Debug, Clone)]
pub struct PushStage {
    name: String,
    message: String,
}

impl PushStage {
    /// Creates a push stage.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Builds the stage for a fan-out descriptor, `None` if it is not a push
    /// stage or carries no `a_msg`.
    #[must_use]
    pub fn from_spec(spec: &StageSpec) -> Option<Self> {
        if spec.kind != StageKind::Push {
            return None;
        }
        spec.param("a_msg")
            .and_then(ParamValue::as_str)
            .map(|message| Self::new(&spec.name, message))
    }

    /// The message this stage publishes.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[async_trait]
impl Stage for PushStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Push
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        traced(ctx, self.kind(), self.run(ctx)).await
    }
}

impl PushStage {
    async fn run(&self, ctx: &StageContext) -> StageOutput {
        info!(stage = ctx.stage_name(), message = %self.message, "Pushing message");
        if let Err(err) = put_typed(ctx.handoff(), &ctx.own_slot(MESSAGE), &self.message) {
            return failed(ctx, &err);
        }
        StageOutput::ok_value(MESSAGE, serde_json::json!(self.message)).with_summary(StageSummary::new(1, 1))
    }
}
