//! Deadline handling and output helpers shared by the stages.

use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::{MosaicflowError, TimeoutError};
use crate::events::STAGE_TIMEOUT;
use crate::observability::{stage_span, SpanTimer, StageSpanAttributes};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, warn, Instrument};

/// Result of an operation run under a deadline.
#[derive(Debug)]
pub enum TimedResult<T, E> {
    /// Operation completed successfully.
    Ok(T),
    /// Operation failed with an error.
    Err(E),
    /// Operation was cut off by the deadline.
    Timeout,
}

impl<T, E> TimedResult<T, E> {
    /// Returns true if the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if the operation timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Converts to a standard Result, treating timeout as an error.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or `timeout_error` on timeout.
    pub fn into_result(self, timeout_error: E) -> Result<T, E> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
            Self::Timeout => Err(timeout_error),
        }
    }
}

/// Runs a future, dropping it if `deadline` elapses first.
///
/// Without a deadline the future runs to completion.
pub async fn run_with_deadline<T, E, F>(deadline: Option<Duration>, future: F) -> TimedResult<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let result = match deadline {
        Some(limit) => match timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => return TimedResult::Timeout,
        },
        None => future.await,
    };
    match result {
        Ok(value) => TimedResult::Ok(value),
        Err(error) => TimedResult::Err(error),
    }
}

/// Runs a stage body inside its span and logs how it finished.
pub(crate) async fn traced<F>(ctx: &StageContext, kind: StageKind, body: F) -> StageOutput
where
    F: Future<Output = StageOutput>,
{
    let span = stage_span(ctx, kind);
    let timer = SpanTimer::start(ctx.stage_name());
    let output = body.instrument(span.clone()).await;
    span.in_scope(|| {
        StageSpanAttributes::new(ctx, kind)
            .with_output(&output, timer.finish())
            .log_finished();
    });
    output
}

/// Output for a stage that hit its deadline. Nothing has been published.
pub(crate) fn timed_out(ctx: &StageContext, deadline: Duration) -> StageOutput {
    let err = TimeoutError::new(ctx.stage_name(), deadline);
    warn!(stage = ctx.stage_name(), deadline_secs = deadline.as_secs_f64(), "{err}");
    ctx.try_emit_event(
        STAGE_TIMEOUT,
        Some(serde_json::json!({"deadline_secs": deadline.as_secs_f64()})),
    );
    StageOutput::timeout(err.to_string())
}

/// Output for a stage that failed at entry or while publishing.
pub(crate) fn failed(ctx: &StageContext, err: &MosaicflowError) -> StageOutput {
    error!(stage = ctx.stage_name(), error = %err, "Stage failed");
    if err.is_retryable() {
        StageOutput::fail_retryable(err.to_string())
    } else {
        StageOutput::fail(err.to_string())
    }
}
