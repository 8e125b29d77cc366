//! Observability utilities.
//!
//! Stages log through `tracing`; this module installs subscribers and wraps
//! each stage execution in a span.

mod subscriber;
mod tracing;

pub use self::subscriber::{init_json_tracing, init_tracing};
pub use self::tracing::{stage_span, SpanTimer, StageSpanAttributes};
