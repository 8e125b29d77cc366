//! Event sinks for stage observability.
//!
//! Stages report notable outcomes (caps hit, items skipped, completions) as
//! named events with a JSON payload, next to their `tracing` output.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Search finished and published its results.
pub const SEARCH_COMPLETED: &str = "search.completed";
/// More download candidates than the cap allows.
pub const DOWNLOAD_CAP_EXCEEDED: &str = "download.cap_exceeded";
/// One product could not be fetched and was skipped.
pub const DOWNLOAD_ITEM_FAILED: &str = "download.item_failed";
/// Download finished and published its outcome.
pub const DOWNLOAD_COMPLETED: &str = "download.completed";
/// A stage ran past its deadline; nothing was published.
pub const STAGE_TIMEOUT: &str = "stage.timeout";
