//! # Mosaicflow
//!
//! Building blocks for satellite-imagery mosaic workflows run by an external
//! orchestrator.
//!
//! Mosaicflow provides:
//!
//! - **Sub-workflow factories**: deterministic warp/overview/transfer/register
//!   chains per mosaic instance, and fan-out groups of push stages
//! - **Catalog stages**: a search stage and a capped, partial-failure tolerant
//!   download stage talking to a product catalog
//! - **Handoff slots**: write-once, task-scoped values passed between stages
//! - **Observability**: `tracing` spans per stage and named events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mosaicflow::prelude::*;
//!
//! let instances = build_mosaic_pipeline(4, &config)?;
//! let store = Arc::new(InMemoryHandoffStore::new());
//!
//! let search = SearchStage::new(client.clone(), criteria);
//! search.execute(&StageContext::new(store.run().clone(), SEARCH_TASK, store.clone())).await;
//!
//! let download = DownloadStage::new(client, DownloadConfig::new("/data/s1").with_max_items(10));
//! download.execute(&StageContext::new(store.run().clone(), DOWNLOAD_TASK, store.clone())).await;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod catalog;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod handoff;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{
        CatalogClient, DownloadOutcome, FetchedProduct, Footprint, ProductRecord, ResultSet, SearchCriteria,
    };
    pub use crate::config::{CatalogConfig, DownloadConfig, MosaicConfig, SearchConfig, Secret};
    pub use crate::context::{RunIdentity, StageContext};
    pub use crate::core::{ParamValue, StageKind, StageOutput, StageStatus, StageSummary};
    pub use crate::errors::{
        CatalogUnavailableError, ConfigurationError, FetchError, HandoffConflictError, MosaicflowError,
        PipelineValidationError, TimeoutError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::handoff::{HandoffStore, InMemoryHandoffStore, SlotKey};
    pub use crate::pipeline::{
        build_fanout, build_mosaic_pipeline, fanout_subworkflow, mosaic_subworkflow, FanoutWidth, PipelineBuilder,
        PipelineInstance, StageGraph, StageSpec, SubWorkflow,
    };
    pub use crate::stages::{
        DownloadStage, PushStage, SearchStage, Stage, DOWNLOAD_TASK, SEARCH_TASK,
    };
}
