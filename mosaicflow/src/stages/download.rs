//! Product download stage.
//!
//! Candidates are fetched one at a time in priority order. A failed fetch is
//! logged and skipped; only a catalog that cannot be reached at all fails the
//! stage.

use super::runtime::{failed, traced, run_with_deadline, timed_out, TimedResult};
use super::Stage;
use crate::catalog::{CatalogClient, DownloadOutcome, ProductRecord, ResultSet};
use crate::config::DownloadConfig;
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput, StageSummary};
use crate::errors::{FetchError, MosaicflowError};
use crate::events::{DOWNLOAD_CAP_EXCEEDED, DOWNLOAD_COMPLETED, DOWNLOAD_ITEM_FAILED};
use crate::handoff::{get_typed, put_typed, SlotKey, DOWNLOADED_PRODUCTS, SEARCHED_PRODUCTS};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default task name of the download stage.
pub const DOWNLOAD_TASK: &str = "dhus_download_task";

/// Where the download candidates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadSource {
    /// Caller-supplied identifiers, attempted in the given order.
    Explicit(Vec<String>),
    /// A search result set, attempted oldest ingestion first.
    Results(ResultSet),
}

impl DownloadSource {
    /// Candidate identifiers in priority order, before capping.
    ///
    /// Repeated explicit identifiers are attempted once.
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Self::Explicit(ids) => {
                let mut seen = HashSet::new();
                ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
            }
            Self::Results(results) => order_candidates(results),
        }
    }
}

/// Orders a result set by ingestion time ascending, ties broken by id.
#[must_use]
pub fn order_candidates(results: &ResultSet) -> Vec<String> {
    let mut records: Vec<&ProductRecord> = results.iter().collect();
    records.sort_by(|a, b| {
        a.ingestion_date
            .cmp(&b.ingestion_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    records.into_iter().map(|r| r.id.clone()).collect()
}

/// Everything a download run did, for logging and events.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Successfully retrieved products.
    pub outcome: DownloadOutcome,
    /// Number of candidates before capping.
    pub candidates: usize,
    /// Identifiers attempted, in order.
    pub attempted: Vec<String>,
    /// Fetches that failed and were skipped.
    pub failures: Vec<FetchError>,
}

impl DownloadReport {
    /// Returns true if candidates were dropped by the cap.
    #[must_use]
    pub fn cap_exceeded(&self, max_items: usize) -> bool {
        self.candidates > max_items
    }

    /// Attempted and achieved counts.
    #[must_use]
    pub fn summary(&self) -> StageSummary {
        StageSummary::new(self.attempted.len(), self.outcome.len())
    }
}

/// Downloads up to `max_items` products into `dest_dir`.
///
/// # Errors
///
/// Returns `MosaicflowError::CatalogUnavailable` if the catalog cannot be
/// reached before the first fetch. Per-product failures are not errors.
pub async fn download(
    client: &dyn CatalogClient,
    source: &DownloadSource,
    max_items: usize,
    dest_dir: &Path,
) -> Result<DownloadOutcome, MosaicflowError> {
    Ok(download_report(client, source, max_items, dest_dir).await?.outcome)
}

/// Like [`download`], also reporting what was attempted and what failed.
///
/// # Errors
///
/// Returns `MosaicflowError::CatalogUnavailable` if the catalog cannot be
/// reached before the first fetch.
pub async fn download_report(
    client: &dyn CatalogClient,
    source: &DownloadSource,
    max_items: usize,
    dest_dir: &Path,
) -> Result<DownloadReport, MosaicflowError> {
    let candidates = source.candidates();
    let mut report = DownloadReport {
        candidates: candidates.len(),
        ..DownloadReport::default()
    };

    if report.cap_exceeded(max_items) {
        warn!(
            candidates = candidates.len(),
            max_items,
            "Found {} products, more than max_items {}; only the first {} will be downloaded",
            candidates.len(),
            max_items,
            max_items
        );
    }

    let selected = &candidates[..candidates.len().min(max_items)];
    if selected.is_empty() {
        info!("No products to download");
        return Ok(report);
    }

    client.connect().await?;
    debug!(endpoint = %client.endpoint(), dest_dir = %dest_dir.display(), "Downloading products");

    for id in selected {
        if report.outcome.len() >= max_items {
            break;
        }
        report.attempted.push(id.clone());
        match client.fetch(id, dest_dir).await {
            Ok(fetched) => {
                let clash = report
                    .outcome
                    .insert(&fetched.path, fetched.record)
                    .err()
                    .map(|holder| holder.id.clone());
                match clash {
                    None => info!(product_id = %id, path = %fetched.path.display(), "Downloaded product"),
                    Some(holder) => {
                        let err = FetchError::new(
                            id.as_str(),
                            format!("{} already holds product {holder}", fetched.path.display()),
                        );
                        warn!(product_id = %id, reason = %err.reason, "Skipping product stored over another");
                        report.failures.push(err);
                    }
                }
            }
            Err(err) => {
                warn!(product_id = %id, reason = %err.reason, "Skipping product that failed to download");
                report.failures.push(err);
            }
        }
    }

    info!(
        "Downloaded {} of {} attempted products",
        report.outcome.len(),
        report.attempted.len()
    );
    Ok(report)
}

/// Stage wrapper around [`download_report`] that publishes the outcome to
/// the `downloaded_products` slot of its task.
///
/// Without explicit product ids the candidates come from the search task's
/// `searched_products` slot; an absent slot means nothing to download.
pub struct DownloadStage {
    name: String,
    client: Arc<dyn CatalogClient>,
    config: DownloadConfig,
}

impl std::fmt::Debug for DownloadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStage")
            .field("name", &self.name)
            .field("endpoint", &self.client.endpoint())
            .field("config", &self.config)
            .finish()
    }
}

impl DownloadStage {
    /// Creates a download stage with the default task name.
    #[must_use]
    pub fn new(client: Arc<dyn CatalogClient>, config: DownloadConfig) -> Self {
        Self {
            name: DOWNLOAD_TASK.to_string(),
            client,
            config,
        }
    }

    /// Sets the task name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The stage configuration.
    #[must_use]
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    fn source(&self, ctx: &StageContext) -> Result<DownloadSource, MosaicflowError> {
        if let Some(ids) = &self.config.product_ids {
            return Ok(DownloadSource::Explicit(ids.clone()));
        }

        let slot = SlotKey::new(&self.config.search_task, SEARCHED_PRODUCTS);
        let results: Option<ResultSet> = get_typed(ctx.handoff(), &slot)?;
        if results.is_none() {
            info!(slot = %slot, "No search results were published");
        }
        Ok(DownloadSource::Results(results.unwrap_or_default()))
    }

    fn report_events(&self, ctx: &StageContext, report: &DownloadReport) {
        if report.cap_exceeded(self.config.max_items) {
            ctx.try_emit_event(
                DOWNLOAD_CAP_EXCEEDED,
                Some(serde_json::json!({
                    "candidates": report.candidates,
                    "max_items": self.config.max_items,
                })),
            );
        }
        for failure in &report.failures {
            ctx.try_emit_event(
                DOWNLOAD_ITEM_FAILED,
                Some(serde_json::json!({
                    "product_id": failure.product_id,
                    "reason": failure.reason,
                })),
            );
        }
        ctx.try_emit_event(
            DOWNLOAD_COMPLETED,
            Some(serde_json::json!({
                "attempted": report.attempted.len(),
                "downloaded": report.outcome.len(),
            })),
        );
    }
}

#[async_trait]
impl Stage for DownloadStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Download
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        traced(ctx, self.kind(), self.run(ctx)).await
    }
}

impl DownloadStage {
    async fn run(&self, ctx: &StageContext) -> StageOutput {
        if let Err(err) = self.config.validate() {
            return failed(ctx, &err.into());
        }
        let source = match self.source(ctx) {
            Ok(source) => source,
            Err(err) => return failed(ctx, &err),
        };

        let deadline = ctx.deadline().unwrap_or_else(|| self.config.timeout());
        let work = download_report(
            self.client.as_ref(),
            &source,
            self.config.max_items,
            &self.config.download_dir,
        );
        let report = match run_with_deadline(Some(deadline), work).await {
            TimedResult::Ok(report) => report,
            TimedResult::Err(err) => return failed(ctx, &err),
            TimedResult::Timeout => return timed_out(ctx, deadline),
        };

        if let Err(err) = put_typed(ctx.handoff(), &ctx.own_slot(DOWNLOADED_PRODUCTS), &report.outcome) {
            return failed(ctx, &err);
        }
        self.report_events(ctx, &report);

        let mut data = std::collections::HashMap::new();
        data.insert("downloaded".to_string(), serde_json::json!(report.outcome.len()));
        data.insert("failed".to_string(), serde_json::json!(report.failures.len()));
        StageOutput::ok(data).with_summary(report.summary())
    }
}
