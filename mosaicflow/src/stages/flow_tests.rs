//! Search and download stages running against one handoff store.

use super::*;
use crate::catalog::{DownloadOutcome, Footprint, ProductRecord, ResultSet, SearchCriteria};
use crate::config::DownloadConfig;
use crate::context::StageContext;
use crate::core::{StageStatus, StageSummary};
use crate::errors::UnavailableKind;
use crate::events::{
    CollectingEventSink, DOWNLOAD_CAP_EXCEEDED, DOWNLOAD_COMPLETED, DOWNLOAD_ITEM_FAILED, SEARCH_COMPLETED,
    STAGE_TIMEOUT,
};
use crate::handoff::{get_typed, put_typed, InMemoryHandoffStore, SlotKey, DOWNLOADED_PRODUCTS, SEARCHED_PRODUCTS};
use crate::testing::fixtures::{at_hour, record};
use crate::testing::{assert_output_status, assert_output_succeeded, assert_output_summary, MockCatalog};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: Arc<InMemoryHandoffStore>,
    events: Arc<CollectingEventSink>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryHandoffStore::new()),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    fn ctx(&self, stage: &str) -> StageContext {
        StageContext::new(self.store.run().clone(), stage, self.store.clone())
            .with_event_sink(self.events.clone())
    }

    fn outcome(&self) -> Option<DownloadOutcome> {
        get_typed(self.store.as_ref(), &SlotKey::new(DOWNLOAD_TASK, DOWNLOADED_PRODUCTS)).unwrap()
    }

    fn event_count(&self, event_type: &str) -> usize {
        self.events.count_of(event_type)
    }
}

fn criteria() -> SearchCriteria {
    SearchCriteria::new(Footprint::from_bbox(10.0, 40.0, 11.0, 41.0).unwrap(), "NOW-1DAY", "NOW")
        .with_platform_name("Sentinel-1")
}

fn three_products() -> Vec<ProductRecord> {
    vec![record("A", at_hour(1)), record("B", at_hour(3)), record("C", at_hour(2))]
}

fn download_stage(catalog: &Arc<MockCatalog>, max_items: usize) -> DownloadStage {
    DownloadStage::new(catalog.clone(), DownloadConfig::new("/data/s1").with_max_items(max_items))
}

#[tokio::test]
async fn test_search_then_download_oldest_first_under_cap() {
    let harness = Harness::new();
    let catalog = Arc::new(
        MockCatalog::new()
            .with_records(three_products())
            .with_failure("A", "Maximum number of 2 concurrent flows achieved"),
    );

    let search_out = SearchStage::new(catalog.clone(), criteria())
        .execute(&harness.ctx(SEARCH_TASK))
        .await;
    assert_output_succeeded(&search_out);
    assert_output_summary(&search_out, 3, 3);

    let download_out = download_stage(&catalog, 2).execute(&harness.ctx(DOWNLOAD_TASK)).await;

    assert_output_succeeded(&download_out);
    assert_output_summary(&download_out, 2, 1);
    assert_eq!(catalog.fetched_ids(), vec!["A", "C"]);
    assert_eq!(catalog.connect_count(), 1);

    let outcome = harness.outcome().unwrap();
    assert_eq!(outcome.len(), 1);
    assert!(outcome.contains_product("C"));
    assert!(outcome.get("/data/s1/S1A_IW_SLC__C.zip").is_some());

    assert_eq!(harness.event_count(SEARCH_COMPLETED), 1);
    assert_eq!(harness.event_count(DOWNLOAD_CAP_EXCEEDED), 1);
    assert_eq!(harness.event_count(DOWNLOAD_ITEM_FAILED), 1);
    assert_eq!(harness.event_count(DOWNLOAD_COMPLETED), 1);

    let failed = harness.events.payloads_of(DOWNLOAD_ITEM_FAILED);
    assert_eq!(failed[0]["product_id"], serde_json::json!("A"));
    assert_eq!(failed[0]["stage"], serde_json::json!(DOWNLOAD_TASK));
    let cap = harness.events.payloads_of(DOWNLOAD_CAP_EXCEEDED);
    assert_eq!(cap[0]["candidates"], serde_json::json!(3));
}

#[tokio::test]
async fn test_search_results_are_not_consumed_by_download() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new().with_records(three_products()));

    SearchStage::new(catalog.clone(), criteria())
        .execute(&harness.ctx(SEARCH_TASK))
        .await;
    download_stage(&catalog, 10).execute(&harness.ctx(DOWNLOAD_TASK)).await;

    let results: Option<ResultSet> =
        get_typed(harness.store.as_ref(), &SlotKey::new(SEARCH_TASK, SEARCHED_PRODUCTS)).unwrap();
    assert_eq!(results.map(|r| r.len()), Some(3));
    assert_eq!(harness.outcome().map(|o| o.len()), Some(3));
    assert_eq!(catalog.fetched_ids(), vec!["A", "C", "B"]);
    assert_eq!(harness.event_count(DOWNLOAD_CAP_EXCEEDED), 0);
}

#[tokio::test]
async fn test_every_fetch_failing_still_succeeds() {
    let harness = Harness::new();
    let catalog = Arc::new(
        MockCatalog::new()
            .with_records(three_products())
            .with_failure("A", "offline")
            .with_failure("B", "offline")
            .with_failure("C", "offline"),
    );
    SearchStage::new(catalog.clone(), criteria())
        .execute(&harness.ctx(SEARCH_TASK))
        .await;

    let output = download_stage(&catalog, 10).execute(&harness.ctx(DOWNLOAD_TASK)).await;

    assert_output_succeeded(&output);
    assert_output_summary(&output, 3, 0);
    assert_eq!(output.get("failed"), Some(&serde_json::json!(3)));
    assert_eq!(harness.outcome().map(|o| o.is_empty()), Some(true));
    assert_eq!(harness.event_count(DOWNLOAD_ITEM_FAILED), 3);
}

#[tokio::test]
async fn test_absent_search_slot_downloads_nothing() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new().with_records(three_products()));

    let output = download_stage(&catalog, 10).execute(&harness.ctx(DOWNLOAD_TASK)).await;

    assert_output_succeeded(&output);
    assert_eq!(output.summary, StageSummary::new(0, 0));
    assert_eq!(catalog.connect_count(), 0);
    assert_eq!(harness.outcome().map(|o| o.len()), Some(0));
}

#[tokio::test]
async fn test_zero_result_search_then_download() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new());

    let search_out = SearchStage::new(catalog.clone(), criteria())
        .execute(&harness.ctx(SEARCH_TASK))
        .await;
    assert_output_succeeded(&search_out);
    assert_eq!(search_out.get("found"), Some(&serde_json::json!(0)));

    let output = download_stage(&catalog, 10).execute(&harness.ctx(DOWNLOAD_TASK)).await;
    assert_output_succeeded(&output);
    assert!(catalog.fetched_ids().is_empty());
}

#[tokio::test]
async fn test_explicit_ids_bypass_search_slot() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new().with_records(three_products()));
    let config = DownloadConfig::new("/data/s1").with_product_ids(["B", "A", "B"]);

    let output = DownloadStage::new(catalog.clone(), config)
        .execute(&harness.ctx(DOWNLOAD_TASK))
        .await;

    assert_output_succeeded(&output);
    assert_eq!(catalog.fetched_ids(), vec!["B", "A"]);
}

#[tokio::test]
async fn test_same_title_products_do_not_overwrite() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new().with_records([
        ProductRecord::new("A", "S1A_SAME", at_hour(1)),
        ProductRecord::new("B", "S1A_SAME", at_hour(2)),
    ]));
    let config = DownloadConfig::new("/data/s1").with_product_ids(["A", "B"]).with_max_items(5);

    let output = DownloadStage::new(catalog.clone(), config)
        .execute(&harness.ctx(DOWNLOAD_TASK))
        .await;

    assert_output_succeeded(&output);
    assert_output_summary(&output, 2, 1);
    assert_eq!(catalog.fetched_ids(), vec!["A", "B"]);
    let outcome = harness.outcome().unwrap();
    assert!(outcome.contains_product("A"));
    assert!(!outcome.contains_product("B"));
    let failed = harness.events.payloads_of(DOWNLOAD_ITEM_FAILED);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].get("product_id"), Some(&serde_json::json!("B")));
}

#[tokio::test]
async fn test_timeout_publishes_nothing() {
    let harness = Harness::new();
    let catalog = Arc::new(
        MockCatalog::new()
            .with_records(three_products())
            .with_fetch_delay(Duration::from_secs(5)),
    );
    let config = DownloadConfig::new("/data/s1").with_product_ids(["A", "B"]);
    let ctx = harness.ctx(DOWNLOAD_TASK).with_deadline(Duration::from_millis(20));

    let output = DownloadStage::new(catalog.clone(), config).execute(&ctx).await;

    assert_output_status(&output, StageStatus::Timeout);
    assert!(output.retryable);
    assert!(harness.outcome().is_none());
    assert_eq!(harness.event_count(STAGE_TIMEOUT), 1);
    assert_eq!(harness.event_count(DOWNLOAD_COMPLETED), 0);
}

#[tokio::test]
async fn test_unreachable_catalog_fails_retryably() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new().unavailable(UnavailableKind::Connect));

    let output = SearchStage::new(catalog.clone(), criteria())
        .execute(&harness.ctx(SEARCH_TASK))
        .await;

    assert_output_status(&output, StageStatus::Fail);
    assert!(output.retryable);
    assert!(!harness.store.contains(&SlotKey::new(SEARCH_TASK, SEARCHED_PRODUCTS)));
}

#[tokio::test]
async fn test_download_slot_already_written() {
    let harness = Harness::new();
    let catalog = Arc::new(MockCatalog::new().with_records(three_products()));
    put_typed(
        harness.store.as_ref(),
        &SlotKey::new(DOWNLOAD_TASK, DOWNLOADED_PRODUCTS),
        &DownloadOutcome::new(),
    )
    .unwrap();

    let output = download_stage(&catalog, 10)
        .execute(&harness.ctx(DOWNLOAD_TASK))
        .await;

    assert_output_status(&output, StageStatus::Fail);
    assert!(!output.retryable);
    assert_eq!(harness.outcome().map(|o| o.len()), Some(0));
    assert_eq!(catalog.fetched_ids().len(), 3);
}
