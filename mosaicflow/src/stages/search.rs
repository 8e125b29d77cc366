//! Catalog search stage.

use super::runtime::{failed, traced, run_with_deadline, timed_out, TimedResult};
use super::Stage;
use crate::catalog::{CatalogClient, ResultSet, SearchCriteria};
use crate::config::SearchConfig;
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput, StageSummary};
use crate::errors::{ConfigurationError, MosaicflowError};
use crate::events::SEARCH_COMPLETED;
use crate::handoff::{put_typed, SEARCHED_PRODUCTS};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Default task name of the search stage.
pub const SEARCH_TASK: &str = "dhus_search_task";

/// Queries the catalog and returns every matching product.
///
/// No match is an empty result set, not an error.
///
/// # Errors
///
/// Returns `MosaicflowError::CatalogUnavailable` if the catalog cannot be
/// reached or rejects the credentials.
pub async fn search(client: &dyn CatalogClient, criteria: &SearchCriteria) -> Result<ResultSet, MosaicflowError> {
    info!(
        endpoint = %client.endpoint(),
        footprint = %criteria.footprint.to_wkt(),
        start_date = %criteria.start_date,
        end_date = %criteria.end_date,
        platform_name = ?criteria.platform_name,
        identifier = ?criteria.identifier,
        "Searching catalog"
    );

    let results: ResultSet = client.query(criteria).await?.into_iter().collect();
    for record in results.iter() {
        info!("{}", record.summary_line());
    }
    info!(count = results.len(), "Found {} products", results.len());
    Ok(results)
}

/// Stage wrapper around [`search`] that publishes the result set to the
/// `searched_products` slot of its task.
pub struct SearchStage {
    name: String,
    client: Arc<dyn CatalogClient>,
    criteria: SearchCriteria,
}

impl std::fmt::Debug for SearchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchStage")
            .field("name", &self.name)
            .field("endpoint", &self.client.endpoint())
            .field("criteria", &self.criteria)
            .finish()
    }
}

impl SearchStage {
    /// Creates a search stage with the default task name.
    #[must_use]
    pub fn new(client: Arc<dyn CatalogClient>, criteria: SearchCriteria) -> Self {
        Self {
            name: SEARCH_TASK.to_string(),
            client,
            criteria,
        }
    }

    /// Creates a search stage from its configuration record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the area of interest cannot be loaded.
    pub fn from_config(client: Arc<dyn CatalogClient>, config: &SearchConfig) -> Result<Self, ConfigurationError> {
        Ok(Self::new(client, config.criteria()?))
    }

    /// Sets the task name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The search criteria.
    #[must_use]
    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }
}

#[async_trait]
impl Stage for SearchStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Search
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        traced(ctx, self.kind(), self.run(ctx)).await
    }
}

impl SearchStage {
    async fn run(&self, ctx: &StageContext) -> StageOutput {
        let results = match run_with_deadline(ctx.deadline(), search(self.client.as_ref(), &self.criteria)).await {
            TimedResult::Ok(results) => results,
            TimedResult::Err(err) => return failed(ctx, &err),
            TimedResult::Timeout => return timed_out(ctx, ctx.deadline().unwrap_or_default()),
        };

        let slot = ctx.own_slot(SEARCHED_PRODUCTS);
        if let Err(err) = put_typed(ctx.handoff(), &slot, &results) {
            return failed(ctx, &err);
        }

        let found = results.len();
        ctx.try_emit_event(SEARCH_COMPLETED, Some(serde_json::json!({"found": found})));
        StageOutput::ok_value("found", serde_json::json!(found)).with_summary(StageSummary::new(found, found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Footprint, MockCatalogClient};
    use crate::core::StageStatus;
    use crate::errors::{CatalogUnavailableError, UnavailableKind};
    use crate::handoff::{get_typed, SlotKey};
    use crate::testing::fixtures::{at_hour, record};

    fn criteria() -> SearchCriteria {
        SearchCriteria::new(Footprint::from_bbox(10.0, 40.0, 11.0, 41.0).unwrap(), "NOW-1DAY", "NOW")
    }

    fn mock_with(records: Vec<crate::catalog::ProductRecord>) -> MockCatalogClient {
        let mut client = MockCatalogClient::new();
        client.expect_endpoint().return_const("mock://hub".to_string());
        client.expect_query().times(1).return_once(move |_| Ok(records));
        client
    }

    #[tokio::test]
    async fn test_search_collects_results() {
        let client = mock_with(vec![record("a", at_hour(1)), record("b", at_hour(2))]);

        let results = search(&client, &criteria()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.get("a").is_some());
    }

    #[tokio::test]
    async fn test_search_zero_matches_is_ok() {
        let client = mock_with(Vec::new());
        let results = search(&client, &criteria()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_unavailable() {
        let mut client = MockCatalogClient::new();
        client.expect_endpoint().return_const("mock://hub".to_string());
        client
            .expect_query()
            .return_once(|_| Err(CatalogUnavailableError::auth("mock://hub", "HTTP 401")));

        let err = search(&client, &criteria()).await.unwrap_err();
        match err {
            MosaicflowError::CatalogUnavailable(e) => assert_eq!(e.kind, UnavailableKind::Auth),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_stage_publishes_results() {
        let stage = SearchStage::new(Arc::new(mock_with(vec![record("a", at_hour(1))])), criteria());
        let ctx = StageContext::standalone(stage.name());

        let output = stage.execute(&ctx).await;

        assert_eq!(output.status, StageStatus::Ok);
        assert_eq!(output.summary, StageSummary::new(1, 1));
        let published: Option<ResultSet> =
            get_typed(ctx.handoff(), &SlotKey::new(SEARCH_TASK, SEARCHED_PRODUCTS)).unwrap();
        assert_eq!(published.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_stage_failure_publishes_nothing() {
        let mut client = MockCatalogClient::new();
        client.expect_endpoint().return_const("mock://hub".to_string());
        client
            .expect_query()
            .return_once(|_| Err(CatalogUnavailableError::connect("mock://hub", "refused")));
        let stage = SearchStage::new(Arc::new(client), criteria());
        let ctx = StageContext::standalone(stage.name());

        let output = stage.execute(&ctx).await;

        assert_eq!(output.status, StageStatus::Fail);
        assert!(output.retryable);
        assert!(ctx.handoff().get(&ctx.own_slot(SEARCHED_PRODUCTS)).is_none());
    }
}
