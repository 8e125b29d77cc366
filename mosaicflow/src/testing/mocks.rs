//! In-memory catalog double.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::catalog::{CatalogClient, FetchedProduct, ProductRecord, SearchCriteria};
use crate::errors::{CatalogUnavailableError, FetchError, UnavailableKind};

const ENDPOINT: &str = "mock://catalog";

/// A catalog that serves a fixed set of records and records every call.
///
/// Fetches never touch the filesystem; the returned path is where a real
/// client would have written the archive.
#[derive(Debug, Default)]
pub struct MockCatalog {
    records: Vec<ProductRecord>,
    failures: HashMap<String, String>,
    unavailable: Option<UnavailableKind>,
    fetch_delay: Option<Duration>,
    connects: Mutex<usize>,
    queries: Mutex<Vec<SearchCriteria>>,
    fetches: Mutex<Vec<String>>,
}

impl MockCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves these records from `query` and `fetch`.
    #[must_use]
    pub fn with_records(mut self, records: impl IntoIterator<Item = ProductRecord>) -> Self {
        self.records.extend(records);
        self
    }

    /// Makes fetching `product_id` fail with `reason`.
    #[must_use]
    pub fn with_failure(mut self, product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures.insert(product_id.into(), reason.into());
        self
    }

    /// Makes `connect` and `query` fail with the given kind.
    #[must_use]
    pub fn unavailable(mut self, kind: UnavailableKind) -> Self {
        self.unavailable = Some(kind);
        self
    }

    /// Delays every fetch.
    #[must_use]
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Number of `connect` calls.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        *self.connects.lock()
    }

    /// Criteria of every `query` call.
    #[must_use]
    pub fn queries(&self) -> Vec<SearchCriteria> {
        self.queries.lock().clone()
    }

    /// Product ids of every `fetch` call, in call order.
    #[must_use]
    pub fn fetched_ids(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }

    fn check_available(&self) -> Result<(), CatalogUnavailableError> {
        match self.unavailable {
            None => Ok(()),
            Some(kind) => Err(CatalogUnavailableError::new(ENDPOINT, kind, "catalog configured as unavailable")),
        }
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    fn endpoint(&self) -> String {
        ENDPOINT.to_string()
    }

    async fn connect(&self) -> Result<(), CatalogUnavailableError> {
        *self.connects.lock() += 1;
        self.check_available()
    }

    async fn query(&self, criteria: &SearchCriteria) -> Result<Vec<ProductRecord>, CatalogUnavailableError> {
        self.queries.lock().push(criteria.clone());
        self.check_available()?;
        Ok(self
            .records
            .iter()
            .filter(|r| criteria.identifier.as_ref().map_or(true, |ident| &r.title == ident))
            .cloned()
            .collect())
    }

    async fn fetch(&self, product_id: &str, dest_dir: &Path) -> Result<FetchedProduct, FetchError> {
        self.fetches.lock().push(product_id.to_string());
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failures.get(product_id) {
            return Err(FetchError::new(product_id, reason.clone()));
        }
        let record = self
            .records
            .iter()
            .find(|r| r.id == product_id)
            .cloned()
            .ok_or_else(|| FetchError::new(product_id, "Product not found"))?;
        Ok(FetchedProduct {
            path: dest_dir.join(format!("{}.zip", record.title)),
            record,
        })
    }
}
