//! Product catalog access.
//!
//! This module provides:
//! - Data models for search criteria, product records and result sets
//! - GeoJSON footprints
//! - The `CatalogClient` trait the search and download stages talk to
//! - Fetch verification
//! - A DHuS (Data Hub Service) client implementation

mod geometry;
mod models;
mod verify;

#[cfg(feature = "dhus")]
mod dhus;

pub use geometry::Footprint;
pub use models::{DownloadOutcome, FetchedProduct, ProductRecord, ResultSet, SearchCriteria};
pub use verify::{ContentVerifier, FetchVerifier};

#[cfg(feature = "dhus")]
pub use dhus::DhusClient;

#[cfg(test)]
pub(crate) use verify::MockFetchVerifier;

use crate::errors::{CatalogUnavailableError, FetchError};
use async_trait::async_trait;
use std::path::Path;

/// Interface to an external product catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Endpoint description used in logs.
    fn endpoint(&self) -> String;

    /// Establishes the connection and checks the credentials.
    ///
    /// Called once at stage entry, before any per-item work.
    async fn connect(&self) -> Result<(), CatalogUnavailableError>;

    /// Returns every product matching the criteria; an empty vec when nothing matches.
    async fn query(&self, criteria: &SearchCriteria) -> Result<Vec<ProductRecord>, CatalogUnavailableError>;

    /// Retrieves one product into `dest_dir` and verifies it.
    async fn fetch(&self, product_id: &str, dest_dir: &Path) -> Result<FetchedProduct, FetchError>;
}
