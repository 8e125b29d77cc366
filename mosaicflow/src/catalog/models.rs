//! Search criteria, product records and the sets exchanged between stages.

use super::Footprint;
use crate::errors::ConfigurationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable input to a catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Area of interest.
    pub footprint: Footprint,
    /// Sensing start (ISO date or `NOW` expression).
    pub start_date: String,
    /// Sensing end.
    pub end_date: String,
    /// Optional platform filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_name: Option<String>,
    /// Optional identifier filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl SearchCriteria {
    /// Creates criteria without optional filters.
    #[must_use]
    pub fn new(footprint: Footprint, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            footprint,
            start_date: start_date.into(),
            end_date: end_date.into(),
            platform_name: None,
            identifier: None,
        }
    }

    /// Restricts the search to one platform.
    #[must_use]
    pub fn with_platform_name(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    /// Restricts the search to one identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Validates the criteria.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a date is blank.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        crate::config::require("search.start_date", &self.start_date)?;
        crate::config::require("search.end_date", &self.end_date)
    }
}

/// One product returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Unique product identifier (used for fetching).
    pub id: String,
    /// Catalog key, the product's name.
    pub title: String,
    /// Descriptive summary.
    #[serde(default)]
    pub summary: String,
    /// When the product entered the catalog.
    pub ingestion_date: DateTime<Utc>,
    /// Any further metadata fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProductRecord {
    /// Creates a record with an empty summary.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, ingestion_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            ingestion_date,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Adds a metadata field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// `id|title|summary`, the per-product log line.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!("{}|{}|{}", self.id, self.title, self.summary)
    }
}

/// Products found by one search, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    products: BTreeMap<String, ProductRecord>,
}

impl ResultSet {
    /// Creates an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any record with the same id.
    pub fn insert(&mut self, record: ProductRecord) -> Option<ProductRecord> {
        self.products.insert(record.id.clone(), record)
    }

    /// Gets a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.products.get(id)
    }

    /// Iterates over records (in id order; callers must not rely on it).
    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.products.values()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if no records were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<ProductRecord> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ProductRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

/// A product stored locally by a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedProduct {
    /// Where the artifact was written.
    pub path: PathBuf,
    /// What the catalog reported about the product.
    pub record: ProductRecord,
}

/// Successfully retrieved artifacts, keyed by storage location.
///
/// Only completed transfers are ever inserted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadOutcome {
    artifacts: BTreeMap<String, ProductRecord>,
}

impl DownloadOutcome {
    /// Creates an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed transfer.
    ///
    /// A location holds one product; if it is already taken the record is
    /// not stored and the current holder is returned as the error.
    pub fn insert(&mut self, path: &Path, record: ProductRecord) -> Result<(), &ProductRecord> {
        match self.artifacts.entry(path.display().to_string()) {
            Entry::Occupied(held) => Err(held.into_mut()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Gets the record stored at a location.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ProductRecord> {
        self.artifacts.get(path)
    }

    /// Returns true if the product id was retrieved.
    #[must_use]
    pub fn contains_product(&self, id: &str) -> bool {
        self.artifacts.values().any(|r| r.id == id)
    }

    /// Iterates over `(location, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProductRecord)> {
        self.artifacts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns true if nothing was retrieved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
