//! Catalog endpoint, search and download configuration.

use super::{require, Secret};
use crate::catalog::{Footprint, SearchCriteria};
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_timeout() -> f64 {
    60.0
}

fn default_page_size() -> u32 {
    100
}

fn default_start_date() -> String {
    "NOW-1DAY".to_string()
}

fn default_end_date() -> String {
    "NOW".to_string()
}

fn default_max_items() -> usize {
    100
}

fn default_download_timeout() -> f64 {
    3600.0
}

fn default_search_task() -> String {
    "dhus_search_task".to_string()
}

/// Connection settings for the product catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the hub (e.g. `https://scihub.example/dhus`).
    pub url: String,
    /// Account name.
    pub user: String,
    /// Account password.
    pub password: Secret,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Rows requested per search page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl CatalogConfig {
    /// Creates a catalog configuration with default limits.
    #[must_use]
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: Secret::new(password.into()),
            timeout_seconds: default_timeout(),
            page_size: default_page_size(),
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("catalog.url", &self.url)?;
        require("catalog.user", &self.user)?;
        if self.password.is_blank() {
            return Err(ConfigurationError::missing("catalog.password"));
        }
        if self.timeout_seconds <= 0.0 {
            return Err(ConfigurationError::out_of_range(
                "catalog.timeout_seconds",
                "catalog.timeout_seconds must be positive",
            ));
        }
        if self.page_size == 0 {
            return Err(ConfigurationError::out_of_range(
                "catalog.page_size",
                "catalog.page_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Search stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to a GeoJSON file holding the area of interest.
    pub geojson_bbox: PathBuf,
    /// Sensing start (ISO date or `NOW-<n>DAY(S)` expression).
    #[serde(default = "default_start_date")]
    pub start_date: String,
    /// Sensing end.
    #[serde(default = "default_end_date")]
    pub end_date: String,
    /// Optional platform filter (e.g. `Sentinel-1`).
    #[serde(default)]
    pub platform_name: Option<String>,
    /// Optional product identifier filter.
    #[serde(default)]
    pub identifier: Option<String>,
}

impl SearchConfig {
    /// Loads the footprint and builds the immutable search criteria.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the GeoJSON file cannot be read or
    /// holds no usable polygon, or if a date is blank.
    pub fn criteria(&self) -> Result<SearchCriteria, ConfigurationError> {
        let footprint = Footprint::from_geojson_file(&self.geojson_bbox)?;
        let mut criteria = SearchCriteria::new(footprint, &self.start_date, &self.end_date);
        if let Some(platform) = &self.platform_name {
            criteria = criteria.with_platform_name(platform);
        }
        if let Some(identifier) = &self.identifier {
            criteria = criteria.with_identifier(identifier);
        }
        criteria.validate()?;
        Ok(criteria)
    }
}

/// Download stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory receiving the downloaded products.
    pub download_dir: PathBuf,
    /// Hard ceiling on successful downloads.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Stage deadline in seconds.
    #[serde(default = "default_download_timeout")]
    pub timeout_seconds: f64,
    /// Explicit product ids; when absent, ids come from the search handoff slot.
    #[serde(default)]
    pub product_ids: Option<Vec<String>>,
    /// Task whose handoff slot holds the search results.
    #[serde(default = "default_search_task")]
    pub search_task: String,
}

impl DownloadConfig {
    /// Creates a download configuration with default limits.
    #[must_use]
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            max_items: default_max_items(),
            timeout_seconds: default_download_timeout(),
            product_ids: None,
            search_task: default_search_task(),
        }
    }

    /// Sets the download cap.
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets explicit product ids.
    #[must_use]
    pub fn with_product_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.product_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the stage deadline.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets the deadline as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::missing("download.download_dir"));
        }
        require("download.search_task", &self.search_task)?;
        if self.timeout_seconds <= 0.0 {
            return Err(ConfigurationError::out_of_range(
                "download.timeout_seconds",
                "download.timeout_seconds must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_json_str;
    use std::io::Write;

    #[test]
    fn test_catalog_defaults() {
        let config: CatalogConfig =
            from_json_str(r#"{"url": "https://hub.example/dhus/", "user": "u", "password": "p"}"#).unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.base_url(), "https://hub.example/dhus");
    }

    #[test]
    fn test_catalog_validation() {
        let config = CatalogConfig::new("https://hub.example", "u", "");
        assert_eq!(
            config.validate().unwrap_err().field.as_deref(),
            Some("catalog.password")
        );

        let config = CatalogConfig::new("https://hub.example", "u", "p").with_timeout(0.0);
        assert_eq!(
            config.validate().unwrap_err().error_info.code,
            "CONFIG-002-RANGE"
        );
    }

    #[test]
    fn test_download_defaults() {
        let config: DownloadConfig = from_json_str(r#"{"download_dir": "/data/s1"}"#).unwrap();

        assert_eq!(config.max_items, 100);
        assert_eq!(config.timeout(), Duration::from_secs(3600));
        assert_eq!(config.search_task, "dhus_search_task");
        assert!(config.product_ids.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_download_empty_dir() {
        let config = DownloadConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_criteria_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "Polygon", "coordinates": [[[10.0, 40.0], [11.0, 40.0], [11.0, 41.0], [10.0, 40.0]]]}}"#
        )
        .unwrap();

        let config = SearchConfig {
            geojson_bbox: file.path().to_path_buf(),
            start_date: "2017-01-01".to_string(),
            end_date: "NOW".to_string(),
            platform_name: Some("Sentinel-1".to_string()),
            identifier: None,
        };

        let criteria = config.criteria().unwrap();
        assert_eq!(criteria.platform_name.as_deref(), Some("Sentinel-1"));
        assert_eq!(criteria.footprint.exterior().len(), 4);
    }
}
