//! Externally supplied configuration records.
//!
//! Every endpoint, credential, filesystem path and numeric limit used by the
//! assemblers and stages comes from these records. Each record validates
//! itself and reports the first missing field as a `ConfigurationError`.

mod catalog;
mod mosaic;
mod secret;

pub use catalog::{CatalogConfig, DownloadConfig, SearchConfig};
pub use mosaic::{MosaicConfig, OverviewConfig, RegisterConfig, TransferConfig, WarpConfig};
pub use secret::Secret;

use crate::errors::ConfigurationError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parses a configuration record from a JSON string.
///
/// # Errors
///
/// Returns `ConfigurationError` if the JSON does not match the record layout.
pub fn from_json_str<T: DeserializeOwned>(json: &str) -> Result<T, ConfigurationError> {
    serde_json::from_str(json).map_err(|e| ConfigurationError::parse(e.to_string()))
}

/// Reads and parses a configuration record from a JSON file.
///
/// # Errors
///
/// Returns `ConfigurationError` if the file cannot be read or parsed.
pub fn from_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigurationError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ConfigurationError::parse(format!("cannot read {}: {e}", path.display()))
    })?;
    from_json_str(&contents)
}

/// Fails with `ConfigurationError::missing` when `value` is blank.
pub(crate) fn require(field: &str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::missing(field));
    }
    Ok(())
}
