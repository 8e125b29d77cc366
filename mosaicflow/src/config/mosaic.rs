//! Configuration shared by every instance of the mosaic pipeline.

use super::{require, Secret};
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};

fn default_instance_count() -> i64 {
    5
}

/// Reprojection/tiling step parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarpConfig {
    /// Target spatial reference system (e.g. `EPSG:4326`).
    pub target_srs: String,
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Local working directory holding the index-specific datasets.
    pub working_dir: String,
    /// Whether existing outputs are overwritten.
    #[serde(default)]
    pub overwrite: bool,
}

impl WarpConfig {
    /// Creates a warp configuration.
    #[must_use]
    pub fn new(target_srs: impl Into<String>, tile_size: u32, working_dir: impl Into<String>) -> Self {
        Self {
            target_srs: target_srs.into(),
            tile_size,
            working_dir: working_dir.into(),
            overwrite: false,
        }
    }

    /// Sets the overwrite flag.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("warp.target_srs", &self.target_srs)?;
        require("warp.working_dir", &self.working_dir)?;
        if self.tile_size == 0 {
            return Err(ConfigurationError::out_of_range(
                "warp.tile_size",
                "warp.tile_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Overview-pyramid step parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewConfig {
    /// Resampling method (e.g. `average`, `nearest`).
    pub resampling_method: String,
    /// Largest overview decimation level.
    pub max_overview_level: u32,
}

impl OverviewConfig {
    /// Creates an overview configuration.
    #[must_use]
    pub fn new(resampling_method: impl Into<String>, max_overview_level: u32) -> Self {
        Self {
            resampling_method: resampling_method.into(),
            max_overview_level,
        }
    }

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("overviews.resampling_method", &self.resampling_method)?;
        if self.max_overview_level < 2 {
            return Err(ConfigurationError::out_of_range(
                "overviews.max_overview_level",
                "overviews.max_overview_level must be at least 2",
            ));
        }
        Ok(())
    }
}

/// Secure-transfer step parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Remote host receiving the granules.
    pub host: String,
    /// Remote user name.
    pub remote_user: String,
    /// Identity file used for the ssh channel.
    pub ssh_key_file: String,
    /// Remote mosaic directory.
    pub remote_dir: String,
    /// Local directory the processed files are read from.
    pub working_dir: String,
}

impl TransferConfig {
    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("transfer.host", &self.host)?;
        require("transfer.remote_user", &self.remote_user)?;
        require("transfer.ssh_key_file", &self.ssh_key_file)?;
        require("transfer.remote_dir", &self.remote_dir)?;
        require("transfer.working_dir", &self.working_dir)
    }
}

/// Mosaic-registration step parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// REST endpoint of the catalog server (e.g. `https://host/geoserver/rest`).
    pub rest_url: String,
    /// REST user.
    pub user: String,
    /// REST password.
    pub password: Secret,
    /// Name of the image-mosaic store receiving granules.
    pub store_name: String,
    /// Mosaic directory as seen by the server.
    pub mosaic_path: String,
}

impl RegisterConfig {
    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("register.rest_url", &self.rest_url)?;
        require("register.user", &self.user)?;
        if self.password.is_blank() {
            return Err(ConfigurationError::missing("register.password"));
        }
        require("register.store_name", &self.store_name)?;
        require("register.mosaic_path", &self.mosaic_path)
    }
}

/// The fixed parameter set shared by all mosaic pipeline instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Number of parallel pipeline instances.
    #[serde(default = "default_instance_count")]
    pub instance_count: i64,
    /// Warp step.
    pub warp: WarpConfig,
    /// Overview step.
    pub overviews: OverviewConfig,
    /// Transfer step.
    pub transfer: TransferConfig,
    /// Registration step.
    pub register: RegisterConfig,
}

impl MosaicConfig {
    /// Validates every section.
    ///
    /// The instance count is checked by the assembler, which may be given a
    /// different count than the configured one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.warp.validate()?;
        self.overviews.validate()?;
        self.transfer.validate()?;
        self.register.validate()
    }
}
