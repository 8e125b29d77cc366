//! Ready-made records and configurations for tests and benchmarks.

use chrono::{DateTime, TimeZone, Utc};

use crate::catalog::{ProductRecord, ResultSet};
use crate::config::{MosaicConfig, OverviewConfig, RegisterConfig, Secret, TransferConfig, WarpConfig};

/// 2017-03-01 at the given hour, UTC.
///
/// Hours past 23 fall back to the Unix epoch.
#[must_use]
pub fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 3, 1, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A Sentinel-1 style product record.
#[must_use]
pub fn record(id: &str, ingestion_date: DateTime<Utc>) -> ProductRecord {
    ProductRecord::new(id, format!("S1A_IW_SLC__{id}"), ingestion_date)
        .with_summary(format!("Date: {}, Instrument: SAR-C, Mode: VV VH", ingestion_date.to_rfc3339()))
}

/// Collects records into a result set.
#[must_use]
pub fn result_set(records: Vec<ProductRecord>) -> ResultSet {
    records.into_iter().collect()
}

/// A complete, valid mosaic configuration.
#[must_use]
pub fn mosaic_config() -> MosaicConfig {
    MosaicConfig {
        instance_count: 5,
        warp: WarpConfig::new("EPSG:4326", 512, "/tmp").with_overwrite(true),
        overviews: OverviewConfig::new("average", 512),
        transfer: TransferConfig {
            host: "sdi.example.org".to_string(),
            remote_user: "mosaic".to_string(),
            ssh_key_file: "/keys/id_rsa".to_string(),
            remote_dir: "/data/coverages/s1".to_string(),
            working_dir: "/tmp".to_string(),
        },
        register: RegisterConfig {
            rest_url: "https://sdi.example.org/geoserver/rest".to_string(),
            user: "admin".to_string(),
            password: Secret::new("geoserver"),
            store_name: "sentinel1_slc".to_string(),
            mosaic_path: "/data/coverages/s1".to_string(),
        },
    }
}
