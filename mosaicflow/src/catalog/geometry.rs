//! Area-of-interest footprints read from GeoJSON.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// A closed polygon ring in `(lon, lat)` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    exterior: Vec<(f64, f64)>,
}

impl Footprint {
    /// Builds a footprint from ring coordinates, closing the ring if needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if fewer than three distinct points are given.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, ConfigurationError> {
        let mut exterior: Vec<(f64, f64)> = points.into_iter().collect();
        if let (Some(first), Some(last)) = (exterior.first().copied(), exterior.last().copied()) {
            if first != last {
                exterior.push(first);
            }
        }
        if exterior.len() < 4 {
            return Err(ConfigurationError::out_of_range(
                "geojson_bbox",
                "footprint needs at least three distinct points",
            ));
        }
        Ok(Self { exterior })
    }

    /// Builds a rectangular footprint from a bounding box.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the box is degenerate.
    pub fn from_bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, ConfigurationError> {
        if min_lon >= max_lon || min_lat >= max_lat {
            return Err(ConfigurationError::out_of_range(
                "geojson_bbox",
                "bounding box minimum must be below its maximum",
            ));
        }
        Self::new([
            (min_lon, min_lat),
            (max_lon, min_lat),
            (max_lon, max_lat),
            (min_lon, max_lat),
        ])
    }

    /// Extracts the first polygon of a GeoJSON document.
    ///
    /// Accepts a bare `Polygon`/`MultiPolygon` geometry, a `Feature` or a
    /// `FeatureCollection`; only the exterior ring is kept.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if no polygon can be found.
    pub fn from_geojson(value: &serde_json::Value) -> Result<Self, ConfigurationError> {
        let geometry = match value.get("type").and_then(serde_json::Value::as_str) {
            Some("FeatureCollection") => value
                .get("features")
                .and_then(|f| f.get(0))
                .and_then(|f| f.get("geometry")),
            Some("Feature") => value.get("geometry"),
            _ => Some(value),
        }
        .ok_or_else(|| ConfigurationError::parse("GeoJSON document holds no geometry"))?;

        let ring = match geometry.get("type").and_then(serde_json::Value::as_str) {
            Some("Polygon") => geometry.pointer("/coordinates/0"),
            Some("MultiPolygon") => geometry.pointer("/coordinates/0/0"),
            other => {
                return Err(ConfigurationError::parse(format!(
                    "unsupported GeoJSON geometry type: {}",
                    other.unwrap_or("none")
                )))
            }
        }
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ConfigurationError::parse("GeoJSON polygon has no exterior ring"))?;

        let points = ring
            .iter()
            .map(|p| match (p.get(0).and_then(serde_json::Value::as_f64), p.get(1).and_then(serde_json::Value::as_f64)) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(ConfigurationError::parse(format!("invalid GeoJSON position: {p}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(points)
    }

    /// Reads a GeoJSON file and extracts its first polygon.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the file cannot be read, parsed, or holds no polygon.
    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let value: serde_json::Value = crate::config::from_path(path)?;
        Self::from_geojson(&value)
    }

    /// The closed exterior ring.
    #[must_use]
    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.exterior
    }

    /// Renders the footprint as WKT, e.g. `POLYGON((10 40,11 40,11 41,10 40))`.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        let mut wkt = String::from("POLYGON((");
        for (i, (lon, lat)) in self.exterior.iter().enumerate() {
            if i > 0 {
                wkt.push(',');
            }
            let _ = write!(wkt, "{lon} {lat}");
        }
        wkt.push_str("))");
        wkt
    }
}
