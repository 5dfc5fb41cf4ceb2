//! Hour-keyed forecast cache.
//!
//! Best-effort persistence of the last fetched forecast, keyed by
//! rounded coordinate plus calendar hour. Failures never surface to
//! the caller: caching is an optimization, not a correctness
//! requirement. There is no eviction; keys age out naturally when the
//! hour rolls over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::{Coordinate, Forecast};

#[derive(Debug)]
pub struct ForecastCache {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    saved_at_ms: i64,
    payload: Forecast,
}

impl ForecastCache {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            dir: config_dir.join("forecast_cache"),
        }
    }

    /// Cache key for `coordinate` at the current hour: latitude and
    /// longitude rounded to 2 decimal places (~1.1 km) plus the UTC
    /// calendar hour, so repeated lookups nearby within the same hour
    /// share one entry.
    pub fn key_for(coordinate: Coordinate) -> String {
        Self::key_for_at(coordinate, Utc::now())
    }

    pub fn key_for_at(coordinate: Coordinate, time: DateTime<Utc>) -> String {
        format!(
            "{:.2}_{:.2}_{}",
            coordinate.latitude,
            coordinate.longitude,
            time.format("%Y-%m-%dT%H")
        )
    }

    /// Best-effort persist. Failure is logged and swallowed.
    pub fn put(&self, key: &str, forecast: &Forecast) {
        let entry = CacheEntry {
            key: key.to_string(),
            saved_at_ms: Utc::now().timestamp_millis(),
            payload: forecast.clone(),
        };

        let result = std::fs::create_dir_all(&self.dir)
            .map_err(|e| e.to_string())
            .and_then(|_| serde_json::to_vec(&entry).map_err(|e| e.to_string()))
            .and_then(|bytes| std::fs::write(self.entry_path(key), bytes).map_err(|e| e.to_string()));

        if let Err(e) = result {
            tracing::warn!(key, "Failed to write forecast cache: {}", e);
        }
    }

    /// Best-effort read. Missing, malformed, or empty data is a miss.
    pub fn get(&self, key: &str) -> Option<Forecast> {
        let bytes = std::fs::read(self.entry_path(key)).ok()?;
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, "Discarding malformed forecast cache entry: {}", e);
                return None;
            }
        };
        if entry.payload.slots().is_empty() {
            return None;
        }
        Some(entry.payload)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}
