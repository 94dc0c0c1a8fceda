//! Weather cache gate.
//!
//! Serves a stored snapshot while it is fresh, otherwise asks the configured
//! [`WeatherSource`] for current conditions and overwrites the snapshot.

mod source;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{city_key, WeatherCache};
use crate::storage::Storage;

pub use source::{Conditions, MockWeatherSource, WeatherSource};

/// `source` marker on responses served from the cache.
pub const CACHE_SOURCE: &str = "cache";

/// Default freshness window for cached snapshots.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Weather returned to callers.
///
/// Cache hits and refreshes share this shape; `source` tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    /// Lower-cased city name.
    pub city: String,
    /// Temperature in degrees Fahrenheit.
    pub temperature: f64,
    /// Human-readable conditions.
    pub conditions: String,
    /// Wind speed in miles per hour.
    pub wind_speed: f64,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// [`CACHE_SOURCE`] or the name of the source that produced the data.
    pub source: String,
}

impl WeatherReport {
    fn from_cache(entry: WeatherCache, source: &str) -> Self {
        Self {
            city: entry.city,
            temperature: entry.temperature,
            conditions: entry.conditions,
            wind_speed: entry.wind_speed,
            timestamp: entry.timestamp,
            source: source.to_string(),
        }
    }
}

/// Decides per request whether to serve a cached snapshot or refresh it.
#[derive(Debug, Clone)]
pub struct WeatherService {
    storage: Arc<Storage>,
    source: Arc<dyn WeatherSource>,
    ttl: TimeDelta,
}

impl WeatherService {
    /// Create a gate over `storage` that refreshes from `source` once a
    /// snapshot is older than `ttl`.
    #[must_use]
    pub fn new(storage: Arc<Storage>, source: Arc<dyn WeatherSource>, ttl: Duration) -> Self {
        Self {
            storage,
            source,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Current weather for a city (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the source cannot provide data.
    pub async fn current(&self, city: &str) -> Result<WeatherReport> {
        self.current_at(city, Utc::now()).await
    }

    /// Current weather for a city as seen at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the source cannot provide data.
    pub async fn current_at(&self, city: &str, now: DateTime<Utc>) -> Result<WeatherReport> {
        let key = city_key(city);

        if let Some(entry) = self.storage.get_weather_cache(&key)? {
            if self.is_fresh(&entry, now) {
                debug!("Weather cache hit for {}", key);
                return Ok(WeatherReport::from_cache(entry, CACHE_SOURCE));
            }
            debug!("Weather cache for {} is stale", key);
        }

        let conditions = self.source.fetch_current(&key).await?;
        let entry = WeatherCache {
            city: key,
            temperature: conditions.temperature,
            conditions: conditions.conditions,
            wind_speed: conditions.wind_speed,
            timestamp: now,
        };
        self.storage.upsert_weather_cache(&entry)?;

        Ok(WeatherReport::from_cache(entry, self.source.name()))
    }

    fn is_fresh(&self, entry: &WeatherCache, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.timestamp) < self.ttl
    }
}
