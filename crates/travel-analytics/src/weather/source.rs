//! Weather data sources.
//!
//! The cache gate asks a [`WeatherSource`] for fresh conditions whenever a
//! snapshot is missing or stale. Only a static mock source exists today.

use async_trait::async_trait;

use crate::error::Result;

/// Current conditions for one city as reported by a source.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    /// Temperature in degrees Fahrenheit.
    pub temperature: f64,
    /// Human-readable conditions.
    pub conditions: String,
    /// Wind speed in miles per hour.
    pub wind_speed: f64,
}

/// A provider of current weather conditions.
///
/// Implementors may call out to a remote API; the cache gate only calls
/// [`WeatherSource::fetch_current`] when its stored snapshot is stale.
#[async_trait]
pub trait WeatherSource: Send + Sync + std::fmt::Debug {
    /// Marker reported as `source` on freshly fetched responses.
    fn name(&self) -> &'static str;

    /// Fetch current conditions for a normalized (lower-cased) city name.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot provide conditions.
    async fn fetch_current(&self, city: &str) -> Result<Conditions>;
}

/// Static lookup table standing in for a real weather API.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockWeatherSource;

/// `(city, temperature, conditions, wind_speed)` rows.
const MOCK_TABLE: &[(&str, f64, &str, f64)] = &[
    ("new york", 45.0, "partly cloudy", 12.0),
    ("london", 52.0, "rain", 8.0),
    ("tokyo", 63.0, "clear", 5.0),
    ("sydney", 75.0, "sunny", 10.0),
    ("chicago", 38.0, "snow", 15.0),
    ("los angeles", 72.0, "sunny", 6.0),
    ("miami", 80.0, "humid", 8.0),
];

/// Returned for any city missing from the table.
const MOCK_DEFAULT: (f64, &str, f64) = (70.0, "clear", 5.0);

impl MockWeatherSource {
    /// Look up the mock conditions for a city, falling back to the default.
    #[must_use]
    pub fn lookup(city: &str) -> Conditions {
        let (temperature, conditions, wind_speed) = MOCK_TABLE
            .iter()
            .find(|(name, ..)| *name == city)
            .map_or(MOCK_DEFAULT, |&(_, t, c, w)| (t, c, w));

        Conditions {
            temperature,
            conditions: conditions.to_string(),
            wind_speed,
        }
    }
}

#[async_trait]
impl WeatherSource for MockWeatherSource {
    fn name(&self) -> &'static str {
        "mock_data"
    }

    async fn fetch_current(&self, city: &str) -> Result<Conditions> {
        Ok(Self::lookup(city))
    }
}
