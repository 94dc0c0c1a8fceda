//! Record types for flights and cached weather.
//!
//! These are the rows persisted by [`crate::storage::Storage`] and the
//! shapes returned over the HTTP API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flight status values the service knows about.
///
/// Status is stored as free text; these are the values the analytics
/// endpoint counts.
pub mod status {
    /// Default status for newly created flights.
    pub const SCHEDULED: &str = "scheduled";
    /// Flight departed or arrived on schedule.
    pub const ON_TIME: &str = "on_time";
    /// Flight is running late.
    pub const DELAYED: &str = "delayed";
    /// Flight will not operate.
    pub const CANCELED: &str = "canceled";
}

/// A stored flight record.
///
/// Serializes to the public flight shape: `created_at` is kept internal and
/// missing times render as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flight {
    /// Identifier assigned by the storage layer.
    pub id: i64,
    /// Carrier flight number, e.g. `AA123`.
    pub flight_number: String,
    /// Operating airline name.
    pub airline: Option<String>,
    /// Three-letter origin airport code.
    pub origin: String,
    /// Three-letter destination airport code.
    pub destination: String,
    /// Scheduled departure (local, no timezone).
    pub departure_time: Option<NaiveDateTime>,
    /// Scheduled arrival (local, no timezone).
    pub arrival_time: Option<NaiveDateTime>,
    /// Free-form status, see [`status`].
    pub status: String,
    /// When the row was inserted.
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// A flight that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFlight {
    /// Carrier flight number.
    pub flight_number: String,
    /// Operating airline name.
    pub airline: Option<String>,
    /// Origin airport code.
    pub origin: String,
    /// Destination airport code.
    pub destination: String,
    /// Scheduled departure.
    pub departure_time: Option<NaiveDateTime>,
    /// Scheduled arrival.
    pub arrival_time: Option<NaiveDateTime>,
    /// Flight status.
    pub status: String,
}

impl NewFlight {
    /// Create a scheduled flight between two airports.
    ///
    /// Airport codes are upper-cased so they match the filters used by
    /// [`crate::storage::Storage::list_flights`].
    #[must_use]
    pub fn new(
        flight_number: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            flight_number: flight_number.into(),
            airline: None,
            origin: origin.into().to_uppercase(),
            destination: destination.into().to_uppercase(),
            departure_time: None,
            arrival_time: None,
            status: status::SCHEDULED.to_string(),
        }
    }

    /// Set the airline.
    #[must_use]
    pub fn airline(mut self, airline: impl Into<String>) -> Self {
        self.airline = Some(airline.into());
        self
    }

    /// Set the scheduled departure and arrival.
    #[must_use]
    pub fn schedule(mut self, departure: NaiveDateTime, arrival: NaiveDateTime) -> Self {
        self.departure_time = Some(departure);
        self.arrival_time = Some(arrival);
        self
    }

    /// Set the status.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Filters for listing flights. Every supplied filter must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlightFilter {
    /// Exact origin code (case-insensitive on input).
    pub origin: Option<String>,
    /// Exact destination code (case-insensitive on input).
    pub destination: Option<String>,
    /// Case-insensitive substring of the airline name.
    pub airline: Option<String>,
}

impl FlightFilter {
    /// Build a filter from decoded query-string pairs.
    ///
    /// A repeated key keeps its first value; unknown keys are ignored.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "origin" => &mut filter.origin,
                "destination" => &mut filter.destination,
                "airline" => &mut filter.airline,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        filter
    }

    /// Returns the filter with blank values dropped and airport codes
    /// upper-cased.
    #[must_use]
    pub fn normalized(&self) -> Self {
        fn clean(value: Option<&String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            origin: clean(self.origin.as_ref()).map(|v| v.to_uppercase()),
            destination: clean(self.destination.as_ref()).map(|v| v.to_uppercase()),
            airline: clean(self.airline.as_ref()),
        }
    }
}

/// A cached weather snapshot for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCache {
    /// Lower-cased city name.
    pub city: String,
    /// Temperature in degrees Fahrenheit.
    pub temperature: f64,
    /// Human-readable conditions, e.g. `rain`.
    pub conditions: String,
    /// Wind speed in miles per hour.
    pub wind_speed: f64,
    /// When the snapshot was last refreshed.
    pub timestamp: DateTime<Utc>,
}

/// Normalize a city name into its cache key.
#[must_use]
pub fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}
