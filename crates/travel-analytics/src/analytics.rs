//! Delay analytics over the flights table.

use serde::Serialize;

use crate::error::Result;
use crate::models::status;
use crate::storage::Storage;

/// Message included with every analytics response.
const ANALYTICS_MESSAGE: &str = "Basic SQLite analytics over stored flights";

/// Flight counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Flights with status `on_time`.
    pub on_time: i64,
    /// Flights with status `delayed`.
    pub delayed: i64,
    /// Flights with status `canceled`.
    pub canceled: i64,
}

/// Summary returned by the delay analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayAnalytics {
    /// Every stored flight, whatever its status.
    pub total_flights: i64,
    /// Share of on-time flights, 0-100 with two decimals.
    pub on_time_percentage: f64,
    /// Per-status counts.
    pub by_status: StatusCounts,
    /// Free-text note about how the numbers were produced.
    pub message: &'static str,
}

impl DelayAnalytics {
    /// Compute the summary from stored flights.
    ///
    /// # Errors
    ///
    /// Returns an error if any count query fails.
    pub fn compute(storage: &Storage) -> Result<Self> {
        let total_flights = storage.count_all()?;
        let by_status = StatusCounts {
            on_time: storage.count_by_status(status::ON_TIME)?,
            delayed: storage.count_by_status(status::DELAYED)?,
            canceled: storage.count_by_status(status::CANCELED)?,
        };

        Ok(Self {
            total_flights,
            on_time_percentage: on_time_percentage(by_status.on_time, total_flights),
            by_status,
            message: ANALYTICS_MESSAGE,
        })
    }
}

/// `on_time / total * 100` rounded to two decimals, or 0 with no flights.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn on_time_percentage(on_time: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let percentage = on_time as f64 / total as f64 * 100.0;
    (percentage * 100.0).round() / 100.0
}
