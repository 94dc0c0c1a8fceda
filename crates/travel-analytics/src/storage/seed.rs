//! Sample flights inserted into an empty database.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{status, NewFlight};

fn jan_15(hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 1, 15)?.and_hms_opt(hour, minute, 0)
}

/// The two sample flights a fresh database starts with.
#[must_use]
pub fn sample_flights() -> Vec<NewFlight> {
    let mut aa123 = NewFlight::new("AA123", "JFK", "LAX")
        .airline("American Airlines")
        .status(status::ON_TIME);
    aa123.departure_time = jan_15(10, 0);
    aa123.arrival_time = jan_15(13, 30);

    let mut ua456 = NewFlight::new("UA456", "SFO", "ORD")
        .airline("United Airlines")
        .status(status::DELAYED);
    ua456.departure_time = jan_15(14, 0);
    ua456.arrival_time = jan_15(20, 15);

    vec![aa123, ua456]
}
