//! `travel-analytics` - flight records and weather lookups over HTTP
//!
//! This library provides the storage layer, weather cache gate, delay
//! analytics and axum router behind the `travel-analytics` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod weather;

pub use analytics::DelayAnalytics;
pub use api::AppState;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use models::{Flight, FlightFilter, NewFlight, WeatherCache};
pub use storage::Storage;
pub use weather::{MockWeatherSource, WeatherReport, WeatherService, WeatherSource};
