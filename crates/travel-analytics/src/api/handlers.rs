//! Request handlers for the v1 API.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::{error::ApiError, AppState};
use crate::analytics::DelayAnalytics;
use crate::error::Error;
use crate::models::{Flight, FlightFilter};
use crate::storage::Storage;
use crate::weather::WeatherReport;

const SERVICE_NAME: &str = "Travel Analytics Platform";

/// Paths advertised by the index endpoint.
pub const ENDPOINTS: &[&str] = &[
    "/api/v1/health",
    "/api/v1/flights",
    "/api/v1/flights/{id}",
    "/api/v1/weather/{city}",
    "/api/v1/analytics/delays",
];

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    service: &'static str,
    status: &'static str,
    version: &'static str,
    database: &'static str,
    endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    database: String,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FlightList {
    count: usize,
    flight: Vec<Flight>,
}

/// GET / returns service metadata.
pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME,
        status: "operational",
        version: env!("CARGO_PKG_VERSION"),
        database: "SQLite",
        endpoints: ENDPOINTS,
    })
}

/// GET /api/v1/health: liveness plus a database round trip.
///
/// Always 200; a broken database shows up in the `database` field.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage = Arc::clone(&state.storage);
    let database = tokio::task::spawn_blocking(move || database_status(&storage))
        .await
        .unwrap_or_else(|err| format!("error {err}"));

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `"connected"` when the database answers, otherwise `"error <msg>"`.
pub(crate) fn database_status(storage: &Storage) -> String {
    match storage.ping() {
        Ok(()) => "connected".to_string(),
        Err(err) => {
            warn!("health check could not reach the database: {err}");
            format!("error {err}")
        }
    }
}

/// GET /api/v1/flights?origin=&destination=&airline=
pub async fn list_flights(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<FlightList>, ApiError> {
    let Query(pairs) = query?;
    let filter = FlightFilter::from_pairs(pairs);
    let flights =
        with_storage(&state.storage, move |storage| storage.list_flights(&filter)).await?;
    Ok(Json(FlightList {
        count: flights.len(),
        flight: flights,
    }))
}

/// GET /api/v1/flights/{id}
pub async fn get_flight(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Flight>, ApiError> {
    let Path(id) = id?;
    let flight = with_storage(&state.storage, move |storage| storage.get_flight(id))
        .await?
        .ok_or(Error::FlightNotFound { id })?;
    Ok(Json(flight))
}

/// GET /api/v1/weather/{city}
pub async fn weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherReport>, ApiError> {
    Ok(Json(state.weather.current(&city).await?))
}

/// GET /api/v1/analytics/delays
pub async fn delay_analytics(
    State(state): State<AppState>,
) -> Result<Json<DelayAnalytics>, ApiError> {
    Ok(Json(with_storage(&state.storage, DelayAnalytics::compute).await?))
}

/// Fallback for paths outside the API.
pub async fn not_found() -> ApiError {
    ApiError::Rejected {
        status: StatusCode::NOT_FOUND,
        message: "Not found".to_string(),
    }
}

/// Run a storage call on the blocking pool.
async fn with_storage<T, F>(storage: &Arc<Storage>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Storage) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let storage = Arc::clone(storage);
    let result = tokio::task::spawn_blocking(move || f(&storage))
        .await
        .map_err(|err| Error::internal(format!("storage task failed: {err}")))?;
    Ok(result?)
}
