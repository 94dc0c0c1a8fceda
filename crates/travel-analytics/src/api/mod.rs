//! HTTP API for travel-analytics.
//!
//! Builds the axum router over an explicitly constructed [`AppState`] and
//! runs it until a shutdown signal arrives.

mod error;
mod handlers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::http_trace_layer;
use crate::storage::Storage;
use crate::weather::WeatherService;

pub use error::ApiError;
pub use handlers::ENDPOINTS;

/// Shared state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<Storage>,
    weather: WeatherService,
}

impl AppState {
    /// Bundle the storage handle and weather gate for the router.
    #[must_use]
    pub fn new(storage: Arc<Storage>, weather: WeatherService) -> Self {
        Self { storage, weather }
    }
}

/// Build the API router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/flights", get(handlers::list_flights))
        .route("/api/v1/flights/{id}", get(handlers::get_flight))
        .route("/api/v1/weather/{city}", get(handlers::weather))
        .route("/api/v1/analytics/delays", get(handlers::delay_analytics))
        .fallback(handlers::not_found)
        .layer(http_trace_layer())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve<F>(config: &Config, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.server.bind;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::ServerBind { addr, source })?;
    info!("starting REST server: {}", listener.local_addr()?);

    axum::serve(listener, router(state, config.request_timeout()))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("REST server has been shut down.");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("starting graceful shutdown for REST server...");
}
