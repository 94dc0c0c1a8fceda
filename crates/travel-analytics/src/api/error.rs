//! Error responses for the HTTP API.
//!
//! Every failure, including malformed paths and query strings, renders as a
//! JSON `{"error": ...}` body.

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::error::Error;

/// Error returned from request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A failure from storage or the weather gate.
    Service(Error),
    /// The request could not be extracted.
    Rejected {
        /// Status chosen by the extractor.
        status: StatusCode,
        /// Extractor message.
        message: String,
    },
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Service(err)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    /// HTTP status for the error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Service(Error::FlightNotFound { .. }) => "Flight not found".to_string(),
            Self::Service(other) => {
                error!("request failed: {other}");
                other.to_string()
            }
            Self::Rejected { message, .. } => {
                debug!("rejected request: {message}");
                message
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
