//! Conversion des erreurs du cœur en réponses HTTP

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use contours_core::ContoursError;

/// Erreur renvoyée par un handler
#[derive(Debug)]
pub struct ApiError(pub ContoursError);

impl From<ContoursError> for ApiError {
    fn from(err: ContoursError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ContoursError::NotFound { .. } => StatusCode::NOT_FOUND,
            ContoursError::SizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ContoursError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ContoursError::InitializationFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            ContoursError::NotFound { kind } => json!({ "detail": format!("{} not found", kind) }),
            ContoursError::SizeExceeded { count, max } => {
                warn!(count, max, "Export refused");
                json!({
                    "detail": format!(
                        "Too many features ({}, max {}). Use the bulk dataset download instead.",
                        count, max
                    ),
                    "count": count,
                    "max": max,
                })
            }
            other => {
                error!(error = %other, "Request failed");
                json!({ "detail": "Dataset backend unavailable" })
            }
        };
        (status, Json(body)).into_response()
    }
}
