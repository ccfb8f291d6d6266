//! Application-level error taxonomy.
//!
//! Provider-level failures never show up here: adapters absorb them into
//! [`crate::model::ProviderOutcome`]s. What remains is what the HTTP boundary
//! must translate into status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request fields; never reaches the orchestrator.
    #[error("{0}")]
    Validation(String),

    /// Orchestrator- or driver-infrastructure failure (e.g. the browser
    /// process could not start). Logged in full, surfaced opaquely.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response(),
            AppError::Infrastructure(detail) => {
                error!(%detail, "internal failure while confirming delivery");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": "Erro interno no servidor." })),
                )
                    .into_response()
            }
        }
    }
}
