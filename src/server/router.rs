//! HTTP boundary: request validation, rate limiting, result translation.
//!
//! The only layer that maps orchestrator results and errors onto HTTP status
//! codes. Raw driver diagnostics stay inside the structured `attempts` field;
//! page content and selectors are never echoed to the caller.

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::model::ConfirmationRequest;

use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/confirmar-entrega", post(confirm_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "ConfirmaTudo API está rodando!",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "confirmar": "POST /confirmar-entrega",
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    #[serde(default)]
    localizador: String,
    #[serde(default)]
    codigo: String,
}

async fn confirm_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConfirmBody>,
) -> Response {
    let client = client_key(&headers);
    if !state.rate_limiter.allow(&client) {
        warn!(%client, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": "Limite de requisições excedido. Tente novamente em instantes.",
            })),
        )
            .into_response();
    }

    let request = match ConfirmationRequest::parse(&body.localizador, &body.codigo) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match state.orchestrator.confirm(&request).await {
        Ok(result) if result.success => {
            info!(provider = ?result.accepting_provider, "delivery confirmed");
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(result) => (StatusCode::BAD_REQUEST, Json(result)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Rate-limit key: forwarded client address when behind a proxy, otherwise a
/// single shared bucket. The ceiling exists to bound browser-session
/// creation, so a coarse key is acceptable.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}
