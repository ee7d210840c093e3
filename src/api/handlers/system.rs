//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    store: &'static str,
    connections: usize,
    timestamp: String,
    version: &'static str,
}

/// `GET /health` — Service health status.
///
/// Chat keeps working while the store is down, so a missing store reports
/// `degraded` rather than failing the check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service status, message store readiness, live connection count and version.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store_ready = state.store.is_ready();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: if store_ready { "healthy" } else { "degraded" },
            store: if store_ready { "ready" } else { "unavailable" },
            connections: state.dispatcher.registry().len().await,
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
