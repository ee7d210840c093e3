//! Router composition and listeners.

use std::net::SocketAddr;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::ws::handler::ws_handler;

/// Builds the main router: REST endpoints plus the co-located `/ws`
/// endpoint.
///
/// The request timeout wraps only the REST routes; upgraded WebSocket
/// connections are never timed out.
pub fn build_app(state: AppState, config: &RelayConfig) -> Router {
    let rest = api::build_router().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        config.http_timeout,
    ));

    Router::new()
        .merge(rest)
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Builds the router for a dedicated WebSocket listener, accepting upgrades
/// on both `/` and `/ws`.
pub fn build_ws_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `app` on `listener`, exposing peer addresses to handlers.
///
/// # Errors
///
/// Returns an I/O error if the server stops abnormally.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
