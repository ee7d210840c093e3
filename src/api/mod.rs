//! HTTP query surface: route handlers, router composition and the OpenAPI
//! document.

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::ChatMessage;

/// OpenAPI description of the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "chat-relay",
        description = "Message history and health endpoints of the chat relay. Chat itself runs over the WebSocket at `/ws`."
    ),
    paths(handlers::messages::list_messages, handlers::system::health_handler),
    components(schemas(ChatMessage, handlers::system::HealthResponse)),
    tags(
        (name = "Messages", description = "Persisted chat history"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Builds the HTTP router with every REST endpoint.
///
/// With the `swagger-ui` feature, the OpenAPI document is served at
/// `/api-docs/openapi.json` and the UI at `/swagger-ui`.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/messages"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
