//! Message history handler.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::ChatMessage;
use crate::error::RelayError;

/// `GET /messages` — Full message history, oldest first.
///
/// # Errors
///
/// Returns [`RelayError::StoreNotReady`] until the message store has
/// connected, and [`RelayError::Persistence`] if the read fails.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "Messages",
    summary = "List stored messages",
    description = "Returns every persisted chat message in ascending timestamp order.",
    responses(
        (status = 200, description = "Message history", body = Vec<ChatMessage>),
        (status = 500, description = "Message store not ready or unavailable", body = String, content_type = "text/plain"),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessage>>, RelayError> {
    let store = state.store.require()?;
    let messages = store.find_all_sorted().await.inspect_err(|err| {
        tracing::error!(error = %err, "failed to load message history");
    })?;
    Ok(Json(messages))
}

/// Message routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::ConnectionRegistry;
    use crate::persistence::{InMemoryMessageStore, MessageStore, PersistenceQueue, StoreSlot};
    use crate::service::Dispatcher;

    fn app(store: StoreSlot) -> Router {
        let dispatcher = Dispatcher::new(
            Arc::new(ConnectionRegistry::new()),
            PersistenceQueue::disabled(),
        );
        routes().with_state(AppState {
            dispatcher: Arc::new(dispatcher),
            store,
            outbound_buffer: 8,
        })
    }

    fn get_messages() -> Request<Body> {
        let Ok(req) = Request::get("/messages").body(Body::empty()) else {
            panic!("valid request");
        };
        req
    }

    #[tokio::test]
    async fn not_ready_store_is_500_text() {
        let Ok(response) = app(StoreSlot::new()).oneshot(get_messages()).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let Ok(body) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body readable");
        };
        assert_eq!(body, "message store not ready");
    }

    #[tokio::test]
    async fn returns_history_sorted() {
        let store = Arc::new(InMemoryMessageStore::new());
        let now = Utc::now();
        tokio_test::assert_ok!(
            store
                .insert(&ChatMessage::new("Bob", "second", now + Duration::milliseconds(5)))
                .await
        );
        tokio_test::assert_ok!(store.insert(&ChatMessage::new("Alice", "first", now)).await);

        let slot = StoreSlot::ready(Arc::clone(&store) as Arc<dyn MessageStore>);
        let Ok(response) = app(slot).oneshot(get_messages()).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);

        let Ok(body) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body readable");
        };
        let Ok(messages) = serde_json::from_slice::<Vec<ChatMessage>>(&body) else {
            panic!("body must be a message array");
        };
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }
}
