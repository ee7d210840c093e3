//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] covers failures surfaced by the HTTP query surface and
//! the message store. The chat channel never carries errors: failures on
//! a WebSocket are logged and the offending event is dropped.

use axum::http::StatusCode;
use axum::http::header;
use axum::response::{IntoResponse, Response};

/// Server-side error enum with HTTP status code mapping.
///
/// Responses carry a plain-text body with the error message.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The message store has not finished connecting yet.
    #[error("message store not ready")]
    StoreNotReady,

    /// The message store rejected a read or write.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RelayError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::StoreNotReady | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for RelayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for RelayError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Startup configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// An environment variable is set but cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value as found in the environment.
        value: String,
    },
}
