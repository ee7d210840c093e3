//! PostgreSQL implementation of the message store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{InMemoryMessageStore, MessageStore, StoreSlot};
use crate::config::{StoreBackend, StoreConfig};
use crate::domain::ChatMessage;
use crate::error::RelayError;

/// PostgreSQL-backed message store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::Persistence`] if the database is unreachable
    /// or a migration fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, RelayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert(&self, message: &ChatMessage) -> Result<(), RelayError> {
        sqlx::query("INSERT INTO messages (sender, content, timestamp) VALUES ($1, $2, $3)")
            .bind(&message.sender)
            .bind(&message.content)
            .bind(message.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_all_sorted(&self) -> Result<Vec<ChatMessage>, RelayError> {
        let rows = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT sender, content, timestamp FROM messages ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sender, content, timestamp)| ChatMessage {
                sender,
                content,
                timestamp,
            })
            .collect())
    }
}

/// Opens the store selected by `config.backend`.
///
/// # Errors
///
/// Returns a [`RelayError::Persistence`] if the PostgreSQL backend cannot be
/// reached or migrated.
pub async fn connect_store(config: StoreConfig) -> Result<Arc<dyn MessageStore>, RelayError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryMessageStore::new())),
        StoreBackend::Postgres => {
            let store = PostgresMessageStore::connect(&config).await?;
            Ok(Arc::new(store) as Arc<dyn MessageStore>)
        }
    }
}

/// Calls `connect` until it yields a store, then installs it into `slot`.
///
/// A failed attempt is logged and retried every `retry_interval`; a zero
/// interval makes a single attempt. The relay keeps serving chat the whole
/// time, with persistence disabled until the slot is filled.
pub async fn connect_until_ready<F, Fut>(retry_interval: Duration, slot: StoreSlot, mut connect: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Arc<dyn MessageStore>, RelayError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match connect().await {
            Ok(store) => {
                if slot.install(store) {
                    tracing::info!(attempt, "message store connected");
                }
                return;
            }
            Err(err) if retry_interval.is_zero() => {
                tracing::error!(
                    attempt,
                    error = %err,
                    "message store unavailable; running without persistence"
                );
                return;
            }
            Err(err) => {
                tracing::warn!(
                    attempt,
                    error = %err,
                    retry_in_ms = u64::try_from(retry_interval.as_millis()).unwrap_or(u64::MAX),
                    "message store unavailable; chat continues without persistence"
                );
                tokio::time::sleep(retry_interval).await;
            }
        }
    }
}
