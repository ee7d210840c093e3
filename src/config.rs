//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Only `DATABASE_URL` is required, and
//! only for the PostgreSQL backend; every other key has a default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Message store backend selected by `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `sqlx`.
    Postgres,
    /// Process-local store; history is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Message store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Which backend to use.
    pub backend: StoreBackend,
    /// Store connection string. Empty for the memory backend when unset.
    pub database_url: String,
    /// Maximum number of pooled database connections.
    pub max_connections: u32,
    /// Timeout for acquiring a database connection.
    pub connect_timeout: Duration,
    /// Delay between connection attempts while degraded. Zero disables retry.
    pub retry_interval: Duration,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP server (and co-located WebSocket endpoint) binds to.
    pub listen_addr: SocketAddr,

    /// Optional dedicated WebSocket listener address.
    pub ws_listen_addr: Option<SocketAddr>,

    /// Message store settings.
    pub store: StoreConfig,

    /// Capacity of the persistence queue feeding the store writer.
    pub persist_queue_capacity: usize,

    /// Per-connection outbound frame bound.
    pub outbound_buffer: usize,

    /// Whether broadcasts carry the sender's display name.
    pub broadcast_include_sender: bool,

    /// Timeout applied to plain HTTP requests.
    pub http_timeout: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `DATABASE_URL` is unset while
    /// `STORE_BACKEND` is `postgres`, and
    /// [`ConfigError::Invalid`] if any variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host: IpAddr = env.parse("HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port: u16 = env.parse("PORT", 3000)?;
        let ws_port: Option<u16> = env.parse_opt("WS_PORT")?;

        let backend = env.parse("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = match (env.get("DATABASE_URL"), backend) {
            (Some(url), _) => url,
            (None, StoreBackend::Memory) => String::new(),
            (None, StoreBackend::Postgres) => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        let store = StoreConfig {
            backend,
            database_url,
            max_connections: env.parse("DATABASE_MAX_CONNECTIONS", 5)?,
            connect_timeout: Duration::from_secs(env.parse("DATABASE_CONNECT_TIMEOUT_SECS", 5)?),
            retry_interval: Duration::from_secs(env.parse("STORE_RETRY_INTERVAL_SECS", 5)?),
        };

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            ws_listen_addr: ws_port
                .filter(|ws| *ws != port)
                .map(|ws| SocketAddr::new(host, ws)),
            store,
            persist_queue_capacity: env.parse("PERSIST_QUEUE_CAPACITY", 1024)?,
            outbound_buffer: env.parse("OUTBOUND_BUFFER", 256)?,
            broadcast_include_sender: env.parse_bool("BROADCAST_INCLUDE_SENDER", false)?,
            http_timeout: Duration::from_secs(env.parse("HTTP_TIMEOUT_SECS", 30)?),
            log_format: env.parse("LOG_FORMAT", LogFormat::Text)?,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Returns the trimmed value of `key`, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_opt<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { key, value })
            })
            .transpose()
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }

    /// Accepts `true`/`1`/`yes` and `false`/`0`/`no` (case-insensitive).
    fn parse_bool(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        }
    }
}
