//! Environment-driven configuration for the server and the sync client.
//!
//! Both binaries call `dotenv().ok()` first, so values may come from a local
//! `.env` file.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub principal_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            port,
            principal_cache_ttl: parse_duration_secs("PRINCIPAL_CACHE_TTL_SECS", 60),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Sync client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL including the `/api` prefix, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    pub token: String,
    pub list_interval: Duration,
    pub thread_interval: Duration,
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            list_interval: Duration::from_secs(10),
            thread_interval: Duration::from_secs(3),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("CHAT_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api".to_string());
        let mut config = Self::new(base_url, required("CHAT_TOKEN")?);
        config.list_interval = parse_duration_secs("CHAT_LIST_POLL_SECS", 10);
        config.thread_interval = parse_duration_secs("CHAT_THREAD_POLL_SECS", 3);
        Ok(config)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_duration_secs(env_var: &str, default: u64) -> Duration {
    std::env::var(env_var)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}
