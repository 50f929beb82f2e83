//! Server configuration parsed from environment variables.
//!
//! `main` loads an optional `.env` file first (via `dotenvy`), so every key
//! below can live there during local development.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_FEED_HISTORY: usize = 100;
pub const DEFAULT_WS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Messages kept in memory; also the largest window a subscriber may ask for.
    pub feed_history: usize,
    /// Outbound frame queue per WebSocket connection.
    pub ws_channel_capacity: usize,
}

impl ServerConfig {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `FEED_HISTORY`: default 100
    /// - `WS_CHANNEL_CAPACITY`: default 256
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            feed_history: positive_or(&lookup, "FEED_HISTORY", DEFAULT_FEED_HISTORY)?,
            ws_channel_capacity: positive_or(&lookup, "WS_CHANNEL_CAPACITY", DEFAULT_WS_CHANNEL_CAPACITY)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn positive_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid { key, value: "0".into() });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
