// src/config.rs
use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string. Without one the server keeps polls in memory.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub change_feed_capacity: usize,
    /// Allowed browser origin; any origin when unset.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("PORT", "3030")?,
            database_url: optional("DATABASE_URL"),
            max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            change_feed_capacity: try_load("CHANGE_FEED_CAPACITY", "64")?,
            cors_origin: optional("CORS_ORIGIN"),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3030,
            database_url: None,
            max_connections: 5,
            change_feed_capacity: 64,
            cors_origin: None,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
