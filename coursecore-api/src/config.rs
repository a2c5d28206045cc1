//! Environment-driven configuration for the service binary.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use coursecore_postgres::{MaxConnections, PostgresConfig};
use thiserror::Error;

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// An environment variable holds an unparseable value.
    #[error("invalid value for environment variable {name}: {detail}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        detail: String,
    },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Connection pool settings.
    pub postgres: PostgresConfig,
}

impl ApiConfig {
    /// Reads the configuration from the environment.
    ///
    /// `DATABASE_URL` is required. `BIND_ADDR` defaults to
    /// `127.0.0.1:3000`; `DB_MAX_CONNECTIONS` and `DB_ACQUIRE_TIMEOUT_SECS`
    /// override the pool defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let bind_addr = match std::env::var("BIND_ADDR") {
            Err(_) => SocketAddr::from(([127, 0, 0, 1], 3000)),
            Ok(raw) => raw.parse().map_err(|err| ConfigError::InvalidVar {
                name: "BIND_ADDR",
                detail: format!("{err}"),
            })?,
        };

        let mut postgres = PostgresConfig::default();
        if let Ok(raw) = std::env::var("DB_MAX_CONNECTIONS") {
            let parsed: NonZeroU32 = raw.parse().map_err(|err| ConfigError::InvalidVar {
                name: "DB_MAX_CONNECTIONS",
                detail: format!("{err}"),
            })?;
            postgres.max_connections = MaxConnections::new(parsed);
        }
        if let Ok(raw) = std::env::var("DB_ACQUIRE_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|err| ConfigError::InvalidVar {
                name: "DB_ACQUIRE_TIMEOUT_SECS",
                detail: format!("{err}"),
            })?;
            postgres.acquire_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            bind_addr,
            database_url,
            postgres,
        })
    }
}
