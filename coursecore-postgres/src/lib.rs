//! PostgreSQL store backend for `CourseCore`.
//!
//! A single [`PostgresStore`] wraps a connection pool and implements every
//! store contract from the `coursecore` crate. The race-sensitive invariants
//! live in the schema and the write paths:
//!
//! - one active enrollment per (student, course): partial unique index
//!   `enrollments_one_active_per_pair`
//! - course capacity: `insert_active` locks the course row and recounts
//!   inside a transaction
//! - unique email across users: unique constraint `users_email_key`
//!
//! Violations surface as the conflict variants of
//! [`coursecore::errors::StoreError`], which the workflows map back to the
//! corresponding domain errors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod store;

use std::num::NonZeroU32;
use std::time::Duration;

use coursecore::errors::StoreError;
use nutype::nutype;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;

/// Errors raised while setting up the backend (pooling, migrations).
#[derive(Debug, Error)]
pub enum PostgresSetupError {
    /// The connection pool could not be created.
    #[error("failed to create postgres connection pool")]
    ConnectionFailed(#[source] sqlx::Error),

    /// Embedded migrations failed to apply.
    #[error("failed to run postgres migrations")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}

/// Maximum number of database connections in the pool. At least 1, enforced
/// by the `NonZeroU32` underlying type.
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRef, Into))]
pub struct MaxConnections(NonZeroU32);

/// Configuration for the [`PostgresStore`] connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10).
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30 seconds).
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes).
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: NonZeroU32 = match NonZeroU32::new(10) {
            Some(v) => v,
            None => unreachable!(),
        };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

/// PostgreSQL-backed implementation of every `CourseCore` store contract.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connects with the default configuration.
    pub async fn connect<S: Into<String>>(
        connection_string: S,
    ) -> Result<Self, PostgresSetupError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Connects with a custom pool configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresSetupError> {
        let connection_string = connection_string.into();
        let max_connections: NonZeroU32 = config.max_connections.into();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.get())
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&connection_string)
            .await
            .map_err(PostgresSetupError::ConnectionFailed)?;
        Ok(Self { pool })
    }

    /// Wraps an existing connection pool.
    ///
    /// Use this when you need full control over pool configuration or want
    /// to share a pool across multiple components.
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), PostgresSetupError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(PostgresSetupError::MigrationFailed)
    }

    /// Verifies connectivity with a trivial round trip.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

/// Maps a sqlx error outside a conflict-sensitive write path.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(error.to_string()),
        _ => StoreError::Internal(error.to_string()),
    }
}
