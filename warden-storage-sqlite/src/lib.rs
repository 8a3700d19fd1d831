//! SQLite storage backend for warden
//!
//! ```rust,ignore
//! use warden_core::repositories::RepositoryProvider;
//! use warden_storage_sqlite::SqliteStorage;
//!
//! let storage = SqliteStorage::connect("sqlite://warden.db").await?;
//! let provider = storage.into_repository_provider();
//! provider.migrate().await?;
//! ```
//!
//! Timestamps are stored as unix milliseconds in `INTEGER` columns.

pub mod migrations;
pub mod repositories;
mod rows;

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use warden_core::{Error, error::StorageError};

pub use repositories::{
    SqlitePasswordResetTokenRepository, SqliteRepositoryProvider, SqliteSessionRepository,
    SqliteUserRepository,
};

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url`, creating the database file if needed.
    ///
    /// An in-memory database is private to one connection, so `:memory:` urls
    /// get a single-connection pool.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                StorageError::Connection(e.to_string())
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_repository_provider(self) -> SqliteRepositoryProvider {
        SqliteRepositoryProvider::new(self.pool)
    }
}
