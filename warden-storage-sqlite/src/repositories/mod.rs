//! Repository implementations for SQLite storage

pub mod reset_token;
pub mod session;
pub mod user;

pub use reset_token::SqlitePasswordResetTokenRepository;
pub use session::SqliteSessionRepository;
pub use user::SqliteUserRepository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use warden_core::{
    Error,
    error::StorageError,
    repositories::{
        PasswordResetTokenRepositoryProvider, RepositoryProvider, SessionRepositoryProvider,
        UserRepositoryProvider,
    },
};

use crate::migrations::{SqliteMigrationManager, all};

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: SqliteUserRepository,
    session: SqliteSessionRepository,
    reset_token: SqlitePasswordResetTokenRepository,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            user: SqliteUserRepository::new(pool.clone()),
            session: SqliteSessionRepository::new(pool.clone()),
            reset_token: SqlitePasswordResetTokenRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl SessionRepositoryProvider for SqliteRepositoryProvider {
    type SessionRepo = SqliteSessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }
}

impl PasswordResetTokenRepositoryProvider for SqliteRepositoryProvider {
    type ResetTokenRepo = SqlitePasswordResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo {
        &self.reset_token
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        let applied = manager.up(&all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(format!(
                "Failed to run migrations: {e}"
            )))
        })?;
        tracing::debug!(applied, "Migrations up to date");

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "SQLite health check failed");
                Error::Storage(StorageError::Connection(e.to_string()))
            })?;
        Ok(())
    }
}
