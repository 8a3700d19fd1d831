//! Builder pattern for constructing Warden instances
//!
//! The builder uses a type-state pattern, so a [`Warden`] can only be built
//! once storage has been configured.
//!
//! ```rust,no_run
//! use chrono::Duration;
//! use warden::WardenBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warden = WardenBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .with_session_ttl(Duration::hours(8))
//!         .with_lockout(10, Duration::minutes(30))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     warden.health_check().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use warden_core::{
    Argon2PasswordHasher, AuthConfig, PasswordHasher, PasswordPolicy,
    repositories::RepositoryProvider,
};

use crate::Warden;

/// Errors that can occur when building a Warden instance.
#[derive(Debug, thiserror::Error)]
pub enum WardenBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Warden`] instances.
///
/// # Defaults
///
/// - Session lifetime: 240 minutes
/// - Reset token lifetime: 30 minutes
/// - Lockout: 5 failed attempts, 15 minute lockout
/// - Password policy: [`PasswordPolicy::default`]
/// - Password hasher: [`Argon2PasswordHasher::default`]
/// - Apply migrations: false
pub struct WardenBuilder<Storage> {
    storage: Storage,
    config: AuthConfig,
    policy: PasswordPolicy,
    hasher: Option<Arc<dyn PasswordHasher>>,
    apply_migrations: bool,
    /// First setter rejection, reported by `build`.
    rejected: Option<String>,
}

impl Default for WardenBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl WardenBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: AuthConfig::default(),
            policy: PasswordPolicy::default(),
            hasher: None,
            apply_migrations: false,
            rejected: None,
        }
    }

    /// Use an already constructed repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> WardenBuilder<WithStorage<R>> {
        WardenBuilder {
            storage: WithStorage { repositories },
            config: self.config,
            policy: self.policy,
            hasher: self.hasher,
            apply_migrations: self.apply_migrations,
            rejected: self.rejected,
        }
    }
}

#[cfg(feature = "sqlite")]
impl WardenBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<WardenBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>>, WardenBuilderError>
    {
        let storage = crate::sqlite::SqliteStorage::connect(url)
            .await
            .map_err(|e| WardenBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(storage.into_repository_provider())))
    }

    /// Configure SQLite storage with an existing connection pool.
    ///
    /// Foreign key enforcement is the caller's responsibility when the pool is
    /// built by hand.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> WardenBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::sqlite::SqliteRepositoryProvider::new(pool)))
    }
}

impl<R: RepositoryProvider> WardenBuilder<WithStorage<R>> {
    /// Replace the whole configuration at once.
    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how long a session stays valid after login.
    ///
    /// Lifetimes are configured in whole minutes. Anything finer makes
    /// [`build`](Self::build) fail.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        if let Some(minutes) = self.whole_minutes("sessionTtlMinutes", ttl) {
            self.config = self.config.with_session_ttl_minutes(minutes);
        }
        self
    }

    /// Set how long an issued reset token can be redeemed, in whole minutes.
    pub fn with_reset_token_ttl(mut self, ttl: Duration) -> Self {
        if let Some(minutes) = self.whole_minutes("resetTokenTtlMinutes", ttl) {
            self.config = self.config.with_reset_token_ttl_minutes(minutes);
        }
        self
    }

    /// Lock an account for `window` once it reaches `threshold` consecutive
    /// failed logins. The window must be whole minutes.
    pub fn with_lockout(mut self, threshold: u32, window: Duration) -> Self {
        if let Some(minutes) = self.whole_minutes("lockoutWindowMinutes", window) {
            self.config = self.config.with_lockout(threshold, minutes);
        }
        self
    }

    fn whole_minutes(&mut self, key: &str, duration: Duration) -> Option<i64> {
        let minutes = duration.num_minutes();
        if Duration::try_minutes(minutes) == Some(duration) {
            return Some(minutes);
        }

        if self.rejected.is_none() {
            self.rejected = Some(format!(
                "{key} must be a whole number of minutes, got {duration}"
            ));
        }
        None
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the default Argon2id hasher.
    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Run the store's migrations during [`build`](Self::build).
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Build the Warden instance.
    ///
    /// # Errors
    ///
    /// - [`WardenBuilderError::InvalidConfiguration`] when a lifetime is not
    ///   positive, out of range, or not whole minutes, or the lockout
    ///   threshold is zero
    /// - [`WardenBuilderError::Migration`] when migrations were requested and failed
    pub async fn build(self) -> Result<Warden<R>, WardenBuilderError> {
        if let Some(reason) = self.rejected {
            return Err(WardenBuilderError::InvalidConfiguration(reason));
        }

        self.config
            .validate()
            .map_err(|e| WardenBuilderError::InvalidConfiguration(e.to_string()))?;

        let repositories = self.storage.repositories;

        if self.apply_migrations {
            repositories
                .migrate()
                .await
                .map_err(|e| WardenBuilderError::Migration(e.to_string()))?;
        }

        let hasher = self
            .hasher
            .unwrap_or_else(|| Arc::new(Argon2PasswordHasher::default()));

        Warden::with_options(repositories, self.config, self.policy, hasher)
            .map_err(|e| WardenBuilderError::InvalidConfiguration(e.to_string()))
    }
}
