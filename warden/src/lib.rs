//! # Warden
//!
//! Warden manages the credential and session lifecycle of an application that
//! keeps its own user accounts:
//!
//! - Password login with progressive per-account lockout
//! - Opaque, database-backed sessions with a fixed lifetime
//! - Administrator-issued, single-use password reset tokens that are stored
//!   only as a hash
//!
//! Warden knows nothing about HTTP. The host maps the typed [`Error`] values to
//! responses, using [`Error::public_message`] for anything shown to end users.
//!
//! ## Storage Support
//!
//! - SQLite (the `sqlite` feature, on by default)
//!
//! Any other store can be plugged in by implementing
//! [`RepositoryProvider`](warden_core::repositories::RepositoryProvider).
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden::{NewUser, Role, WardenBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warden = WardenBuilder::new()
//!         .with_sqlite("sqlite://warden.db")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let admin = warden
//!         .create_user(NewUser::builder().username("root").role(Role::Admin).build()?)
//!         .await?;
//!     let alice = warden
//!         .create_user(NewUser::builder().username("alice").build()?)
//!         .await?;
//!
//!     // Hand the raw token to alice out of band
//!     let issued = warden.issue_password_reset(&admin.id, &alice.id).await?;
//!     warden
//!         .reset_password(&issued.raw_token, "a-Much-Better-Pass1")
//!         .await?;
//!
//!     let login = warden.login("alice", "a-Much-Better-Pass1").await?;
//!     println!("session {} expires at {}", login.session_id, login.expires_at);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use chrono::{DateTime, Utc};
use warden_core::{
    error::AuthError,
    repositories::{
        PasswordResetTokenRepositoryAdapter, RepositoryProvider, SessionRepositoryAdapter,
        UserRepositoryAdapter,
    },
};

mod builder;

pub use builder::{NoStorage, WardenBuilder, WardenBuilderError, WithStorage};
pub use warden_core::{
    Argon2PasswordHasher, AuthConfig, Authenticator, Error, IssuedResetToken, LoginResult,
    NewUser, PasswordHasher, PasswordPolicy, PasswordResetService, PasswordResetToken,
    PolicyViolation, Role, Session, SessionId, User, UserId, UserService, UserStatus, error,
};

#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use warden_storage_sqlite::*;
}

#[cfg(feature = "sqlite")]
pub use warden_storage_sqlite::{SqliteRepositoryProvider, SqliteStorage};

type Users<R> = UserRepositoryAdapter<R>;
type Sessions<R> = SessionRepositoryAdapter<R>;
type ResetTokens<R> = PasswordResetTokenRepositoryAdapter<R>;

/// The main entry point: every credential operation over one repository provider.
///
/// Each operation comes in two forms. The plain form uses the current time; the
/// `_at` form takes `now` explicitly so callers and tests control the clock.
pub struct Warden<R: RepositoryProvider> {
    repositories: Arc<R>,
    user_service: Arc<UserService<Users<R>>>,
    authenticator: Arc<Authenticator<Users<R>, Sessions<R>>>,
    password_reset_service: Arc<PasswordResetService<ResetTokens<R>>>,
    config: AuthConfig,
}

impl<R: RepositoryProvider> Warden<R> {
    /// Create a Warden with the default configuration, password policy and an
    /// Argon2id hasher.
    ///
    /// Prefer [`WardenBuilder`].
    pub fn new(repositories: Arc<R>) -> Self {
        Self::assemble(
            repositories,
            AuthConfig::default(),
            PasswordPolicy::default(),
            Arc::new(Argon2PasswordHasher::default()),
        )
    }

    /// Create a Warden from explicit parts
    ///
    /// # Errors
    ///
    /// A validation error when `config` fails [`AuthConfig::validate`].
    pub fn with_options(
        repositories: Arc<R>,
        config: AuthConfig,
        policy: PasswordPolicy,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::assemble(repositories, config, policy, hasher))
    }

    fn assemble(
        repositories: Arc<R>,
        config: AuthConfig,
        policy: PasswordPolicy,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let user_repo = Arc::new(UserRepositoryAdapter::new(repositories.clone()));
        let session_repo = Arc::new(SessionRepositoryAdapter::new(repositories.clone()));
        let reset_token_repo = Arc::new(PasswordResetTokenRepositoryAdapter::new(
            repositories.clone(),
        ));

        Self {
            user_service: Arc::new(UserService::new(user_repo.clone(), hasher.clone())),
            authenticator: Arc::new(Authenticator::new(
                user_repo,
                session_repo,
                hasher.clone(),
                &config,
            )),
            password_reset_service: Arc::new(PasswordResetService::new(
                reset_token_repo,
                hasher,
                policy,
                config.reset_token_ttl(),
            )),
            repositories,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        self.password_reset_service.policy()
    }

    /// Run migrations for the underlying store
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    // Login and sessions

    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResult, Error> {
        self.login_at(identifier, password, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        identifier: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginResult, Error> {
        self.authenticator.login(identifier, password, now).await
    }

    pub async fn logout(&self, session_id: &SessionId) -> Result<(), Error> {
        self.authenticator.logout(session_id).await
    }

    /// The session for `session_id`, or `None` when it is unknown or expired
    pub async fn get_session(&self, session_id: &SessionId) -> Result<Option<Session>, Error> {
        self.get_session_at(session_id, Utc::now()).await
    }

    pub async fn get_session_at(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, Error> {
        self.authenticator.get_session(session_id, now).await
    }

    // Accounts

    /// Create an account. It cannot log in until a reset token is redeemed for it.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, Error> {
        self.user_service.create_user(new_user).await
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.user_service.get_user(user_id).await
    }

    pub async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, Error> {
        self.user_service.get_user_by_identifier(identifier).await
    }

    pub async fn set_user_status(&self, user_id: &UserId, status: UserStatus) -> Result<User, Error> {
        self.user_service.set_status(user_id, status).await
    }

    // Password resets

    pub async fn issue_password_reset(
        &self,
        issued_by: &UserId,
        target: &UserId,
    ) -> Result<IssuedResetToken, Error> {
        self.issue_password_reset_at(issued_by, target, Utc::now())
            .await
    }

    /// Issue a reset token for `target` on behalf of the administrator `issued_by`
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthorized`] when `issued_by` is unknown, not an
    ///   administrator, or not active
    /// - [`AuthError::UserNotFound`] when `target` does not exist
    pub async fn issue_password_reset_at(
        &self,
        issued_by: &UserId,
        target: &UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedResetToken, Error> {
        let admin = self.user_service.get_user(issued_by).await?;
        match admin {
            Some(admin) if admin.is_admin() && admin.status == UserStatus::Active => {}
            _ => {
                tracing::warn!(issued_by = %issued_by, "Reset token requested by a non-administrator");
                return Err(AuthError::NotAuthorized.into());
            }
        }

        let Some(target) = self.user_service.get_user(target).await? else {
            return Err(AuthError::UserNotFound.into());
        };

        self.password_reset_service
            .issue_token(issued_by, &target.id, now)
            .await
    }

    /// Check a raw reset token without consuming it
    pub async fn check_reset_token(&self, raw_token: &str) -> Result<PasswordResetToken, Error> {
        self.password_reset_service
            .check_token(raw_token, Utc::now())
            .await
    }

    pub async fn reset_password(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<UserId, Error> {
        self.reset_password_at(raw_token, new_password, Utc::now())
            .await
    }

    pub async fn reset_password_at(
        &self,
        raw_token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, Error> {
        self.password_reset_service
            .reset_password(raw_token, new_password, now)
            .await
    }
}
