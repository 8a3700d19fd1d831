//! Repository traits for data access layer
//!
//! Services never touch a storage engine directly. They depend on these
//! traits, which a backend such as `warden-storage-sqlite` implements.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each record type
//! - Individual `*RepositoryProvider` traits give access to each repository
//! - [`RepositoryProvider`] combines them and adds lifecycle methods
//!
//! # Atomicity contract
//!
//! The core takes no locks of its own. Backends must make a single-record
//! update atomic and enforce `UserUpdate::expected_version`.
//! [`PasswordResetTokenRepository::mark_used`] must be a conditional write, and
//! [`PasswordResetTokenRepository::redeem`] must commit the token consumption
//! and the user update together or not at all.

pub mod adapter;
pub mod reset_token;
pub mod session;
pub mod user;

pub use adapter::{
    PasswordResetTokenRepositoryAdapter, SessionRepositoryAdapter, UserRepositoryAdapter,
};
pub use reset_token::PasswordResetTokenRepository;
pub use session::SessionRepository;
pub use user::UserRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for user repository access.
pub trait UserRepositoryProvider: Send + Sync + 'static {
    type UserRepo: UserRepository;

    fn user(&self) -> &Self::UserRepo;
}

/// Provider trait for session repository access.
pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn session(&self) -> &Self::SessionRepo;
}

/// Provider trait for password reset token repository access.
pub trait PasswordResetTokenRepositoryProvider: Send + Sync + 'static {
    type ResetTokenRepo: PasswordResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo;
}

/// Everything a storage backend must provide.
///
/// ```rust,ignore
/// use warden_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl UserRepositoryProvider for MyStorage {
///     type UserRepo = MyUserRepository;
///     fn user(&self) -> &Self::UserRepo { &self.user_repo }
/// }
///
/// // ... the session and reset token providers ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider + SessionRepositoryProvider + PasswordResetTokenRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
