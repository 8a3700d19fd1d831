use async_trait::async_trait;

use crate::{
    Error,
    user::{NewUser, User, UserId, UserUpdate},
};

/// Repository for user data access
///
/// Implementations must apply [`update`](UserRepository::update) atomically
/// for a single record, bump `version` on every successful update, and honour
/// `UserUpdate::expected_version`.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Create a new user with the given password hash
    ///
    /// Fails with `StorageError::Constraint` when the username or email is taken.
    async fn create(&self, user: NewUser, password_hash: &str) -> Result<User, Error>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Apply a partial update and return the stored result
    ///
    /// Fails with `StorageError::NotFound` for an unknown id and with
    /// `StorageError::Conflict` when `expected_version` is stale.
    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, Error>;
}
