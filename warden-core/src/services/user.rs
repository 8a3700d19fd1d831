use std::sync::Arc;

use crate::{
    Error,
    crypto::generate_secure_token,
    hasher::PasswordHasher,
    repositories::UserRepository,
    user::{NewUser, User, UserId, UserStatus, UserUpdate},
    validation::{validate_email, validate_name, validate_username},
};

/// Service for administrator-driven account management
pub struct UserService<U: UserRepository> {
    repository: Arc<U>,
    hasher: Arc<dyn PasswordHasher>,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repository: Arc<U>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { repository, hasher }
    }

    /// Create an account with a random initial password that is never disclosed
    ///
    /// The new user can only sign in after an administrator issues them a
    /// password reset token.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, Error> {
        validate_username(&new_user.username)?;
        if let Some(email) = &new_user.email {
            validate_email(email)?;
        }
        validate_name(&new_user.name)?;

        let initial_password = generate_secure_token()?;
        let password_hash = self.hasher.hash(&initial_password).await?;

        let user = self.repository.create(new_user, &password_hash).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.repository.find_by_id(user_id).await
    }

    /// Look a user up by email when `identifier` contains `@`, otherwise by username
    pub async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, Error> {
        find_by_identifier(self.repository.as_ref(), identifier).await
    }

    /// Set the administrative status of an account
    pub async fn set_status(&self, user_id: &UserId, status: UserStatus) -> Result<User, Error> {
        let user = self
            .repository
            .update(user_id, UserUpdate::new().status(status))
            .await?;
        tracing::info!(user_id = %user.id, status = %status, "User status changed");
        Ok(user)
    }
}

pub(crate) async fn find_by_identifier<U: UserRepository + ?Sized>(
    repository: &U,
    identifier: &str,
) -> Result<Option<User>, Error> {
    if identifier.contains('@') {
        repository.find_by_email(identifier).await
    } else {
        repository.find_by_username(identifier).await
    }
}
