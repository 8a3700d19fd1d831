//! Adapters exposing one repository of a [`RepositoryProvider`] as a standalone
//! repository, so services can be built over a shared provider.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    repositories::{
        PasswordResetTokenRepository, RepositoryProvider, SessionRepository, UserRepository,
    },
    reset_token::{PasswordResetToken, ResetTokenId},
    session::{Session, SessionId},
    user::{NewUser, User, UserId, UserUpdate},
};

pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser, password_hash: &str) -> Result<User, Error> {
        self.provider.user().create(user, password_hash).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }

    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, Error> {
        self.provider.user().update(id, update).await
    }
}

pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.provider.session().create(session).await
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        self.provider.session().find_by_id(id).await
    }

    async fn delete(&self, id: &SessionId) -> Result<(), Error> {
        self.provider.session().delete(id).await
    }
}

pub struct PasswordResetTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordResetTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordResetTokenRepository for PasswordResetTokenRepositoryAdapter<R> {
    async fn create(&self, token: PasswordResetToken) -> Result<PasswordResetToken, Error> {
        self.provider.reset_token().create(token).await
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, Error> {
        self.provider.reset_token().find_by_token_hash(token_hash).await
    }

    async fn mark_used(&self, id: &ResetTokenId, used_at: DateTime<Utc>) -> Result<bool, Error> {
        self.provider.reset_token().mark_used(id, used_at).await
    }

    async fn redeem(
        &self,
        token: &PasswordResetToken,
        update: UserUpdate,
        used_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        self.provider.reset_token().redeem(token, update, used_at).await
    }
}
