//! Login with progressive lockout.
//!
//! A login runs these steps in order:
//!
//! 1. Resolve the identifier (email when it contains `@`, username otherwise).
//! 2. Refuse administratively locked accounts and active lockouts without
//!    verifying the password or touching the counter.
//! 3. Verify the password.
//! 4. On a mismatch, count the failure (possibly starting a lockout) and fail.
//! 5. On a match, clear the lockout state and issue a session.
//!
//! Every call that reaches step 3 writes the user record exactly once. Unknown
//! identifiers and wrong passwords both surface as
//! [`AuthError::InvalidCredentials`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    config::AuthConfig,
    error::AuthError,
    hasher::PasswordHasher,
    repositories::{SessionRepository, UserRepository},
    services::{lockout::LockoutTracker, session::SessionService, user::find_by_identifier},
    session::{Session, SessionId},
    user::{UserId, UserStatus},
};

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub expires_at: DateTime<Utc>,
}

/// Why credentials were rejected. Never leaves this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialFailure {
    UnknownIdentifier,
    WrongPassword,
}

impl From<CredentialFailure> for Error {
    fn from(_: CredentialFailure) -> Self {
        Error::Auth(AuthError::InvalidCredentials)
    }
}

pub struct Authenticator<U: UserRepository, S: SessionRepository> {
    users: Arc<U>,
    sessions: SessionService<S>,
    hasher: Arc<dyn PasswordHasher>,
    lockout: LockoutTracker,
    session_ttl: Duration,
}

impl<U: UserRepository, S: SessionRepository> Authenticator<U, S> {
    pub fn new(
        users: Arc<U>,
        sessions: Arc<S>,
        hasher: Arc<dyn PasswordHasher>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions: SessionService::new(sessions),
            hasher,
            lockout: LockoutTracker::from_config(config),
            session_ttl: config.session_ttl(),
        }
    }

    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    /// Authenticate `identifier` with `password` at `now` and open a session
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for an unknown identifier or a wrong password
    /// - [`AuthError::AccountLocked`] while a lockout is active or the account is locked
    /// - [`AuthError::AccountDisabled`] for a disabled account, after the password verified
    /// - a storage error if any store call fails
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginResult, Error> {
        let Some(user) = find_by_identifier(self.users.as_ref(), identifier).await? else {
            tracing::debug!(cause = ?CredentialFailure::UnknownIdentifier, "Login failed");
            return Err(CredentialFailure::UnknownIdentifier.into());
        };

        if user.status == UserStatus::Locked {
            tracing::debug!(user_id = %user.id, "Login refused: account locked by an administrator");
            return Err(AuthError::AccountLocked { locked_until: None }.into());
        }

        if self.lockout.is_locked(&user, now) {
            tracing::debug!(
                user_id = %user.id,
                locked_until = ?user.lockout_until,
                "Login refused: lockout active"
            );
            return Err(AuthError::AccountLocked {
                locked_until: user.lockout_until,
            }
            .into());
        }

        let verified = self.hasher.verify(password, &user.password_hash).await?;

        if !verified {
            let transition = self.lockout.record_failure(&user, now)?;
            self.users.update(&user.id, transition.update).await?;

            if let Some(locked_until) = transition.locked_until {
                tracing::warn!(
                    user_id = %user.id,
                    failed_login_count = transition.failed_login_count,
                    %locked_until,
                    "Account locked after repeated failed logins"
                );
            }
            tracing::debug!(
                user_id = %user.id,
                cause = ?CredentialFailure::WrongPassword,
                failed_login_count = transition.failed_login_count,
                "Login failed"
            );
            return Err(CredentialFailure::WrongPassword.into());
        }

        if user.status == UserStatus::Disabled {
            tracing::debug!(user_id = %user.id, "Login refused: account disabled");
            return Err(AuthError::AccountDisabled.into());
        }

        self.users
            .update(&user.id, self.lockout.record_success(&user, now))
            .await?;

        let session = self
            .sessions
            .create_session(&user.id, now, self.session_ttl)
            .await?;

        tracing::info!(user_id = %user.id, expires_at = %session.expires_at, "User logged in");

        Ok(LoginResult {
            user_id: user.id,
            session_id: session.id,
            expires_at: session.expires_at,
        })
    }

    /// End a session. Logging out twice is not an error.
    pub async fn logout(&self, session_id: &SessionId) -> Result<(), Error> {
        self.sessions.delete_session(session_id).await
    }

    /// The session behind `session_id` if it is still valid at `now`
    pub async fn get_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, Error> {
        self.sessions.get_valid_session(session_id, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StorageError,
        services::mocks::{
            FakeHasher, MockSessionRepository, MockUserRepository, user_with_password,
        },
        user::User,
    };

    const PASSWORD: &str = "CorrectPass12!";

    struct Harness {
        authenticator: Authenticator<MockUserRepository, MockSessionRepository>,
        users: Arc<MockUserRepository>,
        sessions: Arc<MockSessionRepository>,
        hasher: Arc<FakeHasher>,
    }

    async fn harness_with(user: User) -> Harness {
        let users = Arc::new(MockUserRepository::default());
        let sessions = Arc::new(MockSessionRepository::default());
        let hasher = Arc::new(FakeHasher::default());
        users.insert(user).await;

        Harness {
            authenticator: Authenticator::new(
                users.clone(),
                sessions.clone(),
                hasher.clone(),
                &AuthConfig::default(),
            ),
            users,
            sessions,
            hasher,
        }
    }

    fn assert_invalid_credentials(result: Result<LoginResult, Error>) {
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::InvalidCredentials))
        ));
    }

    fn assert_locked(result: Result<LoginResult, Error>) {
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::AccountLocked { .. }))
        ));
    }

    #[tokio::test]
    async fn test_login_by_username_issues_session() {
        let user = user_with_password("alice", PASSWORD);
        let user_id = user.id.clone();
        let h = harness_with(user).await;
        let now = Utc::now();

        let result = h.authenticator.login("alice", PASSWORD, now).await.unwrap();

        assert_eq!(result.user_id, user_id);
        assert_eq!(result.expires_at, now + Duration::minutes(240));
        assert!(result.session_id.as_str().starts_with("ses_"));
        assert_eq!(h.sessions.create_count(), 1);
        assert_eq!(h.users.update_count().await, 1);

        let stored = h.users.get(&user_id).await;
        assert_eq!(stored.last_login_at, Some(now));
    }

    #[tokio::test]
    async fn test_login_by_email() {
        let user = user_with_password("alice", PASSWORD);
        let h = harness_with(user).await;

        let result = h
            .authenticator
            .login("alice@example.com", PASSWORD, Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_invalid_credentials_without_writes() {
        let h = harness_with(user_with_password("alice", PASSWORD)).await;

        for identifier in ["mallory", "mallory@example.com", ""] {
            assert_invalid_credentials(h.authenticator.login(identifier, PASSWORD, Utc::now()).await);
        }

        assert_eq!(h.sessions.create_count(), 0);
        assert_eq!(h.users.update_count().await, 0);
        assert_eq!(h.hasher.verify_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
        let h = harness_with(user_with_password("alice", PASSWORD)).await;
        let now = Utc::now();

        let unknown = h.authenticator.login("mallory", PASSWORD, now).await.unwrap_err();
        let wrong = h.authenticator.login("alice", "WrongPass12!", now).await.unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.public_message(), wrong.public_message());
    }

    #[tokio::test]
    async fn test_wrong_password_increments_counter_once() {
        let user = user_with_password("alice", PASSWORD);
        let user_id = user.id.clone();
        let h = harness_with(user).await;

        assert_invalid_credentials(h.authenticator.login("alice", "WrongPass12!", Utc::now()).await);

        let stored = h.users.get(&user_id).await;
        assert_eq!(stored.failed_login_count, 1);
        assert_eq!(stored.lockout_until, None);
        assert_eq!(h.users.update_count().await, 1);
        assert_eq!(h.sessions.create_count(), 0);
    }

    #[tokio::test]
    async fn test_threshold_failure_locks_account() {
        let mut user = user_with_password("u1", PASSWORD);
        user.failed_login_count = 4;
        let user_id = user.id.clone();
        let h = harness_with(user).await;
        let now = Utc::now();

        assert_invalid_credentials(h.authenticator.login("u1", "WrongPass12!", now).await);

        let stored = h.users.get(&user_id).await;
        assert_eq!(stored.failed_login_count, 5);
        assert_eq!(stored.lockout_until, Some(now + Duration::minutes(15)));

        // Correct password one minute later: the lockout check comes first
        let verifies_before = h.hasher.verify_count();
        assert_locked(
            h.authenticator
                .login("u1", PASSWORD, now + Duration::minutes(1))
                .await,
        );
        assert_eq!(h.hasher.verify_count(), verifies_before);
        assert_eq!(h.users.get(&user_id).await.failed_login_count, 5);
        assert_eq!(h.sessions.create_count(), 0);
    }

    #[tokio::test]
    async fn test_exactly_threshold_failures_lock() {
        let user = user_with_password("alice", PASSWORD);
        let user_id = user.id.clone();
        let h = harness_with(user).await;
        let now = Utc::now();

        for _ in 0..5 {
            assert_invalid_credentials(h.authenticator.login("alice", "WrongPass12!", now).await);
        }

        let stored = h.users.get(&user_id).await;
        assert_eq!(stored.failed_login_count, 5);
        assert_eq!(stored.lockout_until, Some(now + Duration::minutes(15)));
        assert_locked(h.authenticator.login("alice", PASSWORD, now).await);
    }

    #[tokio::test]
    async fn test_locked_user_is_refused_without_counting() {
        let now = Utc::now();
        let mut user = user_with_password("alice", PASSWORD);
        user.failed_login_count = 5;
        user.lockout_until = Some(now + Duration::minutes(10));
        let user_id = user.id.clone();
        let h = harness_with(user).await;

        let err = h
            .authenticator
            .login("alice", PASSWORD, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::AccountLocked { locked_until: Some(until) })
                if until == now + Duration::minutes(10)
        ));

        assert_locked(h.authenticator.login("alice", "WrongPass12!", now).await);
        assert_eq!(h.users.get(&user_id).await.failed_login_count, 5);
        assert_eq!(h.users.update_count().await, 0);
        assert_eq!(h.hasher.verify_count(), 0);
    }

    #[tokio::test]
    async fn test_success_after_window_clears_lockout() {
        let now = Utc::now();
        let mut user = user_with_password("alice", PASSWORD);
        user.failed_login_count = 7;
        user.lockout_until = Some(now - Duration::seconds(1));
        let user_id = user.id.clone();
        let h = harness_with(user).await;

        h.authenticator.login("alice", PASSWORD, now).await.unwrap();

        let stored = h.users.get(&user_id).await;
        assert_eq!(stored.failed_login_count, 0);
        assert_eq!(stored.lockout_until, None);
        assert_eq!(h.users.update_count().await, 1);
    }

    #[tokio::test]
    async fn test_failure_after_window_relocks_immediately() {
        let now = Utc::now();
        let mut user = user_with_password("alice", PASSWORD);
        user.failed_login_count = 5;
        user.lockout_until = Some(now - Duration::seconds(1));
        let user_id = user.id.clone();
        let h = harness_with(user).await;

        assert_invalid_credentials(h.authenticator.login("alice", "WrongPass12!", now).await);
        let stored = h.users.get(&user_id).await;
        assert_eq!(stored.failed_login_count, 6);
        assert_eq!(stored.lockout_until, Some(now + Duration::minutes(15)));
    }

    #[tokio::test]
    async fn test_administrative_lock_refuses_before_verification() {
        let mut user = user_with_password("alice", PASSWORD);
        user.status = UserStatus::Locked;
        let h = harness_with(user).await;

        let err = h
            .authenticator
            .login("alice", PASSWORD, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::AccountLocked { locked_until: None })
        ));
        assert_eq!(h.hasher.verify_count(), 0);
        assert_eq!(h.users.update_count().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_account() {
        let mut user = user_with_password("alice", PASSWORD);
        user.status = UserStatus::Disabled;
        let user_id = user.id.clone();
        let h = harness_with(user).await;

        let err = h
            .authenticator
            .login("alice", PASSWORD, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountDisabled)));
        assert_eq!(h.users.update_count().await, 0);
        assert_eq!(h.sessions.create_count(), 0);

        // A wrong password still reads as invalid credentials and still counts
        assert_invalid_credentials(h.authenticator.login("alice", "WrongPass12!", Utc::now()).await);
        assert_eq!(h.users.get(&user_id).await.failed_login_count, 1);
    }

    #[tokio::test]
    async fn test_failure_update_carries_read_version() {
        let mut user = user_with_password("alice", PASSWORD);
        user.version = 7;
        let h = harness_with(user).await;

        let _ = h.authenticator.login("alice", "WrongPass12!", Utc::now()).await;
        let update = h.users.last_update().await.unwrap();
        assert_eq!(update.expected_version, Some(7));
    }

    #[tokio::test]
    async fn test_logout_and_get_session() {
        let h = harness_with(user_with_password("alice", PASSWORD)).await;
        let now = Utc::now();
        let result = h.authenticator.login("alice", PASSWORD, now).await.unwrap();

        let session = h
            .authenticator
            .get_session(&result.session_id, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.user_id, result.user_id);

        h.authenticator.logout(&result.session_id).await.unwrap();
        h.authenticator.logout(&result.session_id).await.unwrap();
        assert_eq!(h.sessions.delete_count(), 2);
        assert!(
            h.authenticator
                .get_session(&result.session_id, now)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_each_login_creates_a_distinct_session() {
        let h = harness_with(user_with_password("alice", PASSWORD)).await;
        let first = h.authenticator.login("alice", PASSWORD, Utc::now()).await.unwrap();
        let second = h.authenticator.login("alice", PASSWORD, Utc::now()).await.unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(h.sessions.create_count(), 2);
    }

    #[tokio::test]
    async fn test_custom_config() {
        let users = Arc::new(MockUserRepository::default());
        let sessions = Arc::new(MockSessionRepository::default());
        let user = user_with_password("alice", PASSWORD);
        let user_id = user.id.clone();
        users.insert(user).await;

        let config = AuthConfig::default()
            .with_session_ttl_minutes(30)
            .with_lockout(2, 60);
        let authenticator = Authenticator::new(
            users.clone(),
            sessions,
            Arc::new(FakeHasher::default()),
            &config,
        );
        let now = Utc::now();

        for _ in 0..2 {
            let _ = authenticator.login("alice", "WrongPass12!", now).await;
        }
        assert_eq!(
            users.get(&user_id).await.lockout_until,
            Some(now + Duration::minutes(60))
        );

        let later = now + Duration::minutes(61);
        let result = authenticator.login("alice", PASSWORD, later).await.unwrap();
        assert_eq!(result.expires_at, later + Duration::minutes(30));
    }

    /// Hands out a stale copy of every user, as if another login wrote in between.
    struct StaleReads(MockUserRepository);

    #[async_trait::async_trait]
    impl UserRepository for StaleReads {
        async fn create(&self, user: crate::user::NewUser, hash: &str) -> Result<User, Error> {
            self.0.create(user, hash).await
        }

        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
            self.0.find_by_id(id).await
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
            Ok(self.0.find_by_username(username).await?.map(|mut user| {
                user.version -= 1;
                user
            }))
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            self.0.find_by_email(email).await
        }

        async fn update(
            &self,
            id: &UserId,
            update: crate::user::UserUpdate,
        ) -> Result<User, Error> {
            self.0.update(id, update).await
        }
    }

    #[tokio::test]
    async fn test_stale_read_surfaces_conflict() {
        let inner = MockUserRepository::default();
        let user = user_with_password("alice", PASSWORD);
        let user_id = user.id.clone();
        inner.insert(user).await;
        let users = Arc::new(StaleReads(inner));
        let sessions = Arc::new(MockSessionRepository::default());
        let authenticator = Authenticator::new(
            users.clone(),
            sessions.clone(),
            Arc::new(FakeHasher::default()),
            &AuthConfig::default(),
        );

        let err = authenticator
            .login("alice", "WrongPass12!", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Conflict(_))));
        assert_eq!(users.0.get(&user_id).await.failed_login_count, 0);

        let err = authenticator
            .login("alice", PASSWORD, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_storage_error());
        assert_eq!(sessions.create_count(), 0);
    }
}
