//! In-memory repositories and a transparent hasher for service tests.
//!
//! Every mock counts its writes so tests can assert exactly how many store
//! mutations an operation performed.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    Error,
    crypto::constant_time_compare,
    error::StorageError,
    hasher::PasswordHasher,
    repositories::{PasswordResetTokenRepository, SessionRepository, UserRepository},
    reset_token::{PasswordResetToken, ResetTokenId},
    session::{Session, SessionId},
    user::{NewUser, Role, User, UserId, UserStatus, UserUpdate},
};

#[derive(Default)]
pub struct MockUserRepository {
    users: Mutex<HashMap<UserId, User>>,
    updates: Mutex<Vec<UserUpdate>>,
    creates: AtomicUsize,
}

impl MockUserRepository {
    pub async fn insert(&self, user: User) {
        self.users.lock().await.insert(user.id.clone(), user);
    }

    pub async fn get(&self, id: &UserId) -> User {
        self.users
            .lock()
            .await
            .get(id)
            .cloned()
            .expect("user should exist")
    }

    pub async fn update_count(&self) -> usize {
        self.updates.lock().await.len()
    }

    pub async fn last_update(&self) -> Option<UserUpdate> {
        self.updates.lock().await.last().cloned()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn create(&self, user: NewUser, password_hash: &str) -> Result<User, Error> {
        let mut users = self.users.lock().await;
        let taken = users.values().any(|existing| {
            existing.username == user.username
                || (user.email.is_some() && existing.email == user.email)
        });
        if taken {
            return Err(StorageError::Constraint("username or email taken".to_string()).into());
        }

        let now = Utc::now();
        let created = User {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            role: user.role,
            status: user.status,
            password_hash: password_hash.to_string(),
            failed_login_count: 0,
            lockout_until: None,
            last_login_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id.clone(), created.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, Error> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(id).ok_or(StorageError::NotFound)?;
        if update
            .expected_version
            .is_some_and(|expected| expected != user.version)
        {
            return Err(StorageError::Conflict(format!("user {id}")).into());
        }

        update.apply_to(user, Utc::now());
        self.updates.lock().await.push(update);
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct MockSessionRepository {
    sessions: Mutex<HashMap<SessionId, Session>>,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl MockSessionRepository {
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionRepository for MockSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(session)
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), Error> {
        self.sessions.lock().await.remove(id);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reset tokens that redeem against a shared [`MockUserRepository`].
pub struct MockResetTokenRepository {
    users: Arc<MockUserRepository>,
    tokens: Mutex<HashMap<ResetTokenId, PasswordResetToken>>,
    creates: AtomicUsize,
    /// When set, the next consumption reports a lost race even for an unused token.
    lose_next_race: AtomicBool,
}

impl MockResetTokenRepository {
    pub fn new(users: Arc<MockUserRepository>) -> Self {
        Self {
            users,
            tokens: Mutex::default(),
            creates: AtomicUsize::new(0),
            lose_next_race: AtomicBool::new(false),
        }
    }

    pub async fn all(&self) -> Vec<PasswordResetToken> {
        self.tokens.lock().await.values().cloned().collect()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn lose_next_redemption(&self) {
        self.lose_next_race.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PasswordResetTokenRepository for MockResetTokenRepository {
    async fn create(&self, token: PasswordResetToken) -> Result<PasswordResetToken, Error> {
        self.tokens
            .lock()
            .await
            .insert(token.id.clone(), token.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(token)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, Error> {
        Ok(self
            .tokens
            .lock()
            .await
            .values()
            .find(|t| constant_time_compare(t.token_hash.as_bytes(), token_hash.as_bytes()))
            .cloned())
    }

    async fn mark_used(&self, id: &ResetTokenId, used_at: DateTime<Utc>) -> Result<bool, Error> {
        if self.lose_next_race.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }

        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(id) {
            Some(token) if token.used_at.is_none() => {
                token.used_at = Some(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn redeem(
        &self,
        token: &PasswordResetToken,
        update: UserUpdate,
        used_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        if self.lose_next_race.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }

        // Held across the user write so the pair is atomic
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(&token.id) {
            Some(stored) if stored.used_at.is_none() => {
                self.users.update(&token.user_id, update).await?;
                stored.used_at = Some(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A fast, transparent stand-in for the slow hasher.
#[derive(Default)]
pub struct FakeHasher {
    verifies: AtomicUsize,
    hashes: AtomicUsize,
}

impl FakeHasher {
    pub fn digest(plaintext: &str) -> String {
        format!("fake${plaintext}")
    }

    pub fn verify_count(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }

    pub fn hash_count(&self) -> usize {
        self.hashes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PasswordHasher for FakeHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, Error> {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::digest(plaintext))
    }

    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, Error> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        Ok(Self::digest(plaintext) == digest)
    }
}

pub fn user_with_password(username: &str, password: &str) -> User {
    let now = Utc::now();
    User {
        id: UserId::new_random().expect("random id"),
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        name: username.to_string(),
        role: Role::User,
        status: UserStatus::Active,
        password_hash: FakeHasher::digest(password),
        failed_login_count: 0,
        lockout_until: None,
        last_login_at: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}
