//! Users and their credential state
//!
//! | Field                | Type               | Description                                            |
//! | -------------------- | ------------------ | ------------------------------------------------------ |
//! | `id`                 | `UserId`           | Unique identifier.                                     |
//! | `username`           | `String`           | Unique login name.                                     |
//! | `email`              | `Option<String>`   | Optional, unique when present.                         |
//! | `name`               | `String`           | Display name.                                          |
//! | `role`               | `Role`             | `User` or `Admin`.                                     |
//! | `status`             | `UserStatus`       | `Active`, `Disabled` or `Locked`.                      |
//! | `password_hash`      | `String`           | Slow salted hash, never the plaintext.                 |
//! | `failed_login_count` | `u32`              | Consecutive failed logins, reset on success.           |
//! | `lockout_until`      | `Option<DateTime>` | Login refused while this is in the future.             |
//! | `last_login_at`      | `Option<DateTime>` | Time of the last successful login.                     |
//! | `version`            | `i64`              | Bumped by the store on every update.                   |
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::{ValidationError, utilities::RequiredFieldExt},
    id::{RECORD_ID_BYTES, generate_prefixed_id, validate_prefixed_id},
};

const USER_ID_PREFIX: &str = "usr";

/// A unique, stable identifier for a user. Treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(UserId(generate_prefixed_id(USER_ID_PREFIX, RECORD_ID_BYTES)?))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id has the format produced by [`UserId::new_random`]
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, USER_ID_PREFIX)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(ValidationError::InvalidField(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative account state.
///
/// `Locked` is a lock placed by an administrator and has no expiry; the
/// time-boxed lockout after failed logins is tracked in `lockout_until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
    Locked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Disabled => "DISABLED",
            UserStatus::Locked => "LOCKED",
        }
    }
}

impl FromStr for UserStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "DISABLED" => Ok(UserStatus::Disabled),
            "LOCKED" => Ok(UserStatus::Locked),
            other => Err(ValidationError::InvalidField(format!(
                "unknown user status: {other}"
            ))),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub failed_login_count: u32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A time-boxed lockout is active at `now`.
    pub fn is_locked_out_at(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("password_hash", &"<redacted>")
            .field("failed_login_count", &self.failed_login_count)
            .field("lockout_until", &self.lockout_until)
            .field("last_login_at", &self.last_login_at)
            .field("version", &self.version)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A user about to be created. The password hash is supplied separately to
/// [`UserRepository::create`](crate::repositories::UserRepository::create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub status: UserStatus,
}

impl NewUser {
    pub fn builder() -> NewUserBuilder {
        NewUserBuilder::default()
    }
}

#[derive(Default)]
pub struct NewUserBuilder {
    id: Option<UserId>,
    username: Option<String>,
    email: Option<String>,
    name: Option<String>,
    role: Role,
    status: UserStatus,
}

impl NewUserBuilder {
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Result<NewUser, Error> {
        let username = self.username.require_field("Username")?;
        let id = match self.id {
            Some(id) => id,
            None => UserId::new_random()?,
        };

        Ok(NewUser {
            id,
            name: self.name.unwrap_or_else(|| username.clone()),
            username,
            email: self.email,
            role: self.role,
            status: self.status,
        })
    }
}

/// A partial update of one user record.
///
/// `None` leaves a field untouched. Nullable columns use `Option<Option<_>>`
/// so they can be cleared. When `expected_version` is set the store must
/// reject the update with [`StorageError::Conflict`](crate::error::StorageError::Conflict)
/// unless the stored version still matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub failed_login_count: Option<u32>,
    pub lockout_until: Option<Option<DateTime<Utc>>>,
    pub last_login_at: Option<Option<DateTime<Utc>>>,
    pub status: Option<UserStatus>,
    pub role: Option<Role>,
    pub name: Option<String>,
    pub expected_version: Option<i64>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn failed_login_count(mut self, count: u32) -> Self {
        self.failed_login_count = Some(count);
        self
    }

    pub fn lockout_until(mut self, until: Option<DateTime<Utc>>) -> Self {
        self.lockout_until = Some(until);
        self
    }

    pub fn last_login_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_login_at = Some(at);
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// True when the update would not change any column.
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.failed_login_count.is_none()
            && self.lockout_until.is_none()
            && self.last_login_at.is_none()
            && self.status.is_none()
            && self.role.is_none()
            && self.name.is_none()
    }

    /// Apply the changed fields to an in-memory user, bumping its version.
    ///
    /// The version check is the caller's job; this only writes.
    pub fn apply_to(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(count) = self.failed_login_count {
            user.failed_login_count = count;
        }
        if let Some(until) = self.lockout_until {
            user.lockout_until = until;
        }
        if let Some(at) = self.last_login_at {
            user.last_login_at = at;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        user.version += 1;
        user.updated_at = now;
    }
}
