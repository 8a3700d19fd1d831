//! Sessions
//!
//! A session is the server-side proof that a user authenticated. Its id is the
//! bearer credential handed to the client, so it is drawn with 256 bits of OS
//! randomness.
//!
//! | Field        | Type       | Description                                   |
//! | ------------ | ---------- | --------------------------------------------- |
//! | `id`         | `SessionId`| Unguessable identifier and bearer credential. |
//! | `user_id`    | `UserId`   | The single owner of the session.              |
//! | `created_at` | `DateTime` | When the session was issued.                  |
//! | `expires_at` | `DateTime` | Strictly after `created_at`.                  |
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    config::expiry_after,
    id::{SECRET_ID_BYTES, generate_prefixed_id},
    user::UserId,
};

const SESSION_ID_PREFIX: &str = "ses";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(Self(generate_prefixed_id(SESSION_ID_PREFIX, SECRET_ID_BYTES)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session for `user_id` issued at `now` and living for `ttl`.
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Result<Self, Error> {
        let expires_at = expiry_after(now, ttl, "Session lifetime")?;

        Ok(Self {
            id: SessionId::new_random()?,
            user_id,
            created_at: now,
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(now)
    }
}
