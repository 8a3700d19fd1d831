//! Password reset tokens
//!
//! Only the SHA-256 digest of a raw token is ever stored. The raw value exists
//! once, in the [`IssuedResetToken`] returned to the issuing administrator.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::TokenError,
    id::{RECORD_ID_BYTES, generate_prefixed_id},
    user::UserId,
};

const RESET_TOKEN_ID_PREFIX: &str = "rst";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResetTokenId(String);

impl ResetTokenId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(Self(generate_prefixed_id(
            RESET_TOKEN_ID_PREFIX,
            RECORD_ID_BYTES,
        )?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for ResetTokenId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ResetTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub id: ResetTokenId,
    /// The user whose password this token may overwrite.
    pub user_id: UserId,
    /// The administrator who issued it.
    pub issued_by: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.check_redeemable(now).is_ok()
    }

    /// Used wins over expired when both hold.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), TokenError> {
        if self.is_used() {
            return Err(TokenError::TokenAlreadyUsed);
        }
        if self.is_expired_at(now) {
            return Err(TokenError::TokenExpired);
        }
        Ok(())
    }
}

/// The result of issuing a token. `raw_token` must be delivered out-of-band
/// and cannot be recovered later.
#[derive(Clone)]
pub struct IssuedResetToken {
    pub token_id: ResetTokenId,
    pub user_id: UserId,
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedResetToken")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("raw_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
