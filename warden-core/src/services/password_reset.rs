//! Administrator-issued password reset tokens.
//!
//! Issuing stores only the SHA-256 digest of a fresh 256-bit raw token.
//! Redemption checks, in order: the token exists, it is unused, it has not
//! expired, and the new password passes the [`PasswordPolicy`]. Only then is
//! the new password hashed.
//!
//! Consuming the token and writing the password are one store-level unit.
//! When two redemptions race, exactly one of them commits and the other fails
//! with [`TokenError::TokenAlreadyUsed`] having written nothing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    config::expiry_after,
    crypto::{generate_secure_token, hash_token},
    error::TokenError,
    hasher::PasswordHasher,
    policy::PasswordPolicy,
    repositories::PasswordResetTokenRepository,
    reset_token::{IssuedResetToken, PasswordResetToken, ResetTokenId},
    user::{UserId, UserUpdate},
};

pub struct PasswordResetService<T: PasswordResetTokenRepository> {
    tokens: Arc<T>,
    hasher: Option<Arc<dyn PasswordHasher>>,
    policy: PasswordPolicy,
    token_ttl: Duration,
}

impl<T: PasswordResetTokenRepository> PasswordResetService<T> {
    pub fn new(
        tokens: Arc<T>,
        hasher: Arc<dyn PasswordHasher>,
        policy: PasswordPolicy,
        token_ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            hasher: Some(hasher),
            policy,
            token_ttl,
        }
    }

    /// A service that validates and consumes tokens but never writes a
    /// password. Only meant for tests and dry runs.
    pub fn without_hasher(
        tokens: Arc<T>,
        policy: PasswordPolicy,
        token_ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            hasher: None,
            policy,
            token_ttl,
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Issue a reset token for `target` on behalf of `issued_by`
    ///
    /// The caller has already checked that `issued_by` is an administrator and
    /// that `target` exists.
    pub async fn issue_token(
        &self,
        issued_by: &UserId,
        target: &UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedResetToken, Error> {
        let expires_at = expiry_after(now, self.token_ttl, "Reset token lifetime")?;
        let raw_token = generate_secure_token()?;
        let record = PasswordResetToken {
            id: ResetTokenId::new_random()?,
            user_id: target.clone(),
            issued_by: issued_by.clone(),
            token_hash: hash_token(&raw_token),
            expires_at,
            used_at: None,
            created_at: now,
        };

        let stored = self.tokens.create(record).await?;
        tracing::info!(
            user_id = %stored.user_id,
            issued_by = %stored.issued_by,
            token_id = %stored.id,
            expires_at = %stored.expires_at,
            "Password reset token issued"
        );

        Ok(IssuedResetToken {
            token_id: stored.id,
            user_id: stored.user_id,
            raw_token,
            expires_at: stored.expires_at,
        })
    }

    /// Look a raw token up and check it is redeemable at `now`, without consuming it
    pub async fn check_token(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordResetToken, Error> {
        let Some(record) = self
            .tokens
            .find_by_token_hash(&hash_token(raw_token))
            .await?
        else {
            tracing::debug!("Reset token not found");
            return Err(TokenError::InvalidToken.into());
        };

        if let Err(e) = record.check_redeemable(now) {
            tracing::debug!(token_id = %record.id, reason = %e, "Reset token rejected");
            return Err(e.into());
        }

        Ok(record)
    }

    /// Redeem `raw_token` and set the target user's password to `new_password`
    ///
    /// A successful reset also clears the user's failed login count and any
    /// active lockout. Returns the id of the user whose password changed.
    pub async fn reset_password(
        &self,
        raw_token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, Error> {
        let record = self.check_token(raw_token, now).await?;

        self.policy.validate(new_password)?;

        let consumed = match &self.hasher {
            Some(hasher) => {
                let password_hash = hasher.hash(new_password).await?;
                let update = UserUpdate::new()
                    .password_hash(password_hash)
                    .failed_login_count(0)
                    .lockout_until(None);
                self.tokens.redeem(&record, update, now).await?
            }
            None => {
                tracing::warn!(
                    user_id = %record.user_id,
                    "No password hasher configured, consuming reset token without changing the password"
                );
                self.tokens.mark_used(&record.id, now).await?
            }
        };

        if !consumed {
            tracing::warn!(
                user_id = %record.user_id,
                token_id = %record.id,
                "Reset token was consumed by a concurrent redemption"
            );
            return Err(TokenError::TokenAlreadyUsed.into());
        }

        tracing::info!(user_id = %record.user_id, token_id = %record.id, "Password reset");
        Ok(record.user_id)
    }
}
