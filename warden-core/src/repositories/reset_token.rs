use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    reset_token::{PasswordResetToken, ResetTokenId},
    user::UserUpdate,
};

/// Repository for password reset token data access
#[async_trait]
pub trait PasswordResetTokenRepository: Send + Sync + 'static {
    /// Store a newly issued token
    async fn create(&self, token: PasswordResetToken) -> Result<PasswordResetToken, Error>;

    /// Find a token by the digest of its raw value
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, Error>;

    /// Set `used_at` if, and only if, it is still unset
    ///
    /// Returns `true` when this call consumed the token and `false` when it
    /// was already used (or unknown). Two concurrent calls for the same id
    /// must not both return `true`.
    async fn mark_used(&self, id: &ResetTokenId, used_at: DateTime<Utc>) -> Result<bool, Error>;

    /// Consume `token` and apply `update` to its user as one unit
    ///
    /// The consumption is conditional exactly like [`mark_used`](Self::mark_used).
    /// When it loses, nothing is written and `false` is returned. When the
    /// user update fails, the token stays unused and the error is returned.
    async fn redeem(
        &self,
        token: &PasswordResetToken,
        update: UserUpdate,
        used_at: DateTime<Utc>,
    ) -> Result<bool, Error>;
}
