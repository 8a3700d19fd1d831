use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use warden_core::{
    Error, PasswordResetToken, ResetTokenId, UserUpdate,
    repositories::PasswordResetTokenRepository,
};

use crate::{
    repositories::user::update_user,
    rows::{ResetTokenRow, map_sqlx_error, to_millis},
};

const CONSUME_TOKEN: &str =
    "UPDATE password_reset_tokens SET used_at = ?1 WHERE id = ?2 AND used_at IS NULL";

pub struct SqlitePasswordResetTokenRepository {
    pool: SqlitePool,
}

impl SqlitePasswordResetTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordResetTokenRepository for SqlitePasswordResetTokenRepository {
    async fn create(&self, token: PasswordResetToken) -> Result<PasswordResetToken, Error> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, issued_by, token_hash, expires_at, used_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(token.id.as_str())
        .bind(token.user_id.as_str())
        .bind(token.issued_by.as_str())
        .bind(&token.token_hash)
        .bind(to_millis(token.expires_at))
        .bind(token.used_at.map(to_millis))
        .bind(to_millis(token.created_at))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create password reset token"))?;

        row.try_into()
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, Error> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT * FROM password_reset_tokens WHERE token_hash = ?1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to find password reset token"))?;

        row.map(PasswordResetToken::try_from).transpose()
    }

    async fn mark_used(&self, id: &ResetTokenId, used_at: DateTime<Utc>) -> Result<bool, Error> {
        let result = sqlx::query(CONSUME_TOKEN)
            .bind(to_millis(used_at))
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to mark password reset token used"))?;

        Ok(result.rows_affected() == 1)
    }

    /// Consume the token, then update the user, in one transaction. Dropping
    /// the transaction on any early return rolls both back.
    async fn redeem(
        &self,
        token: &PasswordResetToken,
        update: UserUpdate,
        used_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to begin transaction"))?;

        let consumed = sqlx::query(CONSUME_TOKEN)
            .bind(to_millis(used_at))
            .bind(token.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to mark password reset token used"))?;

        if consumed.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error(e, "Failed to roll back transaction"))?;
            return Ok(false);
        }

        update_user(&mut tx, &token.user_id, update).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to commit password reset"))?;
        Ok(true)
    }
}
