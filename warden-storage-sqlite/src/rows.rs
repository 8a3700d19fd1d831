//! Row types and conversions between SQLite columns and domain records.

use chrono::{DateTime, Utc};
use warden_core::{
    Error, PasswordResetToken, ResetTokenId, Session, SessionId, User, UserId,
    error::{StorageError, utilities::DatabaseResultExt},
};

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StorageError::Database(format!("timestamp out of range: {millis}")).into()
    })
}

fn from_optional_millis(millis: Option<i64>) -> Result<Option<DateTime<Utc>>, Error> {
    millis.map(from_millis).transpose()
}

/// Map a sqlx error, turning unique and foreign key violations into
/// [`StorageError::Constraint`] and logging everything else.
pub(crate) fn map_sqlx_error(e: sqlx::Error, context: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return StorageError::Constraint(format!("{context}: {}", db_err.message())).into();
        }
    }

    tracing::error!(error = %e, "{context}");
    StorageError::Database(format!("{context}: {e}")).into()
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    pub role: String,
    pub status: String,
    pub password_hash: String,
    pub failed_login_count: i64,
    pub lockout_until: Option<i64>,
    pub last_login_at: Option<i64>,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let invalid = |e: warden_core::error::ValidationError| {
            Error::Storage(StorageError::Database(format!("corrupt user row: {e}")))
        };

        Ok(User {
            id: UserId::from(row.id),
            username: row.username,
            email: row.email,
            name: row.name,
            role: row.role.parse().map_err(invalid)?,
            status: row.status.parse().map_err(invalid)?,
            password_hash: row.password_hash,
            failed_login_count: u32::try_from(row.failed_login_count)
                .map_db_err_with_context("failed_login_count out of range")?,
            lockout_until: from_optional_millis(row.lockout_until)?,
            last_login_at: from_optional_millis(row.last_login_at)?,
            version: row.version,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl TryFrom<SessionRow> for Session {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: SessionId::from(row.id),
            user_id: UserId::from(row.user_id),
            created_at: from_millis(row.created_at)?,
            expires_at: from_millis(row.expires_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ResetTokenRow {
    pub id: String,
    pub user_id: String,
    pub issued_by: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub used_at: Option<i64>,
    pub created_at: i64,
}

impl TryFrom<ResetTokenRow> for PasswordResetToken {
    type Error = Error;

    fn try_from(row: ResetTokenRow) -> Result<Self, Self::Error> {
        Ok(PasswordResetToken {
            id: ResetTokenId::from(row.id),
            user_id: UserId::from(row.user_id),
            issued_by: UserId::from(row.issued_by),
            token_hash: row.token_hash,
            expires_at: from_millis(row.expires_at)?,
            used_at: from_optional_millis(row.used_at)?,
            created_at: from_millis(row.created_at)?,
        })
    }
}
