use async_trait::async_trait;
use sqlx::SqlitePool;
use warden_core::{Error, Session, SessionId, repositories::SessionRepository};

use crate::rows::{SessionRow, map_sqlx_error, to_millis};

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Remove sessions that expired before `now`. Returns how many were removed.
    pub async fn delete_expired(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to delete expired sessions"))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, user_id, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(session.id.as_str())
        .bind(session.user_id.as_str())
        .bind(to_millis(session.created_at))
        .bind(to_millis(session.expires_at))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create session"))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to find session"))?;

        row.map(Session::try_from).transpose()
    }

    async fn delete(&self, id: &SessionId) -> Result<(), Error> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to delete session"))?;

        Ok(())
    }
}
