use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use warden_core::{
    Error, NewUser, User, UserId, UserUpdate, error::StorageError, repositories::UserRepository,
};

use crate::rows::{UserRow, map_sqlx_error, to_millis};

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT * FROM users WHERE {column} = ?1"))
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to find user"))?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser, password_hash: &str) -> Result<User, Error> {
        let now = to_millis(Utc::now());

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, email, name, role, status, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING *
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create user"))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.find_one("id", id.as_str()).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.find_one("email", email).await
    }

    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, Error> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to acquire connection"))?;
        update_user(&mut conn, id, update).await
    }
}

/// One `UPDATE ... RETURNING *` statement, so the version check and the write
/// happen atomically. Takes a connection so a transaction can include it.
pub(crate) async fn update_user(
    conn: &mut SqliteConnection,
    id: &UserId,
    update: UserUpdate,
) -> Result<User, Error> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE users SET version = version + 1, updated_at = ");
    query.push_bind(to_millis(Utc::now()));

    if let Some(password_hash) = update.password_hash {
        query.push(", password_hash = ").push_bind(password_hash);
    }
    if let Some(count) = update.failed_login_count {
        query.push(", failed_login_count = ").push_bind(i64::from(count));
    }
    if let Some(lockout_until) = update.lockout_until {
        query
            .push(", lockout_until = ")
            .push_bind(lockout_until.map(to_millis));
    }
    if let Some(last_login_at) = update.last_login_at {
        query
            .push(", last_login_at = ")
            .push_bind(last_login_at.map(to_millis));
    }
    if let Some(status) = update.status {
        query.push(", status = ").push_bind(status.as_str());
    }
    if let Some(role) = update.role {
        query.push(", role = ").push_bind(role.as_str());
    }
    if let Some(name) = update.name {
        query.push(", name = ").push_bind(name);
    }

    query.push(" WHERE id = ").push_bind(id.as_str().to_owned());
    if let Some(expected) = update.expected_version {
        query.push(" AND version = ").push_bind(expected);
    }
    query.push(" RETURNING *");

    let row = query
        .build_query_as::<UserRow>()
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update user"))?;

    if let Some(row) = row {
        return row.try_into();
    }

    let matching: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?1")
        .bind(id.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to find user"))?;

    if update.expected_version.is_some() && matching > 0 {
        tracing::debug!(user_id = %id, "Rejected stale user update");
        Err(StorageError::Conflict(format!("user {id}")).into())
    } else {
        Err(StorageError::NotFound.into())
    }
}
