#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use warden::{
    Argon2PasswordHasher, NewUser, Role, SqliteRepositoryProvider, User, Warden, WardenBuilder,
};

pub const PASSWORD: &str = "CorrectHorse12!";

/// An in-memory database on a single connection, so every query sees the same data.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// A migrated Warden over `pool` with a cheap Argon2 cost.
pub async fn warden_with_pool(pool: SqlitePool) -> Warden<SqliteRepositoryProvider> {
    WardenBuilder::new()
        .with_sqlite_pool(pool)
        .with_password_hasher(Arc::new(Argon2PasswordHasher::with_cost(1024, 1, 1).unwrap()))
        .apply_migrations(true)
        .build()
        .await
        .unwrap()
}

pub async fn memory_warden() -> Warden<SqliteRepositoryProvider> {
    warden_with_pool(memory_pool().await).await
}

/// The current time truncated to what the store keeps.
pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap()
}

pub async fn create_admin(warden: &Warden<SqliteRepositoryProvider>) -> User {
    warden
        .create_user(
            NewUser::builder()
                .username("admin")
                .email(Some("admin@example.com".to_string()))
                .role(Role::Admin)
                .build()
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Create `username` and give it [`PASSWORD`] through an admin-issued reset.
pub async fn create_user_with_password(
    warden: &Warden<SqliteRepositoryProvider>,
    admin: &User,
    username: &str,
    now: DateTime<Utc>,
) -> User {
    let user = warden
        .create_user(
            NewUser::builder()
                .username(username)
                .email(Some(format!("{username}@example.com")))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

    let issued = warden
        .issue_password_reset_at(&admin.id, &user.id, now)
        .await
        .unwrap();
    warden
        .reset_password_at(&issued.raw_token, PASSWORD, now)
        .await
        .unwrap();

    warden.get_user(&user.id).await.unwrap().unwrap()
}

pub async fn session_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(pool)
        .await
        .unwrap()
}
