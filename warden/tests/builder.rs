//! Tests for the Warden builder pattern
#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use chrono::Duration;
use warden::{
    Argon2PasswordHasher, AuthConfig, Error, NewUser, PasswordPolicy, Role, SqliteRepositoryProvider,
    Warden, WardenBuilder, WardenBuilderError, error::ValidationError,
};

#[tokio::test]
async fn test_builder_with_sqlite() {
    let warden = WardenBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build Warden");

    warden.health_check().await.expect("Health check failed");
    assert_eq!(*warden.config(), AuthConfig::default());
}

#[tokio::test]
async fn test_builder_manual_migration() {
    let warden = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .build()
        .await
        .expect("Failed to build Warden");

    warden.migrate().await.expect("Migration failed");
    // Running again is a no-op
    warden.migrate().await.expect("Second migration failed");
    warden.health_check().await.expect("Health check failed");
}

#[tokio::test]
async fn test_builder_with_repositories() {
    let provider = Arc::new(SqliteRepositoryProvider::new(common::memory_pool().await));

    let warden = WardenBuilder::new()
        .with_repositories(provider)
        .with_password_hasher(Arc::new(Argon2PasswordHasher::with_cost(1024, 1, 1).unwrap()))
        .apply_migrations(true)
        .build()
        .await
        .unwrap();

    let user = warden
        .create_user(
            NewUser::builder()
                .username("root")
                .role(Role::Admin)
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(user.is_admin());
    assert_eq!(user.name, "root");
}

#[tokio::test]
async fn test_builder_configuration() {
    let warden = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .with_session_ttl(Duration::hours(8))
        .with_reset_token_ttl(Duration::minutes(10))
        .with_lockout(3, Duration::minutes(60))
        .with_password_policy(PasswordPolicy::new().with_min_length(16))
        .with_password_hasher(Arc::new(Argon2PasswordHasher::with_cost(1024, 1, 1).unwrap()))
        .apply_migrations(true)
        .build()
        .await
        .unwrap();

    let config = warden.config();
    assert_eq!(config.session_ttl(), Duration::hours(8));
    assert_eq!(config.reset_token_ttl(), Duration::minutes(10));
    assert_eq!(config.lockout_threshold, 3);
    assert_eq!(config.lockout_window(), Duration::minutes(60));
    assert_eq!(warden.password_policy().min_length, 16);

    // The configured policy is the one enforced on reset
    let admin = common::create_admin(&warden).await;
    let now = common::now();
    let issued = warden
        .issue_password_reset_at(&admin.id, &admin.id, now)
        .await
        .unwrap();
    assert_eq!(issued.expires_at, now + Duration::minutes(10));

    let err = warden
        .reset_password_at(&issued.raw_token, common::PASSWORD, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::WeakPassword(_))
    ));
}

#[tokio::test]
async fn test_builder_rejects_invalid_configuration() {
    let result = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .with_lockout(0, Duration::minutes(15))
        .build()
        .await;
    assert!(matches!(
        result,
        Err(WardenBuilderError::InvalidConfiguration(_))
    ));

    let result = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .with_config(AuthConfig {
            session_ttl_minutes: 0,
            ..AuthConfig::default()
        })
        .build()
        .await;
    match result {
        Err(WardenBuilderError::InvalidConfiguration(message)) => {
            assert!(message.contains("sessionTtlMinutes"));
        }
        _ => panic!("expected an invalid configuration error"),
    }
}

#[tokio::test]
async fn test_builder_rejects_partial_minutes() {
    let result = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .with_session_ttl(Duration::seconds(90))
        .build()
        .await;
    match result {
        Err(WardenBuilderError::InvalidConfiguration(message)) => {
            assert!(message.contains("sessionTtlMinutes"));
            assert!(message.contains("whole number of minutes"));
        }
        _ => panic!("expected an invalid configuration error"),
    }

    let result = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .with_lockout(5, Duration::seconds(30))
        .build()
        .await;
    match result {
        Err(WardenBuilderError::InvalidConfiguration(message)) => {
            assert!(message.contains("lockoutWindowMinutes"));
        }
        _ => panic!("expected an invalid configuration error"),
    }
}

#[tokio::test]
async fn test_builder_rejects_out_of_range_configuration() {
    let config: AuthConfig =
        serde_json::from_str(r#"{ "sessionTtlMinutes": 9223372036854775807 }"#).unwrap();

    let result = WardenBuilder::new()
        .with_sqlite_pool(common::memory_pool().await)
        .with_config(config)
        .build()
        .await;
    match result {
        Err(WardenBuilderError::InvalidConfiguration(message)) => {
            assert!(message.contains("out of range"));
        }
        _ => panic!("expected an invalid configuration error"),
    }
}

#[tokio::test]
async fn test_with_options_validates_configuration() {
    let provider = Arc::new(SqliteRepositoryProvider::new(common::memory_pool().await));
    let hasher = Arc::new(Argon2PasswordHasher::with_cost(1024, 1, 1).unwrap());

    for config in [
        AuthConfig::default().with_lockout(0, 15),
        AuthConfig::default().with_lockout(5, 0),
    ] {
        let result = Warden::with_options(
            provider.clone(),
            config,
            PasswordPolicy::default(),
            hasher.clone(),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    assert!(
        Warden::with_options(
            provider,
            AuthConfig::default(),
            PasswordPolicy::default(),
            hasher,
        )
        .is_ok()
    );
}
