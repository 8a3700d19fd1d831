//! Authentication configuration
//!
//! ```rust,ignore
//! use warden_core::AuthConfig;
//!
//! let config: AuthConfig = serde_json::from_str(r#"{ "lockoutThreshold": 3 }"#)?;
//! config.validate()?;
//! assert_eq!(config.session_ttl(), chrono::Duration::minutes(240));
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, error::ValidationError};

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 240;
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 30;
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;
pub const DEFAULT_LOCKOUT_WINDOW_MINUTES: i64 = 15;

/// Session lifetime, reset token lifetime and lockout policy.
///
/// Missing keys take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    pub session_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    /// Consecutive failures that trigger a lockout.
    pub lockout_threshold: u32,
    pub lockout_window_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            reset_token_ttl_minutes: DEFAULT_RESET_TOKEN_TTL_MINUTES,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_window_minutes: DEFAULT_LOCKOUT_WINDOW_MINUTES,
        }
    }
}

impl AuthConfig {
    /// Saturates when the minutes are out of range; [`validate`](Self::validate)
    /// rejects such values.
    pub fn session_ttl(&self) -> Duration {
        saturating_minutes(self.session_ttl_minutes)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        saturating_minutes(self.reset_token_ttl_minutes)
    }

    pub fn lockout_window(&self) -> Duration {
        saturating_minutes(self.lockout_window_minutes)
    }

    pub fn with_session_ttl_minutes(mut self, minutes: i64) -> Self {
        self.session_ttl_minutes = minutes;
        self
    }

    pub fn with_reset_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.reset_token_ttl_minutes = minutes;
        self
    }

    pub fn with_lockout(mut self, threshold: u32, window_minutes: i64) -> Self {
        self.lockout_threshold = threshold;
        self.lockout_window_minutes = window_minutes;
        self
    }

    /// Reject values that would create already-expired sessions or tokens,
    /// or lockouts that end before they start.
    pub fn validate(&self) -> Result<(), Error> {
        let durations = [
            ("sessionTtlMinutes", self.session_ttl_minutes),
            ("resetTokenTtlMinutes", self.reset_token_ttl_minutes),
            ("lockoutWindowMinutes", self.lockout_window_minutes),
        ];
        for (key, minutes) in durations {
            if minutes <= 0 {
                return Err(ValidationError::InvalidField(format!(
                    "{key} must be positive, got {minutes}"
                ))
                .into());
            }
            if Duration::try_minutes(minutes).is_none() {
                return Err(ValidationError::InvalidField(format!(
                    "{key} is out of range, got {minutes}"
                ))
                .into());
            }
        }

        if self.lockout_threshold == 0 {
            return Err(
                ValidationError::InvalidField("lockoutThreshold must be at least 1".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}

fn saturating_minutes(minutes: i64) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(if minutes < 0 {
        Duration::MIN
    } else {
        Duration::MAX
    })
}

/// `now + ttl`, for anything that expires.
///
/// Fails when `ttl` is not positive or the sum leaves the range chrono can
/// represent, so an expiry is always strictly after `now`.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration, what: &str) -> Result<DateTime<Utc>, Error> {
    if ttl <= Duration::zero() {
        return Err(ValidationError::InvalidField(format!("{what} must be positive")).into());
    }

    now.checked_add_signed(ttl).ok_or_else(|| {
        Error::from(ValidationError::InvalidField(format!(
            "{what} is out of range"
        )))
    })
}
