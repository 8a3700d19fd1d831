//! Account lockout after repeated failed logins.
//!
//! The tracker is pure: it looks at a [`User`] and a point in time and
//! produces the [`UserUpdate`] the caller must persist. It never talks to a
//! store, which keeps "exactly one user update per login" in the
//! authenticator's hands.
//!
//! The failure counter is only reset by a successful login or a password
//! reset. A lockout window elapsing does not reset it, so the first failure
//! after the window re-locks the account.

use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    config::{AuthConfig, expiry_after},
    user::{User, UserUpdate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutTracker {
    threshold: u32,
    window: Duration,
}

/// What a failed login does to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureTransition {
    pub update: UserUpdate,
    pub failed_login_count: u32,
    /// Set when this failure started a lockout.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutTracker {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self { threshold, window }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.lockout_threshold, config.lockout_window())
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a time-boxed lockout is active for `user` at `now`.
    pub fn is_locked(&self, user: &User, now: DateTime<Utc>) -> bool {
        user.is_locked_out_at(now)
    }

    /// Count a failed login, starting a lockout once the threshold is reached
    ///
    /// Fails only when the window is not positive or `now + window` is out of
    /// range, so `locked_until` is always strictly after `now`.
    pub fn record_failure(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<FailureTransition, Error> {
        let failed_login_count = user.failed_login_count.saturating_add(1);
        let mut update = UserUpdate::new()
            .failed_login_count(failed_login_count)
            .expected_version(user.version);

        let locked_until = if failed_login_count >= self.threshold {
            Some(expiry_after(now, self.window, "Lockout window")?)
        } else {
            None
        };
        if let Some(until) = locked_until {
            update = update.lockout_until(Some(until));
        }

        Ok(FailureTransition {
            update,
            failed_login_count,
            locked_until,
        })
    }

    pub fn record_success(&self, user: &User, now: DateTime<Utc>) -> UserUpdate {
        UserUpdate::new()
            .failed_login_count(0)
            .lockout_until(None)
            .last_login_at(Some(now))
            .expected_version(user.version)
    }
}

impl Default for LockoutTracker {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}
