pub mod utilities;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::policy::PolicyViolation;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Reset token error: {0}")]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identifier or wrong password. Both causes surface as this one variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Only produced for identifiers that resolve to a real user.
    #[error("Account locked")]
    AccountLocked { locked_until: Option<DateTime<Utc>> },

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("User not found")]
    UserNotFound,
}

/// Reset token redemption failures.
///
/// The variants stay distinct for operators; end users should be shown
/// [`Error::public_message`], which reads the same for all three.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token already used")]
    TokenAlreadyUsed,

    #[error("Token expired")]
    TokenExpired,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Weak password: {}", describe_violations(.0))]
    WeakPassword(Vec<PolicyViolation>),

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// An update carried an `expected_version` that no longer matches.
    #[error("Concurrent modification of {0}")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Random source unavailable: {0}")]
    RandomSource(String),
}

fn describe_violations(violations: &[PolicyViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_token_error(&self) -> bool {
        matches!(self, Error::Token(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }

    /// The violated password rules, if this is a weak password failure.
    pub fn policy_violations(&self) -> Option<&[PolicyViolation]> {
        match self {
            Error::Validation(ValidationError::WeakPassword(violations)) => Some(violations),
            _ => None,
        }
    }

    /// Message that is safe to show to an end user.
    ///
    /// Credential failures never say which half was wrong, token failures all
    /// read the same, and infrastructure failures carry no detail.
    pub fn public_message(&self) -> String {
        match self {
            Error::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Error::Auth(AuthError::AccountLocked { .. }) => {
                "Account is temporarily locked, try again later or contact an administrator"
                    .to_string()
            }
            Error::Auth(AuthError::AccountDisabled) => {
                "Account is disabled, contact an administrator".to_string()
            }
            Error::Auth(AuthError::NotAuthorized) => "Not authorized".to_string(),
            Error::Auth(AuthError::UserNotFound) => "User not found".to_string(),
            Error::Token(_) => "Invalid or expired token".to_string(),
            Error::Validation(e) => e.to_string(),
            Error::Storage(_) | Error::Crypto(_) => "Internal error".to_string(),
        }
    }
}
