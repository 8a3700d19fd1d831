//! Core functionality for the warden project
//!
//! This crate holds the credential and session lifecycle: login with
//! progressive lockout, session issuance, and administrator-issued,
//! single-use password reset tokens.
//!
//! It knows nothing about databases or transport. Storage backends implement
//! the traits in [`repositories`], and applications normally reach these
//! services through the `warden` facade crate.
//!
//! See [`User`], [`Session`] and [`PasswordResetToken`] for the records, and
//! [`services`] for the operations.
pub mod config;
pub mod crypto;
pub mod error;
pub mod hasher;
pub mod id;
pub mod policy;
pub mod repositories;
pub mod reset_token;
pub mod services;
pub mod session;
pub mod user;
pub mod validation;

pub use config::AuthConfig;
pub use error::Error;
pub use hasher::{Argon2PasswordHasher, PasswordHasher};
pub use policy::{PasswordPolicy, PolicyViolation};
pub use reset_token::{IssuedResetToken, PasswordResetToken, ResetTokenId};
pub use services::{
    Authenticator, LockoutTracker, LoginResult, PasswordResetService, SessionService, UserService,
};
pub use session::{Session, SessionId};
pub use user::{NewUser, Role, User, UserId, UserStatus, UserUpdate};
