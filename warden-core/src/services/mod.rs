//! Service layer
//!
//! Each service is generic over the repository traits it needs and holds them
//! behind an `Arc`, so one storage provider can back every service.

pub mod authenticator;
pub mod lockout;
pub mod password_reset;
pub mod session;
pub mod user;

#[cfg(test)]
pub(crate) mod mocks;

pub use authenticator::{Authenticator, LoginResult};
pub use lockout::{FailureTransition, LockoutTracker};
pub use password_reset::PasswordResetService;
pub use session::SessionService;
pub use user::UserService;
