//! Authentication and session module for clipshelf.
//!
//! This module provides the optional login gate, password hashing for its
//! credential, and the per-session upload record.

mod gate;
mod password;
mod session;

pub use gate::{
    Authenticator, HashedCredentials, LimitResult, LoginLimiter, LOCKOUT_WINDOW_SECS,
    MAX_LOGIN_ATTEMPTS,
};
pub use password::{
    hash_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
pub use session::{SessionId, SessionInfo, SessionTracker, DEFAULT_IDLE_TIMEOUT_SECS};
