//! Login gate for clipshelf.
//!
//! The gate is a yes/no check in front of the API. Credentials come from a
//! credential store (the configured Argon2 hash), never from literals.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::{ClipError, Result};

use super::password::{verify_password, PasswordError};

/// Maximum failed logins per username within `LOCKOUT_WINDOW_SECS`.
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Window for counting failed logins, and lockout duration.
pub const LOCKOUT_WINDOW_SECS: u64 = 5 * 60;

/// Binary allow/deny credential check.
pub trait Authenticator: Send + Sync {
    /// Return `true` if `username`/`password` are valid.
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Single-account credential store backed by an Argon2 PHC hash.
#[derive(Debug, Clone)]
pub struct HashedCredentials {
    username: String,
    password_hash: String,
}

impl HashedCredentials {
    /// Create a credential store for one account.
    ///
    /// Fails if `password_hash` is not a valid PHC string.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Result<Self> {
        let password_hash = password_hash.into();
        argon2::password_hash::PasswordHash::new(&password_hash).map_err(|e| {
            ClipError::Config(format!("auth.password_hash is not a valid PHC string: {e}"))
        })?;

        Ok(Self {
            username: username.into(),
            password_hash,
        })
    }

    /// Build the credential store from configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        Self::new(&config.username, &config.password_hash)
    }
}

impl Authenticator for HashedCredentials {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        // Verify even on a username mismatch so timing does not reveal it.
        let password_ok = match verify_password(password, &self.password_hash) {
            Ok(()) => true,
            Err(PasswordError::VerificationFailed) => false,
            Err(e) => {
                warn!(error = %e, "Stored password hash unusable");
                false
            }
        };
        let username_ok: bool = username
            .as_bytes()
            .ct_eq(self.username.as_bytes())
            .into();
        password_ok && username_ok
    }
}

/// Result of a login attempt rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitResult {
    /// Login attempt is allowed.
    Allowed,
    /// Further attempts are refused for the given duration.
    Locked(Duration),
}

/// Failed-login limiter keyed by username.
#[derive(Debug)]
pub struct LoginLimiter {
    attempts: HashMap<String, Vec<Instant>>,
    max_attempts: u32,
    window: Duration,
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new(MAX_LOGIN_ATTEMPTS, Duration::from_secs(LOCKOUT_WINDOW_SECS))
    }
}

impl LoginLimiter {
    /// Create a limiter allowing `max_attempts` failures per `window`.
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts,
            window,
        }
    }

    /// Check whether a login attempt for `username` is allowed.
    pub fn check(&mut self, username: &str) -> LimitResult {
        let now = Instant::now();
        let window = self.window;
        let Some(attempts) = self.attempts.get_mut(&username.to_lowercase()) else {
            return LimitResult::Allowed;
        };
        attempts.retain(|t| now.duration_since(*t) < window);

        if attempts.len() >= self.max_attempts as usize {
            if let Some(oldest) = attempts.first() {
                let remaining = window.saturating_sub(now.duration_since(*oldest));
                return LimitResult::Locked(remaining);
            }
        }
        LimitResult::Allowed
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self, username: &str) {
        let attempts = self.attempts.entry(username.to_lowercase()).or_default();
        attempts.push(Instant::now());
        debug!(username, attempt_count = attempts.len(), "Recorded failed login");
    }

    /// Clear failures after a successful login.
    pub fn clear(&mut self, username: &str) {
        self.attempts.remove(&username.to_lowercase());
    }

    /// Drop usernames whose failures have all expired.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let before = self.attempts.len();
        self.attempts.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < window);
            !attempts.is_empty()
        });
        before - self.attempts.len()
    }

    /// Number of usernames with tracked failures.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;

    fn credentials() -> HashedCredentials {
        let hash = hash_password("turntable-42").unwrap();
        HashedCredentials::new("admin", hash).unwrap()
    }

    #[test]
    fn test_authenticate() {
        let creds = credentials();

        assert!(creds.authenticate("admin", "turntable-42"));
        assert!(!creds.authenticate("admin", "turntable-43"));
        assert!(!creds.authenticate("root", "turntable-42"));
        assert!(!creds.authenticate("", ""));
    }

    #[test]
    fn test_rejects_plaintext_hash() {
        let result = HashedCredentials::new("admin", "password");
        assert!(matches!(result, Err(ClipError::Config(_))));
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig {
            enabled: true,
            username: "dj".to_string(),
            password_hash: hash_password("turntable-42").unwrap(),
        };

        let creds = HashedCredentials::from_config(&config).unwrap();
        assert!(creds.authenticate("dj", "turntable-42"));
    }

    #[test]
    fn test_limiter_locks_after_max_attempts() {
        let mut limiter = LoginLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert_eq!(limiter.check("Admin"), LimitResult::Allowed);
            limiter.record_failure("Admin");
        }

        assert!(matches!(limiter.check("admin"), LimitResult::Locked(_)));
        assert_eq!(limiter.check("other"), LimitResult::Allowed);

        limiter.clear("ADMIN");
        assert_eq!(limiter.check("admin"), LimitResult::Allowed);
    }

    #[test]
    fn test_limiter_check_does_not_track_unknown_names() {
        let mut limiter = LoginLimiter::default();
        for i in 0..100 {
            assert_eq!(limiter.check(&format!("user{i}")), LimitResult::Allowed);
        }
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_limiter_cleanup_drops_expired_names() {
        let mut limiter = LoginLimiter::new(5, Duration::from_millis(1));
        for i in 0..1000 {
            limiter.record_failure(&format!("user{i}"));
        }
        assert_eq!(limiter.len(), 1000);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.cleanup(), 1000);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_limiter_cleanup_keeps_recent_failures() {
        let mut limiter = LoginLimiter::new(5, Duration::from_secs(60));
        limiter.record_failure("admin");
        assert_eq!(limiter.cleanup(), 0);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_authenticate_username_prefix() {
        let creds = credentials();
        assert!(!creds.authenticate("admi", "turntable-42"));
        assert!(!creds.authenticate("admin ", "turntable-42"));
    }

    #[test]
    fn test_limiter_window_expires() {
        let mut limiter = LoginLimiter::new(1, Duration::ZERO);
        limiter.record_failure("admin");
        assert_eq!(limiter.check("admin"), LimitResult::Allowed);
    }
}
