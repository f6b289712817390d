//! API handlers for the clipshelf web UI.

pub mod auth;
pub mod library;

pub use auth::*;
pub use library::*;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{error, warn};

use crate::auth::{Authenticator, HashedCredentials, LoginLimiter, SessionTracker};
use crate::config::Config;
use crate::library::{FileRepository, MetadataReader};
use crate::web::error::ApiError;
use crate::Result;

/// Default upload size limit (50 MB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// Default time budget for one storage operation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for all handlers.
pub struct AppState {
    /// Audio file repository.
    pub repository: Arc<FileRepository>,
    /// Session tracker (shared with the repository).
    pub sessions: Arc<SessionTracker>,
    /// Login gate; `None` leaves the API open.
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Failed-login limiter.
    pub login_limiter: Mutex<LoginLimiter>,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
    /// Accepted upload extensions (lowercase, without dot).
    pub allowed_extensions: Vec<String>,
    /// Only the uploading session may delete a file.
    pub restrict_delete_to_session: bool,
    /// Time budget for one storage operation.
    pub request_timeout: Duration,
}

impl AppState {
    /// Create state around a repository, with the login gate disabled.
    pub fn new(repository: Arc<FileRepository>) -> Self {
        let sessions = Arc::clone(repository.sessions());
        Self {
            repository,
            sessions,
            authenticator: None,
            login_limiter: Mutex::new(LoginLimiter::default()),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_extensions: vec!["mp3".to_string()],
            restrict_delete_to_session: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build the full state from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sessions = Arc::new(SessionTracker::with_idle_timeout(Duration::from_secs(
            config.session.idle_timeout_secs,
        )));
        let reader = if config.storage.metadata_cache {
            MetadataReader::with_cache()
        } else {
            MetadataReader::new()
        };
        let repository = FileRepository::new(&config.storage.root)?
            .with_sessions(sessions)
            .with_metadata_reader(reader);

        let mut state = Self::new(Arc::new(repository))
            .with_max_upload_size(config.storage.max_upload_bytes())
            .with_allowed_extensions(config.storage.allowed_extensions.clone())
            .with_restrict_delete_to_session(config.storage.restrict_delete_to_session)
            .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs));

        if config.auth.enabled {
            let credentials = HashedCredentials::from_config(&config.auth)?;
            state = state.with_authenticator(Arc::new(credentials));
        }

        Ok(state)
    }

    /// Enable the login gate.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Set the upload size limit.
    pub fn with_max_upload_size(mut self, size: u64) -> Self {
        self.max_upload_size = size;
        self
    }

    /// Set the accepted upload extensions.
    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    /// Set whether deletes are limited to the uploading session.
    pub fn with_restrict_delete_to_session(mut self, restrict: bool) -> Self {
        self.restrict_delete_to_session = restrict;
        self
    }

    /// Set the time budget for one storage operation.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replace the failed-login limiter.
    pub fn with_login_limiter(mut self, limiter: LoginLimiter) -> Self {
        self.login_limiter = Mutex::new(limiter);
        self
    }

    /// Whether the API requires a login.
    pub fn auth_required(&self) -> bool {
        self.authenticator.is_some()
    }

    /// Lock the login limiter.
    pub fn limiter(&self) -> MutexGuard<'_, LoginLimiter> {
        self.login_limiter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Expire idle sessions and forget lapsed login failures.
    ///
    /// Returns the number of sessions and usernames removed.
    pub fn purge_expired(&self) -> (usize, usize) {
        let sessions = self.sessions.purge_expired();
        let usernames = self.limiter().cleanup();
        (sessions, usernames)
    }

    /// Run a repository operation on a blocking thread within the request
    /// time budget.
    ///
    /// An operation that runs out of time is reported as 503; it keeps
    /// running in the background and still completes or fails atomically.
    pub async fn run_blocking<T, F>(
        &self,
        operation: &'static str,
        f: F,
    ) -> std::result::Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&FileRepository) -> Result<T> + Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        let task = tokio::task::spawn_blocking(move || f(&repository));

        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Storage task failed");
                Err(ApiError::internal("An internal error occurred"))
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.request_timeout.as_secs(),
                    "Storage operation timed out"
                );
                Err(ApiError::unavailable("Storage operation timed out"))
            }
        }
    }
}
