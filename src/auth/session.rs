//! Browser session tracking for clipshelf.
//!
//! A session is identified by an opaque id carried in a cookie. Each session
//! remembers whether it passed the login gate and which files it uploaded;
//! the upload record decides whether the UI offers a delete action.
//! Sessions live in memory only and expire after an idle timeout.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Default idle timeout (1 hour).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60 * 60;

/// Opaque session identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse an id received from a client.
    ///
    /// Returns `None` unless `raw` is a well-formed UUID.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(|u| Self(u.to_string()))
    }

    /// Get the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one session.
#[derive(Debug, Clone)]
struct SessionRecord {
    created_at: DateTime<Utc>,
    username: Option<String>,
    /// Paths uploaded during this session, in upload order.
    uploads: Vec<PathBuf>,
    last_activity: Instant,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            username: None,
            uploads: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    fn is_idle(&self, idle_timeout: Duration) -> bool {
        self.last_activity.elapsed() >= idle_timeout
    }
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session id.
    pub id: SessionId,
    /// When the session was started.
    pub created_at: DateTime<Utc>,
    /// Logged-in account, if the session passed the login gate.
    pub username: Option<String>,
    /// Number of files uploaded in this session that still exist.
    pub upload_count: usize,
}

/// In-memory table of sessions keyed by id.
#[derive(Debug)]
pub struct SessionTracker {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    idle_timeout: Duration,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::with_idle_timeout(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS))
    }
}

impl SessionTracker {
    /// Create a tracker whose sessions expire after `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a new, anonymous session.
    pub fn start(&self) -> SessionId {
        let id = SessionId::generate();
        self.lock().insert(id.clone(), SessionRecord::new());
        debug!(session = %id, "Session started");
        id
    }

    /// Mark activity on a session.
    ///
    /// Returns `false` if the session is unknown or has expired (an expired
    /// session is discarded).
    pub fn resume(&self, id: &SessionId) -> bool {
        let mut sessions = self.lock();
        match sessions.get_mut(id) {
            Some(record) if !record.is_idle(self.idle_timeout) => {
                record.last_activity = Instant::now();
                true
            }
            Some(_) => {
                sessions.remove(id);
                debug!(session = %id, "Session expired");
                false
            }
            None => false,
        }
    }

    /// End a session, discarding its upload record.
    pub fn end(&self, id: &SessionId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            info!(session = %id, "Session ended");
        }
        removed
    }

    /// Record that the session passed the login gate as `username`.
    pub fn mark_authenticated(&self, id: &SessionId, username: &str) -> bool {
        match self.lock().get_mut(id) {
            Some(record) => {
                record.username = Some(username.to_string());
                record.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Whether the session passed the login gate.
    pub fn is_authenticated(&self, id: &SessionId) -> bool {
        self.lock()
            .get(id)
            .is_some_and(|record| record.username.is_some())
    }

    /// Record an upload. Uploading the same path twice keeps one entry.
    pub fn record_upload(&self, id: &SessionId, path: &Path) {
        match self.lock().get_mut(id) {
            Some(record) => {
                if !record.uploads.iter().any(|p| p == path) {
                    record.uploads.push(path.to_path_buf());
                }
            }
            None => debug!(session = %id, "Upload recorded for unknown session"),
        }
    }

    /// Forget `path` in every session; the file no longer exists.
    pub fn forget_upload(&self, path: &Path) {
        for record in self.lock().values_mut() {
            record.uploads.retain(|p| p != path);
        }
    }

    /// Whether `path` was uploaded during the session.
    pub fn has_uploaded(&self, id: &SessionId, path: &Path) -> bool {
        self.lock()
            .get(id)
            .is_some_and(|record| record.uploads.iter().any(|p| p == path))
    }

    /// Paths uploaded during the session, in upload order.
    pub fn uploads(&self, id: &SessionId) -> Vec<PathBuf> {
        self.lock()
            .get(id)
            .map(|record| record.uploads.clone())
            .unwrap_or_default()
    }

    /// Describe a session.
    pub fn info(&self, id: &SessionId) -> Option<SessionInfo> {
        self.lock().get(id).map(|record| SessionInfo {
            id: id.clone(),
            created_at: record.created_at,
            username: record.username.clone(),
            upload_count: record.uploads.len(),
        })
    }

    /// Discard all sessions idle for longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_idle(self.idle_timeout));
        before - sessions.len()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionRecord>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
