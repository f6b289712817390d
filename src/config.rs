//! Configuration module for clipshelf.

use serde::Deserialize;
use std::path::Path;

use crate::{ClipError, Result};

/// Configuration file read when none is named on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for a single repository operation, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: vec![],
        }
    }
}

/// Audio storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage root; every category is a directory directly below it.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// File extensions accepted on upload (case-insensitive, without dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Only allow deleting files uploaded during the caller's session.
    #[serde(default = "default_restrict_delete")]
    pub restrict_delete_to_session: bool,
    /// Cache audio metadata keyed by file size and modification time.
    #[serde(default = "default_metadata_cache")]
    pub metadata_cache: bool,
}

fn default_storage_root() -> String {
    "audio_files".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["mp3".to_string()]
}

fn default_restrict_delete() -> bool {
    true
}

fn default_metadata_cache() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_size_mb: default_max_upload_size(),
            allowed_extensions: default_allowed_extensions(),
            restrict_delete_to_session: default_restrict_delete(),
            metadata_cache: default_metadata_cache(),
        }
    }
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Browser session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are discarded.
    #[serde(default = "default_session_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// How often expired sessions are purged.
    #[serde(default = "default_session_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_session_idle_timeout() -> u64 {
    3600 // 1 hour
}

fn default_session_cleanup_interval() -> u64 {
    300 // 5 minutes
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_session_idle_timeout(),
            cleanup_interval_secs: default_session_cleanup_interval(),
        }
    }
}

/// Login gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Whether a login is required before the API is reachable.
    #[serde(default)]
    pub enabled: bool,
    /// Account name accepted by the login gate.
    #[serde(default = "default_auth_username")]
    pub username: String,
    /// Argon2id PHC hash of the account password.
    ///
    /// Generate one with `clipshelf hash-password`.
    #[serde(default)]
    pub password_hash: String,
}

fn default_auth_username() -> String {
    "admin".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            username: default_auth_username(),
            password_hash: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/clipshelf.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Audio storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Login gate configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ClipError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file that may be absent.
    ///
    /// Returns `Ok(None)` only when the file does not exist; unreadable or
    /// malformed files are errors.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        match Self::load(path) {
            Ok(config) => Ok(Some(config)),
            Err(ClipError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ClipError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CLIPSHELF_AUTH_PASSWORD_HASH`: Override the login password hash
    /// - `CLIPSHELF_STORAGE_ROOT`: Override the storage root
    pub fn apply_env_overrides(&mut self) {
        if let Ok(hash) = std::env::var("CLIPSHELF_AUTH_PASSWORD_HASH") {
            if !hash.is_empty() {
                self.auth.password_hash = hash;
            }
        }
        if let Ok(root) = std::env::var("CLIPSHELF_STORAGE_ROOT") {
            if !root.is_empty() {
                self.storage.root = root;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The login gate is enabled but no password hash is set
    /// - The storage root is empty
    /// - No upload extension is allowed
    pub fn validate(&self) -> Result<()> {
        if self.auth.enabled && self.auth.password_hash.is_empty() {
            return Err(ClipError::Config(
                "auth is enabled but password_hash is not set. \
                 Set it in config.toml or via CLIPSHELF_AUTH_PASSWORD_HASH."
                    .to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ClipError::Config(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.session.cleanup_interval_secs == 0 {
            return Err(ClipError::Config(
                "session.cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.storage.root.trim().is_empty() {
            return Err(ClipError::Config("storage.root must not be empty".to_string()));
        }
        if self.storage.allowed_extensions.is_empty() {
            return Err(ClipError::Config(
                "storage.allowed_extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }
}
