//! Response DTOs for Web API.

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::SessionInfo;
use crate::library::{format_duration, AudioFile};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Format a filesystem timestamp as RFC 3339 (UTC, seconds precision).
pub fn to_rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Category response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    /// Category name (directory name).
    pub name: String,
}

/// Audio file response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AudioFileResponse {
    /// File name.
    pub name: String,
    /// Category the file belongs to.
    pub category: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Size in megabytes, rounded to two decimals.
    pub size_mb: f64,
    /// Duration in seconds; 0 when it could not be read.
    pub duration_seconds: f64,
    /// Duration as `MM:SS`.
    pub duration: String,
    /// Whether the duration was read from the file.
    pub duration_known: bool,
    /// Last modification time (RFC 3339).
    pub modified_at: Option<String>,
    /// Whether the current session may delete this file.
    pub can_delete: bool,
    /// URL for playback or download.
    pub url: String,
}

impl AudioFileResponse {
    /// Build a response for `file`.
    pub fn from_file(file: &AudioFile, can_delete: bool) -> Self {
        Self {
            name: file.name.clone(),
            category: file.category.clone(),
            size_bytes: file.size_bytes,
            size_mb: (file.size_mb() * 100.0).round() / 100.0,
            duration_seconds: file.duration_seconds.unwrap_or(0.0),
            duration: file
                .duration_display()
                .unwrap_or_else(|| format_duration(0.0)),
            duration_known: file.duration_seconds.is_some(),
            modified_at: file.modified.map(to_rfc3339),
            can_delete,
            url: file_url(&file.category, &file.name),
        }
    }
}

/// API path of a stored file.
pub fn file_url(category: &str, name: &str) -> String {
    format!(
        "/api/categories/{}/files/{}",
        urlencoding::encode(category),
        urlencoding::encode(name)
    )
}

/// Delete response.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    /// Category of the deleted file.
    pub category: String,
    /// Name of the deleted file.
    pub name: String,
    /// Whether a file was removed (`false` if it did not exist).
    pub deleted: bool,
}

/// A file uploaded during the current session.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadEntry {
    /// Category.
    pub category: String,
    /// File name.
    pub name: String,
    /// URL for playback or download.
    pub url: String,
}

/// Session status response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Whether the API requires a login.
    pub auth_required: bool,
    /// Whether this session passed the login gate.
    pub authenticated: bool,
    /// Logged-in account.
    pub username: Option<String>,
    /// Session start time (RFC 3339).
    pub started_at: Option<String>,
    /// Number of files uploaded during this session.
    pub upload_count: usize,
}

impl SessionResponse {
    /// Build a response from session info.
    pub fn from_info(info: Option<SessionInfo>, auth_required: bool) -> Self {
        match info {
            Some(info) => Self {
                auth_required,
                authenticated: info.username.is_some(),
                username: info.username,
                started_at: Some(info.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
                upload_count: info.upload_count,
            },
            None => Self {
                auth_required,
                authenticated: false,
                username: None,
                started_at: None,
                upload_count: 0,
            },
        }
    }
}
