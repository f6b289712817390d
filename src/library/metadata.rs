//! Audio metadata reading for clipshelf.
//!
//! Size comes from the filesystem and is always available. Duration is read
//! from the audio container with lofty; an unreadable container degrades to
//! "no duration" instead of failing the whole listing.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::{debug, warn};

use crate::{ClipError, Result};

/// Metadata of one stored audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    /// Size in bytes.
    pub size_bytes: u64,
    /// Duration in seconds, `None` if the container could not be parsed.
    pub duration_seconds: Option<f64>,
    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone)]
struct CachedDuration {
    size_bytes: u64,
    modified: Option<SystemTime>,
    duration_seconds: Option<f64>,
}

/// Reads size and duration of audio files.
///
/// With the cache enabled, durations are remembered per path and reused as
/// long as size and modification time are unchanged.
#[derive(Debug, Default)]
pub struct MetadataReader {
    cache: Option<Mutex<HashMap<PathBuf, CachedDuration>>>,
}

impl MetadataReader {
    /// Create a reader that parses every file on every call.
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Create a reader with a size/mtime-keyed duration cache.
    pub fn with_cache() -> Self {
        Self {
            cache: Some(Mutex::new(HashMap::new())),
        }
    }

    /// Whether this reader caches durations.
    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Read size and duration of the file at `path`.
    ///
    /// Fails with `NotFound` if the file does not exist (for example when it
    /// was deleted while a listing was in progress).
    pub fn read_metadata(&self, path: &Path) -> Result<AudioMetadata> {
        let fs_meta = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ClipError::NotFound(format!("file '{}'", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        let size_bytes = fs_meta.len();
        let modified = fs_meta.modified().ok();

        if let Some(duration_seconds) = self.cached_duration(path, size_bytes, modified) {
            return Ok(AudioMetadata {
                size_bytes,
                duration_seconds,
                modified,
            });
        }

        let duration_seconds = match probe_duration(path) {
            Ok(secs) => Some(secs),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Audio duration unavailable");
                None
            }
        };

        if let Some(mut cache) = self.lock_cache() {
            cache.insert(
                path.to_path_buf(),
                CachedDuration {
                    size_bytes,
                    modified,
                    duration_seconds,
                },
            );
        }

        Ok(AudioMetadata {
            size_bytes,
            duration_seconds,
            modified,
        })
    }

    /// Drop any cached entry for `path`.
    pub fn forget(&self, path: &Path) {
        if let Some(mut cache) = self.lock_cache() {
            cache.remove(path);
        }
    }

    fn cached_duration(
        &self,
        path: &Path,
        size_bytes: u64,
        modified: Option<SystemTime>,
    ) -> Option<Option<f64>> {
        let cache = self.lock_cache()?;
        let entry = cache.get(path)?;
        // Without an mtime there is nothing reliable to key on.
        if modified.is_none() || entry.modified != modified || entry.size_bytes != size_bytes {
            return None;
        }
        debug!(path = %path.display(), "Metadata cache hit");
        Some(entry.duration_seconds)
    }

    fn lock_cache(&self) -> Option<MutexGuard<'_, HashMap<PathBuf, CachedDuration>>> {
        let cache = self.cache.as_ref()?;
        Some(cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

/// Parse the audio container at `path` and return its duration in seconds.
///
/// Fails with `MetadataUnavailable` when the container cannot be parsed.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let tagged = Probe::open(path)
        .map_err(|e| ClipError::MetadataUnavailable(format!("{}: {e}", path.display())))?
        .read()
        .map_err(|e| ClipError::MetadataUnavailable(format!("{}: {e}", path.display())))?;

    Ok(tagged.properties().duration().as_secs_f64())
}

/// Format a duration as `MM:SS`.
///
/// Fractional seconds are truncated. Negative or non-finite input renders as
/// `00:00`.
///
/// # Examples
///
/// ```
/// use clipshelf::library::format_duration;
///
/// assert_eq!(format_duration(0.0), "00:00");
/// assert_eq!(format_duration(75.9), "01:15");
/// assert_eq!(format_duration(3600.0), "60:00");
/// ```
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
