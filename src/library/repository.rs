//! File repository for clipshelf.
//!
//! Save, list, download and delete audio files grouped by category. Every
//! mutation of a category runs inside that category's exclusion scope, so
//! an upload and the deletion of the category's last file cannot interleave.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{SessionId, SessionTracker};
use crate::{ClipError, Result};

use super::category::CategoryStore;
use super::metadata::{format_duration, MetadataReader};
use super::name::validate_file_name;

/// Prefix of temporary upload files inside a category directory.
const TEMP_PREFIX: &str = ".upload-";

/// Suffix of temporary upload files inside a category directory.
const TEMP_SUFFIX: &str = ".part";

/// A stored audio file with its derived metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    /// Original uploaded filename.
    pub name: String,
    /// Owning category.
    pub category: String,
    /// Location on disk, always `{root}/{category}/{name}`.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Duration in seconds, `None` if the audio could not be parsed.
    pub duration_seconds: Option<f64>,
    /// Last modification time.
    pub modified: Option<SystemTime>,
}

impl AudioFile {
    /// Duration rendered as `MM:SS`, if known.
    pub fn duration_display(&self) -> Option<String> {
        self.duration_seconds.map(format_duration)
    }

    /// Size in megabytes.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Keyed table of per-category mutexes.
///
/// Entries are created on demand and dropped again once nobody holds or
/// waits on them.
#[derive(Debug, Default)]
struct CategoryLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CategoryLocks {
    fn with_lock<T>(&self, category: &str, f: impl FnOnce() -> T) -> T {
        let lock = self
            .lock_table()
            .entry(category.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };

        let mut table = self.lock_table();
        // One reference in the table, one here: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            table.remove(category);
        }

        result
    }

    fn len(&self) -> usize {
        self.lock_table().len()
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Repository of audio files stored as `{root}/{category}/{name}`.
///
/// All methods block on filesystem I/O; async callers should run them on a
/// blocking thread.
#[derive(Debug)]
pub struct FileRepository {
    categories: CategoryStore,
    metadata: MetadataReader,
    sessions: Arc<SessionTracker>,
    locks: CategoryLocks,
}

impl FileRepository {
    /// Open a repository rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            categories: CategoryStore::new(root)?,
            metadata: MetadataReader::new(),
            sessions: Arc::new(SessionTracker::default()),
            locks: CategoryLocks::default(),
        })
    }

    /// Use the given session tracker for upload records.
    pub fn with_sessions(mut self, sessions: Arc<SessionTracker>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Use the given metadata reader.
    pub fn with_metadata_reader(mut self, reader: MetadataReader) -> Self {
        self.metadata = reader;
        self
    }

    /// Get the storage root.
    pub fn storage_root(&self) -> &Path {
        self.categories.root()
    }

    /// Get the session tracker that records uploads.
    pub fn sessions(&self) -> &Arc<SessionTracker> {
        &self.sessions
    }

    /// List all category names, sorted.
    pub fn list_categories(&self) -> Result<Vec<String>> {
        self.categories.list_categories()
    }

    /// Resolve the on-disk path of a file, validating both names.
    pub fn file_path(&self, category: &str, name: &str) -> Result<PathBuf> {
        let dir = self.categories.category_path(category)?;
        validate_file_name(name)?;
        Ok(dir.join(name))
    }

    /// Save `bytes` as `name` in `category`.
    ///
    /// The category is created if needed. An existing file with the same
    /// name is replaced. The content is written to a hidden temporary file
    /// and renamed into place, so the target is never partially written.
    /// The stored path is recorded as an upload of `session`.
    pub fn save_file(
        &self,
        session: &SessionId,
        category: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<AudioFile> {
        let path = self.file_path(category, name)?;
        let dir = self.categories.category_path(category)?;

        let file = self.locks.with_lock(category, || -> Result<AudioFile> {
            let created = self.categories.ensure_category(category)?;

            if let Err(e) = write_atomically(&dir, name, bytes) {
                warn!(category, name, error = %e, "Failed to write audio file");
                if created {
                    if let Err(cleanup) = self.categories.remove_category_if_empty(category) {
                        warn!(category, error = %cleanup, "Failed to remove new empty category");
                    }
                }
                return Err(e.into());
            }

            self.metadata.forget(&path);
            let file = self.describe(category, name, &path)?;
            self.sessions.record_upload(session, &path);
            Ok(file)
        })?;

        info!(category, name, size = file.size_bytes, "Saved audio file");

        Ok(file)
    }

    /// List the files of a category, sorted by name.
    ///
    /// A category that does not exist yields an empty list. Files that
    /// disappear while the listing runs are skipped.
    pub fn list_files(&self, category: &str) -> Result<Vec<AudioFile>> {
        let dir = self.categories.category_path(category)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Hidden entries include in-flight temporary uploads.
            if name.starts_with('.') {
                continue;
            }

            match entry.file_type() {
                Ok(t) if t.is_file() => {}
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }

            match self.describe(category, &name, &entry.path()) {
                Ok(file) => files.push(file),
                Err(ClipError::NotFound(_)) => {
                    debug!(category, name = %name, "File vanished during listing");
                }
                Err(e) => return Err(e),
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Delete a file and, if it was the last one, its category.
    ///
    /// Deleting a file that does not exist is a successful no-op. Returns
    /// `true` if a file was removed. The path is dropped from every
    /// session's upload record.
    pub fn delete_file(&self, category: &str, name: &str) -> Result<bool> {
        let path = self.file_path(category, name)?;

        let removed = self.locks.with_lock(category, || -> Result<bool> {
            let removed = match fs::remove_file(&path) {
                Ok(()) => true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => false,
                Err(e) => return Err(e.into()),
            };
            self.metadata.forget(&path);
            self.sessions.forget_upload(&path);
            self.categories.remove_category_if_empty(category)?;
            Ok(removed)
        })?;

        if removed {
            info!(category, name, "Deleted audio file");
        } else {
            debug!(category, name, "Delete of missing file ignored");
        }

        Ok(removed)
    }

    /// Read the full content of a file.
    pub fn download_bytes(&self, category: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.file_path(category, name)?;

        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ClipError::NotFound(format!("file '{category}/{name}'")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove temporary upload files left behind by interrupted writes.
    ///
    /// Categories that end up empty are removed. Returns the number of
    /// temporary files deleted.
    pub fn purge_stale_temp_files(&self) -> Result<usize> {
        let mut purged = 0;

        for category in self.categories.list_categories()? {
            let dir = self.categories.category_path(&category)?;
            purged += self.locks.with_lock(&category, || -> Result<usize> {
                let mut count = 0;
                for entry in fs::read_dir(&dir)?.flatten() {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else {
                        continue;
                    };
                    if is_temp_name(name) && fs::remove_file(entry.path()).is_ok() {
                        count += 1;
                    }
                }
                if count > 0 {
                    self.categories.remove_category_if_empty(&category)?;
                }
                Ok(count)
            })?;
        }

        if purged > 0 {
            info!(purged, "Removed stale temporary uploads");
        }
        Ok(purged)
    }

    fn describe(&self, category: &str, name: &str, path: &Path) -> Result<AudioFile> {
        let meta = self.metadata.read_metadata(path)?;
        Ok(AudioFile {
            name: name.to_string(),
            category: category.to_string(),
            path: path.to_path_buf(),
            size_bytes: meta.size_bytes,
            duration_seconds: meta.duration_seconds,
            modified: meta.modified,
        })
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Write `bytes` to `{dir}/{name}` via a temporary file and a rename.
fn write_atomically(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<()> {
    let temp_path = dir.join(format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", Uuid::new_v4()));

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, dir.join(name))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
