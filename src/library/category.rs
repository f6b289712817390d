//! Category store for clipshelf.
//!
//! A category is nothing more than a directory directly below the storage
//! root:
//! ```text
//! {root}/
//! ├── jazz/
//! │   └── clip.mp3
//! └── field-recordings/
//!     └── rain.mp3
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{ClipError, Result};

use super::name::validate_category_name;

/// Lists, creates and removes category directories below a storage root.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    /// Storage root directory.
    root: PathBuf,
}

impl CategoryStore {
    /// Create a new CategoryStore with the given root.
    ///
    /// The root directory will be created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            ClipError::StorageUnavailable(format!("{}: {e}", root.display()))
        })?;

        Ok(Self { root })
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the directory of a category, validating the name.
    pub fn category_path(&self, name: &str) -> Result<PathBuf> {
        validate_category_name(name)?;
        Ok(self.root.join(name))
    }

    /// List the names of all categories, sorted.
    ///
    /// Hidden directories are skipped.
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let unavailable =
            |e: io::Error| ClipError::StorageUnavailable(format!("{}: {e}", self.root.display()));

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(unavailable)? {
            let entry = entry.map_err(unavailable)?;
            let is_dir = match entry.file_type() {
                Ok(t) => t.is_dir(),
                // Removed between read_dir and file_type.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(unavailable(e)),
            };
            if !is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Create the category directory if it is absent.
    ///
    /// Returns `true` if the directory was created by this call.
    pub fn ensure_category(&self, name: &str) -> Result<bool> {
        let path = self.category_path(name)?;

        match fs::create_dir(&path) {
            Ok(()) => {
                info!(category = name, "Created category");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if path.is_dir() {
                    Ok(false)
                } else {
                    Err(ClipError::InvalidName(format!(
                        "category '{name}' collides with an existing file"
                    )))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ClipError::StorageUnavailable(
                format!("{}: {e}", self.root.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the category directory if it has no entries left.
    ///
    /// Returns `true` if the directory was removed. A missing or non-empty
    /// category is a silent no-op.
    pub fn remove_category_if_empty(&self, name: &str) -> Result<bool> {
        let path = self.category_path(name)?;

        if dir_has_entries(&path)? {
            debug!(category = name, "Category still has files");
            return Ok(false);
        }

        match fs::remove_dir(&path) {
            Ok(()) => {
                info!(category = name, "Removed empty category");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                // Something was written in between; the category stays.
                if dir_has_entries(&path)? {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }
}

/// Check whether a directory has at least one entry.
///
/// A missing directory counts as empty.
fn dir_has_entries(path: &Path) -> Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, CategoryStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = CategoryStore::new(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("audio_files");

        assert!(!root.exists());

        let store = CategoryStore::new(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[test]
    fn test_list_categories_empty() {
        let (_temp_dir, store) = setup_store();
        assert!(store.list_categories().unwrap().is_empty());
    }

    #[test]
    fn test_list_categories_sorted_dirs_only() {
        let (_temp_dir, store) = setup_store();

        store.ensure_category("rock").unwrap();
        store.ensure_category("ambient").unwrap();
        store.ensure_category("jazz").unwrap();
        fs::write(store.root().join("stray.mp3"), b"x").unwrap();
        fs::create_dir(store.root().join(".trash")).unwrap();

        assert_eq!(
            store.list_categories().unwrap(),
            vec!["ambient", "jazz", "rock"]
        );
    }

    #[test]
    fn test_list_categories_root_missing() {
        let (temp_dir, store) = setup_store();
        drop(temp_dir);

        let result = store.list_categories();
        assert!(matches!(result, Err(ClipError::StorageUnavailable(_))));
    }

    #[test]
    fn test_ensure_category_idempotent() {
        let (_temp_dir, store) = setup_store();

        assert!(store.ensure_category("jazz").unwrap());
        assert!(!store.ensure_category("jazz").unwrap());
        assert!(store.root().join("jazz").is_dir());
    }

    #[test]
    fn test_ensure_category_invalid_name() {
        let (_temp_dir, store) = setup_store();

        assert!(matches!(
            store.ensure_category(""),
            Err(ClipError::InvalidName(_))
        ));
        assert!(matches!(
            store.ensure_category(".."),
            Err(ClipError::InvalidName(_))
        ));
        assert!(matches!(
            store.ensure_category("a/b"),
            Err(ClipError::InvalidName(_))
        ));
    }

    #[test]
    fn test_ensure_category_collides_with_file() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.root().join("jazz"), b"not a dir").unwrap();

        assert!(matches!(
            store.ensure_category("jazz"),
            Err(ClipError::InvalidName(_))
        ));
    }

    #[test]
    fn test_remove_category_if_empty() {
        let (_temp_dir, store) = setup_store();
        store.ensure_category("jazz").unwrap();

        assert!(store.remove_category_if_empty("jazz").unwrap());
        assert!(!store.root().join("jazz").exists());
    }

    #[test]
    fn test_remove_category_keeps_non_empty() {
        let (_temp_dir, store) = setup_store();
        store.ensure_category("jazz").unwrap();
        fs::write(store.root().join("jazz").join("clip.mp3"), b"data").unwrap();

        assert!(!store.remove_category_if_empty("jazz").unwrap());
        assert!(store.root().join("jazz").is_dir());
    }

    #[test]
    fn test_remove_category_missing_is_noop() {
        let (_temp_dir, store) = setup_store();
        assert!(!store.remove_category_if_empty("nonexistent").unwrap());
    }
}
