//! Audio library module for clipshelf.
//!
//! This module manages audio files on disk:
//! - Categories as directories below a storage root
//! - Files stored under their original name (same name overwrites)
//! - Size and duration metadata derived from the files themselves
//! - Per-category serialization of mutations

mod category;
mod metadata;
mod name;
mod repository;

pub use category::CategoryStore;
pub use metadata::{format_duration, probe_duration, AudioMetadata, MetadataReader};
pub use name::{has_allowed_extension, validate_category_name, validate_file_name};
pub use repository::{AudioFile, FileRepository};

/// Maximum length for category and file names (in characters).
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum encoded length for category and file names (in bytes).
///
/// Common filesystems cap a single path segment at 255 bytes.
pub const MAX_NAME_BYTES: usize = 255;
