//! Error types for clipshelf.

use thiserror::Error;

/// Common error type for clipshelf.
#[derive(Error, Debug)]
pub enum ClipError {
    /// A category or file name is empty or is not a single safe path segment.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The storage root cannot be read.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// I/O error (write, delete, rename).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Audio duration could not be read.
    ///
    /// This is a soft condition: listings recover from it locally and still
    /// report the file size.
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// Validation error for user input other than names.
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for clipshelf operations.
pub type Result<T> = std::result::Result<T, ClipError>;
