//! clipshelf - a small audio clip library served over HTTP.
//!
//! Audio files are grouped into categories, one directory per category
//! under a storage root. Duration and size are read from the files
//! themselves. A per-session record decides which files a visitor may
//! delete, and an optional login gate protects the whole API.

pub mod auth;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, verify_password, Authenticator, HashedCredentials, LimitResult, LoginLimiter,
    PasswordError, SessionId, SessionInfo, SessionTracker,
};
pub use config::Config;
pub use error::{ClipError, Result};
pub use library::{
    format_duration, AudioFile, AudioMetadata, CategoryStore, FileRepository, MetadataReader,
};
pub use web::WebServer;
