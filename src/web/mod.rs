//! Web API module for clipshelf.
//!
//! A JSON API over the audio library: list categories and files, upload,
//! play or download, and delete. Requests are bound to a cookie session.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
