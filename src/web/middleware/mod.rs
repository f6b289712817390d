//! Middleware for Web API.

pub mod cors;
pub mod session;

pub use cors::create_cors_layer;
pub use session::{
    require_login, session_cookie, session_middleware, CurrentSession, SESSION_COOKIE,
};
