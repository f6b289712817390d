//! Cookie-based session middleware.
//!
//! Every API request is bound to a session. The id travels in an HttpOnly
//! cookie; a request without a live session gets a fresh one.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::SessionId;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "clipshelf_session";

/// Session bound to the current request.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Session middleware not configured"))
    }
}

/// Build the session cookie for `id`.
pub fn session_cookie(id: &SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Resume the session named by the cookie, or start a new one.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let resumed = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| SessionId::parse(cookie.value()))
        .filter(|id| state.sessions.resume(id));

    let (id, is_new) = match resumed {
        Some(id) => (id, false),
        None => (state.sessions.start(), true),
    };

    request.extensions_mut().insert(CurrentSession(id.clone()));
    let response = next.run(request).await;

    if is_new {
        (jar.add(session_cookie(&id)), response).into_response()
    } else {
        response
    }
}

/// Reject requests from sessions that have not passed the login gate.
///
/// A no-op while the gate is disabled.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    request: Request,
    next: Next,
) -> Response {
    if state.auth_required() && !state.sessions.is_authenticated(&session) {
        tracing::debug!(session = %session, "Rejected unauthenticated request");
        return ApiError::unauthorized("Login required").into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let id = SessionId::generate();
        let cookie = session_cookie(&id);

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), id.as_str());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
