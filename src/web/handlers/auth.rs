//! Login gate handlers for Web API.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;

use crate::auth::LimitResult;
use crate::web::dto::{ApiResponse, LoginRequest, SessionResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{CurrentSession, SESSION_COOKIE};

/// POST /api/auth/login - Pass the login gate for this session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session is authenticated", body = SessionResponse),
        (status = 400, description = "Login gate is disabled"),
        (status = 401, description = "Invalid username or password"),
        (status = 422, description = "Validation error"),
        (status = 429, description = "Too many failed attempts")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let authenticator = state
        .authenticator
        .clone()
        .ok_or_else(|| ApiError::bad_request("Login is not enabled"))?;

    let limit = state.limiter().check(&req.username);
    if let LimitResult::Locked(remaining) = limit {
        tracing::warn!(username = %req.username, "Login refused: too many failed attempts");
        return Err(ApiError::too_many_requests(format!(
            "Too many failed login attempts. Try again in {} seconds",
            remaining.as_secs().max(1)
        )));
    }

    // Argon2 verification is CPU-bound.
    let username = req.username.clone();
    let authenticated =
        tokio::task::spawn_blocking(move || authenticator.authenticate(&req.username, &req.password))
            .await
            .map_err(|e| {
                tracing::error!("Login task failed: {}", e);
                ApiError::internal("An internal error occurred")
            })?;

    if !authenticated {
        state.limiter().record_failure(&username);
        tracing::warn!(username = %username, "Login failed");
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    state.limiter().clear(&username);
    state.sessions.mark_authenticated(&session, &username);
    tracing::info!(username = %username, session = %session, "Login succeeded");

    Ok(Json(ApiResponse::new(SessionResponse::from_info(
        state.sessions.info(&session),
        true,
    ))))
}

/// POST /api/auth/logout - End this session.
///
/// The session's upload record is discarded; stored files are kept.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Session ended")
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    state.sessions.end(&session);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

/// GET /api/auth/session - Describe this session.
///
/// Open even when the login gate is enabled, so a client can find out
/// whether it has to log in.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Session status", body = SessionResponse)
    )
)]
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> Json<ApiResponse<SessionResponse>> {
    Json(ApiResponse::new(SessionResponse::from_info(
        state.sessions.info(&session),
        state.auth_required(),
    )))
}
