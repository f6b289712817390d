//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    delete_file, download_file, list_categories, list_files, login, logout, session_status,
    session_uploads, upload_file, upload_to_category, AppState,
};
use super::middleware::{create_cors_layer, require_login, session_middleware};
use super::openapi::ApiDoc;

/// Room for multipart framing and the category field on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    // Reachable without passing the login gate
    let auth_routes = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_status));

    let library_routes = Router::new()
        .route("/categories", get(list_categories))
        .route(
            "/categories/:category/files",
            get(list_files).post(upload_to_category),
        )
        .route(
            "/categories/:category/files/:name",
            get(download_file).delete(delete_file),
        )
        .route("/files", post(upload_file))
        .route("/session/uploads", get(session_uploads))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_login,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(library_routes);

    let body_limit = usize::try_from(app_state.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            session_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
