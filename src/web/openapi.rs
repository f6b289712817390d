//! OpenAPI document for the clipshelf web API.

use utoipa::OpenApi;

use super::dto;
use super::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login,
        handlers::logout,
        handlers::session_status,
        handlers::list_categories,
        handlers::list_files,
        handlers::upload_to_category,
        handlers::upload_file,
        handlers::download_file,
        handlers::delete_file,
        handlers::session_uploads,
    ),
    components(
        schemas(
            dto::LoginRequest,
            dto::SessionResponse,
            dto::CategoryResponse,
            dto::AudioFileResponse,
            dto::DeleteResponse,
            dto::UploadEntry,
        )
    ),
    tags(
        (name = "library", description = "Audio categories and files"),
        (name = "session", description = "Per-session upload record"),
        (name = "auth", description = "Optional login gate")
    )
)]
pub struct ApiDoc;
