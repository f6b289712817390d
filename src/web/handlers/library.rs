//! Audio library handlers for Web API.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::path::Path as FsPath;
use std::sync::Arc;

use crate::auth::SessionId;
use crate::library::has_allowed_extension;
use crate::web::dto::{
    file_url, ApiResponse, AudioFileResponse, CategoryResponse, DeleteResponse, DownloadQuery,
    UploadEntry,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentSession;

/// Generate a safe Content-Disposition header value.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename`; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition_header(disposition: &str, filename: &str) -> String {
    let plain = filename.is_ascii()
        && !filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');
    if plain {
        return format!("{}; filename=\"{}\"", disposition, filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition,
        sanitized,
        urlencoding::encode(filename)
    )
}

/// Fields of an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    category: Option<String>,
    filename: Option<String>,
    content: Option<Vec<u8>>,
}

fn multipart_error(e: MultipartError, max_upload_size: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max_upload_size);
    }
    tracing::debug!("Failed to read multipart data: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

fn too_large(max_upload_size: u64) -> ApiError {
    ApiError::bad_request(format!(
        "File too large (max {}MB)",
        max_upload_size / 1024 / 1024
    ))
}

async fn read_upload_form(
    multipart: &mut Multipart,
    max_upload_size: u64,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_upload_size))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                form.filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_upload_size))?;
                form.content = Some(bytes.to_vec());
            }
            "category" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_upload_size))?;
                form.category = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Check and store an upload, recording it for `session`.
async fn store_upload(
    state: &AppState,
    session: SessionId,
    category: String,
    filename: Option<String>,
    content: Option<Vec<u8>>,
) -> Result<AudioFileResponse, ApiError> {
    let filename = filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let content = content.ok_or_else(|| ApiError::bad_request("No file content"))?;

    if !has_allowed_extension(&filename, &state.allowed_extensions) {
        return Err(ApiError::unprocessable(format!(
            "Unsupported file type; accepted: {}",
            state.allowed_extensions.join(", ")
        )));
    }

    if content.len() as u64 > state.max_upload_size {
        return Err(too_large(state.max_upload_size));
    }

    let file = state
        .run_blocking("save_file", move |repo| {
            repo.save_file(&session, &category, &filename, &content)
        })
        .await?;

    Ok(AudioFileResponse::from_file(&file, true))
}

/// GET /api/categories - List all categories.
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "library",
    responses(
        (status = 200, description = "Category names, sorted", body = Vec<CategoryResponse>),
        (status = 401, description = "Login required"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ApiError> {
    let names = state
        .run_blocking("list_categories", |repo| repo.list_categories())
        .await?;

    let responses = names
        .into_iter()
        .map(|name| CategoryResponse { name })
        .collect();

    Ok(Json(ApiResponse::new(responses)))
}

/// GET /api/categories/:category/files - List files in a category.
#[utoipa::path(
    get,
    path = "/api/categories/{category}/files",
    tag = "library",
    params(
        ("category" = String, Path, description = "Category name")
    ),
    responses(
        (status = 200, description = "Files in the category, sorted by name", body = Vec<AudioFileResponse>),
        (status = 401, description = "Login required"),
        (status = 422, description = "Invalid category name")
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(category): Path<String>,
) -> Result<Json<ApiResponse<Vec<AudioFileResponse>>>, ApiError> {
    let files = state
        .run_blocking("list_files", move |repo| repo.list_files(&category))
        .await?;

    let responses = files
        .iter()
        .map(|file| {
            let can_delete = !state.restrict_delete_to_session
                || state.sessions.has_uploaded(&session, &file.path);
            AudioFileResponse::from_file(file, can_delete)
        })
        .collect();

    Ok(Json(ApiResponse::new(responses)))
}

/// POST /api/categories/:category/files - Upload a file into a category.
///
/// Request body: multipart/form-data with a "file" field. The category is
/// created if it does not exist; a file with the same name is replaced.
#[utoipa::path(
    post,
    path = "/api/categories/{category}/files",
    tag = "library",
    params(
        ("category" = String, Path, description = "Category name")
    ),
    responses(
        (status = 200, description = "File stored", body = AudioFileResponse),
        (status = 400, description = "Missing file or file too large"),
        (status = 401, description = "Login required"),
        (status = 422, description = "Invalid name or unsupported file type")
    )
)]
pub async fn upload_to_category(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<AudioFileResponse>>, ApiError> {
    let form = read_upload_form(&mut multipart, state.max_upload_size).await?;
    let response = store_upload(&state, session, category, form.filename, form.content).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/files - Upload a file, naming the category in the form.
///
/// Request body: multipart/form-data with "category" and "file" fields.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "library",
    responses(
        (status = 200, description = "File stored", body = AudioFileResponse),
        (status = 400, description = "Missing field or file too large"),
        (status = 401, description = "Login required"),
        (status = 422, description = "Invalid name or unsupported file type")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<AudioFileResponse>>, ApiError> {
    let form = read_upload_form(&mut multipart, state.max_upload_size).await?;
    let category = form
        .category
        .ok_or_else(|| ApiError::bad_request("No category provided"))?;
    let response = store_upload(&state, session, category, form.filename, form.content).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// GET /api/categories/:category/files/:name - Play or download a file.
///
/// Served inline for playback; `?download=true` makes it an attachment.
#[utoipa::path(
    get,
    path = "/api/categories/{category}/files/{name}",
    tag = "library",
    params(
        ("category" = String, Path, description = "Category name"),
        ("name" = String, Path, description = "File name"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File content", content_type = "audio/mpeg"),
        (status = 401, description = "Login required"),
        (status = 404, description = "File not found"),
        (status = 422, description = "Invalid name")
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((category, name)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response<Body>, ApiError> {
    let content = {
        let (category, name) = (category.clone(), name.clone());
        state
            .run_blocking("download_file", move |repo| {
                repo.download_bytes(&category, &name)
            })
            .await?
    };

    let content_type = mime_guess::from_path(&name)
        .first_or_octet_stream()
        .to_string();
    let disposition = if query.download { "attachment" } else { "inline" };

    tracing::debug!(%category, %name, size = content.len(), "Serving audio file");

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(disposition, &name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/categories/:category/files/:name - Delete a file.
///
/// Deleting a file that does not exist succeeds with `deleted: false`. When
/// deletes are restricted, only the session that uploaded a file may
/// delete it.
#[utoipa::path(
    delete,
    path = "/api/categories/{category}/files/{name}",
    tag = "library",
    params(
        ("category" = String, Path, description = "Category name"),
        ("name" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "Delete outcome", body = DeleteResponse),
        (status = 401, description = "Login required"),
        (status = 403, description = "File was not uploaded in this session"),
        (status = 422, description = "Invalid name")
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path((category, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let restrict = state.restrict_delete_to_session;
    let outcome = {
        let (category, name) = (category.clone(), name.clone());
        state
            .run_blocking("delete_file", move |repo| {
                let path = repo.file_path(&category, &name)?;
                if restrict && path.is_file() && !repo.sessions().has_uploaded(&session, &path) {
                    return Ok(None);
                }
                repo.delete_file(&category, &name).map(Some)
            })
            .await?
    };

    let deleted = outcome.ok_or_else(|| {
        tracing::info!(%category, %name, "Refused delete of file from another session");
        ApiError::forbidden("Only files uploaded in this session can be deleted")
    })?;

    Ok(Json(ApiResponse::new(DeleteResponse {
        category,
        name,
        deleted,
    })))
}

/// GET /api/session/uploads - Files uploaded during this session.
#[utoipa::path(
    get,
    path = "/api/session/uploads",
    tag = "session",
    responses(
        (status = 200, description = "Uploads in upload order", body = Vec<UploadEntry>),
        (status = 401, description = "Login required")
    )
)]
pub async fn session_uploads(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> Json<ApiResponse<Vec<UploadEntry>>> {
    let root = state.repository.storage_root();
    let entries = state
        .sessions
        .uploads(&session)
        .iter()
        .filter_map(|path| upload_entry(root, path))
        .collect();

    Json(ApiResponse::new(entries))
}

fn upload_entry(root: &FsPath, path: &FsPath) -> Option<UploadEntry> {
    let relative = path.strip_prefix(root).ok()?;
    let name = relative.file_name()?.to_str()?.to_string();
    let category = relative.parent()?.to_str()?.to_string();
    Some(UploadEntry {
        url: file_url(&category, &name),
        category,
        name,
    })
}
