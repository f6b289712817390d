//! Test helpers for web API tests.
//!
//! A `TestApp` owns a temporary storage root and the shared application
//! state. Each `client()` is a separate browser: its own cookie jar and
//! therefore its own session, against the same library.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;

use clipshelf::web::create_router;
use clipshelf::web::AppState;
use clipshelf::FileRepository;

/// Password used by tests that enable the login gate.
pub const TEST_PASSWORD: &str = "turntable-42";

/// MPEG-1 Layer III frames (128 kbps, 44.1 kHz, 417 bytes and 1152 samples
/// per frame). 383 frames play for about ten seconds.
pub fn mp3_frames(count: usize) -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    frame.repeat(count)
}

/// Application under test.
pub struct TestApp {
    temp_dir: TempDir,
    pub state: Arc<AppState>,
}

impl TestApp {
    /// Create an app with default settings.
    pub fn new() -> Self {
        Self::with(|state| state)
    }

    /// Create an app, adjusting the state before it is shared.
    pub fn with(configure: impl FnOnce(AppState) -> AppState) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repository = FileRepository::new(temp_dir.path().join("audio_files"))
            .expect("Failed to open repository");
        let state = configure(AppState::new(Arc::new(repository)));

        Self {
            temp_dir,
            state: Arc::new(state),
        }
    }

    /// A new browser with its own session cookie.
    pub fn client(&self) -> TestServer {
        let router = create_router(self.state.clone(), &[]);
        TestServer::builder()
            .save_cookies()
            .build(router)
            .expect("Failed to create test server")
    }

    /// Storage root on disk.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("audio_files")
    }

    /// Parent of the storage root (outside the library).
    pub fn outside(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Multipart form with only a file part.
pub fn file_form(name: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("file", file_part(name, bytes))
}

/// Multipart form with a category field and a file part.
pub fn upload_form(category: &str, name: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new()
        .add_text("category", category.to_string())
        .add_part("file", file_part(name, bytes))
}

fn file_part(name: &str, bytes: Vec<u8>) -> Part {
    Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_type("audio/mpeg")
}

/// Upload through `POST /api/files` and assert success.
pub async fn upload(client: &TestServer, category: &str, name: &str, bytes: Vec<u8>) {
    client
        .post("/api/files")
        .multipart(upload_form(category, name, bytes))
        .await
        .assert_status_ok();
}
