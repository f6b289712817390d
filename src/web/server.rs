//! Web server for clipshelf.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::{ClipError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
    /// Interval between expired-session sweeps.
    cleanup_interval: Duration,
}

impl WebServer {
    /// Create a web server from configuration.
    ///
    /// Opens (and creates if needed) the storage root.
    pub fn new(config: &Config) -> Result<Self> {
        let app_state = AppState::from_config(config)?;
        Self::with_state(config, Arc::new(app_state))
    }

    /// Create a web server around prepared state.
    pub fn with_state(config: &Config, app_state: Arc<AppState>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ClipError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            app_state,
            cors_origins: config.server.cors_origins.clone(),
            cleanup_interval: Duration::from_secs(config.session.cleanup_interval_secs.max(1)),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete application router.
    pub fn app(&self) -> Router {
        create_router(self.app_state.clone(), &self.cors_origins)
            .merge(create_health_router())
            .merge(create_swagger_router())
            .layer(CompressionLayer::new())
    }

    /// Remove upload leftovers from an earlier run.
    async fn purge_stale_uploads(&self) {
        if let Err(e) = self
            .app_state
            .run_blocking("purge_stale_temp_files", |repo| {
                repo.purge_stale_temp_files()
            })
            .await
        {
            tracing::warn!(error = %e, "Failed to purge stale upload files");
        }
    }

    /// Start the session cleanup background task.
    fn start_session_cleanup_task(state: Arc<AppState>, every: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let (sessions, usernames) = state.purge_expired();
                if sessions > 0 || usernames > 0 {
                    tracing::info!(
                        sessions,
                        usernames,
                        remaining = state.sessions.len(),
                        "Expired idle sessions and login failures"
                    );
                } else {
                    tracing::debug!("No idle sessions to expire");
                }
            }
        });
    }

    async fn bind(&self) -> std::result::Result<(TcpListener, SocketAddr), std::io::Error> {
        self.purge_stale_uploads().await;

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        // Start after a successful bind
        Self::start_session_cleanup_task(Arc::clone(&self.app_state), self.cleanup_interval);
        tracing::info!(
            every_secs = self.cleanup_interval.as_secs(),
            "Session cleanup task started"
        );

        tracing::info!(
            root = %self.app_state.repository.storage_root().display(),
            auth = self.app_state.auth_required(),
            "Web server listening on http://{}",
            local_addr
        );

        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let (listener, _) = self.bind().await?;
        axum::serve(listener, self.app()).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let (listener, local_addr) = self.bind().await?;
        let router = self.app();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(root: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Use random port
        config.storage.root = root.path().join("audio_files").display().to_string();
        config
    }

    #[test]
    fn test_web_server_new() {
        let temp = TempDir::new().unwrap();
        let config = create_test_config(&temp);

        let server = WebServer::new(&config).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
        assert!(temp.path().join("audio_files").is_dir());
    }

    #[test]
    fn test_web_server_invalid_host() {
        let temp = TempDir::new().unwrap();
        let mut config = create_test_config(&temp);
        config.server.host = "not a host".to_string();

        assert!(matches!(
            WebServer::new(&config),
            Err(ClipError::Config(_))
        ));
    }

    #[test]
    fn test_purge_expired_forgets_login_failures() {
        use crate::auth::LoginLimiter;
        use crate::library::FileRepository;

        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().join("audio_files")).unwrap();
        let state = AppState::new(Arc::new(repo))
            .with_login_limiter(LoginLimiter::new(5, Duration::from_millis(1)));

        for i in 0..50 {
            state.limiter().record_failure(&format!("user{i}"));
        }
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(state.purge_expired(), (0, 50));
        assert!(state.limiter().is_empty());
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let temp = TempDir::new().unwrap();
        let config = create_test_config(&temp);

        let stale = temp.path().join("audio_files").join("jazz");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join(".upload-0000.part"), b"partial").unwrap();

        let server = WebServer::new(&config).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
        assert!(!stale.join(".upload-0000.part").exists());
    }
}
