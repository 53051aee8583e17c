//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::routes::create_router;
use crate::state::AppState;

/// The Scribe HTTP server.
#[derive(Debug, Clone)]
pub struct ScribeServer {
    state: Arc<AppState>,
}

impl ScribeServer {
    /// Opens file-backed stores under the configured data directory and
    /// seeds the default template when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be opened or seeded.
    pub fn open(config: ServerConfig) -> ApiResult<Self> {
        let state = AppState::open(config)?;
        state.seed()?;
        Ok(Self::from_state(Arc::new(state)))
    }

    /// Wraps existing state.
    #[must_use]
    pub const fn from_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Serve on the configured address until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self) -> ApiResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` completes, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ApiResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::BindFailed(addr, e))?;
        let local: SocketAddr = listener.local_addr().unwrap_or(addr);

        info!(addr = %local, "Scribe server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        info!("Scribe server shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_server() -> ScribeServer {
        let config = ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        ScribeServer::from_state(Arc::new(AppState::in_memory(config)))
    }

    #[test]
    fn test_open_seeds_template() {
        let dir = tempfile::tempdir().unwrap();
        let server = ScribeServer::open(ServerConfig::default().with_data_dir(dir.path())).unwrap();

        let templates = server.state().templates().list().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Incident Report");
    }

    #[test]
    fn test_open_without_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::default()
            .with_data_dir(dir.path())
            .with_seed_template(false);
        let server = ScribeServer::open(config).unwrap();

        assert!(server.state().templates().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let server = make_test_server();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(());

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), server_handle).await;

        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
