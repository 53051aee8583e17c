//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use scribe_alerts::{DEFAULT_DEDUP_WINDOW, QueueConfig};

/// Configuration for the Scribe server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Root of the record store.
    pub data_dir: PathBuf,
    /// Width of the alert dedup bucket.
    pub dedup_window: Duration,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
    /// Create the default template when none exist.
    pub seed_template: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from("./data"),
            dedup_window: DEFAULT_DEDUP_WINDOW,
            cors_origins: Vec::new(),
            seed_template: true,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the dedup window.
    #[must_use]
    pub const fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Enable or disable default template seeding.
    #[must_use]
    pub const fn with_seed_template(mut self, enabled: bool) -> Self {
        self.seed_template = enabled;
        self
    }

    /// Queue settings derived from this configuration.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default().with_dedup_window(self.dedup_window)
    }
}
