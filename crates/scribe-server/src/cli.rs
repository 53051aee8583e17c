//! Command-line argument parsing with clap.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::ServerConfig;

/// Scribe - turn monitoring alerts into incident reports.
#[derive(Parser, Debug, Clone)]
#[command(name = "scribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "SCRIBE_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory holding templates, alerts and documents.
    #[arg(long, env = "SCRIBE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Width of the alert dedup window in seconds.
    #[arg(long, env = "SCRIBE_DEDUP_WINDOW_SECS", default_value_t = 300)]
    pub dedup_window_secs: u64,

    /// Allowed CORS origin; repeat for several. Any origin when unset.
    #[arg(long = "cors-origin", env = "SCRIBE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Do not create the default template on an empty store.
    #[arg(long)]
    pub no_seed_template: bool,

    /// Log output format.
    #[arg(long, value_enum, env = "SCRIBE_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Builds the server configuration from the parsed arguments.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(self.bind)
            .with_data_dir(self.data_dir.clone())
            .with_dedup_window(Duration::from_secs(self.dedup_window_secs))
            .with_seed_template(!self.no_seed_template);
        for origin in self.cors_origins.iter().filter(|o| !o.trim().is_empty()) {
            config = config.with_cors_origin(origin.trim());
        }
        config
    }
}
