//! Scribe server binary.
//!
//! Receives monitoring webhooks and serves the template and document API.

use anyhow::Context;
use clap::Parser;
use scribe_server::{Cli, LogFormat, ScribeServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.server_config();
    info!(
        bind = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        dedup_window_secs = config.dedup_window.as_secs(),
        "starting scribe"
    );

    let server = ScribeServer::open(config).context("failed to open data directory")?;
    server
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
