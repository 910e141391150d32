//! ratelimit-identity service.
//!
//! ```text
//!     Client Request
//!     ─────────────▶ request id ─▶ trace ─▶ server params ─▶ rate limit ─▶ handler
//!                                             (REMOTE_ADDR,    (identity →
//!                                              HTTP_*)          token bucket)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ratelimit_identity::config::{load_config, validate_config, ConfigError, ServiceConfig};
use ratelimit_identity::lifecycle::{wait_for_signal, Shutdown};
use ratelimit_identity::observability::{logging, metrics};
use ratelimit_identity::HttpServer;

#[derive(Parser)]
#[command(name = "ratelimit-identity")]
#[command(about = "Identity-keyed rate limiting service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;

    tracing::info!(
        config_path = ?cli.config,
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_second = config.rate_limit.requests_per_second,
        burst_size = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = wait_for_signal() => shutdown.trigger(),
    }

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
