//! Prerender gateway.
//!
//! Runs [`prerender_middleware`](prerender_proxy::prerender_middleware) in
//! front of an origin application reached over HTTP.
//!
//! ```text
//!     Client ──▶ listener ──▶ request id / timeout ──▶ prerender ──▶ origin
//!                                                          │
//!                                                          ▼
//!                                                   render backend
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use prerender_proxy::config::validation::validate_config;
use prerender_proxy::config::{load_config, ConfigError, GatewayConfig};
use prerender_proxy::lifecycle::signals::spawn_signal_handler;
use prerender_proxy::observability::{logging, metrics};
use prerender_proxy::{HandlerRegistry, HttpServer, Prerender, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "prerender-proxy", version, about = "Serve prerendered pages to crawlers")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "PRERENDER_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Override origin.url
    #[arg(long)]
    origin: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(origin) = &cli.origin {
        config.origin.url = origin.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "prerender-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = HandlerRegistry::with_builtins();
    let prerender = match Prerender::from_config(config.prerender_config(), &registry) {
        Ok(prerender) => Arc::new(prerender),
        Err(e) => {
            tracing::error!(error = %e, "Invalid prerender configuration");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config, prerender)?;
    server.run(listener, shutdown.wait()).await?;

    if shutdown.is_triggered() {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!("HTTP server exited without a shutdown signal");
    }
    Ok(())
}
