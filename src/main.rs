//! radio-edge
//!
//! Two small HTTP services sharing one binary:
//!
//! ```text
//!   browser ──GET /stream/*──▶ stream-proxy ──▶ streaming upstream
//!                               (CORS, retries, chunk relay)
//!
//!   browser / crawler ──GET /*──▶ edge-renderer ──▶ static_dir
//!                                   │
//!                                   └─▶ content API (article metadata)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use radio_edge::config::{load_config, ObservabilityConfig};
use radio_edge::lifecycle::{wait_for_signal, DrainOutcome, Shutdown};
use radio_edge::observability::{init_logging, metrics};
use radio_edge::{EdgeRendererServer, StreamProxyServer};

#[derive(Parser)]
#[command(name = "radio-edge", version)]
#[command(about = "Live stream relay and SEO edge renderer", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "RADIO_EDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand, Clone, Copy)]
enum Service {
    /// Relay the live audio stream
    StreamProxy,
    /// Serve the web app with per-article head tags
    EdgeRenderer,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "radio-edge starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let bind_address = config.listener.bind_address();

    let mut server = match cli.service {
        Service::StreamProxy => {
            let server = StreamProxyServer::new(config.stream_proxy.clone())?;
            let listener = TcpListener::bind(&bind_address).await?;
            tokio::spawn(server.run(listener, shutdown.subscribe()))
        }
        Service::EdgeRenderer => {
            let server = EdgeRendererServer::new(config.edge_renderer.clone())?;
            let listener = TcpListener::bind(&bind_address).await?;
            tokio::spawn(server.run(listener, shutdown.subscribe()))
        }
    };

    tokio::select! {
        result = &mut server => {
            match result {
                Ok(Ok(())) => tracing::info!("Server exited"),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Server failed");
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Server task panicked");
                    return Err(e.into());
                }
            }
            return Ok(());
        }
        signal = wait_for_signal() => {
            tracing::info!(signal = signal, "Shutdown requested");
        }
    }

    let grace = Duration::from_secs(config.lifecycle.shutdown_grace_secs);
    match shutdown.drain(server, grace).await {
        DrainOutcome::Finished(Ok(())) => tracing::info!("Shutdown complete"),
        DrainOutcome::Finished(Err(e)) => tracing::error!(error = %e, "Server failed during shutdown"),
        DrainOutcome::Panicked(e) => tracing::error!(error = %e, "Server task panicked during shutdown"),
        DrainOutcome::DeadlineReached => {
            tracing::warn!(grace_secs = grace.as_secs(), "Drain deadline reached; closing open streams")
        }
    }
    Ok(())
}
