//! CORS-injecting reverse proxy binary.
//!
//! Startup order: parse flags, load + validate config, init logging and
//! metrics, bind the listener, serve until SIGINT/SIGTERM. Configuration
//! and bind failures are fatal and exit non-zero; a signal-triggered
//! shutdown exits 0.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cors_proxy::config::loader::load_config;
use cors_proxy::lifecycle::{signals, Shutdown};
use cors_proxy::observability::{logging, metrics};
use cors_proxy::{HttpServer, Listener};

#[derive(Parser)]
#[command(name = "cors-proxy")]
#[command(about = "Reverse proxy that forwards HTTP/WebSocket traffic and injects CORS headers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cors-proxy: configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstreams = config.upstreams.len(),
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = match Listener::bind(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config);
    if let Err(e) = server.run(listener, server_shutdown).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
