//! Announcement dispatcher (aa-dispatch) - Main entry point
//!
//! Serves the Play/Stop command surface for the six announcement buttons and
//! launches the external player.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use aa_common::config::find_bootstrap_file;
use aa_common::events::EventBus;
use aa_dispatch::api::{build_router, AppContext};
use aa_dispatch::config::{CliOverrides, Config, TomlConfig};
use aa_dispatch::PlaybackDispatcher;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for aa-dispatch
#[derive(Parser, Debug)]
#[command(name = "aa-dispatch")]
#[command(about = "Announcement playback dispatcher")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file
    #[arg(short, long, env = "AA_BOOTSTRAP")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "AA_PORT")]
    port: Option<u16>,

    /// Directory holding the announcement clips
    #[arg(long)]
    media_root: Option<PathBuf>,

    /// Announcement document (JSON)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Player executable
    #[arg(long)]
    player: Option<PathBuf>,

    /// Activity log file
    #[arg(long)]
    activity_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Bootstrap is read before tracing starts so its log level can apply
    let bootstrap_path = find_bootstrap_file(args.config.as_deref());
    let toml = match bootstrap_path.as_deref() {
        Some(path) => TomlConfig::load(path).ok(),
        None => None,
    };
    let level = toml
        .as_ref()
        .map(|t| t.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());

    let default_filter = format!("aa_dispatch={level},aa_common={level},tower_http={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Announcement Dispatcher (aa-dispatch) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Re-run through the logging loader so a broken file is reported
    let toml = match toml {
        Some(toml) => toml,
        None => TomlConfig::load_or_default(bootstrap_path.as_deref()),
    };

    let cli = CliOverrides {
        port: args.port,
        media_root: args.media_root,
        config_file: args.config_file,
        activity_log: args.activity_log,
        player: args.player,
    };
    let config = Config::resolve(&cli, &toml);

    let dispatcher = Arc::new(PlaybackDispatcher::new(config.dispatcher, EventBus::default()));
    let app = build_router(AppContext::new(Arc::clone(&dispatcher)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    dispatcher.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
