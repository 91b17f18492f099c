//! TuneBox server - main entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tunebox_common::config::{
    CliOverrides, Settings, ENV_CLIENT_NAME, ENV_DATABASE_PATH, ENV_PLEX_BASE_URL, ENV_PLEX_TOKEN,
    ENV_PORT,
};

use tunebox_server::api::create_router;
use tunebox_server::broadcast::spawn_update_loop;
use tunebox_server::db::Store;
use tunebox_server::media::{MediaServer, PlexClient};
use tunebox_server::AppContext;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for tunebox-server
#[derive(Parser, Debug)]
#[command(name = "tunebox-server")]
#[command(about = "Shared jukebox backend for a Plex music library")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "TUNEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Plex server base URL (e.g. http://192.168.1.10:32400)
    #[arg(long, env = ENV_PLEX_BASE_URL)]
    plex_base_url: Option<String>,

    /// Plex authentication token
    #[arg(long, env = ENV_PLEX_TOKEN, hide_env_values = true)]
    plex_token: Option<String>,

    /// Name of the preferred playback device
    #[arg(long, env = ENV_CLIENT_NAME)]
    client_name: Option<String>,

    /// SQLite database path (":memory:" for a throwaway store)
    #[arg(long, env = ENV_DATABASE_PATH)]
    database_path: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = ENV_PORT)]
    port: Option<u16>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            config_path: args.config,
            plex_base_url: args.plex_base_url,
            plex_token: args.plex_token,
            client_name: args.client_name,
            database_path: args.database_path,
            port: args.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration warnings are logged before the configured level is known
    let settings = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        Settings::resolve(args.into())
    })
    .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(env_filter(&settings.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TuneBox server on port {}", settings.port);
    info!("Store: {}", settings.database_path.display());
    if let Some(name) = &settings.client_name {
        info!("Preferred player: {}", name);
    }

    let store = Store::open(&settings.database_path)
        .await
        .context("Failed to open store")?;
    let media: Arc<dyn MediaServer> =
        Arc::new(PlexClient::new(&settings).context("Failed to configure Plex client")?);

    let port = settings.port;
    let update_interval = settings.update_interval;
    let ctx = AppContext::new(settings, store.clone(), media);

    let update_loop = spawn_update_loop(ctx.broadcaster.clone(), update_interval);
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    update_loop.abort();
    store.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Subscriber used while settings are resolved
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LOG_LEVEL))
        .with(tracing_subscriber::fmt::layer())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into())
}

/// Expand a bare level ("debug") into per-crate directives
fn default_filter(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("tunebox_server={level},tunebox_common={level},tower_http={level}")
    }
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
