//! tunehub-api - music catalog service
//!
//! Accepts audio uploads, extracts embedded tags, analyzes audio features in
//! the background and serves the catalog, audio streams and artwork.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunehub_api::services::WorkerPool;
use tunehub_api::storage::ContentStore;
use tunehub_api::AppState;
use tunehub_common::config::{
    load_config, ConfigSource, RootFolderInitializer, RootFolderResolver,
};

/// Command-line arguments; each flag can also come from its environment variable
#[derive(Parser, Debug)]
#[command(name = "tunehub-api", version, about = "TuneHub music catalog service")]
struct Args {
    /// TOML config file; must exist when given (default: ~/.config/tunehub/config.toml)
    #[arg(short, long, env = "TUNEHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database and uploaded content
    /// (falls back to TUNEHUB_ROOT_FOLDER, then the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TUNEHUB_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "TUNEHUB_BIND_ADDRESS")]
    bind: Option<String>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "TUNEHUB_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_source) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting tunehub-api v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults(Some(path)) => warn!(
            "Config file not found at {}, using compiled defaults",
            path.display()
        ),
        ConfigSource::Defaults(None) => {
            warn!("Could not determine config directory, using compiled defaults")
        }
    }

    // Root folder: CLI -> env -> TOML -> OS default
    let root_folder = RootFolderResolver::new("tunehub-api")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = tunehub_api::db::init_database_pool(&db_path).await?;

    let store = ContentStore::new(initializer.content_root());
    info!("Content store: {}", store.root().display());

    let workers = WorkerPool::from_config(&config.analysis);
    info!(
        workers = workers.workers(),
        timeout_secs = config.analysis.timeout_secs,
        "Analysis worker pool ready"
    );

    let state = AppState::new(db_pool, store, config.uploads, workers)
        .with_cors_origins(config.server.cors_origins.clone());
    let app = tunehub_api::build_router(state);

    let bind = args
        .bind
        .unwrap_or_else(|| config.server.bind_address.clone());
    let port = args.port.unwrap_or(config.server.port);
    let (listener, local_addr) = tunehub_api::bind_listener(&bind, port).await?;
    info!("Listening on http://{}", local_addr);
    info!("Health check: http://{}/health", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
