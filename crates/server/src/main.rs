//! Ember server binary.

use anyhow::{Context, Result};
use clap::Parser;
use ember_core::config::AppConfig;
use ember_server::{AppState, create_router, reaper};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ember - self-destructing file sharing server
#[derive(Parser, Debug)]
#[command(name = "emberd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "EMBER_CONFIG", default_value = "config/ember.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Ember v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. Every field has a default, so both the file and
    // the environment are optional.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("EMBER_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize the blob store and verify it before accepting requests
    let blobs = Arc::new(
        ember_storage::from_config(&config.storage)
            .await
            .context("failed to initialize blob storage")?,
    );
    blobs
        .health_check()
        .await
        .context("blob storage health check failed")?;
    tracing::info!(root = %config.storage.root.display(), "Blob store initialized");

    // Initialize the metadata store and verify connectivity
    let records = ember_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    records
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!("Metadata store initialized");

    // Spawn the expiry reaper; a failed subscription is a startup error,
    // not a silent storage leak.
    let _reaper_handle = reaper::spawn(&records, blobs.clone())
        .await
        .context("failed to subscribe to expiration feed")?;
    tracing::info!("Expiry reaper spawned");

    // Create application state and router
    let state = AppState::new(config.clone(), records, blobs);
    let app = create_router(state);

    // Parse bind address and serve
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
