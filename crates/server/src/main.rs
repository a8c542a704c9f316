//! splice server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use splice_core::config::AppConfig;
use splice_server::{AppState, create_router};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// spliced - resumable chunked upload server
#[derive(Parser, Debug)]
#[command(name = "spliced")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (optional)
    #[arg(
        short,
        long,
        env = "SPLICE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,

    /// Bind address, overrides `server.bind`
    #[arg(long)]
    bind: Option<String>,

    /// Storage root, overrides `storage.path`
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Defaults, then the TOML file, then `SPLICE_*` variables, then flags.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    let config_path = std::path::Path::new(&args.config);
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    figment = figment.merge(Env::prefixed("SPLICE_").split("__").ignore(&["config"]));

    if let Some(bind) = &args.bind {
        figment = figment.merge(Serialized::default("server.bind", bind));
    }
    if let Some(path) = &args.storage_path {
        figment = figment.merge(Serialized::default("storage.path", path));
    }

    let config: AppConfig = figment
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    tracing::info!("splice v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    if config.server.metrics_enabled {
        splice_server::metrics::register_metrics();
        tracing::info!("Prometheus metrics registered");
    }

    // Creates the storage root if it does not exist yet
    let storage = splice_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend ready");

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let app = create_router(AppState::new(config, storage));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
