//! Tribo Prediction Service binary

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tribo_service::config::CONFIG_ENV;
use tribo_service::{start_server, ServiceConfig, ServiceContext};

#[derive(Parser, Debug)]
#[command(name = "tribo-service")]
#[command(author = "Tribo Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lubricant tribology prediction API", long_about = None)]
struct Cli {
    /// TOML configuration file (falls back to TRIBO_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Model artifact path
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Feature-order manifest path
    #[arg(long)]
    manifest_path: Option<PathBuf>,

    /// Refuse to fall back to the schema's declared feature order
    #[arg(long)]
    strict_feature_order: bool,

    /// Exit if the model cannot be loaded
    #[arg(long)]
    require_model: bool,
}

impl Cli {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = self.model_path {
            config.model_path = path;
        }
        if let Some(path) = self.manifest_path {
            config.manifest_path = Some(path);
        }
        config.strict_feature_order |= self.strict_feature_order;
        config.require_model |= self.require_model;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let mut cli = Cli::parse();
    let config_path = cli
        .config
        .take()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let mut config =
        ServiceConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    info!("Tribo Prediction Service v{}", env!("CARGO_PKG_VERSION"));
    info!("Model: {}", config.model_path.display());
    info!("Manifest: {}", config.manifest_path().display());

    let ctx = ServiceContext::load(&config);
    if !ctx.is_ready() && config.require_model {
        bail!(
            "model could not be loaded: {}",
            ctx.load_error().unwrap_or("unknown error")
        );
    }

    start_server(Arc::new(ctx), &config.bind_addr(), shutdown_signal()).await?;

    info!("Prediction service stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }
}

/// Initialize logging from RUST_LOG, defaulting to info
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
