// server/src/cli.rs

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use medrec_lib::{load_app_config, AppConfig, Database, RecordStore};

// CLI entry point for the medical records server
#[derive(Parser, Debug)]
#[command(name = "medrec-server")]
#[command(version = "0.1.0")]
#[command(about = "REST API over patient, visit, treatment and diagnostic records")]
pub struct CliArgs {
    /// YAML configuration file (defaults to ./medrec.yaml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "MEDREC_CONFIG")]
    pub config: Option<PathBuf>,
    /// Address to bind
    #[arg(long = "host", value_name = "HOST", env = "MEDREC_HOST")]
    pub host: Option<String>,
    /// Port to listen on
    #[arg(short = 'p', long = "port", value_name = "PORT", env = "MEDREC_PORT")]
    pub port: Option<u16>,
    /// sqlx SQLite URL, e.g. sqlite://medical_records.db
    #[arg(long = "database-url", value_name = "URL", env = "MEDREC_DATABASE_URL")]
    pub database_url: Option<String>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long = "log-level", value_name = "LEVEL", env = "MEDREC_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Command line values win over the config file.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context(format!("Invalid log level: {}", default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Opens the store, creates missing tables and serves until Ctrl-C.
pub async fn run(config: AppConfig) -> Result<()> {
    let db = Database::connect(&config.database)
        .await
        .context(format!("Failed to open database {}", config.database.url))?;
    db.ensure_schema().await.context("Failed to create tables")?;
    let store = RecordStore::new(db.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down."),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let result = medrec_rest_api::start_server(&config.server, store, shutdown_rx).await;
    db.close().await;
    result
}

pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = load_app_config(args.config.as_deref())?;
    args.apply(&mut config);
    init_logging(&config.log_level)?;
    info!("Starting medrec-server on {}", config.server.bind_address());

    run(config).await
}
