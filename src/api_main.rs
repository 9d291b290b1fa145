//! Casino API Server Binary
//!
//! Serves the wallet, slots and food station over HTTP.

use casino_ledger::api::server::{init_tracing, ApiServer};
use casino_ledger::common::config::ConfigLoader;
use casino_ledger::services::ServiceBuilder;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "casino-api")]
#[command(about = "Casino ledger API server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Database URL, e.g. sqlite://casino.db
    #[arg(long)]
    database_url: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,

    /// Seed for reproducible slot reels
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    // Command line flags override file and environment
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(origins) = args.cors_origins {
        config.api.allowed_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(seed) = args.seed {
        config.slots.seed = Some(seed);
    }
    loader.validate(&config)?;

    init_tracing(&config.logging.filter);
    info!(version = env!("CARGO_PKG_VERSION"), "Casino ledger starting");

    let services = ServiceBuilder::new().with_config(config).build().await?;
    ApiServer::new(services).run().await?;

    Ok(())
}
