//! Ledger audit
//!
//! Checks that every user's balance equals 100 plus the sum of their ledger
//! entries. The database is opened read-only and never migrated. Exits
//! non-zero when a discrepancy is found.

use casino_ledger::api::server::init_tracing;
use casino_ledger::common::config::ConfigLoader;
use casino_ledger::ledger::{audit, LedgerStore};
use clap::Parser;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "audit_ledger")]
#[command(about = "Verify balances against the transaction ledger", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Database URL, overrides the configuration
    #[arg(long)]
    database_url: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }

    init_tracing("casino_ledger=warn");

    let store = LedgerStore::open_read_only(&config.database).await?;
    let report = audit(&store).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Ledger audit: {}", config.database.url);
        println!("Users checked: {}", report.users_checked);
        if report.is_consistent() {
            println!("All balances match their ledgers");
        } else {
            println!("Discrepancies: {}", report.discrepancies.len());
            for d in &report.discrepancies {
                println!(
                    "   user {}: stored {} tokens, ledger implies {} (off by {})",
                    d.user_id,
                    d.stored_balance,
                    d.ledger_balance,
                    d.difference()
                );
            }
        }
    }

    Ok(if report.is_consistent() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
