//! docbench — time one TPC-H query against a document store.
//!
//! Prints the elapsed milliseconds (two decimals) on stdout. Queries without
//! a plan and queries the store fails both print `0.00`; only an unreachable
//! store is fatal.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use docbench_catalog::{compile, explain};
use docbench_core::config::{load_dotenv, Config};
use docbench_runner::{Harness, MongoStore};

// ── CLI ─────────────────────────────────────────────────────────────

/// Run one TPC-H query as an aggregation pipeline and report its latency.
#[derive(Parser, Debug)]
#[command(name = "docbench", version, about)]
struct Cli {
    /// Store host name or address.
    host: String,

    /// Store port.
    port: u16,

    /// Database holding the TPC-H collections.
    database: String,

    /// TPC-H query number (1-22).
    #[arg(allow_negative_numbers = true)]
    query_id: i64,

    /// Print the lowered pipeline instead of running it.
    #[arg(long, conflicts_with = "plan")]
    explain: bool,

    /// Print the stage plan instead of running it.
    #[arg(long)]
    plan: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.explain || cli.plan {
        let pipeline = compile(cli.query_id)?;
        let json = if cli.explain {
            explain(&pipeline)
        } else {
            serde_json::to_value(&pipeline)?
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let config = Config::from_env();
    config.log_summary();
    let store_config = config.store.with_address(cli.host, cli.port);

    let store = MongoStore::connect(&store_config)
        .await
        .with_context(|| {
            format!(
                "cannot reach document store at {}:{}",
                store_config.host, store_config.port
            )
        })?;
    info!("Running query {} on {}", cli.query_id, cli.database);

    let harness = Harness::new(store_config.allow_disk_use);
    let measurement = harness.run(&store, &cli.database, cli.query_id).await;
    println!("{}", measurement);
    Ok(())
}
