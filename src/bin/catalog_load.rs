//! Load a catalog CSV into a SQLite database once, then print the run summary as JSON.
//!
//! ```text
//! catalog-load --csv products.csv --db catalog.db
//! RUST_LOG=debug catalog-load --csv products.csv
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_loader::ingestion::CatalogLoader;
use catalog_loader::store::SqliteCatalog;
use catalog_loader::types::RunOutcome;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder};

#[derive(Debug, Parser)]
#[command(name = "catalog-load", about = "One-shot CSV catalog loader")]
struct Args {
    /// Catalog CSV file (first line is a header).
    #[arg(long, env = "CATALOG_CSV", default_value = "products.csv")]
    csv: PathBuf,

    /// SQLite database file. Uses a throwaway in-memory database when omitted.
    #[arg(long, env = "CATALOG_DB")]
    db: Option<PathBuf>,

    /// Exit non-zero unless the run completed or was skipped.
    #[arg(long)]
    strict: bool,
}

fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing("info")?;

    let store = match &args.db {
        Some(path) => SqliteCatalog::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => SqliteCatalog::open_in_memory().context("failed to open in-memory database")?,
    };

    let mut loader = CatalogLoader::new(store);
    let summary = loader.run(&args.csv);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.strict && !matches!(summary.outcome, RunOutcome::Completed | RunOutcome::Skipped) {
        anyhow::bail!("catalog load ended with {:?}", summary.outcome);
    }
    Ok(())
}
