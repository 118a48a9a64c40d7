//! Batch enrichment entry point.
//!
//! One-shot mode reads an input CSV, runs the full batch, and writes the
//! enriched CSV; `--serve` exposes the same pipeline over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vendor_enrich::batch::{BatchScheduler, DEFAULT_MAX_CONCURRENT_ROWS};
use vendor_enrich::cache::ResultCache;
use vendor_enrich::catalog::ReferenceCatalog;
use vendor_enrich::gateway::LlmGateway;
use vendor_enrich::pipeline::Services;
use vendor_enrich::{server, table};

#[derive(Parser, Debug)]
#[command(
    name = "vendor-enrich",
    about = "Enrich vendor/product records with LLM-derived metadata"
)]
struct Args {
    /// Input CSV with vendor_name, vendor_url, product_name, product_url columns
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output CSV path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory holding products.csv and taxonomy.csv reference data
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Maximum rows processed concurrently
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_ROWS)]
    max_concurrent_rows: usize,

    /// Run the HTTP service instead of a one-shot batch
    #[arg(long)]
    serve: bool,

    /// Port for --serve
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let services = Services {
        gateway: Arc::new(LlmGateway::from_env()),
        cache: Arc::new(ResultCache::new()),
        catalog: Arc::new(ReferenceCatalog::load(&args.data_dir)),
    };

    if args.serve {
        return server::serve(services, args.port).await;
    }

    let input_path = args
        .input
        .context("--input is required unless --serve is set")?;
    let csv_text = std::fs::read_to_string(&input_path)
        .with_context(|| format!("reading {}", input_path.display()))?;
    let rows = table::parse_input(&csv_text)?;
    info!(rows = rows.len(), "parsed input table");

    let scheduler = BatchScheduler::new(services, args.max_concurrent_rows);
    let records = scheduler.process(rows).await;
    let output_csv = table::write_output(&records)?;

    match args.output {
        Some(path) => std::fs::write(&path, output_csv)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{output_csv}"),
    }
    Ok(())
}
