//! Log indexer service speaking JSON lines over stdin/stdout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use log_indexer::core::config::Config;
use log_indexer::core::logging::init_tracing;
use log_indexer::service::indexer::LogIndexer;
use log_indexer::service::stdio::serve;
use log_indexer::source::registry::{SourceOptions, SourceRegistry};

#[derive(Parser)]
#[command(name = "log-indexer")]
#[command(about = "Search and facet log records from a pluggable source")]
struct Args {
    /// Log source to load (jsonl, memory)
    #[arg(short, long, env = "LOG_INDEXER_SOURCE", default_value = "jsonl")]
    source: String,

    /// Input file for file-backed sources
    #[arg(short, long, env = "LOG_INDEXER_PATH")]
    path: Option<PathBuf>,

    /// Directory holding persisted grouped searches, wiped on startup
    #[arg(long, env = "LOG_INDEXER_SESSION_DIR", default_value = "/tmp/log_indexer")]
    session_dir: PathBuf,

    /// Seconds a persisted search is kept
    #[arg(long, env = "LOG_INDEXER_RETENTION_SECS", default_value = "3600")]
    retention_secs: u64,

    /// Seconds between expiry sweeps
    #[arg(long, env = "LOG_INDEXER_REAP_INTERVAL_SECS", default_value = "60")]
    reap_interval_secs: u64,

    /// Filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_INDEXER_LOG_FILTER", default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args.log_filter);

    let config = Config {
        session_retention: Duration::from_secs(args.retention_secs),
        reap_interval: Duration::from_secs(args.reap_interval_secs),
        ..Config::default()
    }
    .with_session_dir(args.session_dir);

    let registry = SourceRegistry::with_builtin();
    let source = registry.create(&args.source, &SourceOptions { path: args.path })?;

    let indexer = Arc::new(LogIndexer::new(source, config)?);
    serve(indexer).await?;

    Ok(())
}
