use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use table_loader::ingestion::{
    CompositeObserver, FileObserver, LoadConfig, LoadObserver, LoadOptions, LoadSummary,
    TracingObserver, run,
};
use table_loader::types::{BatchPolicy, DEFAULT_BATCH_SIZE, DEFAULT_EXTENSION};

/// Load a directory of CSV files into SQLite, one table per file.
#[derive(Parser, Debug)]
#[command(name = "table-loader", version, about, long_about = None)]
struct Cli {
    /// Directory holding the source files (e.g. a GTFS feed)
    #[arg(long, value_name = "DIR")]
    source: PathBuf,

    /// SQLite database to load into (created if missing)
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// Rows per insert batch; zero or negative inserts each file in one batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE as i64, allow_negative_numbers = true)]
    size: i64,

    /// File-type suffix stripped from file names to form table names
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Commit each batch as it goes instead of wrapping the run in one transaction
    #[arg(long)]
    no_transaction: bool,

    /// Append load events to this file
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,

    /// Summary output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let observer: Arc<dyn LoadObserver> = match &cli.event_log {
        Some(path) => {
            let observers: Vec<Arc<dyn LoadObserver>> =
                vec![Arc::new(TracingObserver), Arc::new(FileObserver::new(path))];
            Arc::new(CompositeObserver::new(observers))
        }
        None => Arc::new(TracingObserver),
    };

    let config = LoadConfig {
        source_dir: cli.source,
        db_path: cli.db,
        options: LoadOptions {
            batch_policy: BatchPolicy::from_size(cli.size),
            extension: cli.extension,
            atomic: !cli.no_transaction,
            observer: Some(observer),
            ..Default::default()
        },
    };

    let summary = run(&config).with_context(|| {
        format!(
            "loading '{}' into '{}' failed",
            config.source_dir.display(),
            config.db_path.display()
        )
    })?;
    print_summary(&summary, cli.format)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &LoadSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for t in &summary.tables {
                println!("{}: {} rows in {} batches", t.table, t.rows, t.batches);
            }
            println!(
                "Loaded {} tables ({} rows)",
                summary.tables.len(),
                summary.total_rows()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}
