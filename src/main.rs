use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use feedbar_ingest::{BatchScheduler, Config, Database, HttpFetcher};

/// Command-line arguments for feedbar-ingest
#[derive(Parser, Debug)]
#[command(name = "feedbar-ingest")]
#[command(about = "Scheduled RSS/Atom ingestion worker for FeedBar")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", env = "FEEDBAR_CONFIG")]
    config: PathBuf,

    /// Run a single batch and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", args.config.display());
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    if let Err(e) = config.apply_env_overrides().and_then(|_| config.validate()) {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    // Initialize logging
    if let Err(e) = feedbar_ingest::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedbar_ingest::logging::init_console_only(&config.logging.level);
    }

    info!("FeedBar ingestion worker");

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Ingestion worker stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: Config) -> feedbar_ingest::Result<()> {
    let db = Arc::new(Database::open(&config.database.path).await?);
    let fetcher = Arc::new(HttpFetcher::new(&config.ingest)?);
    let scheduler = BatchScheduler::new(db.clone(), fetcher, &config.ingest);

    if args.once {
        let report = scheduler.run_batch().await?;
        info!(?report, "Single batch finished");
        return Ok(());
    }

    tokio::select! {
        _ = scheduler.run(config.ingest.schedule_interval()) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
        }
    }

    db.pool().close().await;
    Ok(())
}
