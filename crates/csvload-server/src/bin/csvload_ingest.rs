// One-shot users ingestion
//
// Runs a single ingestion against the configured database without starting
// the HTTP server, then prints the age distribution report.
//
// Usage:
//   csvload-ingest --file ./data/users.csv --batch-size 500
//
// Exits with status 1 when the run was rolled back.

use anyhow::{Context, Result};
use clap::Parser;
use csvload_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

use csvload_server::config::validate_batch_size;
use csvload_server::db::{self, DbConfig};
use csvload_server::ingest::users::{PgUserStore, RunStatus, UsersPipeline, DEFAULT_BATCH_SIZE};

/// Load a users CSV file into PostgreSQL
#[derive(Debug, Parser)]
#[command(name = "csvload-ingest", version, about)]
struct Cli {
    /// CSV file to ingest
    #[arg(short, long, env = "CSV_FILE_PATH")]
    file: PathBuf,

    /// Rows per multi-row insert
    #[arg(short, long, env = "INGEST_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Debug logging on the console
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("csvload-ingest")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);
    let _log_guard = init_logging(&log_config).ok().flatten();

    match run(&cli).await {
        Ok(RunStatus::Committed) => {},
        Ok(RunStatus::RolledBack { reason }) => {
            eprintln!("Ingestion rolled back: {}", reason);
            process::exit(1);
        },
        Err(e) => {
            error!(error = %e, "Ingestion failed");
            eprintln!("Error: {:#}", e);
            process::exit(1);
        },
    }
}

async fn run(cli: &Cli) -> Result<RunStatus> {
    validate_batch_size(cli.batch_size)?;

    let db_config = DbConfig::from_env()?;
    db::ensure_database(&db_config).await?;
    let pool = db::create_pool(&db_config)
        .await
        .context("Failed to connect to database")?;
    db::verify_connection(&pool).await?;
    db::ensure_users_table(&pool).await?;

    let pipeline =
        UsersPipeline::new(Arc::new(PgUserStore::new(pool))).with_batch_size(cli.batch_size);

    let outcome = pipeline
        .run(&cli.file)
        .await
        .context("Could not start ingestion")?;

    info!(
        run_id = %outcome.run_id,
        accepted = outcome.stats.rows_accepted,
        malformed = outcome.stats.rows_malformed,
        invalid = outcome.stats.rows_invalid,
        "Run complete"
    );

    match &outcome.report {
        Some(report) => println!("{}", report.render()),
        None => println!("No users with age data found."),
    }

    Ok(outcome.status)
}
