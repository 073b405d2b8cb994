//! CRP Ingest - incremental feed ingestion tool

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crp_common::logging::{init_logging, LogConfig, LogLevel};
use crp_ingest::config::IngestConfig;
use crp_ingest::coordinator::Coordinator;
use crp_ingest::source::FeedClient;
use crp_ingest::store::{PgRunLedger, PgStagingSink, PgWatermarkStore, WatermarkStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crp-ingest")]
#[command(author, version, about = "CRP service-request feed ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full ingestion cycle
    Run {
        /// Override the fixed batch limit
        #[arg(long)]
        batch_limit: Option<u32>,
    },

    /// Seed (or rewind) the watermark for a source
    SeedWatermark {
        /// Source name (defaults to the configured source)
        #[arg(long)]
        source: Option<String>,

        /// Watermark timestamp, RFC 3339 (e.g. 2024-01-01T00:00:00Z)
        #[arg(long)]
        at: DateTime<Utc>,
    },

    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_file_prefix("crp-ingest");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    let config = IngestConfig::load()?;
    let pool = crp_common::create_pool(&config.database).await?;
    crp_common::db::health_check(&pool).await?;

    match cli.command {
        Command::Run { batch_limit } => {
            let config = match batch_limit {
                Some(limit) => config.with_batch_limit(limit),
                None => config,
            };

            let coordinator = Coordinator::new(
                FeedClient::new(&config.feed_url, config.request_timeout_secs)?,
                PgWatermarkStore::new(pool.clone()),
                PgStagingSink::new(pool.clone()),
                PgRunLedger::new(pool),
                &config.source_name,
                &config.flow_name,
                config.batch_limit,
            );

            let report = coordinator.run_once().await?;
            info!(
                run_id = %report.run_id,
                rows_loaded = report.rows_loaded,
                watermark = %report.watermark,
                "Run complete"
            );
        },
        Command::SeedWatermark { source, at } => {
            let source = source.as_deref().unwrap_or(&config.source_name);
            PgWatermarkStore::new(pool).seed(source, at).await?;
        },
        Command::Migrate => {
            sqlx::migrate!().run(&pool).await?;
            info!("Migrations applied");
        },
    }

    Ok(())
}
