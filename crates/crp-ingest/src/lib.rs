//! CRP Ingest Library
//!
//! Incremental ingestion of a public city-service request feed into the
//! Postgres staging store. Progress is tracked with a durable per-source
//! watermark; every execution is recorded in a run ledger.
//!
//! # Components
//!
//! - [`source`]: queries the remote feed for records newer than a cursor
//! - [`normalize`]: converts raw feed records into the staging schema
//! - [`store`]: watermark, run ledger, and staging sink adapters (Postgres)
//! - [`coordinator`]: orchestrates one ingestion cycle end to end
//!
//! # Example
//!
//! ```no_run
//! use crp_ingest::config::IngestConfig;
//! use crp_ingest::coordinator::Coordinator;
//! use crp_ingest::source::FeedClient;
//! use crp_ingest::store::{PgRunLedger, PgStagingSink, PgWatermarkStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let pool = crp_common::create_pool(&config.database).await?;
//!
//!     let coordinator = Coordinator::new(
//!         FeedClient::new(&config.feed_url, config.request_timeout_secs)?,
//!         PgWatermarkStore::new(pool.clone()),
//!         PgStagingSink::new(pool.clone()),
//!         PgRunLedger::new(pool),
//!         &config.source_name,
//!         &config.flow_name,
//!         config.batch_limit,
//!     );
//!
//!     let report = coordinator.run_once().await?;
//!     tracing::info!(rows_loaded = report.rows_loaded, "Run complete");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod normalize;
pub mod record;
pub mod source;
pub mod store;
