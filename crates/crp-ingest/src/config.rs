//! Ingestion configuration
//!
//! Built once at process entry and passed by reference into the coordinator
//! and its adapters. Components never read ambient environment state.

use crp_common::db::DbConfig;

// ============================================================================
// Ingestion Constants
// ============================================================================

/// Default dataset endpoint (NYC 311 service requests).
pub const DEFAULT_FEED_URL: &str = "https://data.cityofnewyork.us/resource/erm2-nwe9.json";

/// Watermark source name for the default feed.
pub const DEFAULT_SOURCE_NAME: &str = "nyc_311";

/// Ledger flow name for the default feed.
pub const DEFAULT_FLOW_NAME: &str = "ingest_city_requests_staging";

/// Records fetched per ingestion cycle. Fixed by design; callers needing a
/// different value pass an explicit override.
pub const DEFAULT_BATCH_LIMIT: u32 = 5000;

/// Feed request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Staging/watermark/ledger store connection settings
    pub database: DbConfig,
    /// Dataset endpoint to query
    pub feed_url: String,
    /// Watermark source name
    pub source_name: String,
    /// Ledger flow name
    pub flow_name: String,
    /// Records fetched per cycle
    pub batch_limit: u32,
    /// Feed request timeout
    pub request_timeout_secs: u64,
}

impl IngestConfig {
    /// Load configuration from `.env` and environment variables.
    ///
    /// `DATABASE_URL` is required. `CRP_FEED_URL` and `CRP_SOURCE_NAME`
    /// override the default feed; batch size and timeout are fixed constants
    /// (override via [`IngestConfig::with_batch_limit`]).
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database = DbConfig::from_env()?;

        let feed_url =
            std::env::var("CRP_FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());
        let source_name =
            std::env::var("CRP_SOURCE_NAME").unwrap_or_else(|_| DEFAULT_SOURCE_NAME.to_string());
        let flow_name =
            std::env::var("CRP_FLOW_NAME").unwrap_or_else(|_| DEFAULT_FLOW_NAME.to_string());

        Ok(Self {
            database,
            feed_url,
            source_name,
            flow_name,
            batch_limit: DEFAULT_BATCH_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        })
    }

    /// Explicit batch limit override
    pub fn with_batch_limit(mut self, limit: u32) -> Self {
        self.batch_limit = limit;
        self
    }
}
