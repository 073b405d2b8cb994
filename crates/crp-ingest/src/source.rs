//! Source client for the remote service-request feed
//!
//! The feed is a Socrata-style read-only HTTP API: filterable, ordered,
//! rate-limited. The client issues one bounded query per call and never
//! retries internally; retry policy belongs to the invoking scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::record::RawRecord;

/// Errors from the remote feed
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or non-success HTTP status
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The feed answered but the body was not the expected JSON array
    #[error("source response decode failed: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Unavailable(err.to_string())
    }
}

/// Seam between the coordinator and the remote feed
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetch records whose creation timestamp is strictly greater than
    /// `cursor`, ordered ascending by creation timestamp, capped at `limit`.
    ///
    /// Strictly-greater plus ascending order is what makes incremental
    /// watermark advancement safe.
    async fn fetch_since(
        &self,
        cursor: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RawRecord>, SourceError>;
}

/// HTTP client for the service-request dataset endpoint
pub struct FeedClient {
    client: Client,
    dataset_url: String,
}

impl FeedClient {
    /// Create a client for the given dataset endpoint
    pub fn new(dataset_url: impl Into<String>, timeout_secs: u64) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            dataset_url: dataset_url.into(),
        })
    }

    /// Render the cursor the way the feed's filter syntax expects: naive
    /// UTC, no offset suffix.
    fn filter_boundary(cursor: DateTime<Utc>) -> String {
        cursor.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

#[async_trait]
impl SourceClient for FeedClient {
    async fn fetch_since(
        &self,
        cursor: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let params = [
            ("$limit", limit.to_string()),
            ("$order", "created_date ASC".to_string()),
            (
                "$where",
                format!("created_date > '{}'", Self::filter_boundary(cursor)),
            ),
        ];

        tracing::debug!(cursor = %cursor, limit, "Querying feed for new records");

        let response = self
            .client
            .get(&self.dataset_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "feed returned HTTP {status}"
            )));
        }

        let records: Vec<RawRecord> = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;

        tracing::debug!(fetched = records.len(), "Feed query complete");

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_boundary_is_naive_utc() {
        let cursor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(FeedClient::filter_boundary(cursor), "2024-01-01T00:00:00");
    }
}
