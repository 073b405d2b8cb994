//! Per-source watermark persistence
//!
//! The watermark is the durable cursor between runs. It is never advanced
//! implicitly: a source must be seeded once by an operator before its first
//! run, so the initial backfill boundary is an explicit decision rather than
//! an accidental full-history fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

/// Watermark store errors
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// No cursor has been seeded for this source; operator action required
    #[error("no watermark seeded for source '{0}'; run seed-watermark first")]
    Missing(String),

    #[error("watermark store error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Seam between the coordinator and watermark persistence
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the cursor for a source. Fails with [`WatermarkError::Missing`]
    /// if the source was never seeded.
    async fn get(&self, source_name: &str) -> Result<DateTime<Utc>, WatermarkError>;

    /// Conditionally advance the cursor. Returns `true` if the stored value
    /// actually moved forward; `false` means another writer is already at or
    /// past `ts` and the store was left untouched.
    async fn advance(
        &self,
        source_name: &str,
        ts: DateTime<Utc>,
    ) -> Result<bool, WatermarkError>;

    /// Unconditional upsert, last write wins. Operator-facing: used to seed
    /// a source before its first run or to rewind for a re-backfill.
    async fn seed(&self, source_name: &str, ts: DateTime<Utc>) -> Result<(), WatermarkError>;
}

/// Postgres-backed watermark store over `ingestion_watermarks`
pub struct PgWatermarkStore {
    pool: PgPool,
}

impl PgWatermarkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    async fn get(&self, source_name: &str) -> Result<DateTime<Utc>, WatermarkError> {
        let row: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT last_created_at FROM ingestion_watermarks WHERE source_name = $1",
        )
        .bind(source_name)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| WatermarkError::Missing(source_name.to_string()))
    }

    async fn advance(
        &self,
        source_name: &str,
        ts: DateTime<Utc>,
    ) -> Result<bool, WatermarkError> {
        // Conditional write: the WHERE clause makes advancement a
        // compare-and-swap, so a concurrent run can never regress the
        // cursor even without an external lock.
        let result = sqlx::query(
            r#"
            INSERT INTO ingestion_watermarks (source_name, last_created_at, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (source_name) DO UPDATE
            SET last_created_at = EXCLUDED.last_created_at, updated_at = now()
            WHERE ingestion_watermarks.last_created_at < EXCLUDED.last_created_at
            "#,
        )
        .bind(source_name)
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn seed(&self, source_name: &str, ts: DateTime<Utc>) -> Result<(), WatermarkError> {
        sqlx::query(
            r#"
            INSERT INTO ingestion_watermarks (source_name, last_created_at, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (source_name) DO UPDATE
            SET last_created_at = EXCLUDED.last_created_at, updated_at = now()
            "#,
        )
        .bind(source_name)
        .bind(ts)
        .execute(&self.pool)
        .await?;

        tracing::info!(source = source_name, watermark = %ts, "Watermark seeded");

        Ok(())
    }
}
