//! Staging sink: idempotent batch upsert keyed by natural key

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::record::StagingRecord;

/// Rows per INSERT statement. Keeps bind-parameter counts well under the
/// Postgres limit for the widest batch the coordinator can hand us.
const UPSERT_CHUNK_SIZE: usize = 1000;

/// Staging sink errors
#[derive(Debug, Error)]
#[error("staging upsert failed: {0}")]
pub struct SinkError(#[from] sqlx::Error);

/// Seam between the coordinator and the staging table
#[async_trait]
pub trait StagingSink: Send + Sync {
    /// Upsert a batch by natural key and return the number of distinct keys
    /// written. Duplicate keys within the batch resolve to the last value,
    /// matching upsert's last-write-wins semantics.
    async fn upsert(&self, records: &[StagingRecord]) -> Result<u64, SinkError>;
}

/// Postgres-backed sink over `staging_service_requests`
pub struct PgStagingSink {
    pool: PgPool,
}

impl PgStagingSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StagingSink for PgStagingSink {
    async fn upsert(&self, records: &[StagingRecord]) -> Result<u64, SinkError> {
        if records.is_empty() {
            return Ok(0);
        }

        // Postgres rejects a single INSERT that updates the same row twice,
        // so intra-batch duplicates are collapsed keep-last before binding.
        let mut latest: BTreeMap<i64, &StagingRecord> = BTreeMap::new();
        for record in records {
            latest.insert(record.natural_key, record);
        }
        let rows: Vec<&StagingRecord> = latest.into_values().collect();

        let mut tx = self.pool.begin().await?;

        for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO staging_service_requests (natural_key, created_at, updated_at, \
                 category, subcategory, status, region, location_code, latitude, longitude, \
                 raw_payload) ",
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.natural_key)
                    .push_bind(record.created_at)
                    .push_bind(record.updated_at)
                    .push_bind(&record.category)
                    .push_bind(&record.subcategory)
                    .push_bind(&record.status)
                    .push_bind(&record.region)
                    .push_bind(&record.location_code)
                    .push_bind(record.latitude)
                    .push_bind(record.longitude)
                    .push_bind(&record.raw_payload);
            });

            query_builder.push(
                " ON CONFLICT (natural_key) DO UPDATE SET \
                 created_at = EXCLUDED.created_at, \
                 updated_at = EXCLUDED.updated_at, \
                 category = EXCLUDED.category, \
                 subcategory = EXCLUDED.subcategory, \
                 status = EXCLUDED.status, \
                 region = EXCLUDED.region, \
                 location_code = EXCLUDED.location_code, \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 raw_payload = EXCLUDED.raw_payload",
            );

            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(rows.len() as u64)
    }
}
