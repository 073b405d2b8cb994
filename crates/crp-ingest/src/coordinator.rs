//! Ingestion coordinator
//!
//! Owns one full ingestion cycle: read watermark, fetch new records,
//! normalize, upsert, conditionally advance the watermark, finalize the
//! ledger row. All failure handling lives here; every fatal error is
//! recorded in the ledger before being returned to the caller.
//!
//! Re-invocation with an un-advanced cursor is safe: fetching the same batch
//! and re-upserting by natural key reproduces the same staging state, so the
//! outer scheduler can retry a failed run without duplication.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::normalize::normalize;
use crate::record::StagingRecord;
use crate::source::{SourceClient, SourceError};
use crate::store::{
    LedgerError, RunLedger, RunStatus, SinkError, StagingSink, WatermarkError, WatermarkStore,
};

/// Fatal run errors, one variant per collaborator
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Outcome of one successful ingestion cycle
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Distinct natural keys written to staging
    pub rows_loaded: u64,
    /// Raw records dropped by normalization
    pub rows_rejected: u64,
    /// Maximum creation timestamp observed, or the cursor if none exceeded it
    pub watermark: DateTime<Utc>,
    /// Whether the stored watermark actually moved this run
    pub advanced: bool,
}

/// Orchestrates watermark-driven ingestion over the component seams
pub struct Coordinator<S, W, K, L> {
    source: S,
    watermarks: W,
    sink: K,
    ledger: L,
    source_name: String,
    flow_name: String,
    batch_limit: u32,
}

impl<S, W, K, L> Coordinator<S, W, K, L>
where
    S: SourceClient,
    W: WatermarkStore,
    K: StagingSink,
    L: RunLedger,
{
    pub fn new(
        source: S,
        watermarks: W,
        sink: K,
        ledger: L,
        source_name: impl Into<String>,
        flow_name: impl Into<String>,
        batch_limit: u32,
    ) -> Self {
        Self {
            source,
            watermarks,
            sink,
            ledger,
            source_name: source_name.into(),
            flow_name: flow_name.into(),
            batch_limit,
        }
    }

    /// Execute one full ingestion cycle.
    ///
    /// A ledger row is opened before any work and finalized exactly once on
    /// both paths. Errors are returned to the caller after being recorded;
    /// retry policy belongs to the invoking scheduler.
    #[tracing::instrument(skip(self), fields(source = %self.source_name, flow = %self.flow_name))]
    pub async fn run_once(&self) -> Result<RunReport, IngestError> {
        let run_id = self.ledger.start(&self.flow_name).await?;

        match self.execute(run_id).await {
            Ok(report) => {
                self.ledger
                    .finish(
                        run_id,
                        RunStatus::Success,
                        report.rows_loaded as i64,
                        report.rows_rejected as i64,
                        Some(report.watermark),
                        None,
                    )
                    .await?;

                info!(
                    run_id = %report.run_id,
                    rows_loaded = report.rows_loaded,
                    rows_rejected = report.rows_rejected,
                    watermark = %report.watermark,
                    advanced = report.advanced,
                    "Ingestion cycle finished"
                );

                Ok(report)
            },
            Err(err) => {
                let detail = err.to_string();

                // Record the failure, then re-signal it. A ledger write
                // failure here must not mask the original error.
                if let Err(ledger_err) = self
                    .ledger
                    .finish(run_id, RunStatus::Failed, 0, 0, None, Some(&detail))
                    .await
                {
                    error!(
                        run_id = %run_id,
                        error = %ledger_err,
                        "Could not record failed run in ledger"
                    );
                }

                error!(run_id = %run_id, error = %detail, "Ingestion cycle failed");

                Err(err)
            },
        }
    }

    async fn execute(&self, run_id: Uuid) -> Result<RunReport, IngestError> {
        let cursor = self.watermarks.get(&self.source_name).await?;

        let raw = self.source.fetch_since(cursor, self.batch_limit).await?;
        let fetched = raw.len();

        let mut records: Vec<StagingRecord> = Vec::with_capacity(raw.len());
        let mut rows_rejected = 0u64;
        for record in &raw {
            match normalize(record) {
                Ok(staged) => records.push(staged),
                Err(reason) => {
                    rows_rejected += 1;
                    debug!(%reason, "Rejected raw record");
                },
            }
        }
        if rows_rejected > 0 {
            warn!(rows_rejected, fetched, "Some raw records were rejected");
        }

        let rows_loaded = if records.is_empty() {
            0
        } else {
            self.sink.upsert(&records).await?
        };

        let max_created = records
            .iter()
            .filter_map(|r| r.created_at)
            .max()
            .map_or(cursor, |observed| observed.max(cursor));

        // Advance only on forward progress: a batch of null or stale
        // creation timestamps leaves the cursor untouched.
        let mut advanced = false;
        if rows_loaded > 0 && max_created > cursor {
            advanced = self.watermarks.advance(&self.source_name, max_created).await?;
            if !advanced {
                warn!(
                    watermark = %max_created,
                    "Watermark not advanced; a concurrent run is already past it"
                );
            }
        }

        if fetched as u64 >= u64::from(self.batch_limit) {
            warn!(
                batch_limit = self.batch_limit,
                "Fetch filled the batch limit; backlog likely remains until the next invocation"
            );
        }

        Ok(RunReport {
            run_id,
            rows_loaded,
            rows_rejected,
            watermark: max_created,
            advanced,
        })
    }
}
