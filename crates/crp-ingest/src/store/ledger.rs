//! Run ledger persistence
//!
//! One `pipeline_runs` row per ingestion execution: created in `running`
//! state at start, finalized exactly once to `success` or `failed`. The
//! ledger is write-only from the coordinator's perspective; it exists for
//! observability, never for control flow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

/// Terminal and in-flight run states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run ledger errors
#[derive(Debug, Error)]
#[error("run ledger error: {0}")]
pub struct LedgerError(#[from] sqlx::Error);

/// Seam between the coordinator and run bookkeeping
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Create a `running` ledger row and return its generated run id
    async fn start(&self, flow_name: &str) -> Result<Uuid, LedgerError>;

    /// Finalize a run. Called exactly once per run id, on both the success
    /// and the failure path.
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        run_id: Uuid,
        status: RunStatus,
        rows_loaded: i64,
        rows_rejected: i64,
        max_watermark: Option<DateTime<Utc>>,
        error_detail: Option<&str>,
    ) -> Result<(), LedgerError>;
}

/// Postgres-backed run ledger over `pipeline_runs`
pub struct PgRunLedger {
    pool: PgPool,
}

impl PgRunLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLedger for PgRunLedger {
    async fn start(&self, flow_name: &str) -> Result<Uuid, LedgerError> {
        let run_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (run_id, flow_name, status, started_at)
            VALUES ($1, $2, $3, now())
            "#,
        )
        .bind(run_id)
        .bind(flow_name)
        .bind(RunStatus::Running.as_str())
        .execute(&self.pool)
        .await?;

        Ok(run_id)
    }

    async fn finish(
        &self,
        run_id: Uuid,
        status: RunStatus,
        rows_loaded: i64,
        rows_rejected: i64,
        max_watermark: Option<DateTime<Utc>>,
        error_detail: Option<&str>,
    ) -> Result<(), LedgerError> {
        // The status guard makes the transition single-shot: a second finish
        // for the same run id is a no-op.
        let result = sqlx::query(
            r#"
            UPDATE pipeline_runs
            SET status = $2,
                finished_at = now(),
                rows_loaded = $3,
                rows_rejected = $4,
                max_watermark = $5,
                error_detail = $6
            WHERE run_id = $1 AND status = 'running'
            "#,
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(rows_loaded)
        .bind(rows_rejected)
        .bind(max_watermark)
        .bind(error_detail)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(run_id = %run_id, "Run was already finalized; finish ignored");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_as_str() {
        assert_eq!(RunStatus::Running.as_str(), "running");
        assert_eq!(RunStatus::Success.as_str(), "success");
        assert_eq!(RunStatus::Failed.as_str(), "failed");
    }
}
