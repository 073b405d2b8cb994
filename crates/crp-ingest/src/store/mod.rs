//! Durable state adapters: watermark store, run ledger, staging sink
//!
//! Each adapter is a trait seam with a Postgres implementation. The
//! coordinator is generic over the seams so its invariants can be exercised
//! with in-memory fakes.

pub mod ledger;
pub mod sink;
pub mod watermark;

pub use ledger::{LedgerError, PgRunLedger, RunLedger, RunStatus};
pub use sink::{PgStagingSink, SinkError, StagingSink};
pub use watermark::{PgWatermarkStore, WatermarkError, WatermarkStore};
