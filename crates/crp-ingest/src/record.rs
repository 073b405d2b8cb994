//! Staging record shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw feed record as returned by the remote API: a JSON object with
/// string-typed fields, preserved verbatim for lossless reprocessing.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// One externally-identified service request snapshot in the staging schema.
///
/// All fields except `natural_key` and `raw_payload` are nullable: the feed
/// is heterogeneous and parse failures degrade to null rather than failing
/// the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StagingRecord {
    /// Stable unique identifier from the source; staging primary key
    pub natural_key: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    pub location_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// The complete original record, stored as JSONB
    pub raw_payload: serde_json::Value,
}
