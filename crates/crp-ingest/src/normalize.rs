//! Record normalization
//!
//! Pure conversion from raw feed records to the staging schema. No I/O.
//!
//! The natural key and the creation timestamp are the only fields whose
//! absence rejects a record; everything else degrades to null on a parse
//! failure so a single malformed field never drops a whole snapshot.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::record::{RawRecord, StagingRecord};

/// Why a raw record was rejected by normalization.
///
/// Rejects are counted per batch and logged; they never fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reject {
    #[error("record has no unique_key field")]
    MissingNaturalKey,

    #[error("unique_key '{0}' is not an integer")]
    InvalidNaturalKey(String),

    #[error("record has no created_date field")]
    MissingCreatedAt,
}

/// Convert one raw feed record into a [`StagingRecord`].
///
/// Field mapping follows the upstream 311 dataset: `complaint_type` →
/// category, `descriptor` → subcategory, `borough` → region, `incident_zip`
/// → location code.
pub fn normalize(raw: &RawRecord) -> Result<StagingRecord, Reject> {
    let natural_key = natural_key(raw)?;

    // A present-but-unparseable created_date degrades to null like every
    // other field; only a missing one rejects the record.
    let created_raw = raw
        .get("created_date")
        .filter(|v| !v.is_null())
        .ok_or(Reject::MissingCreatedAt)?;
    let created_at = created_raw.as_str().and_then(parse_timestamp);

    Ok(StagingRecord {
        natural_key,
        created_at,
        updated_at: timestamp_field(raw, "updated_date"),
        category: text_field(raw, "complaint_type"),
        subcategory: text_field(raw, "descriptor"),
        status: text_field(raw, "status"),
        region: text_field(raw, "borough"),
        location_code: text_field(raw, "incident_zip"),
        latitude: float_field(raw, "latitude"),
        longitude: float_field(raw, "longitude"),
        raw_payload: Value::Object(raw.clone()),
    })
}

fn natural_key(raw: &RawRecord) -> Result<i64, Reject> {
    match raw.get("unique_key") {
        None | Some(Value::Null) => Err(Reject::MissingNaturalKey),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| Reject::InvalidNaturalKey(n.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| Reject::InvalidNaturalKey(s.clone())),
        Some(other) => Err(Reject::InvalidNaturalKey(other.to_string())),
    }
}

/// Parse a source-supplied ISO-8601 timestamp, with or without an explicit
/// offset. Offset-free values are treated as UTC (the feed serves UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn text_field(raw: &RawRecord, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn float_field(raw: &RawRecord, key: &str) -> Option<f64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp_field(raw: &RawRecord, key: &str) -> Option<DateTime<Utc>> {
    raw.get(key).and_then(Value::as_str).and_then(parse_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_normalize_full_record() {
        let record = raw(json!({
            "unique_key": "10042",
            "created_date": "2024-01-01T00:00:05.000",
            "updated_date": "2024-01-02T08:30:00.000",
            "complaint_type": "Noise - Residential",
            "descriptor": "Loud Music/Party",
            "status": "Open",
            "borough": "BROOKLYN",
            "incident_zip": "11211",
            "latitude": "40.7128",
            "longitude": "-73.9571"
        }));

        let staged = normalize(&record).unwrap();
        assert_eq!(staged.natural_key, 10042);
        assert_eq!(
            staged.created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap())
        );
        assert_eq!(staged.category.as_deref(), Some("Noise - Residential"));
        assert_eq!(staged.region.as_deref(), Some("BROOKLYN"));
        assert_eq!(staged.location_code.as_deref(), Some("11211"));
        assert_eq!(staged.latitude, Some(40.7128));
        assert_eq!(staged.raw_payload["unique_key"], json!("10042"));
    }

    #[test]
    fn test_missing_natural_key_rejects() {
        let record = raw(json!({ "created_date": "2024-01-01T00:00:05" }));
        assert_eq!(normalize(&record), Err(Reject::MissingNaturalKey));
    }

    #[test]
    fn test_non_numeric_natural_key_rejects() {
        let record = raw(json!({
            "unique_key": "not-a-number",
            "created_date": "2024-01-01T00:00:05"
        }));
        assert_eq!(
            normalize(&record),
            Err(Reject::InvalidNaturalKey("not-a-number".to_string()))
        );
    }

    #[test]
    fn test_missing_created_date_rejects() {
        let record = raw(json!({ "unique_key": "7" }));
        assert_eq!(normalize(&record), Err(Reject::MissingCreatedAt));
    }

    #[test]
    fn test_unparseable_created_date_degrades_to_null() {
        let record = raw(json!({
            "unique_key": "7",
            "created_date": "yesterday-ish"
        }));
        let staged = normalize(&record).unwrap();
        assert_eq!(staged.created_at, None);
    }

    #[test]
    fn test_bad_coordinates_degrade_to_null() {
        let record = raw(json!({
            "unique_key": "7",
            "created_date": "2024-01-01T00:00:05",
            "latitude": "N/A",
            "longitude": ""
        }));
        let staged = normalize(&record).unwrap();
        assert_eq!(staged.latitude, None);
        assert_eq!(staged.longitude, None);
    }

    #[test]
    fn test_offset_timestamps_normalize_to_utc() {
        let record = raw(json!({
            "unique_key": "7",
            "created_date": "2024-01-01T02:00:05+02:00"
        }));
        let staged = normalize(&record).unwrap();
        assert_eq!(
            staged.created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap())
        );
    }

    #[test]
    fn test_empty_strings_are_null() {
        let record = raw(json!({
            "unique_key": "7",
            "created_date": "2024-01-01T00:00:05",
            "borough": "  ",
            "status": ""
        }));
        let staged = normalize(&record).unwrap();
        assert_eq!(staged.region, None);
        assert_eq!(staged.status, None);
    }
}
