// file: src/validator/mod.rs
// description: converts raw records into validated, fingerprinted evidence
// reference: record-level checks that annotate rather than abort

mod fingerprint;

pub use fingerprint::{FINGERPRINT_SEPARATOR, compute_fingerprint};

use crate::models::{RawRecord, ValidatedEvidence};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const CONTROL_ID_FIELD: &str = "controlId";
pub const RESOURCE_ID_FIELD: &str = "resourceId";
pub const COLLECTED_AT_FIELD: &str = "collectedAt";
pub const DATA_FIELD: &str = "data";

/// A record-level problem. Rendered into the evidence's error list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordIssue {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid data payload: {0}")]
    InvalidPayload(String),
}

/// Stateless validator; every record yields exactly one evidence unit.
#[derive(Debug, Clone, Default)]
pub struct EvidenceValidator;

impl EvidenceValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, record: &RawRecord) -> ValidatedEvidence {
        let control_id = record.field(CONTROL_ID_FIELD).trim();
        let resource_id = record.field(RESOURCE_ID_FIELD).trim();
        let collected_at_raw = record.field(COLLECTED_AT_FIELD).trim();

        let mut issues = Vec::new();

        for (name, value) in [
            (CONTROL_ID_FIELD, control_id),
            (RESOURCE_ID_FIELD, resource_id),
            (COLLECTED_AT_FIELD, collected_at_raw),
        ] {
            if value.is_empty() {
                issues.push(RecordIssue::MissingField(name));
            }
        }

        let collected_at = match parse_timestamp(collected_at_raw) {
            Ok(ts) => ts,
            Err(issue) => {
                issues.extend(issue);
                DateTime::<Utc>::UNIX_EPOCH
            }
        };

        let payload = match parse_payload(record.field(DATA_FIELD)) {
            Ok(payload) => payload,
            Err(issue) => {
                issues.push(issue);
                Map::new()
            }
        };

        let fingerprint = compute_fingerprint(control_id, resource_id, collected_at_raw);

        if !issues.is_empty() {
            debug!(
                "Line {} failed {} check(s): {:?}",
                record.line_number(),
                issues.len(),
                issues
            );
        }

        ValidatedEvidence::new(
            control_id.to_string(),
            resource_id.to_string(),
            collected_at,
            collected_at_raw.to_string(),
            payload,
            fingerprint,
            issues.iter().map(ToString::to_string).collect(),
            record.line_number(),
        )
    }
}

/// RFC 3339 timestamp. An empty value is already reported as missing, so it
/// fails without adding a second issue.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Option<RecordIssue>> {
    if raw.is_empty() {
        return Err(None);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            Some(RecordIssue::InvalidTimestamp {
                value: raw.to_string(),
                reason: e.to_string(),
            })
        })
}

fn parse_payload(raw: &str) -> Result<Map<String, Value>, RecordIssue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RecordIssue::InvalidPayload(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(RecordIssue::InvalidPayload(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Header;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn record(line: &str) -> RawRecord {
        let header = Arc::new(Header::parse("controlId,resourceId,collectedAt,data", ',').unwrap());
        RawRecord::from_line(header, line, ',', 2)
    }

    #[test]
    fn test_valid_record() {
        let evidence = EvidenceValidator::new().validate(&record(
            r#"c1,r1,2024-01-01T00:00:00Z,{"k":1}"#,
        ));

        assert!(evidence.is_valid());
        assert!(evidence.errors().is_empty());
        assert_eq!(evidence.control_id(), "c1");
        assert_eq!(
            evidence.collected_at(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(evidence.payload().get("k"), Some(&Value::from(1)));
        assert_eq!(
            evidence.fingerprint(),
            compute_fingerprint("c1", "r1", "2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_missing_resource_and_bad_timestamp() {
        let evidence = EvidenceValidator::new().validate(&record("c2,,bad-date,{}"));

        assert!(!evidence.is_valid());
        assert_eq!(evidence.errors().len(), 2);
        assert_eq!(evidence.errors()[0], "missing required field: resourceId");
        assert!(evidence.errors()[1].starts_with("invalid timestamp 'bad-date'"));
        assert_eq!(evidence.collected_at(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(
            evidence.fingerprint(),
            compute_fingerprint("c2", "", "bad-date")
        );
    }

    #[test]
    fn test_empty_timestamp_reported_once() {
        let evidence = EvidenceValidator::new().validate(&record("c1,r1,,"));
        assert_eq!(
            evidence.errors(),
            &["missing required field: collectedAt".to_string()]
        );
        assert_eq!(evidence.collected_at(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_payload_failures_are_not_fatal() {
        let validator = EvidenceValidator::new();

        let broken = validator.validate(&record("c1,r1,2024-01-01T00:00:00Z,{not json"));
        assert!(!broken.is_valid());
        assert!(broken.payload().is_empty());
        assert!(broken.errors()[0].starts_with("invalid data payload"));

        let array = validator.validate(&record("c1,r1,2024-01-01T00:00:00Z,[1,2]"));
        assert_eq!(
            array.errors(),
            &["invalid data payload: expected a JSON object, found an array".to_string()]
        );
    }

    #[test]
    fn test_absent_data_column_is_empty_payload() {
        let header = Arc::new(Header::parse("controlId,resourceId,collectedAt", ',').unwrap());
        let raw = RawRecord::from_line(header, "c1,r1,2024-06-30T12:00:00+02:00", ',', 9);
        let evidence = EvidenceValidator::new().validate(&raw);

        assert!(evidence.is_valid());
        assert!(evidence.payload().is_empty());
        assert_eq!(
            evidence.collected_at(),
            Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()
        );
        assert_eq!(evidence.line_number(), 9);
    }

    #[test]
    fn test_all_required_fields_missing() {
        let evidence = EvidenceValidator::new().validate(&record(""));
        assert_eq!(evidence.errors().len(), 3);
        assert_eq!(evidence.fingerprint(), compute_fingerprint("", "", ""));
    }

    #[test]
    fn test_fingerprint_ignores_surrounding_whitespace() {
        let validator = EvidenceValidator::new();
        let padded = validator.validate(&record(" c1 , r1 ,2024-01-01T00:00:00Z ,{}"));
        let tight = validator.validate(&record("c1,r1,2024-01-01T00:00:00Z,{}"));

        assert!(padded.is_valid());
        assert_eq!(padded.fingerprint(), tight.fingerprint());
        assert_eq!(padded.collected_at_raw(), "2024-01-01T00:00:00Z");
    }
}
