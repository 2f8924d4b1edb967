// file: src/models/evidence.rs
// description: typed, fingerprinted outcome of validating one raw record
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Immutable evidence unit. `valid` is derived from `errors` at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedEvidence {
    control_id: String,
    resource_id: String,
    collected_at: DateTime<Utc>,
    collected_at_raw: String,
    payload: Map<String, Value>,
    fingerprint: String,
    valid: bool,
    errors: Vec<String>,
    line_number: u64,
}

impl ValidatedEvidence {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control_id: String,
        resource_id: String,
        collected_at: DateTime<Utc>,
        collected_at_raw: String,
        payload: Map<String, Value>,
        fingerprint: String,
        errors: Vec<String>,
        line_number: u64,
    ) -> Self {
        Self {
            control_id,
            resource_id,
            collected_at,
            collected_at_raw,
            payload,
            fingerprint,
            valid: errors.is_empty(),
            errors,
            line_number,
        }
    }

    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// Timestamp text exactly as it appeared in the input.
    pub fn collected_at_raw(&self) -> &str {
        &self.collected_at_raw
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(errors: Vec<String>) -> ValidatedEvidence {
        ValidatedEvidence::new(
            "c1".into(),
            "r1".into(),
            DateTime::<Utc>::UNIX_EPOCH,
            "1970-01-01T00:00:00Z".into(),
            Map::new(),
            "00".into(),
            errors,
            2,
        )
    }

    #[test]
    fn test_validity_follows_error_list() {
        assert!(evidence(vec![]).is_valid());

        let invalid = evidence(vec!["missing required field: resourceId".into()]);
        assert!(!invalid.is_valid());
        assert_eq!(invalid.errors().len(), 1);
    }

    #[test]
    fn test_serializes_validity_flag() {
        let json = serde_json::to_value(evidence(vec![])).unwrap();
        assert_eq!(json["valid"], Value::Bool(true));
        assert_eq!(json["control_id"], "c1");
    }
}
