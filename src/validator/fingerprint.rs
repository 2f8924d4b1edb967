// file: src/validator/fingerprint.rs
// description: deterministic content fingerprint used as the sink's upsert key
// reference: https://docs.rs/sha2

use sha2::{Digest, Sha256};

pub const FINGERPRINT_SEPARATOR: &str = "|";

/// Lowercase hex SHA-256 of `control_id|resource_id|collected_at`.
///
/// Callers pass the field text with surrounding whitespace trimmed, not the
/// parsed values, so an unparseable timestamp still yields a stable key and
/// padding differences between exports do not split one unit into two.
pub fn compute_fingerprint(control_id: &str, resource_id: &str, collected_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(control_id.as_bytes());
    hasher.update(FINGERPRINT_SEPARATOR.as_bytes());
    hasher.update(resource_id.as_bytes());
    hasher.update(FINGERPRINT_SEPARATOR.as_bytes());
    hasher.update(collected_at.as_bytes());
    format!("{:x}", hasher.finalize())
}
