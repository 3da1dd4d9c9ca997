use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serializes a JSON value with sorted object keys and no insignificant whitespace.
pub fn canonical_json(value: &Value) -> String {
    // serde_json's default map is ordered by key, so plain serialization is canonical.
    value.to_string()
}

/// Hex-encoded SHA-256 of the canonical JSON of `value`.
pub fn content_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}
