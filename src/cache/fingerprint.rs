//! Canonical fingerprinting for cache keys (§4.2 "Fingerprint keys").
//!
//! Both the Pairing Engine and the Weather Fetcher derive cache keys by
//! canonicalizing their semantically relevant inputs before hashing, so that
//! two requests differing only in field order or casing collapse onto the
//! same key.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Recursively lowercases string leaves and sorts object keys, then hashes
/// the canonical JSON encoding with SHA-256. Arrays of strings are also
/// sorted so that e.g. `dietary_restrictions: ["vegan", "gluten-free"]` and
/// `["gluten-free", "vegan"]` fingerprint identically.
pub fn canonical_fingerprint(prefix: &str, value: &Value) -> String {
    let canonical = canonicalize(value);
    let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    format!("{prefix}:{digest:x}")
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_lowercase()),
        Value::Array(items) => {
            let mut canon: Vec<Value> = items.iter().map(canonicalize).collect();
            canon.sort_by_key(|v| v.to_string());
            Value::Array(canon)
        }
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .iter()
                .map(|(k, v)| (k.to_lowercase(), canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        other => other.clone(),
    }
}
