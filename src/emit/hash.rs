//! Content hashes for rendered reports.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of the JSON form of `value`, as lowercase hex.
///
/// Identical reports across runs hash identically, which lets a host skip
/// rewriting unchanged report files.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
