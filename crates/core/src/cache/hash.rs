//! Stable digests for cache rows.

use sha2::{Digest, Sha256};

/// Compute the row key of a cached request within a generation.
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// SHA-256 of a response body, hex encoded.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
