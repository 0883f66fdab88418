//! Content hashing and timestamps.

use super::errors::MessageError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Serialize a payload to the exact bytes that get hashed and broadcast.
pub fn canonical_bytes<T: Serialize>(payload: &T) -> Result<Vec<u8>, MessageError> {
    Ok(serde_json::to_vec(payload)?)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Canonical-serialize `payload` and hash it.
pub fn build_content_hash<T: Serialize>(payload: &T) -> Result<String, MessageError> {
    canonical_bytes(payload).map(|bytes| content_hash(&bytes))
}

/// True for a 64-character lowercase hex string.
pub fn is_item_hash(candidate: &str) -> bool {
    candidate.len() == HASH_HEX_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Seconds since the epoch, truncated to millisecond precision.
pub fn now_seconds() -> f64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    millis as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_hash() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_build_content_hash_matches_raw_bytes() {
        let payload = json!({"address": "0xabc", "time": 1.5});
        let bytes = canonical_bytes(&payload).unwrap();
        assert_eq!(build_content_hash(&payload).unwrap(), content_hash(&bytes));
        assert!(is_item_hash(&content_hash(&bytes)));
    }

    #[test]
    fn test_is_item_hash() {
        assert!(is_item_hash(&"a".repeat(64)));
        assert!(!is_item_hash(&"A".repeat(64)));
        assert!(!is_item_hash(&"a".repeat(63)));
        assert!(!is_item_hash(&"g".repeat(64)));
    }

    #[test]
    fn test_now_has_millisecond_precision() {
        let now = now_seconds();
        assert!(now > 1_600_000_000.0);
        let scaled = now * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-3);
    }
}
