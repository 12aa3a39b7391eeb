//! Content hashing for queued write requests.
//!
//! Uses SHA256 over stable ordered parts with null separators, so the same
//! write produces the same hash on every run and replays can be deduplicated
//! by the transport.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the SHA256 content hash of a write request.
///
/// Parts (in order): operation, target key (empty on create), payload JSON.
/// `serde_json` objects serialize with sorted keys, so the payload text is
/// canonical regardless of insertion order.
#[must_use]
pub fn write_request_hash(operation: &str, target_key: Option<&str>, payload: &Value) -> String {
    let mut hasher = Sha256::new();

    let mut add_field = |value: &str| {
        if value.contains('\0') {
            hasher.update(value.replace('\0', " ").as_bytes());
        } else {
            hasher.update(value.as_bytes());
        }
        hasher.update(b"\x00");
    };

    add_field(operation);
    add_field(target_key.unwrap_or(""));
    add_field(&payload.to_string());

    format!("{:x}", hasher.finalize())
}
