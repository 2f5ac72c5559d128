//! # Canonical Encoding
//!
//! Deterministic byte form shared by block hashing, Merkle roots and
//! transaction signatures: JSON with sorted object keys and no whitespace,
//! digested with SHA-256 into lowercase hex.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// All-zero sentinel used for the genesis parent hash and the empty Merkle root.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Serialize `value` into its canonical byte form.
///
/// Routing through `serde_json::Value` places every object key in a
/// `BTreeMap`, so nested keys come out sorted regardless of field order.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_vec(&value)
}

/// SHA-256 of `bytes` as 64 lowercase hex characters.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
