use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// SHA-256 hash (32 bytes).
pub type Hash = [u8; 32];

/// Prefix of integrity strings carried by compliance credentials.
pub const INTEGRITY_PREFIX: &str = "sha256-";

/// Hash arbitrary data using SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hex-encoded SHA-256 of arbitrary data.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Integrity string (`sha256-<hex>`) of a canonicalized document.
pub fn integrity(canonical: &CanonicalBytes) -> String {
    format!("{}{}", INTEGRITY_PREFIX, sha256_hex(canonical.as_bytes()))
}

/// Check an integrity string against canonical bytes. Comparison of the hex
/// digest is case-insensitive.
pub fn verify_integrity(canonical: &CanonicalBytes, expected: &str) -> bool {
    match expected.strip_prefix(INTEGRITY_PREFIX) {
        Some(digest) => digest.eq_ignore_ascii_case(&sha256_hex(canonical.as_bytes())),
        None => false,
    }
}
