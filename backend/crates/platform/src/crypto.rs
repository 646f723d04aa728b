//! Cryptographic Utilities

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 as 64 lowercase hex characters
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// First `len` hex characters of the SHA-256 digest
///
/// `len` is clamped to the 64 characters a digest has.
pub fn sha256_hex_prefix(data: &[u8], len: usize) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(len.min(64));
    digest
}

/// Whether `s` is exactly `len` ASCII hex digits (either case)
pub fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}
