//! SHA-256 digests of transferred payloads.

use sha2::{Digest, Sha256};

/// Calculate the SHA-256 checksum of an in-memory payload.
///
/// Returns the lowercase hexadecimal digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
