//! SHA-256 checksums of artifacts on disk.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{InspectError, InspectResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file.
///
/// Returns the lowercase hexadecimal digest of the file contents.
///
/// # Errors
///
/// Returns a classified [`InspectError`] if the file cannot be read.
pub fn file_checksum(path: &Path) -> InspectResult<String> {
    let mut file = File::open(path).map_err(|e| InspectError::from_io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| InspectError::from_io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check whether a file's SHA-256 checksum equals `expected`.
///
/// The comparison ignores case and surrounding whitespace. Read failures
/// are returned as errors and never reported as a mismatch.
pub fn verify_file_checksum(path: &Path, expected: &str) -> InspectResult<bool> {
    let actual = file_checksum(path)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}
