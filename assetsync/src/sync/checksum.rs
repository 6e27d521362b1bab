//! SHA-256 content digests for local files.
//!
//! Manifest checksums are lowercase hex SHA-256 over the complete file
//! content. Hashing always reads the whole file.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{EngineResult, SyncError};

/// Read buffer for hashing (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of the file at `path`.
///
/// # Errors
///
/// Returns [`SyncError::Filesystem`] if the file cannot be opened or read.
pub fn calculate_file_checksum(path: &Path) -> EngineResult<String> {
    let file = File::open(path).map_err(|e| SyncError::filesystem(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();

    io::copy(&mut reader, &mut hasher).map_err(|e| SyncError::filesystem(path, e))?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check a freshly written file against its manifest checksum.
///
/// Comparison ignores hex case. `rel_path` names the file in the error.
pub fn verify_checksum(path: &Path, rel_path: &str, expected: &str) -> EngineResult<()> {
    let actual = calculate_file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    Err(SyncError::IntegrityMismatch {
        path: rel_path.to_string(),
        expected: expected.to_string(),
        actual,
    })
}
