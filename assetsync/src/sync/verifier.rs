//! Per-file fetch/skip decisions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::checksum::calculate_file_checksum;
use crate::error::{EngineResult, SyncError};

/// What the manifest expects of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedFile<'a> {
    pub size: u64,
    pub checksum: Option<&'a str>,
    pub sync: bool,
}

/// A regular file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileInfo {
    pub path: PathBuf,
    pub size: u64,
}

impl LocalFileInfo {
    /// Stat `path`, returning `None` if nothing usable exists there.
    ///
    /// A directory sitting where a file is expected counts as absent; the
    /// download will then fail with a filesystem error for that path.
    pub fn inspect(path: &Path) -> EngineResult<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Some(Self {
                path: path.to_path_buf(),
                size: meta.len(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::filesystem(path, e)),
        }
    }
}

/// Decides whether a local file already satisfies its manifest entry.
///
/// | local   | sync  | decision                       |
/// |---------|-------|--------------------------------|
/// | absent  | any   | fetch                          |
/// | present | false | skip (presence is enough)      |
/// | present | true  | skip iff size and digest match |
///
/// The digest is only computed when the sizes already agree.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if the file must be downloaded.
    pub fn should_fetch(&self, local: Option<&LocalFileInfo>, expected: &ExpectedFile<'_>) -> bool {
        let Some(local) = local else {
            return true;
        };

        if !expected.sync {
            return false;
        }

        if local.size != expected.size {
            tracing::debug!(
                path = %local.path.display(),
                local = local.size,
                expected = expected.size,
                "Size mismatch"
            );
            return true;
        }

        let Some(checksum) = expected.checksum else {
            return false;
        };

        match calculate_file_checksum(&local.path) {
            Ok(actual) => {
                let matches = actual.eq_ignore_ascii_case(checksum);
                if !matches {
                    tracing::debug!(
                        path = %local.path.display(),
                        expected = checksum,
                        actual = %actual,
                        "Checksum mismatch"
                    );
                }
                !matches
            }
            Err(e) => {
                tracing::warn!(path = %local.path.display(), error = %e, "Cannot hash local file");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn local_with(temp: &TempDir, name: &str, content: &[u8]) -> LocalFileInfo {
        let path = temp.path().join(name);
        fs::write(&path, content).unwrap();
        LocalFileInfo::inspect(&path).unwrap().unwrap()
    }

    #[test]
    fn test_absent_is_fetched() {
        let verifier = IntegrityVerifier::new();
        for sync in [true, false] {
            let expected = ExpectedFile {
                size: 5,
                checksum: Some(HELLO_SHA256),
                sync,
            };
            assert!(verifier.should_fetch(None, &expected));
        }
    }

    #[test]
    fn test_non_sync_present_is_skipped_even_if_different() {
        let temp = TempDir::new().unwrap();
        let local = local_with(&temp, "options.txt", b"user edited this");
        let expected = ExpectedFile {
            size: 3,
            checksum: Some("abc123"),
            sync: false,
        };
        assert!(!IntegrityVerifier::new().should_fetch(Some(&local), &expected));
    }

    #[test]
    fn test_sync_match_is_skipped() {
        let temp = TempDir::new().unwrap();
        let local = local_with(&temp, "a.cfg", b"hello");
        let expected = ExpectedFile {
            size: 5,
            checksum: Some(HELLO_SHA256),
            sync: true,
        };
        assert!(!IntegrityVerifier::new().should_fetch(Some(&local), &expected));
    }

    #[test]
    fn test_sync_checksum_mismatch_is_fetched() {
        let temp = TempDir::new().unwrap();
        let local = local_with(&temp, "a.cfg", b"hello");
        let expected = ExpectedFile {
            size: 5,
            checksum: Some("abc123"),
            sync: true,
        };
        assert!(IntegrityVerifier::new().should_fetch(Some(&local), &expected));
    }

    #[test]
    fn test_sync_size_mismatch_is_fetched() {
        let temp = TempDir::new().unwrap();
        let local = local_with(&temp, "a.cfg", b"hello!");
        let expected = ExpectedFile {
            size: 5,
            checksum: Some(HELLO_SHA256),
            sync: true,
        };
        assert!(IntegrityVerifier::new().should_fetch(Some(&local), &expected));
    }

    #[test]
    fn test_inspect_missing_and_directory() {
        let temp = TempDir::new().unwrap();
        assert_eq!(LocalFileInfo::inspect(&temp.path().join("nope")).unwrap(), None);
        assert_eq!(LocalFileInfo::inspect(temp.path()).unwrap(), None);
    }
}
