//! Content hashing and post-write verification

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::FileError;

/// Verifies file integrity through content comparison and hashing
#[derive(Debug, Clone, Default)]
pub struct ContentVerifier;

impl ContentVerifier {
    /// Creates a new ContentVerifier instance
    pub fn new() -> Self {
        ContentVerifier
    }

    /// Computes the hex SHA-256 of content
    pub fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Verifies that written content matches the source byte-for-byte
    pub fn verify_write(&self, path: &Path, expected: &str) -> Result<(), FileError> {
        let written = fs::read_to_string(path).map_err(|e| {
            FileError::VerificationFailed(format!("Failed to read written file: {}", e))
        })?;

        if written == expected {
            Ok(())
        } else {
            Err(FileError::VerificationFailed(format!(
                "Written content of {} does not match source",
                path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash_deterministic() {
        let content = "\\section{Intro}";
        assert_eq!(
            ContentVerifier::compute_hash(content),
            ContentVerifier::compute_hash(content)
        );
    }

    #[test]
    fn test_compute_hash_different_content() {
        assert_ne!(
            ContentVerifier::compute_hash("content1"),
            ContentVerifier::compute_hash("content2")
        );
    }

    #[test]
    fn test_compute_hash_empty_string() {
        assert_eq!(
            ContentVerifier::compute_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_write_matching_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("doc.md");
        fs::write(&file_path, "# Title\n").unwrap();

        assert!(ContentVerifier::new()
            .verify_write(&file_path, "# Title\n")
            .is_ok());
    }

    #[test]
    fn test_verify_write_mismatched_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("doc.md");
        fs::write(&file_path, "actual").unwrap();

        let result = ContentVerifier::new().verify_write(&file_path, "expected");
        assert!(matches!(result, Err(FileError::VerificationFailed(_))));
    }

    #[test]
    fn test_verify_write_nonexistent_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("missing.md");

        assert!(ContentVerifier::new()
            .verify_write(&file_path, "content")
            .is_err());
    }
}
