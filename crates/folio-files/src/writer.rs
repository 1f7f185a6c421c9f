//! Atomic document writes
//!
//! Content goes to a hidden temporary sibling first and is renamed over the
//! target, so a failed write never leaves a half-written document behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::FileError;
use crate::verifier::ContentVerifier;

/// Implements the temp-file-and-rename write pattern with verification
#[derive(Debug, Clone, Default)]
pub struct SafeWriter {
    verifier: ContentVerifier,
}

impl SafeWriter {
    /// Creates a new SafeWriter instance
    pub fn new() -> Self {
        SafeWriter {
            verifier: ContentVerifier::new(),
        }
    }

    /// Replaces the content of an existing file atomically
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the file to rewrite
    /// * `content` - Complete new content
    ///
    /// # Returns
    ///
    /// The SHA-256 of the written content, or an error. On error the
    /// original file is untouched.
    pub fn write(&self, path: &Path, content: &str) -> Result<String, FileError> {
        let temp_path = self.temp_path(path);

        if let Err(e) = self.write_temp(path, &temp_path, content) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(FileError::from_io(path, e));
        }

        self.verifier.verify_write(path, content)?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());

        Ok(ContentVerifier::compute_hash(content))
    }

    fn write_temp(&self, path: &Path, temp_path: &Path, content: &str) -> Result<(), FileError> {
        fs::write(temp_path, content).map_err(|e| FileError::from_io(path, e))?;

        // Keep the original mode bits across the rename
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(temp_path, metadata.permissions())
                .map_err(|e| FileError::from_io(path, e))?;
        }

        Ok(())
    }

    /// Hidden sibling in the same directory, so the rename stays on one filesystem
    fn temp_path(&self, path: &Path) -> PathBuf {
        let mut temp_path = path.to_path_buf();
        let file_name = format!(
            ".tmp-{}-{}",
            Uuid::new_v4(),
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document")
        );
        temp_path.set_file_name(file_name);
        temp_path
    }
}
