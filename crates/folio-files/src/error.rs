//! Error types for document editing and archive operations

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during document operations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// File not found at the specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Line-addressed insertion outside the file
    #[error("Line {line_number} is out of range (file has {line_count} lines; valid: 1..={max})", max = .line_count + 1)]
    OutOfRange {
        /// Requested 1-based line number
        line_number: usize,
        /// Number of lines in the file
        line_count: usize,
    },

    /// File changed on disk since it was last read through this session
    #[error("File {path:?} was modified externally since last read:\n{diff}")]
    ExternalModification {
        /// Path of the modified file
        path: PathBuf,
        /// Unified diff from the last seen content to the live content
        diff: String,
    },

    /// The content buffer was required but holds nothing
    #[error("Content buffer is empty: no previously attempted replacement to reuse")]
    BufferEmpty,

    /// Invalid content or arguments for an edit
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Invalid glob pattern
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Offending pattern
        pattern: String,
        /// Parser message
        reason: String,
    },

    /// Fuzzy threshold outside [0, 1]
    #[error("Fuzzy threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// Sidecar metadata could not be encoded or decoded
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Content verification after write failed
    #[error("Content verification failed: {0}")]
    VerificationFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl FileError {
    /// Maps an IO error to a path-aware variant where the kind allows it
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => FileError::PermissionDenied(path.to_path_buf()),
            _ => FileError::IoError(err),
        }
    }

    /// Stable snake_case name for transports that report errors as data
    pub fn kind(&self) -> &'static str {
        match self {
            FileError::NotFound(_) => "not_found",
            FileError::PermissionDenied(_) => "permission_denied",
            FileError::OutOfRange { .. } => "out_of_range",
            FileError::ExternalModification { .. } => "external_modification",
            FileError::BufferEmpty => "buffer_empty",
            FileError::InvalidContent(_) => "invalid_content",
            FileError::InvalidPattern { .. } => "invalid_pattern",
            FileError::InvalidThreshold(_) => "invalid_threshold",
            FileError::Metadata(_) => "metadata",
            FileError::VerificationFailed(_) => "verification_failed",
            FileError::IoError(_) => "io",
        }
    }
}

/// Result alias for document operations
pub type Result<T> = std::result::Result<T, FileError>;
