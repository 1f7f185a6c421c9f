//! Per-session file snapshots and external change detection
//!
//! Every path the session reads, edits or checks gets a snapshot of its
//! modification time, size, content hash and content. Later accesses compare
//! the cheap `(mtime, size)` pair first and only re-read and re-hash the file
//! when that pair moved, so unchanged documents are never read twice.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::diff::{DiffEngine, DiffStats};
use crate::error::FileError;
use crate::models::FileState;
use crate::verifier::ContentVerifier;

/// Live content of a file whose hash no longer matches its snapshot
#[derive(Debug, Clone)]
pub struct ExternalChange {
    /// Snapshot taken before the external write
    pub previous: FileState,
    /// Content now on disk
    pub current_content: String,
    /// SHA-256 of the live content
    pub current_hash: String,
    /// Modification time now on disk
    pub current_modified: SystemTime,
    /// Size now on disk
    pub current_size: u64,
}

/// Outcome of comparing a path against its snapshot
#[derive(Debug, Clone)]
pub enum ChangeStatus {
    /// No snapshot exists yet
    Untracked,
    /// Content matches the snapshot
    Unchanged,
    /// Content differs from the snapshot
    Modified(Box<ExternalChange>),
}

/// In-memory map of path to last seen [`FileState`]
///
/// Owned by a session; nothing here outlives the process.
#[derive(Debug, Default)]
pub struct FileStateStore {
    states: HashMap<PathBuf, FileState>,
    diff_engine: DiffEngine,
}

impl FileStateStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for a path, if tracked
    pub fn get(&self, path: &Path) -> Option<&FileState> {
        self.states.get(path)
    }

    /// Whether a path has a snapshot
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.states.contains_key(path)
    }

    /// Number of tracked paths
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drops the snapshot for a path
    pub fn forget(&mut self, path: &Path) -> Option<FileState> {
        self.states.remove(path)
    }

    /// Drops every snapshot
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Reads a file and records its snapshot
    pub fn record(&mut self, path: &Path) -> Result<&FileState, FileError> {
        let content = fs::read_to_string(path).map_err(|e| FileError::from_io(path, e))?;
        self.record_content(path, content)
    }

    /// Records a snapshot for content already in memory, taking the
    /// modification time and size from disk
    pub fn record_content(&mut self, path: &Path, content: String) -> Result<&FileState, FileError> {
        let (modified_time, byte_size) = stat(path)?;
        let state = FileState {
            path: path.to_path_buf(),
            modified_time,
            byte_size,
            content_hash: ContentVerifier::compute_hash(&content),
            cached_content: content,
            recorded_at: SystemTime::now(),
        };
        debug!(
            "Recorded snapshot of {} ({} bytes, {})",
            path.display(),
            byte_size,
            &state.content_hash[..12]
        );

        self.states.insert(path.to_path_buf(), state);
        Ok(&self.states[path])
    }

    /// Compares the live file with its snapshot
    ///
    /// Only reads the file when modification time or size moved. A touch that
    /// leaves the content hash intact refreshes the snapshot's time and size.
    pub fn check(&mut self, path: &Path) -> Result<ChangeStatus, FileError> {
        let (modified_time, byte_size) = stat(path)?;

        let Some(state) = self.states.get_mut(path) else {
            return Ok(ChangeStatus::Untracked);
        };

        if state.modified_time == modified_time && state.byte_size == byte_size {
            return Ok(ChangeStatus::Unchanged);
        }

        let content = fs::read_to_string(path).map_err(|e| FileError::from_io(path, e))?;
        let hash = ContentVerifier::compute_hash(&content);

        if hash == state.content_hash {
            debug!(
                "{} touched without content change, refreshing snapshot",
                path.display()
            );
            state.modified_time = modified_time;
            state.byte_size = byte_size;
            return Ok(ChangeStatus::Unchanged);
        }

        warn!("External modification detected on {}", path.display());
        Ok(ChangeStatus::Modified(Box::new(ExternalChange {
            previous: state.clone(),
            current_content: content,
            current_hash: hash,
            current_modified: modified_time,
            current_size: byte_size,
        })))
    }

    /// Whether the file diverged from its snapshot; untracked paths report false
    pub fn has_changed(&mut self, path: &Path) -> Result<bool, FileError> {
        Ok(matches!(self.check(path)?, ChangeStatus::Modified(_)))
    }

    /// Unified diff from the snapshot to the live file, only when the hash differs
    pub fn diff(&mut self, path: &Path) -> Result<Option<String>, FileError> {
        match self.check(path)? {
            ChangeStatus::Modified(change) => Ok(Some(self.render(path, &change))),
            ChangeStatus::Untracked | ChangeStatus::Unchanged => Ok(None),
        }
    }

    /// Renders the diff for an already detected change
    pub fn render(&self, path: &Path, change: &ExternalChange) -> String {
        self.diff_engine.change_report(
            path,
            &change.previous.cached_content,
            change.previous.modified_time,
            &change.current_content,
            change.current_modified,
        )
    }

    /// Accepts an external change as the new snapshot
    pub fn accept(&mut self, path: &Path, change: ExternalChange) {
        let state = FileState {
            path: path.to_path_buf(),
            modified_time: change.current_modified,
            byte_size: change.current_size,
            content_hash: change.current_hash,
            cached_content: change.current_content,
            recorded_at: SystemTime::now(),
        };
        self.states.insert(path.to_path_buf(), state);
    }

    /// Added and deleted line counts for an already detected change
    pub fn stats(&self, change: &ExternalChange) -> DiffStats {
        self.diff_engine
            .stats(&change.previous.cached_content, &change.current_content)
    }
}

fn stat(path: &Path) -> Result<(SystemTime, u64), FileError> {
    let metadata = fs::metadata(path).map_err(|e| FileError::from_io(path, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| FileError::from_io(path, e))?;
    Ok((modified, metadata.len()))
}
