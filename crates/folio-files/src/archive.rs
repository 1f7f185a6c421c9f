//! Soft-delete archiving with sidecar metadata
//!
//! Archived documents move into a hidden directory next to them and are
//! renamed `{stem}_{YYYYMMDD}_{HHMMSS}_{NNN}{ext}`, where `NNN` counts up
//! from 001 until the name is free. A JSON sidecar `{archived}.meta` records
//! where the file came from. The archived file is the source of truth: every
//! operation here still works when a sidecar is missing or unreadable.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::FileError;
use crate::models::{
    ArchiveEntry, ArchiveMetadata, CleanupFailure, CleanupReport, MoveOutcome, RestoreOutcome,
    VersionInfo, VersionKind,
};

static ARCHIVE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+)_\d{8}_\d{6}_\d{3,}$").expect("archive suffix pattern is valid")
});

const CLEANUP_REASON: &str = "cleanup";

/// Archive layout settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSettings {
    /// Name of the hidden archive directory created beside documents
    pub dir_name: String,
    /// Extension appended to archived names for sidecars
    pub metadata_suffix: String,
    /// Default glob for workspace cleanup
    pub cleanup_pattern: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            dir_name: ".folio_archive".to_string(),
            metadata_suffix: "meta".to_string(),
            cleanup_pattern: "*_old*".to_string(),
        }
    }
}

/// Moves documents in and out of per-directory archives
#[derive(Debug, Clone, Default)]
pub struct ArchiveManager {
    settings: ArchiveSettings,
}

impl ArchiveManager {
    /// Creates an ArchiveManager with the given layout
    pub fn new(settings: ArchiveSettings) -> Self {
        Self { settings }
    }

    /// Active settings
    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    /// Archive directory that belongs to `directory`
    pub fn archive_dir(&self, directory: &Path) -> PathBuf {
        directory.join(&self.settings.dir_name)
    }

    /// Sidecar path for an archived file
    pub fn sidecar_path(&self, archived: &Path) -> PathBuf {
        let mut name = archived
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(&self.settings.metadata_suffix);
        archived.with_file_name(name)
    }

    fn is_sidecar(&self, name: &str) -> bool {
        name.ends_with(&format!(".{}", self.settings.metadata_suffix))
    }

    /// Archives a document using the current local time
    ///
    /// # Arguments
    ///
    /// * `path` - Document to archive
    /// * `reason` - Free-form reason stored in the sidecar
    ///
    /// # Returns
    ///
    /// The archive entry, with every metadata field filled
    pub fn archive(&self, path: &Path, reason: &str) -> Result<ArchiveEntry, FileError> {
        self.archive_at(path, reason, Local::now())
    }

    /// Archives a document as if the current time were `now`
    pub fn archive_at(
        &self,
        path: &Path,
        reason: &str,
        now: DateTime<Local>,
    ) -> Result<ArchiveEntry, FileError> {
        let metadata = fs::metadata(path).map_err(|e| FileError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(FileError::InvalidContent(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let parent = parent_dir(path);
        let archive_dir = self.archive_dir(parent);
        fs::create_dir_all(&archive_dir).map_err(|e| FileError::from_io(&archive_dir, e))?;

        let (stem, extension) = split_name(path);
        let timestamp = now.format("%Y%m%d_%H%M%S");

        // Same-second archives of the same name count up
        let mut sequence: u32 = 1;
        let destination = loop {
            let candidate =
                archive_dir.join(format!("{}_{}_{:03}{}", stem, timestamp, sequence, extension));
            if !candidate.exists() {
                break candidate;
            }
            sequence += 1;
        };

        move_file(path, &destination)?;

        let sidecar = ArchiveMetadata {
            original_path: path.to_path_buf(),
            archived_at: now.into(),
            reason: reason.to_string(),
            original_name: path.file_name().map(|n| n.to_string_lossy().to_string()),
            sequence,
        };
        let has_metadata = match self.write_sidecar(&destination, &sidecar) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Archived {} but could not write its metadata: {}",
                    destination.display(),
                    e
                );
                false
            }
        };

        info!(
            "Archived {} to {} ({})",
            path.display(),
            destination.display(),
            reason
        );

        Ok(ArchiveEntry {
            original_path: Some(sidecar.original_path),
            archive_path: destination,
            archived_at: Some(sidecar.archived_at),
            reason: Some(sidecar.reason),
            sequence: Some(sequence),
            size: metadata.len(),
            modified: modified_time(&metadata),
            has_metadata,
        })
    }

    /// Moves an archived file back into the workspace
    ///
    /// The destination is `restore_path` when given, else the sidecar's
    /// original path, else the archived name with its timestamp suffix
    /// stripped, placed beside the archive directory. An occupied
    /// destination becomes `{stem}_1{ext}`, `{stem}_2{ext}` and so on.
    pub fn restore(
        &self,
        archive_path: &Path,
        restore_path: Option<&Path>,
    ) -> Result<RestoreOutcome, FileError> {
        let metadata =
            fs::metadata(archive_path).map_err(|e| FileError::from_io(archive_path, e))?;
        if !metadata.is_file() {
            return Err(FileError::NotFound(archive_path.to_path_buf()));
        }

        let sidecar_path = self.sidecar_path(archive_path);
        let sidecar = self.read_sidecar(archive_path);
        let original_path = sidecar.as_ref().map(|m| m.original_path.clone());

        let destination = match (restore_path, &original_path) {
            (Some(explicit), _) => explicit.to_path_buf(),
            (None, Some(original)) => original.clone(),
            (None, None) => derived_destination(archive_path),
        };
        let destination = free_destination(destination);

        let parent = parent_dir(&destination);
        fs::create_dir_all(parent).map_err(|e| FileError::from_io(parent, e))?;

        move_file(archive_path, &destination)?;

        if sidecar_path.exists() {
            if let Err(e) = fs::remove_file(&sidecar_path) {
                warn!("Could not remove {}: {}", sidecar_path.display(), e);
            }
        }

        info!(
            "Restored {} to {}",
            archive_path.display(),
            destination.display()
        );

        Ok(RestoreOutcome {
            restored_from: archive_path.to_path_buf(),
            restored_to: destination,
            original_path,
        })
    }

    /// Moves a document, archiving whatever already sits at the destination
    ///
    /// The document keeps its own name when `destination` is an existing
    /// directory or `into_directory` is set. Missing parent directories are
    /// created. An occupied destination is archived with the reason
    /// `replaced by {name}` before the move, so nothing is overwritten.
    pub fn move_document(
        &self,
        source: &Path,
        destination: &Path,
        into_directory: bool,
    ) -> Result<MoveOutcome, FileError> {
        let metadata = fs::metadata(source).map_err(|e| FileError::from_io(source, e))?;
        if !metadata.is_file() {
            return Err(FileError::InvalidContent(format!(
                "{} is not a regular file",
                source.display()
            )));
        }
        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| FileError::InvalidContent(format!("{} has no file name", source.display())))?;

        let destination = if into_directory || destination.is_dir() {
            destination.join(&name)
        } else {
            destination.to_path_buf()
        };
        if destination == source {
            return Err(FileError::InvalidContent(
                "source and destination are the same file".to_string(),
            ));
        }

        let parent = parent_dir(&destination);
        fs::create_dir_all(parent).map_err(|e| FileError::from_io(parent, e))?;

        let replaced = if destination.exists() {
            let reason = format!("replaced by {}", name.to_string_lossy());
            Some(self.archive(&destination, &reason)?)
        } else {
            None
        };

        move_file(source, &destination)?;
        info!("Moved {} to {}", source.display(), destination.display());

        Ok(MoveOutcome {
            moved_from: source.to_path_buf(),
            moved_to: destination,
            replaced,
        })
    }

    /// Lists archived documents of a directory, newest first
    ///
    /// Ordering uses the sidecar's archive time and falls back to the file's
    /// modification time. A directory without an archive yields nothing.
    pub fn list(&self, directory: &Path) -> Result<Vec<ArchiveEntry>, FileError> {
        let archive_dir = self.archive_dir(directory);
        if !archive_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&archive_dir).map_err(|e| FileError::from_io(&archive_dir, e))? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            let name = dir_entry.file_name().to_string_lossy().to_string();
            if self.is_sidecar(&name) {
                continue;
            }

            let metadata = match dir_entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };

            let sidecar = self.read_sidecar(&path);
            entries.push(ArchiveEntry {
                has_metadata: sidecar.is_some(),
                original_path: sidecar.as_ref().map(|m| m.original_path.clone()),
                archived_at: sidecar.as_ref().map(|m| m.archived_at),
                reason: sidecar.as_ref().map(|m| m.reason.clone()),
                sequence: sidecar.as_ref().map(|m| m.sequence),
                archive_path: path,
                size: metadata.len(),
                modified: modified_time(&metadata),
            });
        }

        entries.sort_by(|a, b| sort_time(b).cmp(&sort_time(a)));
        debug!(
            "Found {} archived documents in {}",
            entries.len(),
            archive_dir.display()
        );
        Ok(entries)
    }

    /// Live and archived files sharing a base name, newest first
    pub fn find_versions(
        &self,
        filename: &str,
        directory: &Path,
    ) -> Result<Vec<VersionInfo>, FileError> {
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if stem.is_empty() {
            return Err(FileError::InvalidContent(format!(
                "'{}' has no base name",
                filename
            )));
        }
        let pattern = compile_pattern(&format!("{}*", Pattern::escape(&stem)))?;

        let mut versions = Vec::new();
        for (path, metadata) in matching_files(directory, &pattern)? {
            versions.push(version_info(path, &metadata, VersionKind::Current));
        }

        let archive_dir = self.archive_dir(directory);
        if archive_dir.is_dir() {
            for (path, metadata) in matching_files(&archive_dir, &pattern)? {
                let is_sidecar = path
                    .file_name()
                    .map_or(false, |n| self.is_sidecar(&n.to_string_lossy()));
                if !is_sidecar {
                    versions.push(version_info(path, &metadata, VersionKind::Archived));
                }
            }
        }

        versions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(versions)
    }

    /// Archives every regular, non-hidden file matching `pattern`
    ///
    /// The pattern is matched against paths relative to `directory`, so
    /// `drafts/*.tex` and `**/*_old*` reach into subdirectories. Each file
    /// goes into the archive beside it. Failures are collected per file;
    /// the batch is not atomic.
    pub fn clean_workspace(
        &self,
        directory: &Path,
        pattern: Option<&str>,
    ) -> Result<CleanupReport, FileError> {
        if !directory.is_dir() {
            return Err(FileError::NotFound(directory.to_path_buf()));
        }
        let pattern = compile_pattern(pattern.unwrap_or(&self.settings.cleanup_pattern))?;

        let mut report = CleanupReport::default();
        for (path, _) in matching_files(directory, &pattern)? {
            match self.archive(&path, CLEANUP_REASON) {
                Ok(entry) => report.archived.push(entry),
                Err(e) => {
                    warn!("Cleanup could not archive {}: {}", path.display(), e);
                    report.errors.push(CleanupFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Cleanup of {} archived {} file(s), {} failure(s)",
            directory.display(),
            report.archived.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn write_sidecar(&self, archived: &Path, metadata: &ArchiveMetadata) -> Result<(), FileError> {
        let path = self.sidecar_path(archived);
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, json).map_err(|e| FileError::from_io(&path, e))
    }

    /// Sidecar contents, or `None` when missing or unreadable
    fn read_sidecar(&self, archived: &Path) -> Option<ArchiveMetadata> {
        let path = self.sidecar_path(archived);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Ignoring unreadable metadata {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// `(stem, ".ext")`, with an empty extension string when there is none
fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, extension)
}

fn derived_destination(archive_path: &Path) -> PathBuf {
    let archive_dir = parent_dir(archive_path);
    let workspace = parent_dir(archive_dir);
    let (stem, extension) = split_name(archive_path);
    let original_stem = ARCHIVE_SUFFIX
        .captures(&stem)
        .map(|caps| caps[1].to_string())
        .unwrap_or(stem);
    workspace.join(format!("{}{}", original_stem, extension))
}

fn free_destination(destination: PathBuf) -> PathBuf {
    if !destination.exists() {
        return destination;
    }
    let (stem, extension) = split_name(&destination);
    let parent = parent_dir(&destination).to_path_buf();
    (1..)
        .map(|counter| parent.join(format!("{}_{}{}", stem, counter, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(destination)
}

/// Renames, falling back to copy and remove when rename fails (across
/// filesystems, for instance)
fn move_file(source: &Path, destination: &Path) -> Result<(), FileError> {
    let rename_error = match fs::rename(source, destination) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    debug!(
        "Rename {} -> {} failed ({}), copying instead",
        source.display(),
        destination.display(),
        rename_error
    );

    if let Err(e) = fs::copy(source, destination) {
        // A partial copy must not be mistaken for the document
        let _ = fs::remove_file(destination);
        return Err(FileError::from_io(destination, e));
    }
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(FileError::from_io(source, e));
    }
    Ok(())
}

fn compile_pattern(pattern: &str) -> Result<Pattern, FileError> {
    let escapes = Path::new(pattern).is_absolute()
        || pattern.split(['/', '\\']).any(|part| part == "..");
    if escapes {
        return Err(FileError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern must stay inside the directory".to_string(),
        });
    }
    Pattern::new(pattern).map_err(|e| FileError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}

/// Regular, non-hidden files under `directory` whose relative paths match,
/// sorted by path
///
/// Subdirectories are only visited when `pattern` has a separator in it.
/// Hidden entries are never entered or returned, which keeps archive
/// directories out of the results.
fn matching_files(
    directory: &Path,
    pattern: &Pattern,
) -> Result<Vec<(PathBuf, fs::Metadata)>, FileError> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let recursive = pattern.as_str().contains('/');

    let mut files = Vec::new();
    let mut pending = vec![directory.to_path_buf()];
    while let Some(current) = pending.pop() {
        let read_dir = match fs::read_dir(&current) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(FileError::from_io(&current, e)),
        };

        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            if dir_entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let file_type = dir_entry.file_type()?;
            let path = dir_entry.path();
            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let relative = path.strip_prefix(directory).unwrap_or(&path);
            if pattern.matches_path_with(relative, options) {
                let metadata = dir_entry.metadata()?;
                files.push((path, metadata));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn modified_time(metadata: &fs::Metadata) -> DateTime<Local> {
    metadata
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now())
}

fn sort_time(entry: &ArchiveEntry) -> DateTime<Local> {
    entry
        .archived_at
        .map(|t| t.with_timezone(&Local))
        .unwrap_or(entry.modified)
}

fn version_info(path: PathBuf, metadata: &fs::Metadata, kind: VersionKind) -> VersionInfo {
    VersionInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path,
        kind,
        modified: modified_time(metadata),
        size: metadata.len(),
    }
}
