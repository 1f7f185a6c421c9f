//! Session facade and operation dispatch
//!
//! A [`DocumentSession`] is the unit of state a caller talks to: it owns one
//! [`EditEngine`] (snapshots plus content buffer) and one [`ArchiveManager`],
//! and resolves every raw path through an injected [`PathResolver`].
//! [`Operation`] is the serializable form of each call, so transports such
//! as the CLI's JSON-lines mode can forward requests without knowing their
//! shape.
//!
//! # Example
//!
//! ```ignore
//! use folio_files::{DocumentSession, Operation, WorkspaceResolver};
//!
//! let mut session = DocumentSession::with_defaults(Box::new(WorkspaceResolver::default()));
//! let output = session.execute(Operation::Status { path: "paper.tex".into() })?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::{ArchiveManager, ArchiveSettings};
use crate::batch::BatchReport;
use crate::edit::{EditEngine, EditSettings};
use crate::error::FileError;
use crate::models::{
    ArchiveEntry, AuxGroup, AuxListing, AuxRemoval, CleanupReport, EditChange, EditRequest,
    EditResult, InsertMode, MoveOutcome, ReadView, RestoreOutcome, StatusReport, VersionInfo,
};
use crate::resolver::PathResolver;

const DEFAULT_ARCHIVE_REASON: &str = "manual";

fn default_expected_occurrences() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Every call a session accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Line-numbered window of a document
    Read {
        /// Document path
        path: String,
        /// First line, 1-based
        #[serde(default)]
        offset: Option<usize>,
        /// Maximum number of lines
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Exact-match replacement with fallback recovery
    Edit {
        /// Document path
        path: String,
        /// Literal text to find
        needle: String,
        /// Text to put in its place
        replacement: String,
        /// Occurrences the caller expects
        #[serde(default = "default_expected_occurrences")]
        expected_occurrences: usize,
    },
    /// Several exact replacements written together or not at all
    EditMany {
        /// Document path
        path: String,
        /// Replacements in the order they apply
        changes: Vec<EditChange>,
    },
    /// Retry from the content buffer
    EditFromBuffer {
        /// Document path
        path: String,
        /// Text to find; defaults to a prefix of the replacement
        #[serde(default)]
        needle: Option<String>,
        /// Replacement; defaults to the buffer
        #[serde(default)]
        replacement: Option<String>,
        /// Fuzzy threshold in `[0, 1]`
        #[serde(default)]
        fuzzy_threshold: Option<f64>,
    },
    /// Line-addressed insertion
    InsertAtLine {
        /// Document path
        path: String,
        /// Target line, 1-based
        line_number: usize,
        /// Content; defaults to the buffer
        #[serde(default)]
        content: Option<String>,
        /// Placement relative to the target line
        #[serde(default)]
        mode: InsertMode,
    },
    /// Change detection report
    Status {
        /// Document path
        path: String,
    },
    /// Soft delete
    Archive {
        /// Document path
        path: String,
        /// Reason stored in the sidecar
        #[serde(default)]
        reason: Option<String>,
    },
    /// Undo a soft delete
    Restore {
        /// Archived file
        archive_path: String,
        /// Explicit destination
        #[serde(default)]
        restore_path: Option<String>,
    },
    /// Archived documents of a directory
    ListArchived {
        /// Directory owning the archive
        directory: String,
    },
    /// Live and archived files sharing a base name
    FindVersions {
        /// File whose stem is searched
        filename: String,
        /// Directory to search
        directory: String,
    },
    /// Archive every file matching a glob
    CleanWorkspace {
        /// Directory to clean
        directory: String,
        /// Glob; defaults to the configured cleanup pattern
        #[serde(default)]
        pattern: Option<String>,
    },
    /// Move a document, archiving an occupied destination
    Move {
        /// Document to move
        source: String,
        /// New path, or a directory to move into
        destination: String,
    },
    /// Archive LaTeX build files
    CleanAux {
        /// A `.tex` source or a directory of them
        path: String,
        /// Leave `.bbl`, `.bcf` and `.run.xml` in place
        #[serde(default = "default_true")]
        keep_bibliography: bool,
    },
    /// Delete build files so the next build regenerates them
    RefreshAux {
        /// The `.tex` source
        path: String,
        /// Which files to delete
        #[serde(default)]
        types: AuxGroup,
    },
    /// Build files present beside a LaTeX source
    ListAux {
        /// The `.tex` source
        path: String,
    },
    /// Several operations validated together, then run in order
    Batch {
        /// Operations to run
        steps: Vec<Operation>,
        /// Validate without running
        #[serde(default)]
        dry_run: bool,
        /// End the batch at the first failing step
        #[serde(default)]
        stop_on_error: bool,
    },
}

impl Operation {
    /// Stable operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Read { .. } => "read",
            Operation::Edit { .. } => "edit",
            Operation::EditMany { .. } => "edit_many",
            Operation::EditFromBuffer { .. } => "edit_from_buffer",
            Operation::InsertAtLine { .. } => "insert_at_line",
            Operation::Status { .. } => "status",
            Operation::Archive { .. } => "archive",
            Operation::Restore { .. } => "restore",
            Operation::ListArchived { .. } => "list_archived",
            Operation::FindVersions { .. } => "find_versions",
            Operation::CleanWorkspace { .. } => "clean_workspace",
            Operation::Move { .. } => "move",
            Operation::CleanAux { .. } => "clean_aux",
            Operation::RefreshAux { .. } => "refresh_aux",
            Operation::ListAux { .. } => "list_aux",
            Operation::Batch { .. } => "batch",
        }
    }
}

/// Result of [`DocumentSession::execute`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum OperationOutput {
    /// From `read`
    Read(ReadView),
    /// From `edit`, `edit_many`, `edit_from_buffer` and `insert_at_line`
    Edit(EditResult),
    /// From `status`
    Status(StatusReport),
    /// From `archive`
    Archive(ArchiveEntry),
    /// From `restore`
    Restore(RestoreOutcome),
    /// From `list_archived`
    ArchiveList(Vec<ArchiveEntry>),
    /// From `find_versions`
    Versions(Vec<VersionInfo>),
    /// From `clean_workspace` and `clean_aux`
    Cleanup(CleanupReport),
    /// From `move`
    Move(MoveOutcome),
    /// From `list_aux`
    AuxList(AuxListing),
    /// From `refresh_aux`
    AuxRefresh(AuxRemoval),
    /// From `batch`
    Batch(BatchReport),
}

/// Settings for a session's components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSettings {
    /// Matching and reporting tunables
    pub edit: EditSettings,
    /// Archive layout
    pub archive: ArchiveSettings,
}

/// One caller's editing session
pub struct DocumentSession {
    engine: EditEngine,
    archive: ArchiveManager,
    resolver: Box<dyn PathResolver>,
}

impl DocumentSession {
    /// Creates a session with empty state
    pub fn new(resolver: Box<dyn PathResolver>, settings: SessionSettings) -> Self {
        Self {
            engine: EditEngine::new(settings.edit),
            archive: ArchiveManager::new(settings.archive),
            resolver,
        }
    }

    /// Creates a session with default settings
    pub fn with_defaults(resolver: Box<dyn PathResolver>) -> Self {
        Self::new(resolver, SessionSettings::default())
    }

    /// Editing engine
    pub fn engine(&self) -> &EditEngine {
        &self.engine
    }

    /// Mutable editing engine
    pub fn engine_mut(&mut self) -> &mut EditEngine {
        &mut self.engine
    }

    /// Archive manager
    pub fn archive_manager(&self) -> &ArchiveManager {
        &self.archive
    }

    /// Resolves a raw path through the injected resolver
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, FileError> {
        self.resolver.resolve(raw)
    }

    /// Reads a window of a document
    pub fn read(
        &mut self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<ReadView, FileError> {
        let path = self.resolve(path)?;
        let limit = limit.unwrap_or(self.engine.settings().read_limit);
        self.engine.read(&path, offset.unwrap_or(1), limit)
    }

    /// Replaces literal text
    pub fn edit(
        &mut self,
        path: &str,
        needle: &str,
        replacement: &str,
        expected_occurrences: usize,
    ) -> Result<EditResult, FileError> {
        let request =
            EditRequest::new(self.resolve(path)?, needle, replacement).expecting(expected_occurrences);
        self.engine.apply(&request)
    }

    /// Applies several replacements as one write
    pub fn edit_many(
        &mut self,
        path: &str,
        changes: &[EditChange],
    ) -> Result<EditResult, FileError> {
        let path = self.resolve(path)?;
        self.engine.apply_all(&path, changes)
    }

    /// Retries an edit from the buffer
    pub fn edit_from_buffer(
        &mut self,
        path: &str,
        needle: Option<&str>,
        replacement: Option<&str>,
        fuzzy_threshold: Option<f64>,
    ) -> Result<EditResult, FileError> {
        let path = self.resolve(path)?;
        self.engine
            .edit_from_buffer(&path, needle, replacement, fuzzy_threshold)
    }

    /// Inserts content at a line
    pub fn insert_at_line(
        &mut self,
        path: &str,
        line_number: usize,
        content: Option<&str>,
        mode: InsertMode,
    ) -> Result<EditResult, FileError> {
        let path = self.resolve(path)?;
        self.engine.insert_at_line(&path, line_number, content, mode)
    }

    /// Reports external changes
    pub fn status(&mut self, path: &str) -> Result<StatusReport, FileError> {
        let path = self.resolve(path)?;
        self.engine.status(&path)
    }

    /// Archives a document and stops tracking it
    pub fn archive(&mut self, path: &str, reason: Option<&str>) -> Result<ArchiveEntry, FileError> {
        let path = self.resolve(path)?;
        let entry = self
            .archive
            .archive(&path, reason.unwrap_or(DEFAULT_ARCHIVE_REASON))?;
        self.engine.store_mut().forget(&path);
        Ok(entry)
    }

    /// Restores an archived document; the destination starts untracked
    pub fn restore(
        &mut self,
        archive_path: &str,
        restore_path: Option<&str>,
    ) -> Result<RestoreOutcome, FileError> {
        let archive_path = self.resolve(archive_path)?;
        let restore_path = restore_path.map(|p| self.resolve(p)).transpose()?;
        let outcome = self
            .archive
            .restore(&archive_path, restore_path.as_deref())?;
        self.engine.store_mut().forget(&outcome.restored_to);
        Ok(outcome)
    }

    /// Lists archived documents of a directory
    pub fn list_archived(&self, directory: &str) -> Result<Vec<ArchiveEntry>, FileError> {
        let directory = self.resolve(directory)?;
        self.archive.list(&directory)
    }

    /// Finds every version of a document
    pub fn find_versions(
        &self,
        filename: &str,
        directory: &str,
    ) -> Result<Vec<VersionInfo>, FileError> {
        let directory = self.resolve(directory)?;
        self.archive.find_versions(filename, &directory)
    }

    /// Archives files matching a pattern and stops tracking them
    pub fn clean_workspace(
        &mut self,
        directory: &str,
        pattern: Option<&str>,
    ) -> Result<CleanupReport, FileError> {
        let directory = self.resolve(directory)?;
        let report = self.archive.clean_workspace(&directory, pattern)?;
        self.forget_archived(&report);
        Ok(report)
    }

    /// Moves a document; both ends start untracked
    pub fn move_document(
        &mut self,
        source: &str,
        destination: &str,
    ) -> Result<MoveOutcome, FileError> {
        let into_directory = destination.ends_with('/');
        let source = self.resolve(source)?;
        let destination = self.resolve(destination)?;
        let outcome = self
            .archive
            .move_document(&source, &destination, into_directory)?;
        self.forget(&outcome.moved_from);
        self.forget(&outcome.moved_to);
        Ok(outcome)
    }

    /// Archives LaTeX build files
    pub fn clean_aux(
        &mut self,
        path: &str,
        keep_bibliography: bool,
    ) -> Result<CleanupReport, FileError> {
        let path = self.resolve(path)?;
        let report = self.archive.clean_aux(&path, keep_bibliography)?;
        self.forget_archived(&report);
        Ok(report)
    }

    /// Deletes one group of build files
    pub fn refresh_aux(&mut self, path: &str, group: AuxGroup) -> Result<AuxRemoval, FileError> {
        let path = self.resolve(path)?;
        let removal = self.archive.refresh_aux(&path, group)?;
        for removed in &removal.removed {
            self.forget(removed);
        }
        Ok(removal)
    }

    /// Lists build files beside a LaTeX source
    pub fn list_aux(&self, path: &str) -> Result<AuxListing, FileError> {
        let path = self.resolve(path)?;
        self.archive.list_aux(&path)
    }

    fn forget_archived(&mut self, report: &CleanupReport) {
        for original in report.archived.iter().filter_map(|e| e.original_path.as_deref()) {
            self.forget(original);
        }
    }

    fn forget(&mut self, path: &Path) {
        self.engine.store_mut().forget(path);
    }

    /// Runs one operation
    pub fn execute(&mut self, operation: Operation) -> Result<OperationOutput, FileError> {
        debug!("Executing {}", operation.name());
        match operation {
            Operation::Read {
                path,
                offset,
                limit,
            } => self.read(&path, offset, limit).map(OperationOutput::Read),
            Operation::Edit {
                path,
                needle,
                replacement,
                expected_occurrences,
            } => self
                .edit(&path, &needle, &replacement, expected_occurrences)
                .map(OperationOutput::Edit),
            Operation::EditMany { path, changes } => {
                self.edit_many(&path, &changes).map(OperationOutput::Edit)
            }
            Operation::EditFromBuffer {
                path,
                needle,
                replacement,
                fuzzy_threshold,
            } => self
                .edit_from_buffer(
                    &path,
                    needle.as_deref(),
                    replacement.as_deref(),
                    fuzzy_threshold,
                )
                .map(OperationOutput::Edit),
            Operation::InsertAtLine {
                path,
                line_number,
                content,
                mode,
            } => self
                .insert_at_line(&path, line_number, content.as_deref(), mode)
                .map(OperationOutput::Edit),
            Operation::Status { path } => self.status(&path).map(OperationOutput::Status),
            Operation::Archive { path, reason } => self
                .archive(&path, reason.as_deref())
                .map(OperationOutput::Archive),
            Operation::Restore {
                archive_path,
                restore_path,
            } => self
                .restore(&archive_path, restore_path.as_deref())
                .map(OperationOutput::Restore),
            Operation::ListArchived { directory } => self
                .list_archived(&directory)
                .map(OperationOutput::ArchiveList),
            Operation::FindVersions {
                filename,
                directory,
            } => self
                .find_versions(&filename, &directory)
                .map(OperationOutput::Versions),
            Operation::CleanWorkspace { directory, pattern } => self
                .clean_workspace(&directory, pattern.as_deref())
                .map(OperationOutput::Cleanup),
            Operation::Move {
                source,
                destination,
            } => self
                .move_document(&source, &destination)
                .map(OperationOutput::Move),
            Operation::CleanAux {
                path,
                keep_bibliography,
            } => self
                .clean_aux(&path, keep_bibliography)
                .map(OperationOutput::Cleanup),
            Operation::RefreshAux { path, types } => self
                .refresh_aux(&path, types)
                .map(OperationOutput::AuxRefresh),
            Operation::ListAux { path } => self.list_aux(&path).map(OperationOutput::AuxList),
            Operation::Batch {
                steps,
                dry_run,
                stop_on_error,
            } => self
                .batch(steps, dry_run, stop_on_error)
                .map(OperationOutput::Batch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::WorkspaceResolver;
    use std::fs;

    fn session(root: &std::path::Path) -> DocumentSession {
        DocumentSession::with_defaults(Box::new(WorkspaceResolver::new(root)))
    }

    #[test]
    fn test_operation_deserializes_with_defaults() {
        let op: Operation =
            serde_json::from_str(r#"{"op":"edit","path":"a.tex","needle":"x","replacement":"y"}"#)
                .unwrap();
        assert_eq!(
            op,
            Operation::Edit {
                path: "a.tex".to_string(),
                needle: "x".to_string(),
                replacement: "y".to_string(),
                expected_occurrences: 1,
            }
        );

        let op: Operation =
            serde_json::from_str(r#"{"op":"insert_at_line","path":"a.md","line_number":3}"#)
                .unwrap();
        assert!(matches!(
            op,
            Operation::InsertAtLine {
                mode: InsertMode::After,
                content: None,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let result: Result<Operation, _> = serde_json::from_str(r#"{"op":"compile","path":"a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_execute_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tex"), "Hello World\n").unwrap();
        let mut session = session(dir.path());

        let output = session
            .execute(Operation::Edit {
                path: "a.tex".to_string(),
                needle: "World".to_string(),
                replacement: "Folio".to_string(),
                expected_occurrences: 1,
            })
            .unwrap();

        assert!(matches!(output, OperationOutput::Edit(ref r) if r.is_applied()));
        assert_eq!(
            fs::read_to_string(dir.path().join("a.tex")).unwrap(),
            "Hello Folio\n"
        );
    }

    #[test]
    fn test_archive_forgets_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tex");
        fs::write(&path, "x\n").unwrap();
        let mut session = session(dir.path());

        session.status("a.tex").unwrap();
        assert!(session.engine().store().is_tracked(&path));

        session.archive("a.tex", None).unwrap();
        assert!(!session.engine().store().is_tracked(&path));
    }

    #[test]
    fn test_restored_file_starts_untracked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tex");
        fs::write(&path, "x\n").unwrap();
        let mut session = session(dir.path());

        let entry = session.archive("a.tex", Some("outdated")).unwrap();
        let outcome = session
            .restore(&entry.archive_path.to_string_lossy(), None)
            .unwrap();

        assert_eq!(outcome.restored_to, path);
        let report = session.status("a.tex").unwrap();
        assert!(report.first_observation);
    }

    #[test]
    fn test_new_operations_deserialize() {
        let op: Operation = serde_json::from_str(
            r#"{"op":"edit_many","path":"a.tex","changes":[{"needle":"x","replacement":"y"}]}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            Operation::EditMany {
                path: "a.tex".to_string(),
                changes: vec![EditChange::new("x", "y")],
            }
        );

        let op: Operation = serde_json::from_str(r#"{"op":"clean_aux","path":"."}"#).unwrap();
        assert!(matches!(
            op,
            Operation::CleanAux {
                keep_bibliography: true,
                ..
            }
        ));

        let op: Operation =
            serde_json::from_str(r#"{"op":"refresh_aux","path":"a.tex","types":"bib"}"#).unwrap();
        assert!(matches!(op, Operation::RefreshAux { types: AuxGroup::Bib, .. }));

        let op: Operation = serde_json::from_str(
            r#"{"op":"batch","steps":[{"op":"move","source":"a.tex","destination":"old/"}]}"#,
        )
        .unwrap();
        assert_eq!(op.name(), "batch");
        assert!(matches!(op, Operation::Batch { ref steps, dry_run: false, .. } if steps.len() == 1));
    }

    #[test]
    fn test_move_forgets_both_ends() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tex"), "new\n").unwrap();
        fs::write(dir.path().join("b.tex"), "old\n").unwrap();
        let mut session = session(dir.path());
        session.status("a.tex").unwrap();
        session.status("b.tex").unwrap();

        let outcome = session.move_document("a.tex", "b.tex").unwrap();

        assert!(outcome.replaced.is_some());
        assert!(!session.engine().store().is_tracked(&dir.path().join("a.tex")));
        assert!(!session.engine().store().is_tracked(&dir.path().join("b.tex")));
        assert_eq!(
            fs::read_to_string(dir.path().join("b.tex")).unwrap(),
            "new\n"
        );
    }

    #[test]
    fn test_trailing_slash_moves_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tex"), "x").unwrap();
        let mut session = session(dir.path());

        let outcome = session.move_document("a.tex", "drafts/").unwrap();

        assert_eq!(outcome.moved_to, dir.path().join("drafts").join("a.tex"));
    }

    #[test]
    fn test_output_serializes_with_kind() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let output = OperationOutput::ArchiveList(session.list_archived(".").unwrap());

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "archive_list");
        assert_eq!(json["data"], serde_json::json!([]));
    }
}
