//! Data models for document editing and archive operations

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

use crate::diff::DiffStats;

/// Snapshot of a file as last seen by the session
#[derive(Debug, Clone)]
pub struct FileState {
    /// Path of the tracked file
    pub path: PathBuf,
    /// Modification time at snapshot
    pub modified_time: SystemTime,
    /// Size in bytes at snapshot
    pub byte_size: u64,
    /// SHA-256 of the cached content
    pub content_hash: String,
    /// Content as last read or written
    pub cached_content: String,
    /// When the snapshot was taken
    pub recorded_at: SystemTime,
}

/// Request for an exact-match replacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRequest {
    /// File to edit
    pub path: PathBuf,
    /// Literal text to search for
    pub needle: String,
    /// Text to put in place of the first occurrence
    pub replacement: String,
    /// Number of occurrences the caller expects
    #[serde(default = "default_expected_occurrences")]
    pub expected_occurrences: usize,
}

fn default_expected_occurrences() -> usize {
    1
}

impl EditRequest {
    /// Creates a request expecting a single occurrence
    pub fn new(
        path: impl Into<PathBuf>,
        needle: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            needle: needle.into(),
            replacement: replacement.into(),
            expected_occurrences: 1,
        }
    }

    /// Sets the expected occurrence count
    pub fn expecting(mut self, occurrences: usize) -> Self {
        self.expected_occurrences = occurrences;
        self
    }
}

/// One replacement within a multi-change edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditChange {
    /// Literal text to search for
    pub needle: String,
    /// Text to put in place of the first occurrence
    pub replacement: String,
    /// Number of occurrences the change expects
    #[serde(default = "default_expected_occurrences")]
    pub expected_occurrences: usize,
}

impl EditChange {
    /// Creates a change expecting a single occurrence
    pub fn new(needle: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            replacement: replacement.into(),
            expected_occurrences: 1,
        }
    }

    /// Sets the expected occurrence count
    pub fn expecting(mut self, occurrences: usize) -> Self {
        self.expected_occurrences = occurrences;
        self
    }
}

/// Terminal outcome of an edit call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    /// The file was rewritten
    Applied,
    /// The needle occurs a different number of times than expected
    CountMismatch,
    /// The needle was not found and no fallback could apply the edit
    NoMatch,
}

/// Strategy that produced an edit result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditStrategy {
    /// Literal occurrence counting and replacement
    Exact,
    /// Whole-line replacement of the most similar line
    FuzzyLine,
    /// Markup-stripped phrase located verbatim; insertion recommended
    KeyPhrase,
    /// Ranked word-overlap suggestions
    SuggestionReport,
    /// Position-addressed insertion
    LineInsert,
}

impl EditStrategy {
    /// Stable name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            EditStrategy::Exact => "exact",
            EditStrategy::FuzzyLine => "fuzzy_line",
            EditStrategy::KeyPhrase => "key_phrase",
            EditStrategy::SuggestionReport => "suggestion_report",
            EditStrategy::LineInsert => "line_insert",
        }
    }
}

/// A candidate line for a failed edit, ranked by word overlap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    /// 1-based line number
    pub line_number: usize,
    /// Text of the line
    pub line_text: String,
    /// Number of needle words present in the line
    pub overlap_word_count: usize,
    /// overlap / number of distinct needle words
    pub similarity_score: f64,
}

/// Result of an edit, buffered edit or insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResult {
    /// Terminal outcome
    pub outcome: EditOutcome,
    /// Strategy that produced the outcome
    pub strategy_used: EditStrategy,
    /// Line that matched or was written, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_line: Option<String>,
    /// 1-based line number of the match or write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// Similarity score for fuzzy matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Occurrences of the needle actually found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<usize>,
    /// Ranked candidates when nothing matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    /// Number of lines in the file at the time of the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<usize>,
    /// Text surrounding an applied replacement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Human-readable explanation
    pub diagnostic_message: String,
}

impl EditResult {
    pub(crate) fn new(
        outcome: EditOutcome,
        strategy_used: EditStrategy,
        diagnostic_message: impl Into<String>,
    ) -> Self {
        Self {
            outcome,
            strategy_used,
            matched_line: None,
            line_number: None,
            similarity: None,
            occurrences: None,
            suggestions: Vec::new(),
            total_lines: None,
            context: None,
            diagnostic_message: diagnostic_message.into(),
        }
    }

    pub(crate) fn at_line(mut self, line_number: usize, line: impl Into<String>) -> Self {
        self.line_number = Some(line_number);
        self.matched_line = Some(line.into());
        self
    }

    pub(crate) fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub(crate) fn with_occurrences(mut self, occurrences: usize) -> Self {
        self.occurrences = Some(occurrences);
        self
    }

    pub(crate) fn with_total_lines(mut self, total_lines: usize) -> Self {
        self.total_lines = Some(total_lines);
        self
    }

    pub(crate) fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }

    /// Whether the file was rewritten
    pub fn is_applied(&self) -> bool {
        self.outcome == EditOutcome::Applied
    }
}

/// Where a line insertion lands relative to the target line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Above the target line
    Before,
    /// Below the target line
    #[default]
    After,
    /// In place of the target line
    Replace,
}

impl std::str::FromStr for InsertMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(InsertMode::Before),
            "after" => Ok(InsertMode::After),
            "replace" => Ok(InsertMode::Replace),
            other => Err(format!(
                "unknown insert mode '{}', expected before, after or replace",
                other
            )),
        }
    }
}

/// Line-numbered window of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadView {
    /// File that was read
    pub path: PathBuf,
    /// Lines rendered as `{number:>6}\t{text}`
    pub listing: String,
    /// First line shown (1-based)
    pub offset: usize,
    /// Number of lines shown
    pub lines_read: usize,
    /// Number of lines in the file
    pub total_lines: usize,
}

/// Result of a change-detection status check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// File that was checked
    pub path: PathBuf,
    /// Whether content differs from the last snapshot
    pub changed: bool,
    /// Whether this call started tracking the file
    pub first_observation: bool,
    /// Unified diff from previous to current content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Lines added and deleted by the external change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_changes: Option<DiffStats>,
    /// Size recorded in the previous snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_size: Option<u64>,
    /// Current size on disk
    pub current_size: u64,
    /// Current modification time
    pub modified: DateTime<Local>,
    /// Short prefix of the current content hash
    pub hash_prefix: String,
}

/// Sidecar record stored next to an archived file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveMetadata {
    /// Where the file lived before archiving
    pub original_path: PathBuf,
    /// When it was archived (RFC 3339)
    pub archived_at: DateTime<FixedOffset>,
    /// Caller-supplied reason
    pub reason: String,
    /// File name before archiving
    #[serde(default)]
    pub original_name: Option<String>,
    /// Collision sequence used in the archived name
    pub sequence: u32,
}

/// An archived document, with or without sidecar metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Location before archiving, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
    /// Current location inside the archive directory
    pub archive_path: PathBuf,
    /// Archive time from the sidecar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<FixedOffset>>,
    /// Reason from the sidecar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Collision sequence from the sidecar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    /// Size of the archived file
    pub size: u64,
    /// Filesystem modification time of the archived file
    pub modified: DateTime<Local>,
    /// Whether a readable sidecar was found
    pub has_metadata: bool,
}

/// Output of a restore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreOutcome {
    /// Archived file that was moved
    pub restored_from: PathBuf,
    /// Where it now lives
    pub restored_to: PathBuf,
    /// Original path from the sidecar, if one was readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
}

/// Whether a version is the live file or an archived copy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    /// File in the working directory
    Current,
    /// File inside the archive directory
    Archived,
}

/// A file sharing a base stem with a requested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Full path
    pub path: PathBuf,
    /// File name
    pub name: String,
    /// Live or archived
    #[serde(rename = "type")]
    pub kind: VersionKind,
    /// Filesystem modification time
    pub modified: DateTime<Local>,
    /// Size in bytes
    pub size: u64,
}

/// A file that could not be archived during a cleanup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// File that failed
    pub path: PathBuf,
    /// Error description
    pub error: String,
}

/// Per-file breakdown of a pattern cleanup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Files archived successfully
    pub archived: Vec<ArchiveEntry>,
    /// Files that failed
    pub errors: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// True when every matching file was archived
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Output of a move
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Where the document was
    pub moved_from: PathBuf,
    /// Where it is now
    pub moved_to: PathBuf,
    /// Archive entry of the file that occupied the destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<ArchiveEntry>,
}

/// Kinds of files a LaTeX build leaves beside its source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuxCategory {
    /// `.aux`, `.log`, `.out`, `.fls`, `.fdb_latexmk`
    Compilation,
    /// `.bbl`, `.blg`, `.bcf`, `.run.xml`
    Bibliography,
    /// `.idx`, `.ind`, `.ilg`, `.glo`, `.gls`, `.glg`
    Index,
    /// `.nav`, `.snm`, `.vrb`
    Beamer,
    /// `.toc`, `.lof`, `.lot`, `.dvi`, `.synctex.gz`
    Other,
}

/// Auxiliary files removed to force regeneration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuxGroup {
    /// Tables of contents, figures and tables
    Toc,
    /// Bibliography
    Bib,
    /// Index
    Idx,
    /// All of the above
    #[default]
    All,
}

impl std::str::FromStr for AuxGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toc" => Ok(AuxGroup::Toc),
            "bib" => Ok(AuxGroup::Bib),
            "idx" => Ok(AuxGroup::Idx),
            "all" => Ok(AuxGroup::All),
            other => Err(format!(
                "unknown auxiliary group '{}', expected toc, bib, idx or all",
                other
            )),
        }
    }
}

/// An auxiliary file found beside a LaTeX source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxFile {
    /// Full path
    pub path: PathBuf,
    /// File name
    pub name: String,
    /// What produced it
    pub category: AuxCategory,
    /// Size in bytes
    pub size: u64,
    /// Filesystem modification time
    pub modified: DateTime<Local>,
}

/// Auxiliary files of one LaTeX source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxListing {
    /// The `.tex` source
    pub document: PathBuf,
    /// Files found, grouped by category in a fixed order
    pub files: Vec<AuxFile>,
    /// Sum of their sizes in bytes
    pub total_size: u64,
}

/// Auxiliary files deleted by a refresh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxRemoval {
    /// Files deleted
    pub removed: Vec<PathBuf>,
    /// Files that could not be deleted
    pub errors: Vec<CleanupFailure>,
}
