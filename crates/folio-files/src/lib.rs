#![warn(missing_docs)]

//! Document editing engine for folio
//!
//! Safe, file-backed editing of LaTeX and Markdown sources without a
//! database: atomic writes, detection of changes made outside the session,
//! recovery from failed textual edits through fuzzy matching and a content
//! buffer, and soft-delete archiving with sidecar metadata.

pub mod archive;
mod auxiliary;
pub mod batch;
pub mod buffer;
mod buffered;
pub mod diff;
pub mod edit;
pub mod error;
pub mod insert;
pub mod matcher;
pub mod models;
mod multi;
pub mod resolver;
pub mod session;
pub mod tracker;
pub mod validate;
pub mod verifier;
pub mod writer;

// Re-export public API
pub use archive::{ArchiveManager, ArchiveSettings};
pub use batch::{BatchIssue, BatchReport, BatchStep};
pub use buffer::ContentBuffer;
pub use diff::{DiffEngine, DiffStats};
pub use edit::{EditEngine, EditSettings};
pub use error::{FileError, Result};
pub use insert::LineInserter;
pub use matcher::{similarity_ratio, FallbackMatcher, FuzzyMatch, KeyPhraseHit};
pub use models::{
    ArchiveEntry, ArchiveMetadata, AuxCategory, AuxFile, AuxGroup, AuxListing, AuxRemoval,
    CleanupFailure, CleanupReport, EditChange, EditOutcome, EditRequest, EditResult, EditStrategy,
    FileState, InsertMode, MoveOutcome, ReadView, RestoreOutcome, StatusReport, Suggestion,
    VersionInfo, VersionKind,
};
pub use resolver::{PathResolver, WorkspaceResolver};
pub use session::{DocumentSession, Operation, OperationOutput, SessionSettings};
pub use tracker::{ChangeStatus, ExternalChange, FileStateStore};
pub use validate::{ContentValidator, DelimiterValidator, DocumentFormat, ValidationReport};
pub use verifier::ContentVerifier;
pub use writer::SafeWriter;
