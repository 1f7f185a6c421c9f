//! Running a list of operations as one request
//!
//! Every step is checked before anything runs, so a batch with a missing
//! file or a malformed step does nothing at all. Paths created by an
//! earlier move or explicit restore count as present for the steps after
//! it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::FileError;
use crate::session::{DocumentSession, Operation, OperationOutput};

/// A step that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchIssue {
    /// 0-based position in the batch
    pub index: usize,
    /// Operation name
    pub op: String,
    /// What is wrong with it
    pub reason: String,
}

/// Outcome of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStep {
    /// 0-based position in the batch
    pub index: usize,
    /// Operation name
    pub op: String,
    /// Output, when the operation returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OperationOutput>,
    /// Error message, or the diagnostic of an edit that did not apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchStep {
    /// True when the step did what it was asked
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Report of a whole batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Only validation ran
    pub dry_run: bool,
    /// Validation problems; when non-empty no step ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<BatchIssue>,
    /// Executed steps in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<BatchStep>,
    /// Steps that succeeded
    pub succeeded: usize,
    /// Steps that failed
    pub failed: usize,
    /// Execution stopped at the first failure
    pub stopped_early: bool,
}

impl BatchReport {
    /// True when validation passed and no executed step failed
    pub fn is_success(&self) -> bool {
        self.issues.is_empty() && self.failed == 0
    }
}

impl DocumentSession {
    /// Validates every step, then runs them in order
    ///
    /// With `dry_run` only validation happens. With `stop_on_error` the
    /// first failing step ends the batch; otherwise the remaining steps
    /// still run. An edit that returns without applying counts as a failure.
    pub fn batch(
        &mut self,
        steps: Vec<Operation>,
        dry_run: bool,
        stop_on_error: bool,
    ) -> Result<BatchReport, FileError> {
        if steps.is_empty() {
            return Err(FileError::InvalidContent(
                "a batch needs at least one step".to_string(),
            ));
        }

        let mut report = BatchReport {
            dry_run,
            issues: self.validate_steps(&steps),
            ..BatchReport::default()
        };
        if !report.issues.is_empty() {
            warn!(
                "Batch of {} step(s) rejected with {} issue(s)",
                steps.len(),
                report.issues.len()
            );
            return Ok(report);
        }
        if dry_run {
            return Ok(report);
        }

        for (index, operation) in steps.into_iter().enumerate() {
            let op = operation.name().to_string();
            let step = match self.execute(operation) {
                Ok(OperationOutput::Edit(result)) if !result.is_applied() => BatchStep {
                    index,
                    op,
                    error: Some(result.diagnostic_message.clone()),
                    output: Some(OperationOutput::Edit(result)),
                },
                Ok(output) => BatchStep {
                    index,
                    op,
                    output: Some(output),
                    error: None,
                },
                Err(e) => BatchStep {
                    index,
                    op,
                    output: None,
                    error: Some(e.to_string()),
                },
            };

            let failed = !step.succeeded();
            if failed {
                report.failed += 1;
            } else {
                report.succeeded += 1;
            }
            report.steps.push(step);

            if failed && stop_on_error {
                report.stopped_early = true;
                break;
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        Ok(report)
    }

    fn validate_steps(&self, steps: &[Operation]) -> Vec<BatchIssue> {
        let mut created: HashSet<PathBuf> = HashSet::new();
        let mut issues = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            if let Err(reason) = self.validate_step(step, &mut created) {
                issues.push(BatchIssue {
                    index,
                    op: step.name().to_string(),
                    reason,
                });
            }
        }
        issues
    }

    fn validate_step(
        &self,
        step: &Operation,
        created: &mut HashSet<PathBuf>,
    ) -> Result<(), String> {
        match step {
            Operation::Batch { .. } => Err("batches cannot be nested".to_string()),
            Operation::Move {
                source,
                destination,
            } => {
                let source = self.present(source, created)?;
                non_empty(destination, "destination")?;
                let into_directory = destination.ends_with('/');
                let destination = self.resolve(destination).map_err(|e| e.to_string())?;
                created.insert(moved_destination(&source, destination, into_directory));
                Ok(())
            }
            Operation::Restore {
                archive_path,
                restore_path,
            } => {
                self.present(archive_path, created)?;
                if let Some(restore_path) = restore_path {
                    created.insert(self.resolve(restore_path).map_err(|e| e.to_string())?);
                }
                Ok(())
            }
            Operation::FindVersions { filename, .. } => non_empty(filename, "filename"),
            Operation::Edit { path, needle, .. } => {
                non_empty(needle, "needle")?;
                self.present(path, created).map(drop)
            }
            Operation::EditMany { path, changes } => {
                if changes.is_empty() {
                    return Err("changes must not be empty".to_string());
                }
                self.present(path, created).map(drop)
            }
            Operation::Read { path, .. }
            | Operation::EditFromBuffer { path, .. }
            | Operation::InsertAtLine { path, .. }
            | Operation::Status { path }
            | Operation::Archive { path, .. }
            | Operation::CleanAux { path, .. }
            | Operation::RefreshAux { path, .. }
            | Operation::ListAux { path } => self.present(path, created).map(drop),
            Operation::CleanWorkspace { directory, .. } => {
                self.present(directory, created).map(drop)
            }
            Operation::ListArchived { .. } => Ok(()),
        }
    }

    /// Resolved path that exists now or will once earlier steps ran
    fn present(&self, raw: &str, created: &HashSet<PathBuf>) -> Result<PathBuf, String> {
        let path = self.resolve(raw).map_err(|e| e.to_string())?;
        if path.exists() || created.contains(&path) {
            Ok(path)
        } else {
            Err(format!("{} does not exist", path.display()))
        }
    }
}

fn non_empty(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

/// Where a move will land, as `ArchiveManager::move_document` decides it
fn moved_destination(source: &Path, destination: PathBuf, into_directory: bool) -> PathBuf {
    match source.file_name() {
        Some(name) if into_directory || destination.is_dir() => destination.join(name),
        _ => destination,
    }
}
