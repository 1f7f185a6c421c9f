// Output formatting and styling

use colored::Colorize;
use folio_files::{
    ArchiveEntry, AuxListing, AuxRemoval, BatchReport, CleanupReport, EditResult, MoveOutcome,
    OperationOutput, ReadView, StatusReport, ValidationReport, VersionInfo, VersionKind,
};

use crate::logging::VerbosityLevel;

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl OutputStyle {
    /// Format success message
    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    /// Format error message
    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✗".red().bold(), msg)
        } else {
            format!("✗ {}", msg)
        }
    }

    /// Format warning message
    pub fn warning(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "⚠".yellow(), msg)
        } else {
            format!("⚠ {}", msg)
        }
    }

    /// Format info message
    pub fn info(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "ℹ".blue(), msg)
        } else {
            format!("ℹ {}", msg)
        }
    }

    /// Format code block
    pub fn code(&self, code: &str) -> String {
        if self.use_colors {
            code.cyan().to_string()
        } else {
            code.to_string()
        }
    }

    /// Colour a unified diff line by line
    pub fn diff(&self, diff: &str) -> String {
        if !self.use_colors {
            return diff.to_string();
        }
        diff.lines()
            .map(|line| {
                if line.starts_with("+++") || line.starts_with("---") {
                    line.bold().to_string()
                } else if line.starts_with('+') {
                    line.green().to_string()
                } else if line.starts_with('-') {
                    line.red().to_string()
                } else if line.starts_with("@@") {
                    line.cyan().to_string()
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format header
    pub fn header(&self, title: &str) -> String {
        if self.use_colors {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format a section header
    pub fn section(&self, title: &str) -> String {
        if self.use_colors {
            format!(
                "\n{}\n{}",
                title.bold().underline(),
                "─".repeat(title.chars().count())
            )
        } else {
            format!("\n{}\n{}", title, "─".repeat(title.chars().count()))
        }
    }

    /// Format a list item
    pub fn list_item(&self, item: &str) -> String {
        format!("  • {}", item)
    }

    /// Format a numbered list item
    pub fn numbered_item(&self, number: usize, item: &str) -> String {
        format!("  {}. {}", number, item)
    }

    /// Format a key-value pair
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.use_colors {
            format!("  {}: {}", key.bold(), value)
        } else {
            format!("  {}: {}", key, value)
        }
    }

    /// Human-readable rendering of an operation result
    pub fn operation(&self, output: &OperationOutput) -> String {
        match output {
            OperationOutput::Read(view) => self.read_view(view),
            OperationOutput::Edit(result) => self.edit_result(result),
            OperationOutput::Status(report) => self.status_report(report),
            OperationOutput::Archive(entry) => self.success(&format!(
                "Archived {} to {}",
                entry
                    .original_path
                    .as_deref()
                    .unwrap_or(entry.archive_path.as_path())
                    .display(),
                entry.archive_path.display()
            )),
            OperationOutput::Restore(outcome) => self.success(&format!(
                "Restored {} to {}",
                outcome.restored_from.display(),
                outcome.restored_to.display()
            )),
            OperationOutput::ArchiveList(entries) => self.archive_list(entries),
            OperationOutput::Versions(versions) => self.versions(versions),
            OperationOutput::Cleanup(report) => self.cleanup(report),
            OperationOutput::Move(outcome) => self.move_outcome(outcome),
            OperationOutput::AuxList(listing) => self.aux_listing(listing),
            OperationOutput::AuxRefresh(removal) => self.aux_removal(removal),
            OperationOutput::Batch(report) => self.batch(report),
        }
    }

    fn read_view(&self, view: &ReadView) -> String {
        let last = view.offset + view.lines_read.saturating_sub(1);
        let title = if view.lines_read == 0 {
            format!("{} (no lines at {}, {} total)", view.path.display(), view.offset, view.total_lines)
        } else {
            format!(
                "{} (lines {}-{} of {})",
                view.path.display(),
                view.offset,
                last,
                view.total_lines
            )
        };
        format!("{}\n{}", self.header(&title), view.listing)
    }

    fn edit_result(&self, result: &EditResult) -> String {
        let mut out = if result.is_applied() {
            self.success(&result.diagnostic_message)
        } else {
            self.warning(&result.diagnostic_message)
        };
        out.push('\n');
        out.push_str(&self.key_value("strategy", result.strategy_used.as_str()));
        if let Some(line) = result.line_number {
            out.push('\n');
            out.push_str(&self.key_value("line", &line.to_string()));
        }
        if let Some(score) = result.similarity {
            out.push('\n');
            out.push_str(&self.key_value("similarity", &format!("{:.2}", score)));
        }
        if let Some(context) = &result.context {
            out.push('\n');
            out.push_str(&self.code(context));
        }
        for (i, suggestion) in result.suggestions.iter().enumerate() {
            out.push('\n');
            out.push_str(&self.numbered_item(
                i + 1,
                &format!(
                    "line {} ({} shared words, {:.2}): {}",
                    suggestion.line_number,
                    suggestion.overlap_word_count,
                    suggestion.similarity_score,
                    suggestion.line_text.trim()
                ),
            ));
        }
        out
    }

    fn status_report(&self, report: &StatusReport) -> String {
        let path = report.path.display();
        let mut out = if report.first_observation {
            self.info(&format!("Now tracking {}", path))
        } else if report.changed {
            self.warning(&format!("{} changed on disk", path))
        } else {
            self.success(&format!("{} is unchanged", path))
        };
        out.push('\n');
        out.push_str(&self.key_value("size", &report.current_size.to_string()));
        if let Some(previous) = report.previous_size {
            out.push('\n');
            out.push_str(&self.key_value("previous size", &previous.to_string()));
        }
        if let Some(stats) = report.line_changes {
            out.push('\n');
            out.push_str(&self.key_value(
                "lines",
                &format!("+{} -{}", stats.additions, stats.deletions),
            ));
        }
        out.push('\n');
        out.push_str(&self.key_value("modified", &report.modified.format("%Y-%m-%d %H:%M:%S").to_string()));
        out.push('\n');
        out.push_str(&self.key_value("sha256", &report.hash_prefix));
        if let Some(diff) = &report.diff {
            out.push('\n');
            out.push_str(&self.diff(diff));
        }
        out
    }

    fn archive_list(&self, entries: &[ArchiveEntry]) -> String {
        if entries.is_empty() {
            return self.info("No archived documents");
        }
        let mut out = self.section(&format!("{} archived", entries.len()));
        for entry in entries {
            let name = entry
                .archive_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let when = entry
                .archived_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| entry.modified.format("%Y-%m-%d %H:%M:%S").to_string());
            let reason = entry.reason.as_deref().unwrap_or("-");
            out.push('\n');
            out.push_str(&self.list_item(&format!("{}  {}  {}", name, when, reason)));
        }
        out
    }

    fn versions(&self, versions: &[VersionInfo]) -> String {
        if versions.is_empty() {
            return self.info("No versions found");
        }
        let mut out = self.section(&format!("{} versions", versions.len()));
        for version in versions {
            let kind = match version.kind {
                VersionKind::Current => "current",
                VersionKind::Archived => "archived",
            };
            out.push('\n');
            out.push_str(&self.list_item(&format!(
                "[{}] {}  {} bytes",
                kind, version.name, version.size
            )));
        }
        out
    }

    fn cleanup(&self, report: &CleanupReport) -> String {
        let mut out = self.success(&format!("Archived {} files", report.archived.len()));
        for entry in &report.archived {
            out.push('\n');
            out.push_str(&self.list_item(&entry.archive_path.display().to_string()));
        }
        for failure in &report.errors {
            out.push('\n');
            out.push_str(&self.warning(&format!(
                "{}: {}",
                failure.path.display(),
                failure.error
            )));
        }
        out
    }

    fn move_outcome(&self, outcome: &MoveOutcome) -> String {
        let mut out = self.success(&format!(
            "Moved {} to {}",
            outcome.moved_from.display(),
            outcome.moved_to.display()
        ));
        if let Some(replaced) = &outcome.replaced {
            out.push('\n');
            out.push_str(&self.key_value(
                "previous file archived",
                &replaced.archive_path.display().to_string(),
            ));
        }
        out
    }

    fn aux_listing(&self, listing: &AuxListing) -> String {
        if listing.files.is_empty() {
            return self.info(&format!(
                "No auxiliary files beside {}",
                listing.document.display()
            ));
        }
        let mut out = self.section(&format!(
            "{} auxiliary files, {} bytes",
            listing.files.len(),
            listing.total_size
        ));
        for file in &listing.files {
            out.push('\n');
            out.push_str(&self.list_item(&format!(
                "{}  {:?}  {} bytes",
                file.name, file.category, file.size
            )));
        }
        out
    }

    fn aux_removal(&self, removal: &AuxRemoval) -> String {
        let mut out = self.success(&format!("Removed {} files", removal.removed.len()));
        for path in &removal.removed {
            out.push('\n');
            out.push_str(&self.list_item(&path.display().to_string()));
        }
        for failure in &removal.errors {
            out.push('\n');
            out.push_str(&self.warning(&format!(
                "{}: {}",
                failure.path.display(),
                failure.error
            )));
        }
        out
    }

    fn batch(&self, report: &BatchReport) -> String {
        if !report.issues.is_empty() {
            let mut out = self.error(&format!(
                "Batch rejected, {} step(s) failed validation",
                report.issues.len()
            ));
            for issue in &report.issues {
                out.push('\n');
                out.push_str(&self.numbered_item(
                    issue.index + 1,
                    &format!("{}: {}", issue.op, issue.reason),
                ));
            }
            return out;
        }
        if report.dry_run {
            return self.success("Batch is valid (dry run, nothing executed)");
        }

        let summary = format!(
            "Batch finished: {} succeeded, {} failed{}",
            report.succeeded,
            report.failed,
            if report.stopped_early { ", stopped early" } else { "" }
        );
        let mut out = if report.is_success() {
            self.success(&summary)
        } else {
            self.warning(&summary)
        };
        for step in &report.steps {
            let line = match &step.error {
                None => format!("{}: ok", step.op),
                Some(error) => format!("{}: {}", step.op, error),
            };
            out.push('\n');
            out.push_str(&self.numbered_item(step.index + 1, &line));
        }
        out
    }

    /// Rendering of a validation report
    pub fn validation(&self, report: &ValidationReport) -> String {
        if report.valid {
            return self.success("Document structure is valid");
        }
        let mut out = self.error("Document structure is invalid");
        for error in &report.errors {
            out.push('\n');
            out.push_str(&self.list_item(error));
        }
        out
    }
}

/// Print formatted output
pub fn print_success(msg: &str) {
    let style = OutputStyle::default();
    println!("{}", style.success(msg));
}

pub fn print_error(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.error(msg));
}

pub fn print_warning(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.warning(msg));
}

pub fn print_info(msg: &str) {
    if VerbosityLevel::Normal.should_output() {
        let style = OutputStyle::default();
        println!("{}", style.info(msg));
    }
}
