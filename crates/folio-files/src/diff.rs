//! Unified diff rendering for externally modified documents

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Line counts of a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Number of lines added
    pub additions: usize,
    /// Number of lines deleted
    pub deletions: usize,
}

/// Generates line-oriented unified diffs between document versions
#[derive(Debug, Clone)]
pub struct DiffEngine {
    context_radius: usize,
}

impl DiffEngine {
    /// Creates a DiffEngine with three lines of context
    pub fn new() -> Self {
        Self { context_radius: 3 }
    }

    /// Renders a unified diff with the given file headers
    ///
    /// Returns an empty string when the inputs are identical line-wise.
    pub fn unified(&self, old: &str, new: &str, old_header: &str, new_header: &str) -> String {
        let diff = TextDiff::from_lines(old, new);
        let mut unified = diff.unified_diff();
        unified
            .context_radius(self.context_radius)
            .header(old_header, new_header);
        unified.to_string()
    }

    /// Renders the diff between a cached snapshot and the live file, with
    /// both modification times in the headers
    pub fn change_report(
        &self,
        path: &Path,
        previous: &str,
        previous_time: SystemTime,
        current: &str,
        current_time: SystemTime,
    ) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let old_header = format!("{} (previous)\t{}", name, format_time(previous_time));
        let new_header = format!("{} (current)\t{}", name, format_time(current_time));

        let rendered = self.unified(previous, current, &old_header, &new_header);
        if rendered.is_empty() {
            "No line-by-line differences found".to_string()
        } else {
            rendered
        }
    }

    /// Counts added and deleted lines
    pub fn stats(&self, old: &str, new: &str) -> DiffStats {
        let diff = TextDiff::from_lines(old, new);
        let mut stats = DiffStats::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => stats.additions += 1,
                ChangeTag::Delete => stats.deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        stats
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Local `%Y-%m-%d %H:%M:%S` rendering of a filesystem time
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
