//! Several literal replacements committed as one write

use std::path::Path;

use tracing::debug;

use crate::edit::{read_document, EditEngine};
use crate::error::FileError;
use crate::models::{EditChange, EditOutcome, EditResult, EditStrategy};

impl EditEngine {
    /// Applies a list of replacements in order, all or nothing
    ///
    /// Each change searches the text produced by the changes before it and
    /// replaces the first occurrence once its count matches
    /// `expected_occurrences`. The first change that cannot apply stops the
    /// call: its replacement is buffered, suggestions are attached when the
    /// needle was missing, and the file is left untouched. Otherwise the
    /// document is written once.
    pub fn apply_all(
        &mut self,
        path: &Path,
        changes: &[EditChange],
    ) -> Result<EditResult, FileError> {
        if changes.is_empty() {
            return Err(FileError::InvalidContent(
                "at least one change is required".to_string(),
            ));
        }
        for (index, change) in changes.iter().enumerate() {
            let position = index + 1;
            if change.needle.is_empty() {
                return Err(FileError::InvalidContent(format!(
                    "change {}: search text must not be empty",
                    position
                )));
            }
            if change.needle == change.replacement {
                return Err(FileError::InvalidContent(format!(
                    "change {}: search text and replacement are identical",
                    position
                )));
            }
            if change.expected_occurrences == 0 {
                return Err(FileError::InvalidContent(format!(
                    "change {}: expected occurrences must be at least 1",
                    position
                )));
            }
        }

        self.ensure_unmodified(path)?;
        let original = read_document(path)?;
        let total = changes.len();
        let mut working = original.clone();
        let mut first_line = None;

        for (index, change) in changes.iter().enumerate() {
            let position = index + 1;
            let occurrences = working.matches(change.needle.as_str()).count();

            if occurrences == 0 {
                self.buffer.set(change.replacement.as_str());
                let best = self.matcher.best_line(&change.needle, &working);
                let mut result = EditResult::new(
                    EditOutcome::NoMatch,
                    EditStrategy::SuggestionReport,
                    format!(
                        "Change {} of {}: search text not found; nothing was changed. \
                         Its replacement is saved in the content buffer.",
                        position, total
                    ),
                )
                .with_similarity(best.map_or(0.0, |m| m.score))
                .with_occurrences(0)
                .with_total_lines(original.lines().count());
                result.suggestions = self.matcher.suggest(&change.needle, &working);
                return Ok(result);
            }

            if occurrences != change.expected_occurrences {
                return Ok(EditResult::new(
                    EditOutcome::CountMismatch,
                    EditStrategy::Exact,
                    format!(
                        "Change {} of {}: expected {} occurrence(s) of the search text but \
                         found {}; nothing was changed",
                        position, total, change.expected_occurrences, occurrences
                    ),
                )
                .with_occurrences(occurrences)
                .with_total_lines(original.lines().count()));
            }

            let Some(start) = working.find(change.needle.as_str()) else {
                return Err(FileError::InvalidContent(
                    "search text vanished while editing".to_string(),
                ));
            };
            let line_number = working[..start].matches('\n').count() + 1;
            first_line.get_or_insert(line_number);
            debug!("Change {} of {} lands on line {}", position, total, line_number);

            working.replace_range(start..start + change.needle.len(), &change.replacement);
        }

        let total_lines = working.lines().count();
        let line_number = first_line.unwrap_or(1);
        let line_text = working
            .lines()
            .nth(line_number - 1)
            .unwrap_or_default()
            .to_string();
        self.commit(path, working)?;

        let message = if total == 1 {
            "Applied 1 change".to_string()
        } else {
            format!("Applied {} changes", total)
        };
        Ok(
            EditResult::new(EditOutcome::Applied, EditStrategy::Exact, message)
                .at_line(line_number, line_text)
                .with_occurrences(total)
                .with_total_lines(total_lines),
        )
    }
}
