//! Exact-match document editing with fallback recovery
//!
//! [`EditEngine`] owns the per-session state: the snapshot store used for
//! change detection, the content buffer holding the last failed payload, the
//! fallback matcher and the atomic writer. Every mutating call goes through
//! the same gate: refuse when the file changed behind the session's back,
//! otherwise compute the new content in memory, write it atomically and
//! refresh the snapshot.
//!
//! Buffered retries live in `buffered.rs` and line insertion in `insert.rs`;
//! both extend this type.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::buffer::ContentBuffer;
use crate::error::FileError;
use crate::insert::LineInserter;
use crate::matcher::{FallbackMatcher, FuzzyMatch};
use crate::models::{
    EditOutcome, EditRequest, EditResult, EditStrategy, FileState, InsertMode, ReadView,
    StatusReport,
};
use crate::tracker::{ChangeStatus, FileStateStore};
use crate::writer::SafeWriter;

/// Tunables for matching and reporting
#[derive(Debug, Clone, PartialEq)]
pub struct EditSettings {
    /// Minimum similarity a line must exceed for a fuzzy replacement
    pub fuzzy_threshold: f64,
    /// Default threshold for buffered retries
    pub buffered_threshold: f64,
    /// Maximum number of suggestions in a failure report
    pub suggestion_limit: usize,
    /// Characters of the replacement used as needle when none is given
    pub needle_prefix_chars: usize,
    /// Characters of context on each side of an applied replacement
    pub snippet_radius: usize,
    /// Default number of lines returned by a read
    pub read_limit: usize,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            buffered_threshold: 0.7,
            suggestion_limit: 5,
            needle_prefix_chars: 100,
            snippet_radius: 50,
            read_limit: 50,
        }
    }
}

/// Session-scoped editing engine
#[derive(Debug)]
pub struct EditEngine {
    pub(crate) store: FileStateStore,
    pub(crate) buffer: ContentBuffer,
    pub(crate) matcher: FallbackMatcher,
    writer: SafeWriter,
    pub(crate) settings: EditSettings,
}

impl EditEngine {
    /// Creates an engine with empty state
    pub fn new(settings: EditSettings) -> Self {
        Self {
            store: FileStateStore::new(),
            buffer: ContentBuffer::new(),
            matcher: FallbackMatcher::new(settings.suggestion_limit),
            writer: SafeWriter::new(),
            settings,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &EditSettings {
        &self.settings
    }

    /// Snapshot store
    pub fn store(&self) -> &FileStateStore {
        &self.store
    }

    /// Mutable snapshot store
    pub fn store_mut(&mut self) -> &mut FileStateStore {
        &mut self.store
    }

    /// Content buffer
    pub fn buffer(&self) -> &ContentBuffer {
        &self.buffer
    }

    /// Mutable content buffer
    pub fn buffer_mut(&mut self) -> &mut ContentBuffer {
        &mut self.buffer
    }

    /// Returns a line-numbered window of a document and records its snapshot
    ///
    /// `offset` is 1-based; 0 is treated as 1. Lines render as
    /// `{number:>6}\t{text}`.
    pub fn read(&mut self, path: &Path, offset: usize, limit: usize) -> Result<ReadView, FileError> {
        let content = read_document(path)?;
        let offset = offset.max(1);
        let total_lines = content.lines().count();

        let listing: Vec<String> = content
            .lines()
            .enumerate()
            .skip(offset - 1)
            .take(limit)
            .map(|(index, line)| format!("{:>6}\t{}", index + 1, line))
            .collect();

        let view = ReadView {
            path: path.to_path_buf(),
            lines_read: listing.len(),
            listing: listing.join("\n"),
            offset,
            total_lines,
        };

        self.store.record_content(path, content)?;
        debug!(
            "Read {} lines of {} from line {}",
            view.lines_read,
            path.display(),
            offset
        );
        Ok(view)
    }

    /// Reports whether a document changed since it was last seen
    ///
    /// The first call for a path starts tracking it. Later calls that find a
    /// change return the diff and accept the live content as the new snapshot.
    pub fn status(&mut self, path: &Path) -> Result<StatusReport, FileError> {
        match self.store.check(path)? {
            ChangeStatus::Untracked => {
                let state = self.store.record(path)?;
                Ok(status_report(state, false, true, None, None))
            }
            ChangeStatus::Unchanged => {
                let state = self
                    .store
                    .get(path)
                    .ok_or_else(|| FileError::NotFound(path.to_path_buf()))?;
                Ok(status_report(state, false, false, None, Some(state.byte_size)))
            }
            ChangeStatus::Modified(change) => {
                let diff = self.store.render(path, &change);
                let stats = self.store.stats(&change);
                let previous_size = change.previous.byte_size;
                self.store.accept(path, *change);
                let state = self
                    .store
                    .get(path)
                    .ok_or_else(|| FileError::NotFound(path.to_path_buf()))?;
                info!(
                    "Accepted external changes to {} (+{} -{})",
                    path.display(),
                    stats.additions,
                    stats.deletions
                );
                let mut report = status_report(state, true, false, Some(diff), Some(previous_size));
                report.line_changes = Some(stats);
                Ok(report)
            }
        }
    }

    /// Replaces literal text in a document
    ///
    /// Zero occurrences buffer the replacement and run the fallback
    /// strategies. A count other than `expected_occurrences` is reported
    /// without writing. When the count matches, only the first occurrence is
    /// replaced, even if more than one was expected.
    pub fn apply(&mut self, request: &EditRequest) -> Result<EditResult, FileError> {
        let path = request.path.as_path();

        if request.needle.is_empty() {
            return Err(FileError::InvalidContent(
                "search text must not be empty".to_string(),
            ));
        }
        if request.needle == request.replacement {
            return Err(FileError::InvalidContent(
                "search text and replacement are identical".to_string(),
            ));
        }

        self.ensure_unmodified(path)?;
        let content = read_document(path)?;
        let occurrences = content.matches(request.needle.as_str()).count();

        if occurrences == 0 {
            self.buffer.set(request.replacement.as_str());
            return self.recover(
                path,
                &content,
                &request.needle,
                &request.replacement,
                self.settings.fuzzy_threshold,
            );
        }

        self.replace_exact(
            path,
            &content,
            &request.needle,
            &request.replacement,
            occurrences,
            request.expected_occurrences,
        )
    }

    /// Refuses with [`FileError::ExternalModification`] when the file no
    /// longer matches its snapshot; starts tracking untracked paths
    pub(crate) fn ensure_unmodified(&mut self, path: &Path) -> Result<(), FileError> {
        match self.store.check(path)? {
            ChangeStatus::Untracked => {
                self.store.record(path)?;
                Ok(())
            }
            ChangeStatus::Unchanged => Ok(()),
            ChangeStatus::Modified(change) => {
                warn!("Refusing to edit {}: modified externally", path.display());
                Err(FileError::ExternalModification {
                    path: path.to_path_buf(),
                    diff: self.store.render(path, &change),
                })
            }
        }
    }

    /// Exact phase once at least one occurrence exists
    pub(crate) fn replace_exact(
        &mut self,
        path: &Path,
        content: &str,
        needle: &str,
        replacement: &str,
        occurrences: usize,
        expected: usize,
    ) -> Result<EditResult, FileError> {
        if occurrences != expected {
            return Ok(EditResult::new(
                EditOutcome::CountMismatch,
                EditStrategy::Exact,
                format!(
                    "Expected {} occurrence(s) of the search text but found {}; nothing was changed",
                    expected, occurrences
                ),
            )
            .with_occurrences(occurrences)
            .with_total_lines(content.lines().count()));
        }

        let Some(start) = content.find(needle) else {
            return Err(FileError::InvalidContent(
                "search text vanished while editing".to_string(),
            ));
        };
        let end = start + replacement.len();
        let updated = format!(
            "{}{}{}",
            &content[..start],
            replacement,
            &content[start + needle.len()..]
        );

        let line_number = content[..start].matches('\n').count() + 1;
        let line_text = updated.lines().nth(line_number - 1).unwrap_or_default().to_string();
        let context = snippet(&updated, start, end, self.settings.snippet_radius);
        let total_lines = updated.lines().count();

        self.commit(path, updated)?;

        let message = if occurrences > 1 {
            format!(
                "Replaced the first of {} occurrences at line {}",
                occurrences, line_number
            )
        } else {
            format!("Replaced 1 occurrence at line {}", line_number)
        };

        Ok(
            EditResult::new(EditOutcome::Applied, EditStrategy::Exact, message)
                .at_line(line_number, line_text)
                .with_occurrences(occurrences)
                .with_total_lines(total_lines)
                .with_context(context),
        )
    }

    /// Fuzzy line match, then key phrase, then suggestions
    fn recover(
        &mut self,
        path: &Path,
        content: &str,
        needle: &str,
        replacement: &str,
        threshold: f64,
    ) -> Result<EditResult, FileError> {
        let total_lines = content.lines().count();
        let best = self.matcher.best_line(needle, content);

        if let Some(found) = best.as_ref().filter(|m| m.score > threshold) {
            return self.replace_line(path, content, found, replacement);
        }
        let best_score = best.map_or(0.0, |m| m.score);

        if let Some(hit) = self.matcher.find_key_phrase(needle, content) {
            debug!("Key phrase '{}' found on line {}", hit.phrase, hit.line_number);
            return Ok(EditResult::new(
                EditOutcome::NoMatch,
                EditStrategy::KeyPhrase,
                format!(
                    "Search text not found, but the phrase \"{}\" appears on line {}. \
                     Use insert_at_line with line_number {} to place the buffered content.",
                    hit.phrase, hit.line_number, hit.line_number
                ),
            )
            .at_line(hit.line_number, hit.line_text)
            .with_similarity(best_score)
            .with_occurrences(0)
            .with_total_lines(total_lines));
        }

        let mut result = EditResult::new(
            EditOutcome::NoMatch,
            EditStrategy::SuggestionReport,
            format!(
                "Search text not found in {} ({} lines). The replacement ({} bytes) is saved \
                 in the content buffer: retry with edit_from_buffer using a corrected search \
                 text, or with insert_at_line at one of the suggested lines.",
                path.display(),
                total_lines,
                self.buffer.len()
            ),
        )
        .with_similarity(best_score)
        .with_occurrences(0)
        .with_total_lines(total_lines);
        result.suggestions = self.matcher.suggest(needle, content);
        Ok(result)
    }

    /// Replaces the matched line, keeping its terminator
    pub(crate) fn replace_line(
        &mut self,
        path: &Path,
        content: &str,
        found: &FuzzyMatch,
        replacement: &str,
    ) -> Result<EditResult, FileError> {
        let updated =
            LineInserter::splice(content, found.line_number(), replacement, InsertMode::Replace)?;
        let total_lines = updated.lines().count();
        self.commit(path, updated)?;

        Ok(EditResult::new(
            EditOutcome::Applied,
            EditStrategy::FuzzyLine,
            format!(
                "Replaced line {} (similarity {:.2})",
                found.line_number(),
                found.score
            ),
        )
        .at_line(found.line_number(), found.line_text.clone())
        .with_similarity(found.score)
        .with_total_lines(total_lines))
    }

    /// Writes new content atomically and refreshes the snapshot
    pub(crate) fn commit(&mut self, path: &Path, updated: String) -> Result<(), FileError> {
        self.writer.write(path, &updated)?;
        let bytes = updated.len();
        self.store.record_content(path, updated)?;
        info!("Updated {} ({} bytes)", path.display(), bytes);
        Ok(())
    }
}

impl Default for EditEngine {
    fn default() -> Self {
        Self::new(EditSettings::default())
    }
}

pub(crate) fn read_document(path: &Path) -> Result<String, FileError> {
    fs::read_to_string(path).map_err(|e| FileError::from_io(path, e))
}

fn status_report(
    state: &FileState,
    changed: bool,
    first_observation: bool,
    diff: Option<String>,
    previous_size: Option<u64>,
) -> StatusReport {
    StatusReport {
        path: state.path.clone(),
        changed,
        first_observation,
        diff,
        line_changes: None,
        previous_size,
        current_size: state.byte_size,
        modified: state.modified_time.into(),
        hash_prefix: state.content_hash.chars().take(12).collect(),
    }
}

/// Up to `radius` characters on each side of `text[start..end]`
fn snippet(text: &str, start: usize, end: usize, radius: usize) -> String {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let hi = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    text[lo..hi].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn setup(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.tex");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_exact_replacement() {
        let (_dir, path) = setup("Hello World\n");
        let mut engine = EditEngine::default();

        let result = engine
            .apply(&EditRequest::new(&path, "World", "Rust"))
            .unwrap();

        assert_eq!(result.outcome, EditOutcome::Applied);
        assert_eq!(result.strategy_used, EditStrategy::Exact);
        assert_eq!(result.line_number, Some(1));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Hello Rust\n");
    }

    #[test]
    fn test_count_mismatch_leaves_file() {
        let (_dir, path) = setup("a x b x c\n");
        let mut engine = EditEngine::default();

        let result = engine.apply(&EditRequest::new(&path, "x", "y")).unwrap();

        assert_eq!(result.outcome, EditOutcome::CountMismatch);
        assert_eq!(result.occurrences, Some(2));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a x b x c\n");
    }

    #[test]
    fn test_expected_count_replaces_first_only() {
        let (_dir, path) = setup("a x b x c\n");
        let mut engine = EditEngine::default();

        let result = engine
            .apply(&EditRequest::new(&path, "x", "y").expecting(2))
            .unwrap();

        assert!(result.is_applied());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a y b x c\n");
        assert!(result.diagnostic_message.contains("first of 2"));
    }

    #[test]
    fn test_empty_needle_rejected() {
        let (_dir, path) = setup("text");
        let mut engine = EditEngine::default();
        let result = engine.apply(&EditRequest::new(&path, "", "x"));
        assert!(matches!(result, Err(FileError::InvalidContent(_))));
    }

    #[test]
    fn test_identical_needle_and_replacement_rejected() {
        let (_dir, path) = setup("text");
        let mut engine = EditEngine::default();
        let result = engine.apply(&EditRequest::new(&path, "text", "text"));
        assert!(matches!(result, Err(FileError::InvalidContent(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EditEngine::default();
        let result = engine.apply(&EditRequest::new(dir.path().join("gone.tex"), "a", "b"));
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[test]
    fn test_fuzzy_line_replacement_keeps_terminator() {
        let (_dir, path) = setup("intro\nThe results are significant.\noutro\n");
        let mut engine = EditEngine::default();

        let result = engine
            .apply(&EditRequest::new(
                &path,
                "The results were significant.",
                "The results are highly significant.",
            ))
            .unwrap();

        assert_eq!(result.strategy_used, EditStrategy::FuzzyLine);
        assert_eq!(result.line_number, Some(2));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "intro\nThe results are highly significant.\noutro\n"
        );
        assert_eq!(engine.buffer().get(), Some("The results are highly significant."));
    }

    #[test]
    fn test_fuzzy_line_replacement_on_crlf_file() {
        let (_dir, path) = setup("intro\r\nThe results are significant.\r\noutro\r\n");
        let mut engine = EditEngine::default();

        let result = engine
            .apply(&EditRequest::new(
                &path,
                "The results were significant.",
                "Revised results.",
            ))
            .unwrap();

        assert_eq!(result.strategy_used, EditStrategy::FuzzyLine);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "intro\r\nRevised results.\r\noutro\r\n"
        );
    }

    #[test]
    fn test_fuzzy_score_equal_to_threshold_does_not_write() {
        let (_dir, path) = setup("abcxy\n");
        let mut engine = EditEngine::default();

        let result = engine.apply(&EditRequest::new(&path, "abcde", "Z")).unwrap();

        assert_eq!(result.outcome, EditOutcome::NoMatch);
        assert_eq!(result.similarity, Some(0.6));
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcxy\n");
    }

    #[test]
    fn test_suggestion_report_buffers_replacement() {
        let content = "alpha beta\ngamma\n";
        let (_dir, path) = setup(content);
        let mut engine = EditEngine::default();

        let result = engine
            .apply(&EditRequest::new(&path, "zzz beta qqq rrr sss ttt", "NEW"))
            .unwrap();

        assert_eq!(result.outcome, EditOutcome::NoMatch);
        assert_eq!(result.strategy_used, EditStrategy::SuggestionReport);
        assert_eq!(result.total_lines, Some(2));
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].line_number, 1);
        assert!(result.diagnostic_message.contains("edit_from_buffer"));
        assert_eq!(engine.buffer().get(), Some("NEW"));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_key_phrase_recommends_insertion() {
        let content = "\\section{Method}\nWe sample every participant twice per week.\n";
        let (_dir, path) = setup(content);
        let mut engine = EditEngine::default();

        let needle = "Intro paragraph that differs. We sample every participant twice per week. \
                      Another long sentence not in the file at all.";
        let result = engine.apply(&EditRequest::new(&path, needle, "NEW")).unwrap();

        assert_eq!(result.outcome, EditOutcome::NoMatch);
        assert_eq!(result.strategy_used, EditStrategy::KeyPhrase);
        assert_eq!(result.line_number, Some(2));
        assert!(result.diagnostic_message.contains("insert_at_line"));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_external_modification_refuses_edit() {
        let (_dir, path) = setup("one\n");
        let mut engine = EditEngine::default();
        engine.read(&path, 1, 50).unwrap();

        fs::write(&path, "one\ntwo\n").unwrap();

        let result = engine.apply(&EditRequest::new(&path, "one", "uno"));
        match result {
            Err(FileError::ExternalModification { diff, .. }) => assert!(diff.contains("+two")),
            other => panic!("expected refusal, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");

        // Still refused: a refusal does not accept the external version
        assert!(engine.apply(&EditRequest::new(&path, "one", "uno")).is_err());
    }

    #[test]
    fn test_status_accepts_external_change() {
        let (_dir, path) = setup("one\n");
        let mut engine = EditEngine::default();

        let first = engine.status(&path).unwrap();
        assert!(first.first_observation);
        assert!(!first.changed);

        fs::write(&path, "one\ntwo\n").unwrap();
        let second = engine.status(&path).unwrap();
        assert!(second.changed);
        assert_eq!(second.previous_size, Some(4));
        assert_eq!(
            second.line_changes,
            Some(crate::diff::DiffStats {
                additions: 1,
                deletions: 0
            })
        );
        assert_eq!(second.current_size, 8);
        assert!(second.diff.unwrap().contains("+two"));

        let third = engine.status(&path).unwrap();
        assert!(!third.changed);
        assert!(third.line_changes.is_none());
        assert!(engine.apply(&EditRequest::new(&path, "two", "2")).unwrap().is_applied());
    }

    #[test]
    fn test_read_window() {
        let content: String = (1..=10).map(|i| format!("line {}\n", i)).collect();
        let (_dir, path) = setup(&content);
        let mut engine = EditEngine::default();

        let view = engine.read(&path, 3, 2).unwrap();

        assert_eq!(view.listing, "     3\tline 3\n     4\tline 4");
        assert_eq!(view.lines_read, 2);
        assert_eq!(view.total_lines, 10);
        assert!(engine.store().is_tracked(&path));
    }

    #[test]
    fn test_read_past_end_is_empty() {
        let (_dir, path) = setup("only\n");
        let view = EditEngine::default().read(&path, 5, 10).unwrap();
        assert_eq!(view.listing, "");
        assert_eq!(view.lines_read, 0);
        assert_eq!(view.total_lines, 1);
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let text = "ééééé[X]ééééé";
        let start = text.find('[').unwrap();
        let end = text.find(']').unwrap() + 1;
        assert_eq!(snippet(text, start, end, 2), "éé[X]éé");
        assert_eq!(snippet(text, start, end, 0), "[X]");
        assert_eq!(snippet(text, start, end, 50), text);
    }
}
