//! Retrying an edit from the content buffer

use std::path::Path;

use tracing::debug;

use crate::edit::{read_document, EditEngine};
use crate::error::FileError;
use crate::models::{EditOutcome, EditResult, EditStrategy};

impl EditEngine {
    /// Retries an edit with a tunable fuzzy threshold
    ///
    /// The replacement defaults to the buffered content and the needle to
    /// the first `needle_prefix_chars` characters of the replacement. A
    /// single exact occurrence is replaced outright; several are reported as
    /// a count mismatch. Otherwise the most similar line is replaced when
    /// its score exceeds `fuzzy_threshold`.
    ///
    /// An explicitly supplied replacement that fails to apply is buffered
    /// for the next attempt.
    pub fn edit_from_buffer(
        &mut self,
        path: &Path,
        needle: Option<&str>,
        replacement: Option<&str>,
        fuzzy_threshold: Option<f64>,
    ) -> Result<EditResult, FileError> {
        let threshold = fuzzy_threshold.unwrap_or(self.settings.buffered_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(FileError::InvalidThreshold(threshold));
        }

        let explicit = replacement.is_some();
        let replacement = match replacement {
            Some(replacement) => replacement.to_string(),
            None => self.buffer.get_or_require()?.to_string(),
        };
        let needle = match needle {
            Some(needle) => needle.to_string(),
            None => replacement
                .chars()
                .take(self.settings.needle_prefix_chars)
                .collect(),
        };
        if needle.is_empty() {
            return Err(FileError::InvalidContent(
                "search text must not be empty".to_string(),
            ));
        }

        self.ensure_unmodified(path)?;
        let content = read_document(path)?;
        let occurrences = content.matches(needle.as_str()).count();

        if occurrences > 0 {
            return self.replace_exact(path, &content, &needle, &replacement, occurrences, 1);
        }

        let best = self.matcher.best_line(&needle, &content);
        if let Some(found) = best.as_ref().filter(|m| m.score > threshold) {
            return self.replace_line(path, &content, found, &replacement);
        }

        if explicit {
            self.buffer.set(replacement.as_str());
        }

        let total_lines = content.lines().count();
        let message = match &best {
            Some(found) => format!(
                "No line exceeded similarity {:.2}; best was {:.2} on line {}",
                threshold,
                found.score,
                found.line_number()
            ),
            None => format!("No line exceeded similarity {:.2}; the file is empty", threshold),
        };
        debug!("Buffered edit of {} failed: {}", path.display(), message);

        let mut result = EditResult::new(EditOutcome::NoMatch, EditStrategy::FuzzyLine, message)
            .with_similarity(best.as_ref().map_or(0.0, |m| m.score))
            .with_occurrences(0)
            .with_total_lines(total_lines);
        if let Some(found) = best {
            result = result.at_line(found.line_number(), found.line_text);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EditRequest;
    use std::fs;
    use std::path::PathBuf;

    fn setup(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.tex");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_empty_buffer_fails() {
        let (_dir, path) = setup("text\n");
        let result = EditEngine::default().edit_from_buffer(&path, Some("text"), None, None);
        assert!(matches!(result, Err(FileError::BufferEmpty)));
    }

    #[test]
    fn test_threshold_validation() {
        let (_dir, path) = setup("text\n");
        let mut engine = EditEngine::default();
        engine.buffer_mut().set("x");

        for bad in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                engine.edit_from_buffer(&path, Some("text"), None, Some(bad)),
                Err(FileError::InvalidThreshold(_))
            ));
        }
    }

    #[test]
    fn test_retry_after_failed_edit_uses_buffer() {
        let (_dir, path) = setup("first line\nsecond line\n");
        let mut engine = EditEngine::default();

        let failed = engine
            .apply(&EditRequest::new(&path, "not present anywhere", "REPLACED"))
            .unwrap();
        assert!(!failed.is_applied());

        let retried = engine
            .edit_from_buffer(&path, Some("second line"), None, None)
            .unwrap();

        assert!(retried.is_applied());
        assert_eq!(retried.strategy_used, EditStrategy::Exact);
        assert_eq!(fs::read_to_string(&path).unwrap(), "first line\nREPLACED\n");
    }

    #[test]
    fn test_multiple_occurrences_are_a_mismatch() {
        let (_dir, path) = setup("dup\ndup\n");
        let mut engine = EditEngine::default();
        engine.buffer_mut().set("new");

        let result = engine.edit_from_buffer(&path, Some("dup"), None, None).unwrap();

        assert_eq!(result.outcome, EditOutcome::CountMismatch);
        assert_eq!(result.occurrences, Some(2));
        assert_eq!(fs::read_to_string(&path).unwrap(), "dup\ndup\n");
    }

    #[test]
    fn test_fuzzy_threshold_controls_application() {
        let (_dir, path) = setup("The quick brown fox\n");
        let mut engine = EditEngine::default();
        engine.buffer_mut().set("A slow red fox");

        let strict = engine
            .edit_from_buffer(&path, Some("The quick brown cat"), None, Some(0.99))
            .unwrap();
        assert_eq!(strict.outcome, EditOutcome::NoMatch);
        assert!(strict.similarity.unwrap() > 0.7);
        assert_eq!(fs::read_to_string(&path).unwrap(), "The quick brown fox\n");

        let relaxed = engine
            .edit_from_buffer(&path, Some("The quick brown cat"), None, Some(0.5))
            .unwrap();
        assert_eq!(relaxed.strategy_used, EditStrategy::FuzzyLine);
        assert!(relaxed.is_applied());
        assert_eq!(fs::read_to_string(&path).unwrap(), "A slow red fox\n");
    }

    #[test]
    fn test_threshold_must_be_exceeded() {
        let (_dir, path) = setup("abcxy\n");
        let mut engine = EditEngine::default();
        engine.buffer_mut().set("Z");

        let result = engine
            .edit_from_buffer(&path, Some("abcde"), None, Some(0.6))
            .unwrap();

        assert_eq!(result.outcome, EditOutcome::NoMatch);
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcxy\n");
    }

    #[test]
    fn test_explicit_replacement_is_buffered_on_failure() {
        let (_dir, path) = setup("abc\n");
        let mut engine = EditEngine::default();

        let result = engine
            .edit_from_buffer(&path, Some("zzzzzzzz"), Some("payload"), None)
            .unwrap();

        assert_eq!(result.outcome, EditOutcome::NoMatch);
        assert_eq!(engine.buffer().get(), Some("payload"));
    }

    #[test]
    fn test_needle_defaults_to_replacement_prefix() {
        let (_dir, path) = setup("keep\nSome heading text\nkeep\n");
        let mut engine = EditEngine::default();
        engine.buffer_mut().set("Some heading text, revised");

        let result = engine.edit_from_buffer(&path, None, None, None).unwrap();

        // The prefix is the whole payload here, so the most similar line is replaced
        assert_eq!(result.strategy_used, EditStrategy::FuzzyLine);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "keep\nSome heading text, revised\nkeep\n"
        );
    }
}
