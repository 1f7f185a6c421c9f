//! Integration tests for recovering failed edits through the content buffer

use std::fs;
use std::path::PathBuf;

use folio_files::{
    EditEngine, EditOutcome, EditRequest, EditStrategy, FileError, InsertMode,
};
use tempfile::TempDir;

const PAPER: &str = "\\documentclass{article}
\\begin{document}
\\section{Introduction}
Document engines rarely detect concurrent edits.
\\section{Method}
We compare snapshots before every write.
\\end{document}
";

fn setup() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("paper.tex");
    fs::write(&path, PAPER).unwrap();
    (temp_dir, path)
}

#[test]
fn test_failed_edit_then_insert_from_buffer() {
    let (_dir, path) = setup();
    let mut engine = EditEngine::default();
    let generated = "\\section{Results}\nSnapshots caught every external write.";

    let failed = engine
        .apply(&EditRequest::new(
            &path,
            "\\section{Evaluation}\nNothing like this exists here at all",
            generated,
        ))
        .unwrap();

    assert_eq!(failed.outcome, EditOutcome::NoMatch);
    assert_eq!(failed.total_lines, Some(7));
    assert_eq!(engine.buffer().get(), Some(generated));
    assert_eq!(fs::read_to_string(&path).unwrap(), PAPER);

    // Place the buffered section before \end{document}
    let inserted = engine
        .insert_at_line(&path, 7, None, InsertMode::Before)
        .unwrap();

    assert!(inserted.is_applied());
    assert_eq!(inserted.strategy_used, EditStrategy::LineInsert);
    assert_eq!(inserted.line_number, Some(7));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with(
        "We compare snapshots before every write.\n\\section{Results}\nSnapshots caught every external write.\n\\end{document}\n"
    ));
}

#[test]
fn test_key_phrase_points_at_insertion_line() {
    let (_dir, path) = setup();
    let mut engine = EditEngine::default();

    let result = engine
        .apply(&EditRequest::new(
            &path,
            "Rewritten opening sentence goes here. We compare snapshots before every write. More text follows here too.",
            "NEW PARAGRAPH",
        ))
        .unwrap();

    assert_eq!(result.strategy_used, EditStrategy::KeyPhrase);
    assert_eq!(result.line_number, Some(6));
    assert_eq!(fs::read_to_string(&path).unwrap(), PAPER);

    let line = result.line_number.unwrap();
    engine
        .insert_at_line(&path, line, None, InsertMode::After)
        .unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("before every write.\nNEW PARAGRAPH\n\\end{document}"));
}

#[test]
fn test_suggestions_point_at_related_lines() {
    let (_dir, path) = setup();
    let mut engine = EditEngine::default();

    let result = engine
        .apply(&EditRequest::new(
            &path,
            "before anything, snapshots matter",
            "X",
        ))
        .unwrap();

    assert_eq!(result.strategy_used, EditStrategy::SuggestionReport);
    assert!(!result.suggestions.is_empty());
    assert_eq!(result.suggestions[0].line_number, 6);
    assert!(result.diagnostic_message.contains("insert_at_line"));
}

#[test]
fn test_buffer_is_latest_write_wins() {
    let (_dir, path) = setup();
    let mut engine = EditEngine::default();

    engine
        .apply(&EditRequest::new(&path, "no such text one", "first payload"))
        .unwrap();
    engine
        .apply(&EditRequest::new(&path, "no such text two", "second payload"))
        .unwrap();

    assert_eq!(engine.buffer().get(), Some("second payload"));
}

#[test]
fn test_edit_from_buffer_with_corrected_needle() {
    let (_dir, path) = setup();
    let mut engine = EditEngine::default();

    let first = engine
        .apply(&EditRequest::new(
            &path,
            "Document engines never detect edits",
            "Document engines now detect concurrent edits.",
        ))
        .unwrap();

    // The fuzzy phase already rewrote the closest line
    assert_eq!(first.strategy_used, EditStrategy::FuzzyLine);
    assert_eq!(first.line_number, Some(4));
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("Document engines now detect concurrent edits.\n"));

    let retried = engine
        .edit_from_buffer(&path, Some("\\section{Method}"), None, None)
        .unwrap();
    assert_eq!(retried.strategy_used, EditStrategy::Exact);
    assert!(fs::read_to_string(&path)
        .unwrap()
        .contains("\nDocument engines now detect concurrent edits.\nWe compare"));
}

#[test]
fn test_buffered_operations_require_content() {
    let (_dir, path) = setup();
    let mut engine = EditEngine::default();

    assert!(matches!(
        engine.edit_from_buffer(&path, None, None, None),
        Err(FileError::BufferEmpty)
    ));
    assert!(matches!(
        engine.insert_at_line(&path, 1, None, InsertMode::After),
        Err(FileError::BufferEmpty)
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), PAPER);
}
