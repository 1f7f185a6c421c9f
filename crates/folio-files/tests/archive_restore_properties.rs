//! Property-based tests for archive naming and restoration
//! **Feature: folio-files, Property 3: Archive Round Trip**

use std::fs;

use chrono::{Local, TimeZone};
use folio_files::{ArchiveManager, ArchiveMetadata};
use proptest::prelude::*;
use tempfile::TempDir;

// Property 3: Archive Round Trip
// Archiving then restoring returns the same bytes to the same path, and the
// sidecar disappears. Archives of one name within one second get distinct,
// increasing sequence numbers.

#[test]
fn prop_archive_restore_round_trip() {
    proptest!(|(
        stem in "[a-zA-Z][a-zA-Z0-9_-]{0,15}",
        extension in prop::sample::select(vec!["tex", "md", "txt", "bib"]),
        content in ".{0,300}",
    )| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(format!("{}.{}", stem, extension));
        fs::write(&path, &content).unwrap();
        let manager = ArchiveManager::default();

        let entry = manager.archive(&path, "manual").unwrap();
        prop_assert!(!path.exists());
        prop_assert!(entry.archive_path.exists());

        let outcome = manager.restore(&entry.archive_path, None).unwrap();

        prop_assert_eq!(&outcome.restored_to, &path);
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), content);
        prop_assert!(!entry.archive_path.exists());
        prop_assert!(!manager.sidecar_path(&entry.archive_path).exists());
    });
}

#[test]
fn prop_same_second_sequences_increase() {
    proptest!(|(count in 1..8usize)| {
        let temp_dir = TempDir::new().unwrap();
        let manager = ArchiveManager::default();
        let now = Local.with_ymd_and_hms(2024, 5, 20, 9, 15, 0).unwrap();
        let path = temp_dir.path().join("draft.tex");

        for expected in 1..=count {
            fs::write(&path, format!("version {}", expected)).unwrap();
            let entry = manager.archive_at(&path, "manual", now).unwrap();

            let name = format!("draft_20240520_091500_{:03}.tex", expected);
            prop_assert!(entry.archive_path.ends_with(&name));
            prop_assert_eq!(entry.sequence, Some(expected as u32));
        }

        let listed = manager.list(temp_dir.path()).unwrap();
        prop_assert_eq!(listed.len(), count);
    });
}

#[test]
fn prop_sidecar_records_origin() {
    proptest!(|(reason in "[a-z ]{1,20}")| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chapter.tex");
        fs::write(&path, "text").unwrap();
        let manager = ArchiveManager::default();

        let entry = manager.archive(&path, &reason).unwrap();
        let raw = fs::read_to_string(manager.sidecar_path(&entry.archive_path)).unwrap();
        let metadata: ArchiveMetadata = serde_json::from_str(&raw).unwrap();

        prop_assert_eq!(metadata.original_path, path);
        prop_assert_eq!(metadata.reason, reason);
        prop_assert_eq!(metadata.original_name.as_deref(), Some("chapter.tex"));
        prop_assert_eq!(Some(metadata.sequence), entry.sequence);
    });
}

#[test]
fn test_restore_collisions_count_up() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ArchiveManager::default();
    let path = temp_dir.path().join("paper.tex");

    let mut archived = Vec::new();
    for i in 0..3 {
        fs::write(&path, format!("v{}", i)).unwrap();
        archived.push(manager.archive(&path, "manual").unwrap());
    }
    fs::write(&path, "live").unwrap();

    let restored: Vec<_> = archived
        .iter()
        .map(|e| manager.restore(&e.archive_path, None).unwrap().restored_to)
        .collect();

    assert_eq!(restored[0], temp_dir.path().join("paper_1.tex"));
    assert_eq!(restored[1], temp_dir.path().join("paper_2.tex"));
    assert_eq!(restored[2], temp_dir.path().join("paper_3.tex"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "live");
    assert!(manager.list(temp_dir.path()).unwrap().is_empty());
}
