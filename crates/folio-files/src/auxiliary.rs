//! LaTeX auxiliary files
//!
//! Compiling `paper.tex` leaves `paper.aux`, `paper.log`, `paper.toc` and
//! friends beside it. They are found by stem only: nothing here runs or
//! inspects a LaTeX build. Cleanup archives them so a bad cleanup can be
//! undone; a refresh deletes the ones the next build regenerates anyway.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::ArchiveManager;
use crate::error::FileError;
use crate::models::{
    AuxCategory, AuxFile, AuxGroup, AuxListing, AuxRemoval, CleanupFailure, CleanupReport,
};

const AUX_CLEANUP_REASON: &str = "auxiliary_cleanup";

/// Bibliography outputs a cleanup keeps unless told otherwise; the `.blg`
/// log is not among them
const BIBLIOGRAPHY_DATA: &[&str] = &[".bbl", ".bcf", ".run.xml"];

impl AuxCategory {
    /// Every category, in listing order
    pub const ALL: [AuxCategory; 5] = [
        AuxCategory::Compilation,
        AuxCategory::Bibliography,
        AuxCategory::Index,
        AuxCategory::Beamer,
        AuxCategory::Other,
    ];

    /// Suffixes appended to the source's stem
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            AuxCategory::Compilation => &[".aux", ".log", ".out", ".fls", ".fdb_latexmk"],
            AuxCategory::Bibliography => &[".bbl", ".blg", ".bcf", ".run.xml"],
            AuxCategory::Index => &[".idx", ".ind", ".ilg", ".glo", ".gls", ".glg"],
            AuxCategory::Beamer => &[".nav", ".snm", ".vrb"],
            AuxCategory::Other => &[".toc", ".lof", ".lot", ".dvi", ".synctex.gz"],
        }
    }
}

impl AuxGroup {
    /// Suffixes a refresh of this group deletes
    pub fn extensions(&self) -> Vec<&'static str> {
        match self {
            AuxGroup::Toc => vec![".toc", ".lof", ".lot"],
            AuxGroup::Bib => vec![".bbl", ".blg", ".bcf", ".run.xml"],
            AuxGroup::Idx => vec![".idx", ".ind", ".ilg"],
            AuxGroup::All => [AuxGroup::Toc, AuxGroup::Bib, AuxGroup::Idx]
                .iter()
                .flat_map(|group| group.extensions())
                .collect(),
        }
    }
}

/// Suffixes archived by a cleanup
fn cleanup_extensions(keep_bibliography: bool) -> impl Iterator<Item = &'static str> {
    AuxCategory::ALL
        .into_iter()
        .flat_map(|category| category.extensions().iter().copied())
        .filter(move |ext| !(keep_bibliography && BIBLIOGRAPHY_DATA.contains(ext)))
}

/// `(directory, stem)` of a `.tex` source that must exist
fn latex_source(document: &Path) -> Result<(PathBuf, String), FileError> {
    let metadata = fs::metadata(document).map_err(|e| FileError::from_io(document, e))?;
    let is_tex = document.extension().map_or(false, |ext| ext == "tex");
    if !metadata.is_file() || !is_tex {
        return Err(FileError::InvalidContent(format!(
            "{} is not a LaTeX source",
            document.display()
        )));
    }
    Ok(source_stem(document))
}

fn source_stem(document: &Path) -> (PathBuf, String) {
    let parent = match document.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    (parent, stem)
}

/// Sources whose auxiliary files a cleanup of `path` covers
///
/// A directory covers its visible top-level `.tex` files; any other path
/// covers itself, whatever its extension.
fn cleanup_sources(path: &Path) -> Result<Vec<(PathBuf, String)>, FileError> {
    let metadata = fs::metadata(path).map_err(|e| FileError::from_io(path, e))?;
    if !metadata.is_dir() {
        return Ok(vec![source_stem(path)]);
    }

    let mut sources = Vec::new();
    for dir_entry in fs::read_dir(path).map_err(|e| FileError::from_io(path, e))? {
        let dir_entry = dir_entry?;
        let entry_path = dir_entry.path();
        let hidden = dir_entry.file_name().to_string_lossy().starts_with('.');
        let is_tex = entry_path.extension().map_or(false, |ext| ext == "tex");
        if !hidden && is_tex && dir_entry.file_type()?.is_file() {
            sources.push(source_stem(&entry_path));
        }
    }
    sources.sort();
    Ok(sources)
}

impl ArchiveManager {
    /// Archives the auxiliary files of a source, or of every source in a
    /// directory
    ///
    /// Bibliography data (`.bbl`, `.bcf`, `.run.xml`) is left alone when
    /// `keep_bibliography` is set. Failures are collected per file.
    pub fn clean_aux(
        &self,
        path: &Path,
        keep_bibliography: bool,
    ) -> Result<CleanupReport, FileError> {
        let mut report = CleanupReport::default();

        for (directory, stem) in cleanup_sources(path)? {
            for ext in cleanup_extensions(keep_bibliography) {
                let candidate = directory.join(format!("{}{}", stem, ext));
                if !candidate.is_file() {
                    continue;
                }
                match self.archive(&candidate, AUX_CLEANUP_REASON) {
                    Ok(entry) => report.archived.push(entry),
                    Err(e) => {
                        warn!("Could not archive {}: {}", candidate.display(), e);
                        report.errors.push(CleanupFailure {
                            path: candidate,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            "Archived {} auxiliary file(s) under {}",
            report.archived.len(),
            path.display()
        );
        Ok(report)
    }

    /// Deletes one group of auxiliary files so the next build regenerates
    /// them
    pub fn refresh_aux(&self, document: &Path, group: AuxGroup) -> Result<AuxRemoval, FileError> {
        let (directory, stem) = latex_source(document)?;
        let mut removal = AuxRemoval::default();

        for ext in group.extensions() {
            let candidate = directory.join(format!("{}{}", stem, ext));
            if !candidate.is_file() {
                continue;
            }
            match fs::remove_file(&candidate) {
                Ok(()) => removal.removed.push(candidate),
                Err(e) => removal.errors.push(CleanupFailure {
                    error: FileError::from_io(&candidate, e).to_string(),
                    path: candidate,
                }),
            }
        }

        debug!(
            "Removed {} auxiliary file(s) of {}",
            removal.removed.len(),
            document.display()
        );
        Ok(removal)
    }

    /// Auxiliary files present beside a source
    pub fn list_aux(&self, document: &Path) -> Result<AuxListing, FileError> {
        let (directory, stem) = latex_source(document)?;
        let mut files = Vec::new();

        for category in AuxCategory::ALL {
            for ext in category.extensions() {
                let name = format!("{}{}", stem, ext);
                let path = directory.join(&name);
                let metadata = match fs::metadata(&path) {
                    Ok(metadata) if metadata.is_file() => metadata,
                    _ => continue,
                };
                files.push(AuxFile {
                    path,
                    name,
                    category,
                    size: metadata.len(),
                    modified: metadata
                        .modified()
                        .map(Into::into)
                        .unwrap_or_else(|_| chrono::Local::now()),
                });
            }
        }

        let total_size = files.iter().map(|f| f.size).sum();
        Ok(AuxListing {
            document: document.to_path_buf(),
            files,
            total_size,
        })
    }
}
