//! Turning caller-supplied path strings into filesystem paths

use std::path::{Path, PathBuf};

use crate::error::FileError;

/// Maps raw paths from callers onto the filesystem
pub trait PathResolver: Send + Sync {
    /// Resolves a raw path
    fn resolve(&self, raw: &str) -> Result<PathBuf, FileError>;
}

/// Resolves relative paths against a workspace root
///
/// `~` and `~/…` expand to the home directory and absolute paths pass
/// through unchanged.
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    root: PathBuf,
}

impl WorkspaceResolver {
    /// Creates a resolver rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root used for relative paths
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The user's documents directory, else the current directory
    pub fn default_root() -> PathBuf {
        dirs::document_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for WorkspaceResolver {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl PathResolver for WorkspaceResolver {
    fn resolve(&self, raw: &str) -> Result<PathBuf, FileError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FileError::InvalidContent("path must not be empty".to_string()));
        }

        let expanded = expand_home(raw)?;
        if expanded.is_absolute() {
            Ok(expanded)
        } else {
            Ok(self.root.join(expanded))
        }
    }
}

fn expand_home(raw: &str) -> Result<PathBuf, FileError> {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return Ok(PathBuf::from(raw)),
    };

    let home = dirs::home_dir().ok_or_else(|| {
        FileError::InvalidContent("cannot expand '~': home directory is unknown".to_string())
    })?;
    Ok(home.join(rest.trim_start_matches(['/', '\\'])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_joins_root() {
        let resolver = WorkspaceResolver::new("/work");
        assert_eq!(
            resolver.resolve("paper/main.tex").unwrap(),
            PathBuf::from("/work/paper/main.tex")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_passes_through() {
        let resolver = WorkspaceResolver::new("/work");
        assert_eq!(
            resolver.resolve("/tmp/x.md").unwrap(),
            PathBuf::from("/tmp/x.md")
        );
    }

    #[test]
    fn test_home_expansion() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let resolver = WorkspaceResolver::new("/work");
        assert_eq!(resolver.resolve("~/notes.md").unwrap(), home.join("notes.md"));
        assert_eq!(resolver.resolve("~").unwrap(), home);
    }

    #[test]
    fn test_tilde_inside_name_is_literal() {
        let resolver = WorkspaceResolver::new("/work");
        assert_eq!(
            resolver.resolve("~draft.tex").unwrap(),
            PathBuf::from("/work/~draft.tex")
        );
    }

    #[test]
    fn test_empty_path_rejected() {
        let resolver = WorkspaceResolver::new("/work");
        assert!(matches!(
            resolver.resolve("  "),
            Err(FileError::InvalidContent(_))
        ));
    }
}
