//! Core configuration types and data structures

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main application configuration
///
/// Every section falls back to its defaults, so a config file only needs
/// the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Edit engine tuning
    pub edit: EditConfig,
    /// Archive layout
    pub archive: ArchiveConfig,
    /// Where relative paths resolve
    pub workspace: WorkspaceConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Edit engine tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditConfig {
    /// Minimum similarity for the fuzzy fallback of an exact edit
    pub fuzzy_threshold: f64,
    /// Default similarity threshold for buffered edits
    pub buffered_threshold: f64,
    /// Maximum number of suggestions in a failure report
    pub suggestion_limit: usize,
    /// Characters of the buffer used as a needle when none is given
    pub needle_prefix_chars: usize,
    /// Characters of context reported around an applied edit
    pub snippet_radius: usize,
    /// Lines returned by a read without an explicit limit
    pub read_limit: usize,
}

/// Archive layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Hidden directory created next to archived files
    pub dir_name: String,
    /// Extension appended to archive names for metadata sidecars
    pub metadata_suffix: String,
    /// Glob used by workspace cleanup when no pattern is given
    pub cleanup_pattern: String,
}

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root for relative paths; the user's documents directory when unset
    pub root: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when no verbosity flag is given
    pub level: String,
}

impl Default for EditConfig {
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

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir_name: ".folio_archive".to_string(),
            metadata_suffix: "meta".to_string(),
            cleanup_pattern: "*_old*".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration manager trait
pub trait ConfigManager {
    /// Load configuration
    fn load_config(&mut self) -> Result<AppConfig, crate::error::ConfigError>;
    /// Save configuration
    fn save_config(&self, config: &AppConfig) -> Result<(), crate::error::ConfigError>;
    /// Validate configuration
    fn validate_config(&self, config: &AppConfig) -> Result<(), crate::error::ConfigError>;
}
