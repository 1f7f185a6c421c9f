// Command handlers for the folio CLI

pub mod config;
pub mod operation;
pub mod session;

pub use config::{load_config, ConfigAction, ConfigCommand};
pub use operation::OperationCommand;
pub use session::{SessionCommand, SessionSummary};

use std::path::Path;

use folio_config::AppConfig;
use folio_files::{
    ArchiveSettings, DocumentSession, EditSettings, SessionSettings, WorkspaceResolver,
};

use crate::output::OutputStyle;

/// State shared by session-backed commands
pub struct CommandContext {
    /// Editing session for this invocation
    pub session: DocumentSession,
    /// Human-readable output styling
    pub style: OutputStyle,
    /// Print JSON instead of styled text
    pub json: bool,
}

/// Session settings from the loaded configuration
pub fn session_settings(config: &AppConfig) -> SessionSettings {
    SessionSettings {
        edit: EditSettings {
            fuzzy_threshold: config.edit.fuzzy_threshold,
            buffered_threshold: config.edit.buffered_threshold,
            suggestion_limit: config.edit.suggestion_limit,
            needle_prefix_chars: config.edit.needle_prefix_chars,
            snippet_radius: config.edit.snippet_radius,
            read_limit: config.edit.read_limit,
        },
        archive: ArchiveSettings {
            dir_name: config.archive.dir_name.clone(),
            metadata_suffix: config.archive.metadata_suffix.clone(),
            cleanup_pattern: config.archive.cleanup_pattern.clone(),
        },
    }
}

/// Builds a session rooted at `root`, the configured workspace root, or the
/// user's documents directory, in that order
pub fn build_session(config: &AppConfig, root: Option<&Path>) -> DocumentSession {
    let root = root
        .map(Path::to_path_buf)
        .or_else(|| config.workspace.root.clone())
        .unwrap_or_else(WorkspaceResolver::default_root);
    DocumentSession::new(
        Box::new(WorkspaceResolver::new(root)),
        session_settings(config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_follow_configuration() {
        let mut config = AppConfig::default();
        config.edit.fuzzy_threshold = 0.8;
        config.archive.dir_name = ".attic".to_string();

        let settings = session_settings(&config);

        assert_eq!(settings.edit.fuzzy_threshold, 0.8);
        assert_eq!(settings.archive.dir_name, ".attic");
        assert_eq!(settings.edit.read_limit, 50);
    }

    #[test]
    fn test_default_configuration_matches_engine_defaults() {
        assert_eq!(session_settings(&AppConfig::default()), SessionSettings::default());
    }
}
