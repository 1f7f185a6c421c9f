//! Folio Configuration Management
//!
//! Layered settings for the document editing engine: built-in defaults, an
//! optional TOML file and `FOLIO__SECTION__KEY` environment overrides, in
//! that order of precedence.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::ConfigManager;
pub use types::{
    AppConfig, ArchiveConfig, ConfigManager as ConfigManagerTrait, EditConfig, LoggingConfig,
    WorkspaceConfig,
};
