//! Configuration manager implementation

use std::path::{Component, Path, PathBuf};

use config::{Config, Environment, File};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::{AppConfig, ConfigManager as ConfigManagerTrait},
};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration manager
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
    /// Fail when the config file is missing
    required: bool,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: "FOLIO".to_string(),
            required: false,
        }
    }

    /// Create with custom config path
    ///
    /// A path given explicitly must exist when loading.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            env_prefix: "FOLIO".to_string(),
            required: true,
        }
    }

    /// Create with a config path that may be absent
    pub fn with_optional_path(path: PathBuf) -> Self {
        Self {
            required: false,
            ..Self::with_path(path)
        }
    }

    /// Override the environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Configuration file this manager reads and writes
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }
}

impl ConfigManagerTrait for ConfigManager {
    fn load_config(&mut self) -> Result<AppConfig> {
        if self.required && !self.config_path.exists() {
            return Err(ConfigError::NotFound(
                self.config_path.display().to_string(),
            ));
        }

        // FOLIO__EDIT__FUZZY_THRESHOLD=0.8 overrides edit.fuzzy_threshold
        let builder = Config::builder()
            .add_source(File::from(self.config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;
        debug!(path = %self.config_path.display(), "Loaded configuration");
        Ok(app_config)
    }

    fn save_config(&self, config: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(config)?;
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.config_path, toml)?;
        debug!(path = %self.config_path.display(), "Saved configuration");
        Ok(())
    }

    fn validate_config(&self, config: &AppConfig) -> Result<()> {
        let edit = &config.edit;
        for (name, value) in [
            ("edit.fuzzy_threshold", edit.fuzzy_threshold),
            ("edit.buffered_threshold", edit.buffered_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("edit.suggestion_limit", edit.suggestion_limit),
            ("edit.needle_prefix_chars", edit.needle_prefix_chars),
            ("edit.read_limit", edit.read_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        validate_archive_dir(&config.archive.dir_name)?;
        let suffix = &config.archive.metadata_suffix;
        if suffix.is_empty() || suffix.contains(['.', '/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "archive.metadata_suffix must be a bare extension, got '{}'",
                suffix
            )));
        }
        if config.archive.cleanup_pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "archive.cleanup_pattern must not be empty".to_string(),
            ));
        }

        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                config.logging.level
            )));
        }
        Ok(())
    }
}

/// The archive directory is a single hidden path component.
fn validate_archive_dir(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || !name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "archive.dir_name must be a single hidden directory name, got '{}'",
            name
        )));
    }
    Ok(())
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
