// Configuration loading and the `config` subcommand

use std::io::Write;
use std::path::Path;

use folio_config::{AppConfig, ConfigManager, ConfigManagerTrait};
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::output::OutputStyle;

/// Loads and validates configuration from `path` or the default location
pub fn load_config(path: Option<&Path>) -> CliResult<(ConfigManager, AppConfig)> {
    let mut manager = match path {
        Some(path) => ConfigManager::with_path(path.to_path_buf()),
        None => ConfigManager::new(),
    };
    let config = manager.load_config()?;
    manager.validate_config(&config)?;
    Ok((manager, config))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    Show,
    Path,
    Init { force: bool },
}

/// Inspect and initialize configuration
pub struct ConfigCommand {
    pub action: ConfigAction,
}

impl ConfigCommand {
    pub fn new(action: ConfigAction) -> Self {
        Self { action }
    }

    pub fn execute(
        &self,
        manager: &ConfigManager,
        config: &AppConfig,
        style: &OutputStyle,
        json: bool,
        out: &mut dyn Write,
    ) -> CliResult<()> {
        match &self.action {
            ConfigAction::Show => {
                if json {
                    serde_json::to_writer_pretty(&mut *out, config)?;
                    writeln!(out)?;
                } else {
                    let rendered = toml::to_string_pretty(config)
                        .map_err(|e| CliError::Config(e.to_string()))?;
                    writeln!(out, "{}", style.header("Folio Configuration"))?;
                    writeln!(out, "{}", rendered)?;
                    writeln!(
                        out,
                        "{}",
                        style.info(&format!(
                            "Config file: {}",
                            manager.config_path().display()
                        ))
                    )?;
                }
            }
            ConfigAction::Path => {
                writeln!(out, "{}", manager.config_path().display())?;
            }
            ConfigAction::Init { force } => {
                let path = manager.config_path();
                if path.exists() && !force {
                    return Err(CliError::InvalidArgument {
                        message: format!(
                            "{} already exists; pass --force to overwrite it",
                            path.display()
                        ),
                    });
                }
                manager.save_config(&AppConfig::default())?;
                info!(path = %path.display(), "Wrote default configuration");
                writeln!(
                    out,
                    "{}",
                    style.success(&format!("Wrote {}", path.display()))
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[edit]\n").unwrap();
        let manager = ConfigManager::with_path(path);
        let style = OutputStyle { use_colors: false };
        let mut out = Vec::new();

        let result = ConfigCommand::new(ConfigAction::Init { force: false }).execute(
            &manager,
            &AppConfig::default(),
            &style,
            false,
            &mut out,
        );
        assert!(matches!(result, Err(CliError::InvalidArgument { .. })));

        ConfigCommand::new(ConfigAction::Init { force: true })
            .execute(&manager, &AppConfig::default(), &style, false, &mut out)
            .unwrap();
        let written = std::fs::read_to_string(manager.config_path()).unwrap();
        assert!(written.contains("fuzzy_threshold = 0.6"));
    }

    #[test]
    fn test_show_as_json() {
        let manager = ConfigManager::with_optional_path("unused.toml".into());
        let style = OutputStyle { use_colors: false };
        let mut out = Vec::new();

        ConfigCommand::new(ConfigAction::Show)
            .execute(&manager, &AppConfig::default(), &style, true, &mut out)
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["archive"]["dir_name"], ".folio_archive");
    }

    #[test]
    fn test_missing_explicit_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = load_config(Some(dir.path().join("nope.toml").as_path()));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
