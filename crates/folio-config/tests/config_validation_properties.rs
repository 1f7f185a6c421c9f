//! Property-based tests for configuration validation
//! **Feature: folio-config, Property 1: Validation Bounds**

use folio_config::{AppConfig, ConfigManager, ConfigManagerTrait};
use proptest::prelude::*;

#[test]
fn prop_thresholds_in_unit_range_are_accepted() {
    proptest!(|(fuzzy in 0.0f64..=1.0, buffered in 0.0f64..=1.0)| {
        let mut config = AppConfig::default();
        config.edit.fuzzy_threshold = fuzzy;
        config.edit.buffered_threshold = buffered;

        prop_assert!(ConfigManager::new().validate_config(&config).is_ok());
    });
}

#[test]
fn prop_thresholds_outside_unit_range_are_rejected() {
    proptest!(|(
        excess in 0.001f64..100.0,
        below in any::<bool>(),
        which in any::<bool>(),
    )| {
        let value = if below { -excess } else { 1.0 + excess };
        let mut config = AppConfig::default();
        if which {
            config.edit.fuzzy_threshold = value;
        } else {
            config.edit.buffered_threshold = value;
        }

        prop_assert!(ConfigManager::new().validate_config(&config).is_err());
    });
}

#[test]
fn prop_archive_dir_must_be_hidden_single_component() {
    proptest!(|(name in "[a-z_]{1,12}")| {
        let manager = ConfigManager::new();
        let mut config = AppConfig::default();

        config.archive.dir_name = format!(".{}", name);
        prop_assert!(manager.validate_config(&config).is_ok());

        config.archive.dir_name = name.clone();
        prop_assert!(manager.validate_config(&config).is_err());

        config.archive.dir_name = format!(".{}/{}", name, name);
        prop_assert!(manager.validate_config(&config).is_err());
    });
}

#[test]
fn test_nan_threshold_is_rejected() {
    let mut config = AppConfig::default();
    config.edit.fuzzy_threshold = f64::NAN;
    assert!(ConfigManager::new().validate_config(&config).is_err());
}

#[test]
fn test_zero_limits_are_rejected() {
    let manager = ConfigManager::new();
    let mut config = AppConfig::default();
    config.edit.read_limit = 0;
    assert!(manager.validate_config(&config).is_err());

    let mut config = AppConfig::default();
    config.edit.suggestion_limit = 0;
    assert!(manager.validate_config(&config).is_err());
}

#[test]
fn test_log_level_is_case_insensitive() {
    let manager = ConfigManager::new();
    let mut config = AppConfig::default();
    config.logging.level = "DEBUG".to_string();
    assert!(manager.validate_config(&config).is_ok());

    config.logging.level = "loud".to_string();
    assert!(manager.validate_config(&config).is_err());
}

#[test]
fn test_metadata_suffix_is_bare() {
    let manager = ConfigManager::new();
    let mut config = AppConfig::default();
    config.archive.metadata_suffix = ".meta".to_string();
    assert!(manager.validate_config(&config).is_err());
}
