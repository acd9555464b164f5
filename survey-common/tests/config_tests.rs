//! Unit tests for configuration and graceful degradation
//!
//! Tests that manipulate SURVEY_ROOT_FOLDER are marked with #[serial]
//! so they run sequentially, not in parallel.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use survey_common::config::{
    CompiledDefaults, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DEFAULT_PORT, ROOT_FOLDER_ENV,
};

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(
        defaults.root_folder.ends_with("survey") || defaults.root_folder.ends_with("survey_data")
    );
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.port, DEFAULT_PORT);
    assert_eq!(defaults.bind, "127.0.0.1");
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/survey-test-env");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/survey-test-cli")))
        .with_toml(TomlConfig {
            root_folder: Some(PathBuf::from("/tmp/survey-test-toml")),
            ..Default::default()
        });

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/survey-test-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/survey-test-env");

    let resolver = RootFolderResolver::new("test-module").with_toml(TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/survey-test-toml")),
        ..Default::default()
    });

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/survey-test-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new("test-module").with_toml(TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/survey-test-toml")),
        ..Default::default()
    });

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/survey-test-toml"));
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    // A module name that definitely has no config file
    let resolver = RootFolderResolver::new("nonexistent-test-module-12345");
    let root_folder = resolver.resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
fn test_initializer_creates_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();
    // Idempotent
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("survey.db"));
    assert!(!initializer.database_exists());
}

#[test]
fn test_toml_partial_file_uses_defaults() {
    let toml_str = r#"
        root_folder = "/srv/survey"
        [logging]
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/survey")));
    assert_eq!(config.port, None);
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_toml_load_reports_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey-web.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let result = TomlConfig::load(&path);
    assert!(result.is_err());

    std::fs::write(&path, "port = 8080\nbind = \"0.0.0.0\"").unwrap();
    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.bind.as_deref(), Some("0.0.0.0"));
}
