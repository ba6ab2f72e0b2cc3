//! Tests for configuration resolution and graceful degradation
//!
//! Uses serial_test to prevent environment variable races: tests that touch
//! ATTSYNC_ROOT_FOLDER or ATTSYNC_ROOT run sequentially.

use attsync_common::config::{
    CompiledDefaults, LoggingConfig, RootFolderInitializer, RootFolderResolver, ServerConfig,
    SyncConfig, TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.ends_with("attsync"));
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var("ATTSYNC_ROOT_FOLDER");
    env::remove_var("ATTSYNC_ROOT");

    // A module name that will not have a config file
    let resolver = RootFolderResolver::new("nonexistent-test-module-12345");
    let root_folder = resolver.resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    env::remove_var("ATTSYNC_ROOT");
    env::set_var("ATTSYNC_ROOT_FOLDER", "/tmp/attsync-test-env-folder");

    let resolver = RootFolderResolver::new("test-module");
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attsync-test-env-folder"));

    env::remove_var("ATTSYNC_ROOT_FOLDER");
}

#[test]
#[serial]
fn test_resolver_root_folder_takes_precedence_over_root() {
    env::set_var("ATTSYNC_ROOT_FOLDER", "/tmp/attsync-priority-1");
    env::set_var("ATTSYNC_ROOT", "/tmp/attsync-priority-2");

    let resolver = RootFolderResolver::new("test-module");
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attsync-priority-1"));

    env::remove_var("ATTSYNC_ROOT_FOLDER");
    env::remove_var("ATTSYNC_ROOT");
}

#[test]
#[serial]
fn test_cli_arg_beats_environment() {
    env::set_var("ATTSYNC_ROOT_FOLDER", "/tmp/attsync-from-env");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/attsync-from-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/attsync-from-cli"));

    env::remove_var("ATTSYNC_ROOT_FOLDER");
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/attsync-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("attsync.db"));
}

#[test]
fn test_initializer_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    assert!(!initializer.database_exists());

    // Safe to call twice
    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/attsync")),
        logging: LoggingConfig::default(),
        server: ServerConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        },
        sync: SyncConfig {
            page_size: Some(50),
            utc_offset: Some("+05:30".to_string()),
            ..SyncConfig::default()
        },
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed, config);
}

#[test]
fn test_partial_file_fills_defaults() {
    let toml_str = r#"
        root_folder = "/srv/attsync"
        [sync]
        interval_secs = 900
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/attsync")));
    assert_eq!(config.sync.interval_secs, Some(900));
    assert_eq!(config.sync.page_size, None);
    assert_eq!(config.server, ServerConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_reports_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attsync.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    let result = TomlConfig::load(&path);
    assert!(matches!(result, Err(attsync_common::Error::Config(_))));
}
