//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests:
//! - TOML bootstrap parsing (partial files, folder overrides)
//! - Priority order: command line > TOML > compiled defaults
//! - Missing default config file falls back to defaults
//! - Explicit config path that cannot be read is an error
//!
//! Tests that manipulate XDG_CONFIG_HOME are marked with #[serial].

use hhv_common::config::{FolderLayout, ServiceConfig, TomlConfig, DEFAULT_PORT};
use hhv_common::ReviewerCategory;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("hhv-review.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_empty_toml_uses_compiled_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let toml_config = TomlConfig::load(&path).unwrap();
    let config = ServiceConfig::resolve(None, None, toml_config).unwrap();

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.root_folder, PathBuf::from("."));
    assert_eq!(config.folders, FolderLayout::default());
}

#[test]
fn test_toml_values_are_applied() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
root_folder = "/srv/hh"
port = 6001
bind_host = "0.0.0.0"

[logging]
level = "debug"

[folders]
general = ["alpha", "beta"]
lawyers = ["gamma"]
"#,
    );

    let config = ServiceConfig::resolve(None, None, TomlConfig::load(&path).unwrap()).unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/srv/hh"));
    assert_eq!(config.bind_addr(), "0.0.0.0:6001");
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.folders.folders(ReviewerCategory::General), ["alpha", "beta"]);
    assert_eq!(config.folders.folders(ReviewerCategory::Lawyers), ["gamma"]);
}

#[test]
fn test_command_line_overrides_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "root_folder = \"/from/toml\"\nport = 6001\n");

    let config = ServiceConfig::resolve(
        Some(PathBuf::from("/from/cli")),
        Some(7002),
        TomlConfig::load(&path).unwrap(),
    )
    .unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/from/cli"));
    assert_eq!(config.port, 7002);
}

#[test]
fn test_invalid_folder_layout_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[folders]\ngeneral = []\nlawyers = [\"x\"]\n");

    let err = ServiceConfig::resolve(None, None, TomlConfig::load(&path).unwrap()).unwrap_err();
    assert!(matches!(err, hhv_common::Error::Config(_)));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = \"not a number\"");

    assert!(matches!(TomlConfig::load(&path), Err(hhv_common::Error::Config(_))));
}

#[test]
fn test_explicit_missing_config_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");

    assert!(TomlConfig::load_or_default(Some(&missing), "hhv-review").is_err());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_missing_default_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = TomlConfig::load_or_default(None, "hhv-review").unwrap();
    assert!(config.root_folder.is_none());
    assert!(config.port.is_none());

    std::env::remove_var("XDG_CONFIG_HOME");
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_default_config_location_is_used_when_present() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("hhv")).unwrap();
    std::fs::write(dir.path().join("hhv").join("hhv-review.toml"), "port = 6123\n").unwrap();
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = TomlConfig::load_or_default(None, "hhv-review").unwrap();
    assert_eq!(config.port, Some(6123));

    std::env::remove_var("XDG_CONFIG_HOME");
}
