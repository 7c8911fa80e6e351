//! Integration tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate RTW_CONFIG are marked with #[serial] so they do not
//! race each other on the process environment.

use rtw_common::config::{
    load_toml_config, ConfigResolver, OrientationAveraging, TomlConfig, WorldKind, CONFIG_ENV_VAR,
};
use rtw_common::messages::TeamColor;
use rtw_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
our_color = "blue"
world = "dummy"
port = 6001

[fusion]
stale_after_secs = 3.0
future_tolerance_secs = 0.05
ball_miss_limit = 8
orientation_averaging = "arithmetic"

[predictor]
window_secs = 0.25

[logging]
level = "debug"
file = "/tmp/rtw-test.log"
"#;

#[test]
fn test_load_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rtw-world.toml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.our_color, TeamColor::Blue);
    assert_eq!(config.world, WorldKind::Dummy);
    assert_eq!(config.port, 6001);
    assert_eq!(config.fusion.stale_after_secs, 3.0);
    assert_eq!(config.fusion.future_tolerance_secs, 0.05);
    assert_eq!(config.fusion.ball_miss_limit, 8);
    assert_eq!(config.fusion.orientation_averaging, OrientationAveraging::Arithmetic);
    assert_eq!(config.predictor.window_secs, 0.25);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file.as_deref(),
        Some(std::path::Path::new("/tmp/rtw-test.log"))
    );
}

#[test]
fn test_missing_explicit_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    fs::write(&path, "[fusion]\nball_miss_limit = 0\n").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[test]
#[serial]
fn test_cli_path_takes_precedence_over_env() {
    let temp_dir = TempDir::new().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    let env_path = temp_dir.path().join("env.toml");
    fs::write(&cli_path, "port = 7001\n").unwrap();
    fs::write(&env_path, "port = 7002\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_path);
    let resolver = ConfigResolver::new("rtw-test");
    let config = resolver.load(Some(&cli_path)).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.port, 7001);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("env.toml");
    fs::write(&env_path, "our_color = \"blue\"\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_path);
    let resolver = ConfigResolver::new("rtw-test");
    let config = resolver.load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.our_color, TeamColor::Blue);
}

#[test]
#[serial]
fn test_env_path_pointing_nowhere_is_error() {
    let temp_dir = TempDir::new().unwrap();
    env::set_var(CONFIG_ENV_VAR, temp_dir.path().join("missing.toml"));
    let resolver = ConfigResolver::new("rtw-test");
    let result = resolver.load(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_no_config_anywhere_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    // Module name chosen so no per-user file can exist for it
    let resolver = ConfigResolver::new("rtw-test-no-such-module-3f9a");
    let config = resolver.load(None).unwrap();

    assert_eq!(config, TomlConfig::default());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_unreadable_user_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let temp_dir = TempDir::new().unwrap();
    // A directory where the file should be cannot be read as a file
    fs::create_dir_all(temp_dir.path().join("rtw").join("rtw-unreadable.toml")).unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    let result = ConfigResolver::new("rtw-unreadable").load(None);
    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(result.unwrap(), TomlConfig::default());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_malformed_user_file_is_config_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("rtw");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("rtw-malformed.toml"), "port = [").unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    let result = ConfigResolver::new("rtw-malformed").load(None);
    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    assert!(matches!(result, Err(Error::Config(_))));
}
