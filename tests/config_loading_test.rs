//! Configuration layering: defaults, TOML file, `ARTIK_` environment.

use std::fs;
use std::path::PathBuf;

use artik::config::{ArtikConfig, BackendKind, ConfigError};
use serial_test::serial;

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("ARTIK_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_missing_file_gives_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = ArtikConfig::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ArtikConfig::default());
}

#[test]
#[serial]
fn test_file_values_override_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artik.toml");
    fs::write(
        &path,
        r#"
[application]
log_level = "debug"

[platform]
model = "ARTIK 710"
sysfs_root = "/tmp/fake-sys"

[adc]
backend = "tizenrt"
device = 1
trigger_request = 0

[pwm]
chip = 2
"#,
    )
    .unwrap();

    let config = ArtikConfig::load_from(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.log_format, "pretty");
    assert_eq!(config.platform.model.as_deref(), Some("ARTIK 710"));
    assert_eq!(config.platform.sysfs_root, PathBuf::from("/tmp/fake-sys"));
    assert_eq!(config.platform.dev_root, PathBuf::from("/dev"));
    assert_eq!(config.adc.backend, Some(BackendKind::Tizenrt));
    assert_eq!(config.adc.device, 1);
    assert_eq!(config.adc.trigger(), None);
    assert_eq!(config.pwm.chip, 2);
    assert_eq!(config.gpio.backend, None);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artik.toml");
    fs::write(&path, "[adc]\nbackend = \"sysfs\"\n").unwrap();

    std::env::set_var("ARTIK_ADC__BACKEND", "mock");
    std::env::set_var("ARTIK_APPLICATION__LOG_FORMAT", "json");
    let result = ArtikConfig::load_from(&path);
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.adc.backend, Some(BackendKind::Mock));
    assert_eq!(config.application.log_format, "json");
}

#[test]
#[serial]
fn test_bad_backend_is_load_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artik.toml");
    fs::write(&path, "[gpio]\nbackend = \"spi\"\n").unwrap();

    let err = ArtikConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
#[serial]
fn test_shipped_config_is_valid() {
    clear_env();
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/artik.toml");
    let config = ArtikConfig::load_from(path).unwrap();
    assert!(config.validate().is_ok());
}
