//! Configuration loading tests

use liquid_check::config::{AppConfig, DeviceRegistry};
use liquid_check::error::LiquidCheckError;
use liquid_check::services::DeviceResolver;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 3] = [
    "LIQUID_CHECK_HOST",
    "LIQUID_CHECK_NAME",
    "LIQUID_CHECK_SCAN_INTERVAL",
];

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_file() {
    let file = write_config(
        r#"
        [[devices]]
        id = "cistern"
        name = "Cistern"
        host = " 192.168.1.100 "
        scan_interval = 30

        [[devices]]
        name = "Rain barrel"
        host = "barrel.local"

        [http]
        request_timeout = "2s"

        [logging]
        level = "debug"
        json_format = true
        "#,
    );

    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices[0].host, "192.168.1.100");
    assert_eq!(config.devices[0].scan_interval, 30);
    assert_eq!(config.devices[1].scan_interval, 60);
    assert_eq!(config.http.request_timeout, Duration::from_secs(2));
    assert_eq!(config.http.command_timeout, Duration::from_secs(10));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json_format);

    let registry = DeviceRegistry::from_config(&config).unwrap();
    assert_eq!(registry.len(), 2);
    let cistern = registry.resolve("cistern").unwrap();
    assert_eq!(cistern.host, "192.168.1.100");
    assert_eq!(cistern.name, "Cistern");
}

#[test]
fn test_discover_uses_explicit_path() {
    let file = write_config(
        r#"
        [[devices]]
        name = "Cistern"
        host = "10.0.0.5"
        "#,
    );

    let config = AppConfig::discover(Some(file.path())).unwrap();
    assert_eq!(config.devices[0].host, "10.0.0.5");
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AppConfig::load(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(LiquidCheckError::Config(_))));
}

#[test]
fn test_invalid_host_in_file_rejected() {
    let file = write_config(
        r#"
        [[devices]]
        name = "Cistern"
        host = "my tank"
        "#,
    );
    assert!(AppConfig::load(file.path()).is_err());
}

#[test]
#[serial]
fn test_from_env() {
    temp_env::with_vars(
        [
            ("LIQUID_CHECK_HOST", Some("192.168.1.100")),
            ("LIQUID_CHECK_NAME", Some("Cistern")),
            ("LIQUID_CHECK_SCAN_INTERVAL", Some("0")),
        ],
        || {
            let config = AppConfig::from_env().unwrap();
            assert_eq!(config.devices.len(), 1);
            let device = &config.devices[0];
            assert_eq!(device.host, "192.168.1.100");
            assert_eq!(device.name, "Cistern");
            assert_eq!(device.scan_interval, 0);
        },
    );
}

#[test]
#[serial]
fn test_from_env_defaults() {
    temp_env::with_vars(
        [
            ("LIQUID_CHECK_HOST", Some("liquid-check.local")),
            ("LIQUID_CHECK_NAME", None),
            ("LIQUID_CHECK_SCAN_INTERVAL", None),
        ],
        || {
            let config = AppConfig::from_env().unwrap();
            assert_eq!(config.devices[0].name, "Liquid-Check");
            assert_eq!(config.devices[0].scan_interval, 60);
        },
    );
}

#[test]
#[serial]
fn test_from_env_requires_host() {
    temp_env::with_vars_unset(ENV_VARS, || {
        assert!(matches!(
            AppConfig::from_env(),
            Err(LiquidCheckError::Config(_))
        ));
    });
}

#[test]
#[serial]
fn test_from_env_rejects_bad_interval() {
    for interval in ["soon", "3601", "-1"] {
        temp_env::with_vars(
            [
                ("LIQUID_CHECK_HOST", Some("192.168.1.100")),
                ("LIQUID_CHECK_SCAN_INTERVAL", Some(interval)),
            ],
            || {
                assert!(AppConfig::from_env().is_err(), "{interval} accepted");
            },
        );
    }
}
