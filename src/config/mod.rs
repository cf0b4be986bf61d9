//! Configuration management for the Liquid-Check integration
//!
//! Configuration is read from a TOML file:
//!
//! ```toml
//! [[devices]]
//! name = "Cistern"
//! host = "192.168.1.100"
//! scan_interval = 60
//!
//! [http]
//! request_timeout = "10s"
//! command_timeout = "10s"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Without a file a single device can be configured from the environment.

pub mod device_registry;

pub use device_registry::{DeviceEntry, DeviceRegistry};

use crate::client::http_client::base_url_for;
use crate::client::DEFAULT_TIMEOUT;
use crate::error::{LiquidCheckError, Result};
use crate::services::coordinator::{DEFAULT_SCAN_INTERVAL, MAX_SCAN_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs, time::Duration};

/// Default device name when none is configured
pub const DEFAULT_DEVICE_NAME: &str = "Liquid-Check";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Configured devices
    pub devices: Vec<DeviceConfig>,

    /// HTTP client configuration
    pub http: HttpConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// One configured device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Entry id; generated when absent
    #[serde(default)]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// IP address or hostname
    pub host: String,

    /// Refresh interval in seconds, 0 disables periodic refresh
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            host: host.into(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    /// Validate and normalize the entry
    ///
    /// The host is trimmed and must be usable as the authority of the device
    /// URL: an IP address or hostname with an optional port.
    pub fn validate(&self) -> Result<Self> {
        let host = self.host.trim();
        if let Err(err) = base_url_for(host) {
            return Err(LiquidCheckError::config(format!(
                "Invalid host {:?}: {err}",
                self.host
            )));
        }

        let name = self.name.trim();
        if name.is_empty() {
            return Err(LiquidCheckError::config(format!(
                "Device {host} has an empty name"
            )));
        }

        if self.scan_interval > MAX_SCAN_INTERVAL {
            return Err(LiquidCheckError::config(format!(
                "scan_interval for {host} must be between 0 and {MAX_SCAN_INTERVAL}, got {}",
                self.scan_interval
            )));
        }

        Ok(Self {
            id: self.id.clone(),
            name: name.to_string(),
            host: host.to_string(),
            scan_interval: self.scan_interval,
        })
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout of status fetches
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Timeout of command posts
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            command_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Log to file (path)
    pub file: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file: None,
            stderr: true,
        }
    }
}

impl AppConfig {
    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liquid-check")
            .join("config.toml")
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LiquidCheckError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()
    }

    /// Single-device configuration from environment variables
    ///
    /// `LIQUID_CHECK_HOST` is required; `LIQUID_CHECK_NAME` and
    /// `LIQUID_CHECK_SCAN_INTERVAL` are optional.
    pub fn from_env() -> Result<Self> {
        let host = env::var("LIQUID_CHECK_HOST")
            .map_err(|_| LiquidCheckError::config("LIQUID_CHECK_HOST is not set"))?;

        let mut device = DeviceConfig::new(
            env::var("LIQUID_CHECK_NAME").unwrap_or_else(|_| DEFAULT_DEVICE_NAME.to_string()),
            host,
        );

        if let Ok(interval) = env::var("LIQUID_CHECK_SCAN_INTERVAL") {
            device.scan_interval = interval.parse().map_err(|e| {
                LiquidCheckError::config(format!("Invalid LIQUID_CHECK_SCAN_INTERVAL: {e}"))
            })?;
        }

        Self {
            devices: vec![device],
            ..Self::default()
        }
        .validate()
    }

    /// Configuration from an explicit path, the default file or the environment
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Self::default_path();
        if default_path.exists() {
            Self::load(&default_path)
        } else {
            Self::from_env()
        }
    }

    /// Validate every device entry
    pub fn validate(&self) -> Result<Self> {
        let devices = self
            .devices
            .iter()
            .map(DeviceConfig::validate)
            .collect::<Result<Vec<_>>>()?;

        if self.http.request_timeout.is_zero() || self.http.command_timeout.is_zero() {
            return Err(LiquidCheckError::config("HTTP timeouts must be non-zero"));
        }

        Ok(Self {
            devices,
            http: self.http.clone(),
            logging: self.logging.clone(),
        })
    }
}
