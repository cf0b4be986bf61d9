//! Registry of configured devices, keyed by entry id

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{AppConfig, DeviceConfig};
use crate::error::{LiquidCheckError, Result};
use crate::services::actions::DeviceResolver;
use crate::services::device::DeviceIdentity;

/// Registered device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    /// Unique entry ID
    pub id: String,
    /// Friendly name
    pub name: String,
    /// Host information
    pub host: String,
    /// Refresh interval in seconds
    pub scan_interval: u64,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl DeviceEntry {
    /// Create an entry from validated device configuration
    pub fn new(id: String, config: &DeviceConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            host: config.host.clone(),
            scan_interval: config.scan_interval,
            created_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(&self.id, &self.host, &self.name)
    }
}

/// Device registry for managing multiple devices
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceRegistry {
    /// Map of entry ID to device
    pub devices: HashMap<String, DeviceEntry>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every device of `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut registry = Self::new();
        for device in &config.devices {
            registry.add_device(device)?;
        }
        Ok(registry)
    }

    /// Validate and register a device, generating an ID if it has none
    pub fn add_device(&mut self, config: &DeviceConfig) -> Result<String> {
        let config = config.validate()?;
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if self.devices.contains_key(&id) {
            return Err(LiquidCheckError::config(format!(
                "Duplicate device id: {id}"
            )));
        }

        self.devices.insert(id.clone(), DeviceEntry::new(id.clone(), &config));
        Ok(id)
    }

    /// Remove a device entry
    pub fn remove_device(&mut self, id: &str) -> Option<DeviceEntry> {
        self.devices.remove(id)
    }

    /// Get a device entry
    pub fn get_device(&self, id: &str) -> Option<&DeviceEntry> {
        self.devices.get(id)
    }

    /// Check if a device exists
    pub fn contains_device(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    /// List all device IDs
    pub fn list_device_ids(&self) -> Vec<String> {
        self.list_devices().into_iter().map(|d| d.id.clone()).collect()
    }

    /// List all devices, oldest first
    pub fn list_devices(&self) -> Vec<&DeviceEntry> {
        let mut devices: Vec<&DeviceEntry> = self.devices.values().collect();
        devices.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceResolver for DeviceRegistry {
    fn resolve(&self, device_id: &str) -> Option<DeviceIdentity> {
        self.get_device(device_id).map(DeviceEntry::identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_uuids() {
        let mut registry = DeviceRegistry::new();
        let id = registry
            .add_device(&DeviceConfig::new("Cistern", " 192.168.1.100 "))
            .unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        let entry = registry.get_device(&id).unwrap();
        assert_eq!(entry.host, "192.168.1.100");
        assert_eq!(entry.scan_interval, 60);
    }

    #[test]
    fn test_explicit_ids_kept_and_duplicates_rejected() {
        let mut registry = DeviceRegistry::new();
        let mut device = DeviceConfig::new("Cistern", "192.168.1.100");
        device.id = Some("cistern".to_string());

        assert_eq!(registry.add_device(&device).unwrap(), "cistern");
        assert!(registry.add_device(&device).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_device_not_registered() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.add_device(&DeviceConfig::new("Cistern", "bad host")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolves_identity() {
        let mut registry = DeviceRegistry::new();
        let id = registry
            .add_device(&DeviceConfig::new("Cistern", "192.168.1.100"))
            .unwrap();

        let identity = registry.resolve(&id).unwrap();
        assert_eq!(identity, DeviceIdentity::new(&id, "192.168.1.100", "Cistern"));
        assert!(registry.resolve("unknown").is_none());

        registry.remove_device(&id);
        assert!(registry.resolve(&id).is_none());
    }
}
