//! Device identity and the device record entities are grouped under

use serde::{Deserialize, Serialize};

/// Manufacturer reported for every device record
pub const MANUFACTURER: &str = "SI-Elektronik GmbH";

/// Model reported for every device record
pub const MODEL: &str = "Liquid-Check";

/// Identity of one configured device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Entry id, namespaces every derived unique id
    pub id: String,
    /// IP address or hostname, optionally with port
    pub host: String,
    /// User-assigned display name
    pub name: String,
}

impl DeviceIdentity {
    pub fn new(id: impl Into<String>, host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            name: name.into(),
        }
    }

    /// Unique id of an entity derived from this device
    pub fn unique_id(&self, suffix: &str) -> String {
        format!("{}_{}", self.id, suffix)
    }

    /// Device record the entities are grouped under
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.id.clone(),
            name: self.name.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            configuration_url: format!("http://{}/", self.host),
        }
    }
}

/// Logical device record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub configuration_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_are_namespaced_by_entry_id() {
        let identity = DeviceIdentity::new("test_entry_id", "192.168.1.100", "Cistern");
        assert_eq!(identity.unique_id("level"), "test_entry_id_level");
        assert_eq!(identity.unique_id("restart"), "test_entry_id_restart");
    }

    #[test]
    fn test_device_info_uses_fixed_manufacturer_and_model() {
        let info = DeviceIdentity::new("abc", "192.168.1.100", "Cistern").device_info();
        assert_eq!(info.identifier, "abc");
        assert_eq!(info.name, "Cistern");
        assert_eq!(info.manufacturer, "SI-Elektronik GmbH");
        assert_eq!(info.model, "Liquid-Check");
        assert_eq!(info.configuration_url, "http://192.168.1.100/");
    }
}
