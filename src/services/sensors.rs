//! Metric sensors
//!
//! Every reading is exposed through the same [`MetricSensor`] type, configured
//! from the static [`METRICS`] table. Sensors read the coordinator's cache on
//! render and hold no state of their own.

use crate::services::coordinator::PollingCoordinator;
use crate::services::device::DeviceInfo;
use crate::services::snapshot::{MetricKey, ReadingValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of quantity a sensor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Distance,
    VolumeStorage,
    Duration,
    SignalStrength,
}

/// How the value evolves over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Display metadata of one metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub key: MetricKey,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub icon: &'static str,
}

/// Metric table, in display order
pub static METRICS: [MetricDescriptor; 10] = [
    MetricDescriptor {
        key: MetricKey::Level,
        name: "Level",
        unit: Some("m"),
        device_class: Some(DeviceClass::Distance),
        state_class: Some(StateClass::Measurement),
        icon: "mdi:waves-arrow-up",
    },
    MetricDescriptor {
        key: MetricKey::Content,
        name: "Content",
        unit: Some("L"),
        device_class: Some(DeviceClass::VolumeStorage),
        state_class: Some(StateClass::Measurement),
        icon: "mdi:water",
    },
    MetricDescriptor {
        key: MetricKey::Percent,
        name: "Fill level",
        unit: Some("%"),
        device_class: None,
        state_class: Some(StateClass::Measurement),
        icon: "mdi:water-percent",
    },
    MetricDescriptor {
        key: MetricKey::Age,
        name: "Measurement age",
        unit: Some("s"),
        device_class: Some(DeviceClass::Duration),
        state_class: None,
        icon: "mdi:clock-outline",
    },
    MetricDescriptor {
        key: MetricKey::Error,
        name: "Error code",
        unit: None,
        device_class: None,
        state_class: None,
        icon: "mdi:alert-circle-outline",
    },
    MetricDescriptor {
        key: MetricKey::Uptime,
        name: "Uptime",
        unit: Some("s"),
        device_class: Some(DeviceClass::Duration),
        state_class: Some(StateClass::TotalIncreasing),
        icon: "mdi:timer-outline",
    },
    MetricDescriptor {
        key: MetricKey::TotalRuns,
        name: "Pump runs",
        unit: None,
        device_class: None,
        state_class: Some(StateClass::TotalIncreasing),
        icon: "mdi:counter",
    },
    MetricDescriptor {
        key: MetricKey::TotalRuntime,
        name: "Pump runtime",
        unit: Some("s"),
        device_class: Some(DeviceClass::Duration),
        state_class: Some(StateClass::TotalIncreasing),
        icon: "mdi:pump",
    },
    MetricDescriptor {
        key: MetricKey::Rssi,
        name: "WiFi signal",
        unit: Some("dBm"),
        device_class: Some(DeviceClass::SignalStrength),
        state_class: Some(StateClass::Measurement),
        icon: "mdi:wifi",
    },
    MetricDescriptor {
        key: MetricKey::Firmware,
        name: "Firmware",
        unit: None,
        device_class: None,
        state_class: None,
        icon: "mdi:chip",
    },
];

/// Descriptor of `key`
pub fn descriptor(key: MetricKey) -> &'static MetricDescriptor {
    // METRICS follows the declaration order of MetricKey
    &METRICS[key as usize]
}

/// Rendered sensor state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    /// `None` renders as unknown
    pub state: Option<ReadingValue>,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub icon: &'static str,
    pub available: bool,
}

/// Reader of one metric from a device's coordinator
#[derive(Debug, Clone)]
pub struct MetricSensor {
    descriptor: &'static MetricDescriptor,
    coordinator: Arc<PollingCoordinator>,
    unique_id: String,
    name: String,
}

impl MetricSensor {
    pub fn new(descriptor: &'static MetricDescriptor, coordinator: Arc<PollingCoordinator>) -> Self {
        let identity = coordinator.identity();
        let unique_id = identity.unique_id(descriptor.key.as_str());
        let name = format!("{} {}", identity.name, descriptor.name);
        Self {
            descriptor,
            coordinator,
            unique_id,
            name,
        }
    }

    pub fn key(&self) -> MetricKey {
        self.descriptor.key
    }

    pub fn descriptor(&self) -> &'static MetricDescriptor {
        self.descriptor
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.coordinator.identity().device_info()
    }

    /// Latest value from the coordinator; `None` means unknown
    pub fn native_value(&self) -> Option<ReadingValue> {
        self.coordinator.read(self.descriptor.key)
    }

    /// False while the most recent refresh failed
    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    pub fn render(&self) -> SensorState {
        SensorState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            state: self.native_value(),
            unit: self.descriptor.unit,
            device_class: self.descriptor.device_class,
            state_class: self.descriptor.state_class,
            icon: self.descriptor.icon,
            available: self.available(),
        }
    }
}

/// One sensor per metric for a device
pub fn build_sensors(coordinator: &Arc<PollingCoordinator>) -> Vec<MetricSensor> {
    METRICS
        .iter()
        .map(|descriptor| MetricSensor::new(descriptor, Arc::clone(coordinator)))
        .collect()
}
