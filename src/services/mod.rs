//! Device services
//!
//! The polling coordinator is the single source of truth for a device's
//! readings. Sensors read its cache; command actions bypass it and talk to
//! the device directly.

pub mod actions;
pub mod coordinator;
pub mod device;
pub mod sensors;
pub mod snapshot;

pub use actions::{
    build_buttons, AvailableAction, ButtonEntity, CommandActions, DeviceAction, DeviceResolver,
};
pub use coordinator::{
    CoordinatorState, PollingCoordinator, RefreshFailure, RefreshOutcome, DEFAULT_SCAN_INTERVAL,
    MAX_SCAN_INTERVAL,
};
pub use device::{DeviceIdentity, DeviceInfo, MANUFACTURER, MODEL};
pub use sensors::{build_sensors, MetricDescriptor, MetricSensor, SensorState, METRICS};
pub use snapshot::{MetricKey, ReadingSnapshot, ReadingValue};
