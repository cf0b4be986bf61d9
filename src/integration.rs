//! Integration host
//!
//! [`LiquidCheckIntegration`] ties the pieces together for a set of
//! configured devices: it owns the device registry, one coordinator per loaded
//! device with its sensors and buttons, and the command actions. Devices are
//! loaded and unloaded independently of each other.

use crate::client::{ClientFactory, HttpClientFactory};
use crate::config::{AppConfig, DeviceConfig, DeviceEntry, DeviceRegistry};
use crate::error::{LiquidCheckError, Result};
use crate::services::actions::{build_buttons, AvailableAction, ButtonEntity, CommandActions};
use crate::services::coordinator::PollingCoordinator;
use crate::services::device::DeviceInfo;
use crate::services::sensors::{build_sensors, MetricSensor};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Loaded device with its entities
#[derive(Debug, Clone)]
pub struct ActiveDevice {
    pub entry: DeviceEntry,
    pub coordinator: Arc<PollingCoordinator>,
    pub sensors: Vec<MetricSensor>,
    pub buttons: Vec<ButtonEntity>,
}

/// Host for all configured Liquid-Check devices
pub struct LiquidCheckIntegration {
    registry: Arc<RwLock<DeviceRegistry>>,
    status_factory: Arc<dyn ClientFactory>,
    actions: CommandActions,
    devices: tokio::sync::RwLock<HashMap<String, ActiveDevice>>,
}

impl std::fmt::Debug for LiquidCheckIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiquidCheckIntegration")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl LiquidCheckIntegration {
    /// Create an integration using separate factories for polling and commands
    pub fn new(
        registry: DeviceRegistry,
        status_factory: Arc<dyn ClientFactory>,
        command_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let registry = Arc::new(RwLock::new(registry));
        let actions = CommandActions::new(registry.clone(), command_factory);
        Self {
            registry,
            status_factory,
            actions,
            devices: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Create an integration with HTTP clients configured from `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            DeviceRegistry::from_config(config)?,
            Arc::new(HttpClientFactory::with_timeout(config.http.request_timeout)),
            Arc::new(HttpClientFactory::with_timeout(config.http.command_timeout)),
        ))
    }

    fn registered(&self, device_id: &str) -> Option<DeviceEntry> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_device(device_id)
            .cloned()
    }

    /// IDs of every registered device, oldest first
    pub fn registered_ids(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list_device_ids()
    }

    /// Register a new device and set it up
    ///
    /// The device is only kept if setup succeeds.
    pub async fn setup_device(&self, config: &DeviceConfig) -> Result<String> {
        let id = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_device(config)?;

        if let Err(err) = self.setup_entry(&id).await {
            self.registry
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove_device(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Set up a registered device: first refresh, timer and entities
    pub async fn setup_entry(&self, device_id: &str) -> Result<()> {
        let entry = self
            .registered(device_id)
            .ok_or_else(|| LiquidCheckError::not_found(format!("Device {device_id} not registered")))?;

        if self.devices.read().await.contains_key(device_id) {
            return Err(LiquidCheckError::config(format!(
                "Device {device_id} is already set up"
            )));
        }

        let identity = entry.identity();
        let client = self.status_factory.create_client(&entry.host)?;
        let coordinator = PollingCoordinator::setup(identity.clone(), client, entry.scan_interval).await?;

        let device = ActiveDevice {
            sensors: build_sensors(&coordinator),
            buttons: build_buttons(&identity),
            coordinator,
            entry,
        };

        let mut devices = self.devices.write().await;
        if devices.contains_key(device_id) {
            // Lost a race with a concurrent setup of the same entry
            device.coordinator.shutdown();
            return Err(LiquidCheckError::config(format!(
                "Device {device_id} is already set up"
            )));
        }
        info!(
            device_id,
            host = %device.entry.host,
            sensors = device.sensors.len(),
            "Device set up"
        );
        devices.insert(device_id.to_string(), device);
        Ok(())
    }

    /// Set up every registered device concurrently
    ///
    /// One device failing does not prevent the others from loading.
    pub async fn setup_all(&self) -> Vec<(String, Result<()>)> {
        let ids = self.registered_ids();
        let results = join_all(ids.iter().map(|id| self.setup_entry(id))).await;

        ids.into_iter()
            .zip(results)
            .inspect(|(id, result)| {
                if let Err(err) = result {
                    warn!(device_id = %id, error = %err, "Device setup failed");
                }
            })
            .collect()
    }

    /// Tear down a loaded device; the registration is kept
    pub async fn unload_device(&self, device_id: &str) -> bool {
        match self.devices.write().await.remove(device_id) {
            Some(device) => {
                device.coordinator.shutdown();
                info!(device_id, "Device unloaded");
                true
            }
            None => false,
        }
    }

    /// Tear down every loaded device
    pub async fn unload_all(&self) {
        for (_, device) in self.devices.write().await.drain() {
            device.coordinator.shutdown();
        }
    }

    /// IDs of loaded devices
    pub async fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn device(&self, device_id: &str) -> Option<ActiveDevice> {
        self.devices.read().await.get(device_id).cloned()
    }

    pub async fn coordinator(&self, device_id: &str) -> Option<Arc<PollingCoordinator>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|device| device.coordinator.clone())
    }

    pub async fn sensors(&self, device_id: &str) -> Option<Vec<MetricSensor>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|device| device.sensors.clone())
    }

    pub async fn buttons(&self, device_id: &str) -> Option<Vec<ButtonEntity>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|device| device.buttons.clone())
    }

    pub async fn device_info(&self, device_id: &str) -> Option<DeviceInfo> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|device| device.entry.identity().device_info())
    }

    /// Press a button; command errors are logged, not returned
    pub async fn press(&self, button: &ButtonEntity) {
        button.press(&self.actions).await
    }

    pub fn actions(&self) -> &CommandActions {
        &self.actions
    }

    /// Actions offered for a registered device
    pub fn available_actions(&self, device_id: &str) -> Vec<AvailableAction> {
        self.actions.available_actions(device_id)
    }
}
