//! Command actions and button entities
//!
//! Actions are addressed by device id. The id is resolved through an injected
//! [`DeviceResolver`], a fresh client is built for the resolved host and one
//! command is sent. Every failure is logged and dropped: the caller only
//! learns that the command was attempted.

use crate::client::{ClientFactory, DeviceCommand};
use crate::error::LiquidCheckError;
use crate::log_structured_error;
use crate::services::device::{DeviceIdentity, DeviceInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

/// Domain the actions are registered under
pub const ACTION_DOMAIN: &str = "liquid_check";

/// Looks up a configured device by id
pub trait DeviceResolver: Send + Sync {
    fn resolve(&self, device_id: &str) -> Option<DeviceIdentity>;
}

impl DeviceResolver for HashMap<String, DeviceIdentity> {
    fn resolve(&self, device_id: &str) -> Option<DeviceIdentity> {
        self.get(device_id).cloned()
    }
}

impl<R: DeviceResolver> DeviceResolver for RwLock<R> {
    fn resolve(&self, device_id: &str) -> Option<DeviceIdentity> {
        match self.read() {
            Ok(resolver) => resolver.resolve(device_id),
            Err(poisoned) => poisoned.into_inner().resolve(device_id),
        }
    }
}

/// Named action a device exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAction {
    StartMeasure,
    Restart,
}

impl DeviceAction {
    pub const ALL: [DeviceAction; 2] = [DeviceAction::StartMeasure, DeviceAction::Restart];

    /// Action type as listed to the host
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAction::StartMeasure => "start_measure",
            DeviceAction::Restart => "restart",
        }
    }

    pub fn command(&self) -> DeviceCommand {
        match self {
            DeviceAction::StartMeasure => DeviceCommand::StartMeasure,
            DeviceAction::Restart => DeviceCommand::Restart,
        }
    }

    fn button_name(&self) -> &'static str {
        match self {
            DeviceAction::StartMeasure => "Start measurement",
            DeviceAction::Restart => "Restart",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            DeviceAction::StartMeasure => "mdi:play",
            DeviceAction::Restart => "mdi:restart",
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceAction {
    type Err = LiquidCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "start_measure" => Ok(DeviceAction::StartMeasure),
            "restart" => Ok(DeviceAction::Restart),
            _ => Err(LiquidCheckError::invalid_input(format!(
                "Unknown action type: {s}"
            ))),
        }
    }
}

/// Action listed for a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction {
    pub device_id: String,
    pub domain: String,
    #[serde(rename = "type")]
    pub action_type: DeviceAction,
}

/// Fire-and-forget command dispatch
#[derive(Clone)]
pub struct CommandActions {
    resolver: Arc<dyn DeviceResolver>,
    factory: Arc<dyn ClientFactory>,
}

impl fmt::Debug for CommandActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandActions").finish_non_exhaustive()
    }
}

impl CommandActions {
    pub fn new(resolver: Arc<dyn DeviceResolver>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { resolver, factory }
    }

    pub async fn start_measure(&self, device_id: &str) {
        self.execute(device_id, DeviceAction::StartMeasure).await
    }

    pub async fn restart(&self, device_id: &str) {
        self.execute(device_id, DeviceAction::Restart).await
    }

    /// Send the action's command to the device; errors are logged, not returned
    pub async fn execute(&self, device_id: &str, action: DeviceAction) {
        let Some(identity) = self.resolver.resolve(device_id) else {
            error!(device_id, action = %action, "Device with ID {device_id} not found");
            return;
        };

        let client = match self.factory.create_client(&identity.host) {
            Ok(client) => client,
            Err(err) => {
                log_structured_error!(err, "actions", action.as_str());
                return;
            }
        };

        let command = action.command();
        debug!(device_id, host = %identity.host, %command, "Sending command");
        match client.send_command(command.command_name()).await {
            Ok(()) => info!(
                device_id,
                host = %identity.host,
                %command,
                "Command accepted by device"
            ),
            Err(err) => {
                let err = LiquidCheckError::from(err);
                log_structured_error!(err, "actions", action.as_str());
            }
        }
    }

    /// Actions listed for `device_id`; empty when the device is unknown
    pub fn available_actions(&self, device_id: &str) -> Vec<AvailableAction> {
        if self.resolver.resolve(device_id).is_none() {
            return Vec::new();
        }
        DeviceAction::ALL
            .into_iter()
            .map(|action_type| AvailableAction {
                device_id: device_id.to_string(),
                domain: ACTION_DOMAIN.to_string(),
                action_type,
            })
            .collect()
    }
}

/// Button triggering one action on its device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonEntity {
    pub device_id: String,
    pub action: DeviceAction,
    pub unique_id: String,
    pub name: &'static str,
    pub icon: &'static str,
    pub device_info: DeviceInfo,
}

impl ButtonEntity {
    pub fn new(identity: &DeviceIdentity, action: DeviceAction) -> Self {
        Self {
            device_id: identity.id.clone(),
            action,
            unique_id: identity.unique_id(action.as_str()),
            name: action.button_name(),
            icon: action.icon(),
            device_info: identity.device_info(),
        }
    }

    pub async fn press(&self, actions: &CommandActions) {
        actions.execute(&self.device_id, self.action).await
    }
}

/// Start-measurement and restart buttons of a device
pub fn build_buttons(identity: &DeviceIdentity) -> Vec<ButtonEntity> {
    DeviceAction::ALL
        .into_iter()
        .map(|action| ButtonEntity::new(identity, action))
        .collect()
}
