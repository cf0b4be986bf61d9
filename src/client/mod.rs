//! Liquid-Check device client
//!
//! A device exposes two endpoints: `GET /infos.json` returns the nested status
//! document and `POST /command` accepts control commands. The
//! [`LiquidCheckClient`] trait is the seam the polling coordinator and the
//! command actions talk to; [`LiquidCheckHttpClient`] is the `reqwest`
//! implementation.

pub mod client_factory;
pub mod http_client;

pub use client_factory::{ClientFactory, HttpClientFactory};
pub use http_client::LiquidCheckHttpClient;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Path of the status document
pub const STATUS_PATH: &str = "infos.json";

/// Path of the command endpoint
pub const COMMAND_PATH: &str = "command";

/// Namespace every control command is sent under
pub const COMMAND_NAMESPACE: &str = "Device.Control";

/// Content type the command endpoint expects
pub const COMMAND_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Bounded timeout for every device request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Control commands understood by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceCommand {
    /// Trigger an immediate level measurement
    StartMeasure,
    /// Reboot the device
    Restart,
}

impl DeviceCommand {
    /// Name sent in the command header
    pub fn command_name(&self) -> &'static str {
        match self {
            DeviceCommand::StartMeasure => "StartMeasure",
            DeviceCommand::Restart => "Restart",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

/// Header of a command request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandHeader {
    pub namespace: String,
    pub name: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "payloadVersion")]
    pub payload_version: String,
}

/// Body of `POST /command`
///
/// The device ignores the payload; it is always sent as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub header: CommandHeader,
    pub payload: Option<serde_json::Value>,
}

impl CommandRequest {
    /// Build the request for a command name
    pub fn new(command_name: &str) -> Self {
        Self {
            header: CommandHeader {
                namespace: COMMAND_NAMESPACE.to_string(),
                name: command_name.to_string(),
                message_id: "1".to_string(),
                payload_version: "1".to_string(),
            },
            payload: None,
        }
    }
}

/// Operations against one Liquid-Check device
///
/// Implementations hold no connection state between calls and make exactly
/// one attempt per call.
#[async_trait]
pub trait LiquidCheckClient: Send + Sync {
    /// Host (IP address or hostname, optionally with port) this client targets
    fn host(&self) -> &str;

    /// Fetch and parse the status document
    async fn fetch_status(&self) -> std::result::Result<serde_json::Value, TransportError>;

    /// Send a control command by name
    async fn send_command(&self, command_name: &str) -> std::result::Result<(), TransportError>;
}
