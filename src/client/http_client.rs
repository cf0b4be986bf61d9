//! HTTP client implementation for Liquid-Check devices
//!
//! One `reqwest` client per device host. Idle connections are not pooled, so
//! every call opens and closes its own connection.

use crate::client::{
    CommandRequest, LiquidCheckClient, COMMAND_CONTENT_TYPE, COMMAND_PATH, DEFAULT_TIMEOUT,
    STATUS_PATH,
};
use crate::error::{LiquidCheckError, Result, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client for one Liquid-Check device
#[derive(Debug, Clone)]
pub struct LiquidCheckHttpClient {
    /// HTTP client instance
    client: Client,

    /// Host as configured
    host: String,

    /// `http://<host>/`
    base_url: Url,

    /// Per-request timeout
    timeout: Duration,
}

impl LiquidCheckHttpClient {
    /// Create a client with the default 10 second timeout
    pub fn new(host: &str) -> Result<Self> {
        Self::with_timeout(host, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(host: &str, timeout: Duration) -> Result<Self> {
        let host = host.trim();
        let base_url = base_url_for(host)?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .user_agent(format!("liquid-check/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LiquidCheckError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: host.to_string(),
            base_url,
            timeout,
        })
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build URL for an endpoint path
    fn build_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }
}

/// Base URL for a device host
///
/// The host may carry a port (`192.168.1.100:8080`) but no scheme or path.
/// Bare IPv6 addresses are bracketed.
pub fn base_url_for(host: &str) -> Result<Url> {
    if host.is_empty() {
        return Err(LiquidCheckError::invalid_input("Device host must not be empty"));
    }
    if host.contains(char::is_whitespace) || host.contains('/') {
        return Err(LiquidCheckError::invalid_input(format!(
            "Invalid device host: {host:?}"
        )));
    }

    let authority = match host.parse::<Ipv6Addr>() {
        Ok(_) => format!("[{host}]"),
        Err(_) => host.to_string(),
    };
    let url = Url::parse(&format!("http://{authority}/"))
        .map_err(|e| LiquidCheckError::invalid_input(format!("Invalid device host {host:?}: {e}")))?;

    if url.host_str().is_none() || url.query().is_some() || url.fragment().is_some() {
        return Err(LiquidCheckError::invalid_input(format!(
            "Invalid device host: {host:?}"
        )));
    }
    Ok(url)
}

fn command_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(COMMAND_CONTENT_TYPE));
    headers
}

#[async_trait]
impl LiquidCheckClient for LiquidCheckHttpClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn fetch_status(&self) -> std::result::Result<serde_json::Value, TransportError> {
        let url = self.build_url(STATUS_PATH);
        debug!(host = %self.host, %url, "Fetching device status");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), self.timeout, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(host = %self.host, %status, "Status request rejected");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), self.timeout, e))?;

        serde_json::from_slice(&body).map_err(|source| TransportError::MalformedBody {
            url: url.to_string(),
            source,
        })
    }

    async fn send_command(&self, command_name: &str) -> std::result::Result<(), TransportError> {
        let url = self.build_url(COMMAND_PATH);
        debug!(host = %self.host, command = command_name, "Sending device command");

        // `headers` replaces the plain `application/json` set by `json`
        let response = self
            .client
            .post(url.clone())
            .json(&CommandRequest::new(command_name))
            .headers(command_headers())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), self.timeout, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(host = %self.host, command = command_name, "Command accepted");
        Ok(())
    }
}
