//! WireMock-based Liquid-Check API mocking infrastructure
//!
//! Provides mock HTTP servers that simulate the device's `/infos.json` and
//! `/command` endpoints for testing without requiring actual hardware.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Content type the device expects on commands
pub const COMMAND_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Mock Liquid-Check device
pub struct MockLiquidCheckDevice {
    pub server: MockServer,
}

impl MockLiquidCheckDevice {
    /// Start a mock device with no endpoints mounted
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// `host:port` to configure clients with
    pub fn host(&self) -> String {
        self.server.address().to_string()
    }

    /// Answer status fetches with `document`
    pub async fn mock_status(&self, document: Value) {
        Mock::given(method("GET"))
            .and(path("/infos.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Answer status fetches with `document` after `delay`
    pub async fn mock_status_delayed(&self, document: Value, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/infos.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(document)
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer status fetches with an HTTP error
    pub async fn mock_status_error(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/infos.json"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer status fetches with a body that is not JSON
    pub async fn mock_status_malformed(&self) {
        Mock::given(method("GET"))
            .and(path("/infos.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&self.server)
            .await;
    }

    /// Accept exactly `times` well-formed requests for `command_name`
    pub async fn expect_command(&self, command_name: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/command"))
            .and(header("content-type", COMMAND_CONTENT_TYPE))
            .and(body_json(command_body(command_name)))
            .respond_with(ResponseTemplate::new(200))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer any command with `status`, after `delay`
    pub async fn mock_command_response(&self, status: u16, delay: Duration, times: u64) {
        Mock::given(method("POST"))
            .and(path("/command"))
            .respond_with(ResponseTemplate::new(status).set_delay(delay))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Drop every mounted mock and recorded request
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    /// Number of status fetches received
    pub async fn status_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == "/infos.json")
            .count()
    }
}

/// Body the device expects for `command_name`
pub fn command_body(command_name: &str) -> Value {
    json!({
        "header": {
            "namespace": "Device.Control",
            "name": command_name,
            "messageId": "1",
            "payloadVersion": "1"
        },
        "payload": null
    })
}
