//! Test fixtures shared across integration tests

use liquid_check::config::DeviceConfig;
use rstest::fixture;
use serde_json::{json, Value};

/// Status document with only the measurement block
#[fixture]
pub fn partial_document() -> Value {
    json!({"payload": {"measure": {"level": 0.23, "content": 920, "percent": 8.4}}})
}

/// Status document carrying every known metric
#[fixture]
pub fn full_document() -> Value {
    json!({
        "payload": {
            "measure": {"level": 1.52, "content": 4520, "percent": 76.3, "age": 120},
            "system": {
                "error": 0,
                "uptime": 86400,
                "pump": {"totalRuns": 42, "totalRuntime": 3600}
            },
            "wifi": {"accessPoint": {"rssi": -61}},
            "device": {"firmware": "1.60"}
        }
    })
}

/// Device configuration with a fixed id
pub fn device_config(id: &str, host: &str, scan_interval: u64) -> DeviceConfig {
    DeviceConfig {
        id: Some(id.to_string()),
        name: "Cistern".to_string(),
        host: host.to_string(),
        scan_interval,
    }
}
