//! Reading snapshots flattened from the device status document
//!
//! The device reports a nested document:
//!
//! ```json
//! {"payload": {"measure": {...}, "system": {"pump": {...}},
//!              "wifi": {"accessPoint": {...}}, "device": {...}}}
//! ```
//!
//! Each [`MetricKey`] is read from a fixed JSON pointer. Keys missing from the
//! document are absent from the snapshot; they are never defaulted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::LiquidCheckError;

/// One flattened reading of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKey {
    #[serde(rename = "level")]
    Level,
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "percent")]
    Percent,
    #[serde(rename = "age")]
    Age,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "uptime")]
    Uptime,
    #[serde(rename = "totalRuns")]
    TotalRuns,
    #[serde(rename = "totalRuntime")]
    TotalRuntime,
    #[serde(rename = "rssi")]
    Rssi,
    #[serde(rename = "firmware")]
    Firmware,
}

impl MetricKey {
    /// Every metric, in display order
    pub const ALL: [MetricKey; 10] = [
        MetricKey::Level,
        MetricKey::Content,
        MetricKey::Percent,
        MetricKey::Age,
        MetricKey::Error,
        MetricKey::Uptime,
        MetricKey::TotalRuns,
        MetricKey::TotalRuntime,
        MetricKey::Rssi,
        MetricKey::Firmware,
    ];

    /// Key as used in unique ids and output
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Level => "level",
            MetricKey::Content => "content",
            MetricKey::Percent => "percent",
            MetricKey::Age => "age",
            MetricKey::Error => "error",
            MetricKey::Uptime => "uptime",
            MetricKey::TotalRuns => "totalRuns",
            MetricKey::TotalRuntime => "totalRuntime",
            MetricKey::Rssi => "rssi",
            MetricKey::Firmware => "firmware",
        }
    }

    /// JSON pointer of the value in the status document
    pub fn source_pointer(&self) -> &'static str {
        match self {
            MetricKey::Level => "/payload/measure/level",
            MetricKey::Content => "/payload/measure/content",
            MetricKey::Percent => "/payload/measure/percent",
            MetricKey::Age => "/payload/measure/age",
            MetricKey::Error => "/payload/system/error",
            MetricKey::Uptime => "/payload/system/uptime",
            MetricKey::TotalRuns => "/payload/system/pump/totalRuns",
            MetricKey::TotalRuntime => "/payload/system/pump/totalRuntime",
            MetricKey::Rssi => "/payload/wifi/accessPoint/rssi",
            MetricKey::Firmware => "/payload/device/firmware",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = LiquidCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| LiquidCheckError::invalid_input(format!("Unknown metric key: {s}")))
    }
}

/// Scalar reading value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ReadingValue {
    /// Convert a JSON value; `None` for null, booleans and non-scalars
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(ReadingValue::Integer)
                .or_else(|| n.as_f64().map(ReadingValue::Float)),
            Value::String(s) => Some(ReadingValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReadingValue::Integer(i) => Some(*i as f64),
            ReadingValue::Float(f) => Some(*f),
            ReadingValue::Text(_) => None,
        }
    }

    /// Text view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReadingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingValue::Integer(i) => write!(f, "{i}"),
            ReadingValue::Float(v) => write!(f, "{v}"),
            ReadingValue::Text(s) => f.write_str(s),
        }
    }
}

/// Flat set of readings from one successful refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingSnapshot {
    readings: HashMap<MetricKey, ReadingValue>,
    fetched_at: DateTime<Utc>,
}

impl ReadingSnapshot {
    /// Flatten a status document fetched now
    pub fn from_status(document: &Value) -> Self {
        Self::from_status_at(document, Utc::now())
    }

    /// Flatten a status document fetched at `fetched_at`
    pub fn from_status_at(document: &Value, fetched_at: DateTime<Utc>) -> Self {
        let readings = MetricKey::ALL
            .into_iter()
            .filter_map(|key| {
                document
                    .pointer(key.source_pointer())
                    .and_then(ReadingValue::from_json)
                    .map(|value| (key, value))
            })
            .collect();

        Self {
            readings,
            fetched_at,
        }
    }

    /// Value of one metric, if the device reported it
    pub fn get(&self, key: MetricKey) -> Option<&ReadingValue> {
        self.readings.get(&key)
    }

    /// True if the device reported this metric
    pub fn contains(&self, key: MetricKey) -> bool {
        self.readings.contains_key(&key)
    }

    /// Number of metrics present
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True if no metric was present
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// When the document was fetched
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Present readings in display order
    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, &ReadingValue)> {
        MetricKey::ALL
            .into_iter()
            .filter_map(move |key| self.readings.get(&key).map(|value| (key, value)))
    }
}
