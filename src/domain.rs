use crate::constants::{ARCHIVE_PREFIX, ARCHIVE_SUFFIX, NO_TIMESTAMP, UNKNOWN};
use serde::{Deserialize, Serialize};
use std::fmt;

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn no_timestamp() -> String {
    NO_TIMESTAMP.to_string()
}

/// A decoded sensor reading. Carries no anomaly flag; see [`ClassifiedEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    #[serde(rename = "capteur_id", alias = "sensor_id", default = "unknown")]
    pub sensor_id: String,
    #[serde(default = "unknown")]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "humidite", alias = "humidity", default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<f64>,
    /// ISO-8601 as sent by the producer, never parsed
    #[serde(default = "no_timestamp")]
    pub timestamp: String,
    /// Producer fields outside the known schema, forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SensorEvent {
    pub fn new(sensor_id: &str, region: &str, temperature: Option<f64>, timestamp: &str) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            region: region.to_string(),
            temperature,
            humidity: None,
            vibration: None,
            timestamp: timestamp.to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A sensor event after classification. Sinks only ever see this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEvent {
    #[serde(flatten)]
    pub event: SensorEvent,
    #[serde(rename = "anomalie")]
    pub anomaly: bool,
}

impl ClassifiedEvent {
    pub(crate) fn new(event: SensorEvent, anomaly: bool) -> Self {
        Self { event, anomaly }
    }

    pub fn sensor_id(&self) -> &str {
        &self.event.sensor_id
    }

    pub fn region(&self) -> &str {
        &self.event.region
    }

    pub fn archive_key(&self) -> ArchiveKey {
        ArchiveKey::for_timestamp(&self.event.timestamp)
    }

    /// Canonical textual form written to the archive.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Object key of an archived event: `archive/<timestamp>.json`.
///
/// Two events with the same timestamp map to the same key; the later write wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    pub fn for_timestamp(timestamp: &str) -> Self {
        Self(format!("{}{}{}", ARCHIVE_PREFIX, timestamp, ARCHIVE_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Most recent analytical row for one sensor, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestReading {
    pub capteur_id: String,
    pub region: String,
    pub temperature: Option<f64>,
    pub anomalie: bool,
    pub timestamp: String,
}
