//! # One synthetic sensor reading.
//!
//! [`Reading`] is the per-tick value type the simulator emits. On the wire
//! it is a UTF-8 JSON object:
//!
//! ```json
//! {"messageId": 3, "deviceId": "sensor-1", "temperature": 31.2, "humidity": 64.7}
//! ```
//!
//! The alert flag does **not** travel in the body; it rides as the
//! out-of-band [`ALERT_HEADER`] header (`"true"`/`"false"`), so consumers
//! can filter without parsing the payload.

use serde::{Deserialize, Serialize};

use crate::hub::Envelope;

/// Header key carrying the alert flag out-of-band.
pub const ALERT_HEADER: &str = "temperatureAlert";

/// Temperature above which a reading is flagged as an alert.
pub const ALERT_THRESHOLD: f64 = 30.0;

/// One sensor reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// 1-based, strictly increasing within one simulator run.
    #[serde(rename = "messageId")]
    pub sequence: u64,
    /// Id of the emitting device.
    pub device_id: String,
    /// Degrees Celsius, drawn uniformly from `[20, 35)`.
    pub temperature: f64,
    /// Relative humidity percent, drawn uniformly from `[60, 80)`.
    pub humidity: f64,
    /// Whether the temperature exceeds [`ALERT_THRESHOLD`]. Out-of-band on
    /// the wire.
    #[serde(skip)]
    pub alert: bool,
}

impl Reading {
    /// Builds a reading, deriving the alert flag from the temperature.
    pub fn new(sequence: u64, device_id: impl Into<String>, temperature: f64, humidity: f64) -> Self {
        Self {
            sequence,
            device_id: device_id.into(),
            temperature,
            humidity,
            alert: temperature > ALERT_THRESHOLD,
        }
    }

    /// Serializes the reading into a transport envelope: JSON body plus the
    /// alert header.
    pub fn to_envelope(&self) -> Envelope {
        // Serialization of four plain fields cannot fail.
        let body = serde_json::to_vec(self).unwrap_or_default();
        Envelope::new(body).with_header(ALERT_HEADER, if self.alert { "true" } else { "false" })
    }

    /// Parses a reading back from payload bytes.
    ///
    /// The alert flag is recomputed from the temperature since it is not
    /// part of the body.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        let mut reading: Reading = serde_json::from_slice(body)?;
        reading.alert = reading.temperature > ALERT_THRESHOLD;
        Ok(reading)
    }
}
