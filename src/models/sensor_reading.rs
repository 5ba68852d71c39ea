use std::fmt::Display;

use serde::Deserialize;
use thiserror::Error;

/// Shown in place of the distance when it is unknown or the last cycle failed.
pub const PLACEHOLDER: &str = "--";

/// Latest distance observed by the device's range sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    distance: String,
}

#[derive(Error, Debug)]
pub enum SensorReadingError {
    /// The `distancia` field holds something other than a string or number.
    #[error("Unsupported distance value: {0}")]
    UnsupportedValue(serde_json::Value),
}

/// Body returned by the telemetry endpoint. Fields other than `distancia`
/// are ignored.
#[derive(Deserialize, Debug)]
pub struct TelemetryResponse {
    pub distancia: serde_json::Value,
}

impl SensorReading {
    pub fn new(distance: impl Into<String>) -> Self {
        Self {
            distance: distance.into(),
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER)
    }

    pub fn distance(&self) -> &str {
        &self.distance
    }

    pub fn is_placeholder(&self) -> bool {
        self.distance == PLACEHOLDER
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl TryFrom<TelemetryResponse> for SensorReading {
    type Error = SensorReadingError;

    fn try_from(value: TelemetryResponse) -> Result<Self, Self::Error> {
        match value.distancia {
            serde_json::Value::String(text) => Ok(SensorReading::new(text)),
            serde_json::Value::Number(number) => Ok(SensorReading::new(number.to_string())),
            other => Err(SensorReadingError::UnsupportedValue(other)),
        }
    }
}

impl Display for SensorReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mm", self.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<SensorReading, SensorReadingError> {
        let response: TelemetryResponse =
            serde_json::from_str(body).expect("Failed to decode telemetry body.");
        SensorReading::try_from(response)
    }

    #[test]
    fn test_string_and_number_distances() {
        assert_eq!(parse(r#"{"distancia": "123"}"#).unwrap().distance(), "123");
        assert_eq!(parse(r#"{"distancia": 87}"#).unwrap().distance(), "87");
        assert_eq!(
            parse(r#"{"distancia": 12.5, "other": true}"#)
                .unwrap()
                .distance(),
            "12.5"
        );
    }

    #[test]
    fn test_unsupported_distance() {
        assert!(parse(r#"{"distancia": null}"#).is_err());
        assert!(parse(r#"{"distancia": [1]}"#).is_err());
    }

    #[test]
    fn test_missing_distance_fails_to_decode() {
        assert!(serde_json::from_str::<TelemetryResponse>(r#"{"other": 1}"#).is_err());
    }

    #[test]
    fn test_placeholder_display() {
        let reading = SensorReading::default();
        assert!(reading.is_placeholder());
        assert_eq!(reading.to_string(), "-- mm");
    }
}
