/// Topic payload decoding
use serde::de::DeserializeOwned;
use std::fmt;
use time::OffsetDateTime;

use crate::models::{ActuatorOutput, Prediction, SensorPayload, SensorReading};

#[derive(Debug)]
pub enum DecodeError {
    Utf8(std::str::Utf8Error),
    Json(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Utf8(e) => write!(f, "payload is not UTF-8: {}", e),
            DecodeError::Json(e) => write!(f, "invalid JSON payload: {}", e),
            DecodeError::NotAnObject => write!(f, "payload is not a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Utf8(e) => Some(e),
            DecodeError::Json(e) => Some(e),
            DecodeError::NotAnObject => None,
        }
    }
}

pub fn payload_str(payload: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(payload).map_err(DecodeError::Utf8)
}

/// Deserialize a payload that must be a JSON object.
///
/// serde accepts arrays for structs, so the shape is checked first.
fn decode_object<T: DeserializeOwned>(payload: &str) -> Result<T, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(payload).map_err(DecodeError::Json)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    serde_json::from_value(value).map_err(DecodeError::Json)
}

/// Decode a sensor topic payload such as `{"temp":27.5,"hum":61,"soil":40}`
///
/// Missing and null fields become absent values, never zero. A field of the
/// wrong type fails the whole payload.
pub fn decode_sensor(payload: &str, received_at: OffsetDateTime) -> Result<SensorReading, DecodeError> {
    let data: SensorPayload = decode_object(payload)?;
    Ok(data.into_reading(received_at))
}

/// Decode a prediction topic payload `"<prefix>:<label>"`
///
/// Only the trimmed text after the first colon is kept. Returns None when
/// there is no colon.
pub fn decode_prediction(payload: &str) -> Option<Prediction> {
    payload
        .split_once(':')
        .map(|(_, label)| Prediction::new(label.trim()))
}

/// Decode an output topic payload, applying defaults per field.
pub fn decode_output(payload: &str) -> Result<ActuatorOutput, DecodeError> {
    decode_object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Level;

    #[test]
    fn sensor_fields_map_and_absent_stays_absent() {
        let now = OffsetDateTime::now_utc();
        let reading = decode_sensor(r#"{"temp":27.5,"hum":61,"soil":null}"#, now).unwrap();
        assert_eq!(reading.time, now);
        assert_eq!(reading.temperature, Some(27.5));
        assert_eq!(reading.humidity, Some(61.0));
        assert_eq!(reading.soil_moisture, None);

        let reading = decode_sensor("{}", now).unwrap();
        assert_eq!(reading.temperature, None);
        assert_eq!(reading.humidity, None);
    }

    #[test]
    fn malformed_sensor_payloads_fail() {
        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            decode_sensor(r#"{"temp":"hot","hum":50}"#, now),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(decode_sensor("not json", now), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode_sensor("[1, 2, 3]", now),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn prediction_keeps_text_after_first_colon() {
        let prediction = decode_prediction("status:[WARNING]segera_siram").unwrap();
        assert_eq!(prediction.raw(), "[WARNING]segera_siram");
        let label = prediction.label().unwrap();
        assert_eq!(label.level, Level::Warning);
        assert_eq!(label.key, "segera_siram");

        let prediction = decode_prediction("model: [INFO] a:b ").unwrap();
        assert_eq!(prediction.raw(), "[INFO] a:b");
    }

    #[test]
    fn prediction_without_colon_is_ignored() {
        assert!(decode_prediction("[INFO]kondisi_optimal").is_none());
        assert!(decode_prediction("").is_none());
    }

    #[test]
    fn output_decodes_exact_values() {
        let output = decode_output(r#"{"led_color":"RED","buzzer_on":true}"#).unwrap();
        assert_eq!(output.led_color, "RED");
        assert!(output.buzzer_on);

        let output = decode_output(r#"{"led_color":"YELLOW"}"#).unwrap();
        assert_eq!(output.led_color, "YELLOW");
        assert!(!output.buzzer_on);
    }

    #[test]
    fn malformed_output_fails() {
        assert!(decode_output(r#"{"buzzer_on":"yes"}"#).is_err());
        assert!(decode_output("true").is_err());
    }

    #[test]
    fn invalid_utf8_is_reported() {
        assert!(matches!(payload_str(&[0xff, 0xfe]), Err(DecodeError::Utf8(_))));
    }
}
