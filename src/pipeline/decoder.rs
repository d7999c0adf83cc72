use base64::Engine as _;
use serde_json::Value;

use crate::constants::{
    ANOMALY_FIELD, ANOMALY_FIELD_ALIAS, HUMIDITY_FIELD, HUMIDITY_FIELD_ALIAS, SENSOR_ID_FIELD,
    SENSOR_ID_FIELD_ALIAS,
};
use crate::domain::SensorEvent;
use crate::envelope::DeliveryEnvelope;
use crate::error::DecodeError;

/// Decode the base64 JSON payload of an envelope into a `SensorEvent`.
///
/// Missing fields get their defaults. Any anomaly flag the producer sent is
/// discarded so that classification is the only place it gets set. When a
/// field arrives under both its canonical and English name, the canonical
/// one wins.
pub fn decode(envelope: &DeliveryEnvelope) -> Result<SensorEvent, DecodeError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(envelope.data.trim())?;
    let text = String::from_utf8(bytes)?;
    let value: Value = serde_json::from_str(&text).map_err(DecodeError::Json)?;

    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DecodeError::NotAnObject {
                found: json_kind(&other),
            })
        }
    };
    object.remove(ANOMALY_FIELD);
    object.remove(ANOMALY_FIELD_ALIAS);
    for (canonical, alias) in [
        (SENSOR_ID_FIELD, SENSOR_ID_FIELD_ALIAS),
        (HUMIDITY_FIELD, HUMIDITY_FIELD_ALIAS),
    ] {
        if object.contains_key(canonical) {
            object.remove(alias);
        }
    }

    serde_json::from_value(Value::Object(object)).map_err(DecodeError::Field)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_for(payload: &str) -> DeliveryEnvelope {
        DeliveryEnvelope::from_payload(payload.as_bytes(), "msg-1")
    }

    #[test]
    fn decodes_full_producer_payload() {
        let payload = json!({
            "capteur_id": "sensor-3",
            "region": "Sfax",
            "temperature": 85.2,
            "humidite": 55.1,
            "vibration": 0.31,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let event = decode(&envelope_for(&payload.to_string())).unwrap();

        assert_eq!(event.sensor_id, "sensor-3");
        assert_eq!(event.region, "Sfax");
        assert_eq!(event.temperature, Some(85.2));
        assert_eq!(event.humidity, Some(55.1));
        assert_eq!(event.vibration, Some(0.31));
        assert_eq!(event.timestamp, "2024-01-01T00:00:00Z");
        assert!(event.extra.is_empty());
    }

    #[test]
    fn applies_defaults_for_missing_fields() {
        let event = decode(&envelope_for("{}")).unwrap();
        assert_eq!(event.sensor_id, "unknown");
        assert_eq!(event.region, "unknown");
        assert_eq!(event.temperature, None);
        assert_eq!(event.timestamp, "no-timestamp");
    }

    #[test]
    fn accepts_english_aliases_and_integer_readings() {
        let event = decode(&envelope_for(r#"{"sensor_id":"s-9","humidity":40,"temperature":71}"#)).unwrap();
        assert_eq!(event.sensor_id, "s-9");
        assert_eq!(event.humidity, Some(40.0));
        assert_eq!(event.temperature, Some(71.0));
    }

    #[test]
    fn canonical_name_wins_over_english_alias() {
        let event = decode(&envelope_for(
            r#"{"capteur_id":"a","sensor_id":"b","humidite":50,"humidity":12,"temperature":80}"#,
        ))
        .unwrap();
        assert_eq!(event.sensor_id, "a");
        assert_eq!(event.humidity, Some(50.0));
        assert_eq!(event.temperature, Some(80.0));
        assert!(event.extra.is_empty());
    }

    #[test]
    fn drops_producer_supplied_anomaly_flag() {
        let event = decode(&envelope_for(r#"{"temperature":10,"anomalie":true,"anomaly":true,"site":"A"}"#)).unwrap();
        assert!(!event.extra.contains_key("anomalie"));
        assert!(!event.extra.contains_key("anomaly"));
        assert_eq!(event.extra.get("site"), Some(&json!("A")));
    }

    #[test]
    fn rejects_invalid_base64() {
        let envelope = DeliveryEnvelope {
            data: "not base64!!".to_string(),
            ..Default::default()
        };
        assert!(matches!(decode(&envelope), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn rejects_non_utf8_payload() {
        let envelope = DeliveryEnvelope::from_payload(&[0xff, 0xfe, 0x7b], "m");
        assert!(matches!(decode(&envelope), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn rejects_non_json_payload() {
        assert!(matches!(decode(&envelope_for("temperature=80")), Err(DecodeError::Json(_))));
    }

    #[test]
    fn rejects_json_that_is_not_an_object() {
        match decode(&envelope_for("[1,2,3]")) {
            Err(DecodeError::NotAnObject { found }) => assert_eq!(found, "an array"),
            other => panic!("expected NotAnObject, got {:?}", other),
        }
    }

    #[test]
    fn rejects_wrongly_typed_reading() {
        assert!(matches!(
            decode(&envelope_for(r#"{"temperature":"hot"}"#)),
            Err(DecodeError::Field(_))
        ));
    }
}
