use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DecodeError;

/// Message as handed over by the delivery platform. The pipeline never mutates it.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEnvelope {
    /// base64 of the UTF-8 JSON payload
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(skip)]
    pub delivery_attempt: Option<u32>,
}

impl DeliveryEnvelope {
    pub fn from_payload(payload: &[u8], message_id: impl Into<String>) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(payload),
            message_id: Some(message_id.into()),
            ..Default::default()
        }
    }

    pub fn message_id(&self) -> &str {
        self.message_id.as_deref().unwrap_or("-")
    }
}

/// Push-subscription request body wrapping one envelope.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub message: DeliveryEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_attempt: Option<u32>,
}

impl PushRequest {
    pub fn new(message: DeliveryEnvelope, subscription: Option<String>) -> Self {
        Self {
            message,
            subscription,
            delivery_attempt: None,
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(body).map_err(DecodeError::Envelope)
    }

    pub fn into_envelope(self) -> DeliveryEnvelope {
        DeliveryEnvelope {
            delivery_attempt: self.delivery_attempt,
            ..self.message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_request_carries_delivery_attempt_into_envelope() {
        let body = json!({
            "message": {
                "data": "e30=",
                "messageId": "136969346945",
                "attributes": {"origin": "field"},
                "publishTime": "2024-01-01T00:00:01Z"
            },
            "subscription": "projects/p/subscriptions/iot-ingest",
            "deliveryAttempt": 3
        });
        let request = PushRequest::from_slice(body.to_string().as_bytes()).unwrap();
        let envelope = request.into_envelope();

        assert_eq!(envelope.data, "e30=");
        assert_eq!(envelope.message_id(), "136969346945");
        assert_eq!(envelope.delivery_attempt, Some(3));
        assert_eq!(envelope.attributes.get("origin").map(String::as_str), Some("field"));
    }

    #[test]
    fn body_without_message_is_rejected() {
        let err = PushRequest::from_slice(br#"{"subscription":"s"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }
}
