/// Hub message schema
///
/// A `HubMessage` is an already-serialized payload plus routing data. The hub
/// never inspects the payload; it only fans it out as a text frame.
use serde::Serialize;
use std::sync::Arc;

use crate::auth::SubscriberId;

/// Frame payload shared by every connection a message fans out to
pub type Outbound = Arc<str>;

#[derive(Debug, Clone)]
pub struct HubMessage {
    /// Target subscriber, `None` for every live connection
    pub target: Option<SubscriberId>,

    /// Event type, used for logging and stats only
    pub message_type: String,

    pub payload: Outbound,
}

impl HubMessage {
    pub fn new(
        target: Option<SubscriberId>,
        message_type: impl Into<String>,
        payload: impl Into<Outbound>,
    ) -> Self {
        Self {
            target,
            message_type: message_type.into(),
            payload: payload.into(),
        }
    }

    pub fn to_user(
        user: SubscriberId,
        message_type: impl Into<String>,
        payload: impl Into<Outbound>,
    ) -> Self {
        Self::new(Some(user), message_type, payload)
    }

    pub fn broadcast(message_type: impl Into<String>, payload: impl Into<Outbound>) -> Self {
        Self::new(None, message_type, payload)
    }

    /// Serialize `{"type": <message_type>, "data": <data>}` as the payload
    pub fn typed<T: Serialize>(
        target: Option<SubscriberId>,
        message_type: &str,
        data: &T,
    ) -> serde_json::Result<Self> {
        let payload = serde_json::to_string(&TypedEnvelope {
            kind: message_type,
            data,
        })?;
        Ok(Self::new(target, message_type, payload))
    }

    pub fn is_broadcast(&self) -> bool {
        self.target.is_none()
    }
}

#[derive(Serialize)]
struct TypedEnvelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_typed_payload_shape() {
        let msg = HubMessage::typed(
            Some(SubscriberId::from("u1")),
            "notification",
            &json!({"id": "n1"}),
        )
        .unwrap();

        assert_eq!(msg.message_type, "notification");
        assert!(!msg.is_broadcast());

        let value: Value = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(value, json!({"type": "notification", "data": {"id": "n1"}}));
    }

    #[test]
    fn test_raw_payload_untouched() {
        let msg = HubMessage::broadcast("announcement", r#"{"text":"hi"}"#);
        assert!(msg.is_broadcast());
        assert_eq!(&*msg.payload, r#"{"text":"hi"}"#);
    }
}
