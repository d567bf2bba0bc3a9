//! Socket Mode event envelopes and acknowledgements.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope `type` sent once after each connection is established.
pub const HELLO: &str = "hello";
/// Envelope `type` announcing that the server is about to drop the socket.
pub const DISCONNECT: &str = "disconnect";
/// Envelope `type` carrying an Events API callback. Must be acknowledged.
pub const EVENTS_API: &str = "events_api";

/// Nested payload `type` for event callbacks.
pub const EVENT_CALLBACK: &str = "event_callback";
/// Nested event `type` for mentions of the bot.
pub const APP_MENTION: &str = "app_mention";

/// A decoded event envelope.
///
/// Only `type` is required. `payload` is kept as raw JSON; use
/// [`app_mention`](Self::app_mention) to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope_id: Option<String>,
    /// Why the server is disconnecting (`disconnect` envelopes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// The fields of an `app_mention` callback the bot acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMention {
    pub channel: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct CallbackPayload {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    event: Option<CallbackEvent>,
}

#[derive(Debug, Deserialize)]
struct CallbackEvent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl Envelope {
    /// Create an envelope with just a type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            envelope_id: None,
            reason: None,
            payload: None,
        }
    }

    /// Extract an `app_mention` callback from the payload.
    ///
    /// Returns `None` for any other shape, including a mention without a
    /// channel or text.
    pub fn app_mention(&self) -> Option<AppMention> {
        let payload: CallbackPayload = serde_json::from_value(self.payload.clone()?).ok()?;
        if payload.kind != EVENT_CALLBACK {
            return None;
        }

        let event = payload.event?;
        if event.kind != APP_MENTION {
            return None;
        }

        Some(AppMention {
            channel: event.channel?,
            text: event.text?,
        })
    }
}

/// Reply that tells the server an `events_api` envelope was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub envelope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Acknowledgement {
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            payload: None,
        }
    }

    /// Attach a response payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn mention(text: &str) -> Envelope {
        serde_json::from_value(json!({
            "type": "events_api",
            "envelope_id": "e-1",
            "accepts_response_payload": false,
            "payload": {
                "type": "event_callback",
                "event": {"type": "app_mention", "channel": "C42", "text": text, "user": "U1"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_decodes_hello() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"type":"hello","num_connections":1}"#).unwrap();
        assert_eq!(envelope.kind, HELLO);
        assert!(envelope.envelope_id.is_none());
    }

    #[test]
    fn test_decodes_disconnect_reason() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"type":"disconnect","reason":"refresh_requested"}"#).unwrap();
        assert_eq!(envelope.kind, DISCONNECT);
        assert_eq!(envelope.reason.as_deref(), Some("refresh_requested"));
    }

    #[test]
    fn test_missing_type_is_rejected() {
        assert!(serde_json::from_str::<Envelope>(r#"{"envelope_id":"x"}"#).is_err());
    }

    #[test]
    fn test_app_mention_extracted() {
        let found = mention("<@U0> led on").app_mention().unwrap();
        assert_eq!(found.channel, "C42");
        assert_eq!(found.text, "<@U0> led on");
    }

    #[test]
    fn test_other_shapes_are_not_mentions() {
        let mut envelope = mention("led on");
        envelope.payload = Some(json!({"type": "event_callback", "event": {"type": "message"}}));
        assert!(envelope.app_mention().is_none());

        envelope.payload = Some(json!({"type": "interactive"}));
        assert!(envelope.app_mention().is_none());

        envelope.payload = Some(json!("not an object"));
        assert!(envelope.app_mention().is_none());

        envelope.payload = None;
        assert!(envelope.app_mention().is_none());
    }

    #[test]
    fn test_acknowledgement_shape() {
        let ack = Acknowledgement::new("e-1");
        assert_eq!(serde_json::to_value(&ack).unwrap(), json!({"envelope_id": "e-1"}));

        let ack = ack.with_payload(json!({"text": "ok"}));
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({"envelope_id": "e-1", "payload": {"text": "ok"}})
        );
    }
}
