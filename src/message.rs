//! JSON envelope carried inside chunked payloads.
//!
//! Every payload is a JSON object with a required event name under `c` and
//! an optional argument value under `a`. Unknown keys are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named application event with an optional argument.
///
/// # Examples
///
/// ```
/// use peerlink::message::EventMessage;
/// use serde_json::json;
///
/// let message = EventMessage::new("ping", Some(json!({"n": 1})));
/// let bytes = message.to_json().expect("serialisable");
/// assert_eq!(bytes, br#"{"c":"ping","a":{"n":1}}"#);
/// assert_eq!(EventMessage::from_slice(&bytes).expect("valid"), message);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event name.
    #[serde(rename = "c")]
    pub name: String,
    /// Argument value, omitted from the wire when absent.
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl EventMessage {
    /// Build a message for `name` with optional `args`.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Serialise to the compact JSON sent over the link.
    ///
    /// # Errors
    ///
    /// Returns any [`serde_json::Error`] raised while serialising `args`.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> { serde_json::to_vec(self) }

    /// Parse a completed payload.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] for invalid UTF-8, invalid JSON, or a
    /// missing or non-string event name.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::EventMessage;

    #[test]
    fn absent_args_are_omitted() {
        let bytes = EventMessage::new("hello", None).to_json().expect("serialise");
        assert_eq!(bytes, br#"{"c":"hello"}"#);
    }

    #[test]
    fn event_name_is_escaped() {
        let bytes = EventMessage::new("say \"hi\"", None).to_json().expect("serialise");
        assert_eq!(bytes, br#"{"c":"say \"hi\""}"#);
    }

    #[test]
    fn scalar_args_round_trip() {
        let parsed = EventMessage::from_slice(br#"{"c":"level","a":7}"#).expect("parse");
        assert_eq!(parsed, EventMessage::new("level", Some(json!(7))));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let parsed = EventMessage::from_slice(br#"{"c":"x","z":true}"#).expect("parse");
        assert_eq!(parsed.name, "x");
        assert!(parsed.args.is_none());
    }

    #[test]
    fn missing_name_is_rejected() {
        assert!(EventMessage::from_slice(br#"{"a":1}"#).is_err());
    }

    #[test]
    fn truncated_json_is_rejected() {
        assert!(EventMessage::from_slice(br#"{"c":"pi"#).is_err());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(EventMessage::from_slice(&[b'{', 0xff, b'}']).is_err());
    }
}
