//! Payload decoding.
//!
//! Turns raw message bytes into a generic JSON document. No domain
//! knowledge lives here; the ingestion paths interpret the document.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{IngestError, Result};

/// Transport property carrying the subject (twin id) of an event.
pub const SUBJECT_PROPERTY: &str = "cloudEvents:subject";

/// A raw event delivered by the transport.
#[derive(Debug, Clone, Default)]
pub struct TelemetryEvent {
    /// Message body
    pub body: Vec<u8>,
    /// Transport metadata (application properties)
    pub properties: HashMap<String, Value>,
}

impl TelemetryEvent {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        self.with_property(SUBJECT_PROPERTY, Value::String(subject.into()))
    }

    /// The subject this event refers to, if the transport supplied one.
    pub fn subject(&self) -> Option<&str> {
        self.properties.get(SUBJECT_PROPERTY).and_then(Value::as_str)
    }
}

/// Decode bytes into a JSON document of any shape.
pub fn decode_document(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| IngestError::decode(format!("malformed payload: {}", e)))
}

/// Decode bytes into a JSON object.
pub fn decode_object(bytes: &[u8]) -> Result<Map<String, Value>> {
    match decode_document(bytes)? {
        Value::Object(map) => Ok(map),
        other => Err(IngestError::decode(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fetch a required string field.
pub(crate) fn required_str<'a>(doc: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match doc.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(IngestError::decode(format!(
            "field '{}' must be a string, found {}",
            field,
            json_type_name(other)
        ))),
        None => Err(IngestError::decode(format!("missing field '{}'", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_document_any_shape() {
        assert_eq!(decode_document(b"[1, 2]").unwrap(), json!([1, 2]));
        assert_eq!(decode_document(b"\"x\"").unwrap(), json!("x"));
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode_document(b"{\"state\": ").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));

        let err = decode_document(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[test]
    fn test_decode_object_rejects_non_object() {
        let err = decode_object(b"[1]").unwrap_err();
        assert_eq!(err.to_string(), "Decode error: expected a JSON object, found array");
        assert!(decode_object(b"{\"a\": 1}").is_ok());
    }

    #[test]
    fn test_event_subject() {
        let event = TelemetryEvent::new("{}").with_subject("room-1");
        assert_eq!(event.subject(), Some("room-1"));
        assert_eq!(TelemetryEvent::new("{}").subject(), None);
    }

    #[test]
    fn test_required_str() {
        let doc = json!({"a": "x", "b": 1});
        let doc = doc.as_object().unwrap();
        assert_eq!(required_str(doc, "a").unwrap(), "x");
        assert!(required_str(doc, "b").unwrap_err().to_string().contains("must be a string"));
        assert!(required_str(doc, "c").unwrap_err().to_string().contains("missing field 'c'"));
    }
}
