//! Change-notification patch extraction.
//!
//! A change notification reports a mutation already applied to a twin as
//! a JSON Patch. Only operations that leave a value behind (`add`,
//! `replace`) are of interest downstream; their paths are flattened into
//! dotted keys, e.g. `/Front/Temperature` becomes `Front.Temperature`.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use twinbridge_core::PatchOp;

use crate::decoder::TelemetryEvent;
use crate::error::{IngestError, Result};

/// One operation of a change-notification patch.
///
/// Entries are kept as received. Verbs other than `add` and `replace`,
/// including unrecognized ones, are ignored downstream and need no path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatchEntry {
    pub op: String,
    #[serde(default)]
    pub path: Option<String>,
    /// Treated as `null` if absent on `add`/`replace`
    #[serde(default)]
    pub value: Option<Value>,
}

impl PatchEntry {
    /// The recognized verb, if any.
    pub fn kind(&self) -> Option<PatchOp> {
        self.op.parse().ok()
    }

    /// Whether the entry leaves a value behind.
    pub fn writes_value(&self) -> bool {
        self.kind().is_some_and(|op| op.writes_value())
    }
}

/// A mutation already applied to `twin_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub twin_id: String,
    pub patch: Vec<PatchEntry>,
}

#[derive(Deserialize)]
struct Envelope {
    patch: Vec<PatchEntry>,
}

impl ChangeNotification {
    /// Decode a notification body for a known twin.
    ///
    /// Only `add`/`replace` entries must carry a path.
    pub fn decode(twin_id: impl Into<String>, body: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| IngestError::decode(format!("malformed change notification: {}", e)))?;

        for (index, entry) in envelope.patch.iter().enumerate() {
            if entry.writes_value() && entry.path.is_none() {
                return Err(IngestError::decode(format!(
                    "patch entry {} ('{}') has no path",
                    index, entry.op
                )));
            }
            if entry.kind().is_none() {
                debug!("Ignoring unrecognized patch operation '{}'", entry.op);
            }
        }

        Ok(Self {
            twin_id: twin_id.into(),
            patch: envelope.patch,
        })
    }

    /// Decode a notification whose subject travels in transport metadata.
    pub fn from_event(event: &TelemetryEvent) -> Result<Self> {
        let subject = event
            .subject()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IngestError::decode("change notification has no subject"))?;
        Self::decode(subject, &event.body)
    }
}

/// Flatten a JSON Patch path into a dotted key.
///
/// The leading separator is dropped and every remaining `/` becomes `.`.
pub fn flatten_path(path: &str) -> String {
    path.strip_prefix('/').unwrap_or(path).replace('/', ".")
}

/// Retained `add`/`replace` entries as `(flattened key, value)`, in patch order.
pub fn extract_changes(notification: &ChangeNotification) -> Vec<(String, Value)> {
    notification
        .patch
        .iter()
        .filter(|entry| entry.writes_value())
        .filter_map(|entry| {
            let path = entry.path.as_deref()?;
            Some((
                flatten_path(path),
                entry.value.clone().unwrap_or(Value::Null),
            ))
        })
        .collect()
}

/// Flattened key → value map of a notification. Later entries win.
pub fn flatten_patch(notification: &ChangeNotification) -> Map<String, Value> {
    let mut flattened = Map::new();
    for (key, value) in extract_changes(notification) {
        flattened.insert(key, value);
    }
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(patch: Value) -> ChangeNotification {
        let body = serde_json::to_vec(&json!({ "patch": patch })).unwrap();
        ChangeNotification::decode("room-1", &body).unwrap()
    }

    #[test]
    fn test_flatten_path() {
        assert_eq!(flatten_path("/Front/Temperature"), "Front.Temperature");
        assert_eq!(flatten_path("/A/B/C"), "A.B.C");
        assert_eq!(flatten_path("/hasValue"), "hasValue");
        assert_eq!(flatten_path("A/B"), "A.B");
    }

    #[test]
    fn test_only_add_and_replace_retained() {
        let n = notification(json!([
            {"op": "replace", "path": "/Front/Temperature", "value": 21.5},
            {"op": "remove", "path": "/Back"},
            {"op": "add", "path": "/Occupied", "value": true}
        ]));

        let flattened = flatten_patch(&n);
        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened["Front.Temperature"], json!(21.5));
        assert_eq!(flattened["Occupied"], json!(true));
    }

    #[test]
    fn test_last_write_wins() {
        let n = notification(json!([
            {"op": "replace", "path": "/A/B", "value": 1},
            {"op": "add", "path": "/A/B", "value": 2}
        ]));

        assert_eq!(extract_changes(&n).len(), 2);
        assert_eq!(flatten_patch(&n)["A.B"], json!(2));
    }

    #[test]
    fn test_remove_only_is_empty() {
        let n = notification(json!([{"op": "remove", "path": "/A"}]));
        assert!(flatten_patch(&n).is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let n = notification(json!([
            {"op": "replace", "path": "/x/y", "value": "a"},
            {"op": "add", "path": "/z", "value": [1, 2]}
        ]));
        assert_eq!(flatten_patch(&n), flatten_patch(&n));
        assert_eq!(extract_changes(&n), extract_changes(&n));
    }

    #[test]
    fn test_decode_errors() {
        assert!(ChangeNotification::decode("t", b"{}").is_err());
        assert!(ChangeNotification::decode("t", b"{\"patch\": {}}").is_err());
        assert!(
            ChangeNotification::decode("t", br#"{"patch": [{"op": "replace", "value": 1}]}"#)
                .is_err()
        );
        assert!(ChangeNotification::decode("t", br#"{"patch": [{"path": "/a"}]}"#).is_err());

        let event = TelemetryEvent::new(r#"{"patch": []}"#);
        let err = ChangeNotification::from_event(&event).unwrap_err();
        assert!(err.to_string().contains("no subject"));
    }

    #[test]
    fn test_tolerates_unknown_fields() {
        let event = TelemetryEvent::new(
            r#"{"modelId": "dtmi:x;1", "patch": [{"op": "add", "path": "/a", "value": 1, "extra": 0}]}"#,
        )
        .with_subject("room-9");
        let n = ChangeNotification::from_event(&event).unwrap();
        assert_eq!(n.twin_id, "room-9");
        assert_eq!(n.patch[0].kind(), Some(PatchOp::Add));
    }

    #[test]
    fn test_unrecognized_entries_do_not_drop_updates() {
        let n = notification(json!([
            {"op": "replace", "path": "/Front/Temperature", "value": 21.5},
            {"op": "merge", "path": "/Front", "value": {}},
            {"op": "Replace", "path": "/Back/Temperature", "value": 19.0},
            {"op": "remove"}
        ]));

        assert_eq!(n.patch.len(), 4);
        assert_eq!(n.patch[1].kind(), None);
        assert_eq!(
            extract_changes(&n),
            vec![("Front.Temperature".to_string(), json!(21.5))]
        );
    }
}
