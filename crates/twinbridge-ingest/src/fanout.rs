//! Fan-out event building.
//!
//! A fan-out event is a flat property map plus the id of the twin it
//! belongs to. On the wire the id travels inline under `$dtId`:
//!
//! ```json
//! {"Front.Temperature": 21.5, "$dtId": "room-1"}
//! ```
//!
//! Two strategies exist:
//! - **Direct**: the flattened patch of the changed twin, addressed to that twin.
//! - **Capability**: the changed twin is a capability; its values are
//!   collapsed onto the capability's `name` and addressed to the parent twin.

use serde_json::{Map, Value};
use twinbridge_core::Twin;

use crate::diff::{extract_changes, flatten_patch, ChangeNotification};

/// Reserved document key carrying the target twin id.
pub const DTID_KEY: &str = "$dtId";

/// Twin property naming the quantity a capability measures.
pub const CAPABILITY_NAME_PROPERTY: &str = "name";

/// An outbound time-series update.
#[derive(Debug, Clone, PartialEq)]
pub struct FanoutEvent {
    target_id: String,
    properties: Map<String, Value>,
}

impl FanoutEvent {
    /// Create an event. Returns `None` when there is nothing to emit.
    pub fn new(target_id: impl Into<String>, properties: Map<String, Value>) -> Option<Self> {
        if properties.is_empty() {
            return None;
        }
        Some(Self {
            target_id: target_id.into(),
            properties,
        })
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// The sink document. `$dtId` overrides a property of the same name.
    pub fn to_document(&self) -> Value {
        let mut doc = self.properties.clone();
        doc.insert(DTID_KEY.to_string(), Value::String(self.target_id.clone()));
        Value::Object(doc)
    }

    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_document())
    }
}

/// Direct strategy: flattened paths addressed to the notifying twin.
pub fn build_direct(notification: &ChangeNotification) -> Option<FanoutEvent> {
    FanoutEvent::new(notification.twin_id.clone(), flatten_patch(notification))
}

/// Property name of a capability twin: its trimmed `name`, if non-empty.
pub fn capability_property_name(twin: &Twin) -> Option<String> {
    twin.string_property(CAPABILITY_NAME_PROPERTY)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Capability strategy: every written value collapses onto `property_name`
/// (last write wins) and the event is addressed to `target_id`.
pub fn build_capability(
    notification: &ChangeNotification,
    property_name: &str,
    target_id: &str,
) -> Option<FanoutEvent> {
    let value = extract_changes(notification).pop().map(|(_, value)| value)?;
    let mut properties = Map::new();
    properties.insert(property_name.to_string(), value);
    FanoutEvent::new(target_id, properties)
}
