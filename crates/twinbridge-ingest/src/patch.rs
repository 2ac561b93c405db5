//! Patch operation building.

use twinbridge_core::{ScalarValue, UpdateOperation};

/// Property that carries a sensor's current reading.
pub const HAS_VALUE_PATH: &str = "/hasValue";

/// Builds an ordered list of `replace` operations.
///
/// Paths are not validated; callers pass legal property paths.
#[derive(Debug, Clone, Default)]
pub struct PatchBuilder {
    ops: Vec<UpdateOperation>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `replace` operation.
    pub fn replace(mut self, path: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.ops.push(UpdateOperation::replace(path, value));
        self
    }

    /// Append a `replace` operation for each pair, in order.
    pub fn replace_all<I, P, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, V)>,
        P: Into<String>,
        V: Into<ScalarValue>,
    {
        self.ops
            .extend(pairs.into_iter().map(|(p, v)| UpdateOperation::replace(p, v)));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn build(self) -> Vec<UpdateOperation> {
        self.ops
    }

    /// Serialize to a JSON Patch document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.ops)
    }
}
