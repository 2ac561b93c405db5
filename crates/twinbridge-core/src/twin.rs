//! Digital-twin graph store abstractions.
//!
//! The graph store is an external collaborator. This module defines the
//! types exchanged with it and the [`TwinStore`] trait that concrete
//! clients (HTTP, in-memory, test doubles) implement.
//!
//! ## Example
//!
//! ```rust,ignore
//! use twinbridge_core::twin::{TwinStore, UpdateOperation};
//!
//! let patch = vec![UpdateOperation::replace("/hasValue", 21.5)];
//! store.update_twin("TemperatureSensor1", &patch).await?;
//! ```

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreResult;
use crate::value::ScalarValue;

/// JSON Patch (RFC 6902) operation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl PatchOp {
    /// Whether the operation leaves a value at its path.
    pub fn writes_value(&self) -> bool {
        matches!(self, Self::Add | Self::Replace)
    }
}

impl std::fmt::Display for PatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Test => "test",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PatchOp {
    type Err = String;

    /// Verbs are matched exactly, as on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown patch operation '{}'", other)),
        }
    }
}

/// A single property update addressed to a twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: ScalarValue,
}

impl UpdateOperation {
    /// Create a `replace` operation.
    pub fn replace(path: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Twin metadata block (`$metadata`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwinMetadata {
    /// Model identifier (DTMI) the twin is an instance of.
    #[serde(rename = "$model", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Per-property metadata and anything else the store returns.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A twin as returned by a store read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Twin {
    #[serde(rename = "$dtId")]
    pub id: String,
    #[serde(rename = "$metadata", default)]
    pub metadata: TwinMetadata,
    /// User-defined properties.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Twin {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: TwinMetadata::default(),
            properties: Map::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.metadata.model = Some(model.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Read a string property, if present and a string.
    pub fn string_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

/// A directed, typed edge between two twins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    #[serde(rename = "$sourceId")]
    pub source_id: String,
    #[serde(rename = "$targetId")]
    pub target_id: String,
    #[serde(rename = "$relationshipName")]
    pub kind: String,
}

impl RelationshipEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind: kind.into(),
        }
    }
}

/// Lazily paged relationship query results.
///
/// The stream is finite. Dropping it abandons the remaining pages;
/// issuing the query again restarts from the first page.
pub type RelationshipStream<'a> =
    Pin<Box<dyn Stream<Item = StoreResult<RelationshipEdge>> + Send + 'a>>;

/// Client capability for the digital-twin graph store.
///
/// Implementations own transport, credentials and timeouts. Calls block
/// the calling pipeline until the store answers.
#[async_trait]
pub trait TwinStore: Send + Sync {
    /// Read a twin. Returns `Ok(None)` when the twin does not exist.
    async fn get_twin(&self, twin_id: &str) -> StoreResult<Option<Twin>>;

    /// Apply an ordered patch to a twin.
    async fn update_twin(&self, twin_id: &str, patch: &[UpdateOperation]) -> StoreResult<()>;

    /// Query outgoing relationships of `kind` from `twin_id`.
    fn query_relationships<'a>(&'a self, twin_id: &'a str, kind: &'a str)
        -> RelationshipStream<'a>;

    /// Check whether a twin is an instance of `model_id`.
    async fn is_of_model(&self, twin_id: &str, model_id: &str) -> StoreResult<bool> {
        Ok(self
            .get_twin(twin_id)
            .await?
            .and_then(|twin| twin.metadata.model)
            .is_some_and(|model| model == model_id))
    }
}

/// Shared handle to a twin store client.
pub type DynTwinStore = Arc<dyn TwinStore>;
