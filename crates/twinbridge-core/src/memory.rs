//! In-memory twin store.
//!
//! Holds twins and relationship edges in process memory. Used for local
//! runs and as the store behind integration tests.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::twin::{PatchOp, RelationshipEdge, RelationshipStream, Twin, TwinStore, UpdateOperation};

/// Twin store backed by process memory.
#[derive(Default)]
pub struct InMemoryTwinStore {
    twins: DashMap<String, Twin>,
    relationships: RwLock<Vec<RelationshipEdge>>,
    /// Every accepted update, in arrival order
    history: Mutex<Vec<(String, Vec<UpdateOperation>)>>,
}

impl InMemoryTwinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a twin.
    pub fn insert_twin(&self, twin: Twin) {
        self.twins.insert(twin.id.clone(), twin);
    }

    /// Add a relationship edge. Edges are returned by queries in insertion order.
    pub fn insert_relationship(&self, edge: RelationshipEdge) {
        self.relationships.write().push(edge);
    }

    /// Snapshot of a twin.
    pub fn twin(&self, twin_id: &str) -> Option<Twin> {
        self.twins.get(twin_id).map(|t| t.clone())
    }

    /// All updates accepted so far.
    pub fn updates(&self) -> Vec<(String, Vec<UpdateOperation>)> {
        self.history.lock().clone()
    }

    pub fn update_count(&self) -> usize {
        self.history.lock().len()
    }

    fn matching_edges(&self, twin_id: &str, kind: &str) -> Vec<RelationshipEdge> {
        self.relationships
            .read()
            .iter()
            .filter(|edge| edge.source_id == twin_id && edge.kind == kind)
            .cloned()
            .collect()
    }
}

/// Set `value` at a `/`-separated property path, creating intermediate objects.
fn set_path(properties: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = properties;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}

/// Remove the value at a `/`-separated property path.
fn remove_path(properties: &mut Map<String, Value>, path: &str) {
    let mut segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = properties;
    for segment in segments {
        current = match current.get_mut(segment) {
            Some(Value::Object(map)) => map,
            _ => return,
        };
    }
    current.remove(last);
}

#[async_trait]
impl TwinStore for InMemoryTwinStore {
    async fn get_twin(&self, twin_id: &str) -> StoreResult<Option<Twin>> {
        Ok(self.twin(twin_id))
    }

    async fn update_twin(&self, twin_id: &str, patch: &[UpdateOperation]) -> StoreResult<()> {
        if let Some(op) = patch.iter().find(|op| {
            !matches!(op.op, PatchOp::Add | PatchOp::Replace | PatchOp::Remove)
        }) {
            return Err(StoreError::Request {
                status: 400,
                message: format!("unsupported patch operation '{}'", op.op),
            });
        }

        {
            let mut twin = self
                .twins
                .get_mut(twin_id)
                .ok_or_else(|| StoreError::NotFound(twin_id.to_string()))?;

            for op in patch {
                if op.op == PatchOp::Remove {
                    remove_path(&mut twin.properties, &op.path);
                } else {
                    set_path(&mut twin.properties, &op.path, op.value.to_json());
                }
            }
            twin.metadata.extra.insert(
                "$lastUpdateTime".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        trace!("Applied {} operation(s) to twin '{}'", patch.len(), twin_id);
        self.history
            .lock()
            .push((twin_id.to_string(), patch.to_vec()));
        Ok(())
    }

    fn query_relationships<'a>(
        &'a self,
        twin_id: &'a str,
        kind: &'a str,
    ) -> RelationshipStream<'a> {
        Box::pin(async_stream::stream! {
            for edge in self.matching_edges(twin_id, kind) {
                yield Ok(edge);
            }
        })
    }
}
