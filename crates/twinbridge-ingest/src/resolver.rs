//! Single-hop relationship resolution.

use futures::StreamExt;
use tracing::{debug, warn};
use twinbridge_core::DynTwinStore;

/// Relationship linking a capability twin to the twin it describes.
pub const IS_CAPABILITY_OF: &str = "isCapabilityOf";

/// Resolves the target of one outgoing relationship.
///
/// Store failures are logged and reported as "no relationship" so that
/// they never abort the surrounding item.
#[derive(Clone)]
pub struct RelationshipResolver {
    store: DynTwinStore,
}

impl RelationshipResolver {
    pub fn new(store: DynTwinStore) -> Self {
        Self { store }
    }

    /// Target id of the first `kind` edge leaving `entity_id`.
    ///
    /// Result ordering is whatever the store returns; only the first
    /// element is consumed.
    pub async fn resolve(&self, entity_id: &str, kind: &str) -> Option<String> {
        let mut edges = self.store.query_relationships(entity_id, kind);
        match edges.next().await {
            Some(Ok(edge)) => {
                debug!(
                    "Resolved '{}' relationship of '{}' to '{}'",
                    kind, entity_id, edge.target_id
                );
                Some(edge.target_id)
            }
            Some(Err(e)) => {
                warn!(
                    "Relationship query '{}' for '{}' failed, treating as unresolved: {}",
                    kind, entity_id, e
                );
                None
            }
            None => {
                debug!("No '{}' relationship found for '{}'", kind, entity_id);
                None
            }
        }
    }

    /// Parent twin of a capability twin.
    pub async fn capability_parent(&self, capability_id: &str) -> Option<String> {
        self.resolve(capability_id, IS_CAPABILITY_OF).await
    }
}
