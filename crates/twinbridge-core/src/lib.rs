//! Core traits and types for TwinBridge.
//!
//! This crate defines the foundations shared by the ingestion paths:
//!
//! - **TwinStore**: client capability for the digital-twin graph store
//! - **EventSink**: client capability for the downstream time-series sink
//! - **IngestConfig**: startup configuration
//! - **ScalarValue** / **UpdateOperation**: property update wire types
//!
//! Concrete collaborators are constructed once by the host process and
//! shared as `Arc<dyn TwinStore>` / `Arc<dyn EventSink>`.

pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod sink;
pub mod twin;
pub mod value;

pub use config::{FailurePolicy, FanoutMode, IngestConfig};
pub use error::{ConfigError, SinkError, StoreError, StoreResult};
pub use memory::InMemoryTwinStore;
pub use sink::{BroadcastSink, DynEventSink, EventSink, SinkReceiver};
pub use twin::{
    DynTwinStore, PatchOp, RelationshipEdge, RelationshipStream, Twin, TwinMetadata, TwinStore,
    UpdateOperation,
};
pub use value::ScalarValue;

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::{FailurePolicy, FanoutMode, IngestConfig};
    pub use crate::error::{ConfigError, SinkError, StoreError, StoreResult};
    pub use crate::sink::{DynEventSink, EventSink};
    pub use crate::twin::{DynTwinStore, RelationshipEdge, Twin, TwinStore, UpdateOperation};
    pub use crate::value::ScalarValue;
}
