//! Smart-space telemetry ingestion.
//!
//! This crate turns sensor payloads and twin change notifications into
//! digital-twin updates and time-series events.
//!
//! ## Ingestion paths
//!
//! | Path | Input | Output |
//! |------|-------|--------|
//! | [`TelemetryIngestor`] | Home Assistant state messages | twin `/hasValue` updates |
//! | [`ObservationIngestor`] | REC observation messages | twin `/hasValue` updates |
//! | [`StatePropagator`] | twin change notifications | time-series sink documents |
//!
//! ## Architecture
//!
//! - **decoder**: raw bytes to JSON documents
//! - **value_mapper**: device class to typed value coercion
//! - **patch**: `replace` operation building
//! - **resolver**: single-hop relationship lookup
//! - **batch**: per-item failure isolation and aggregation
//! - **diff**: change-notification patch flattening
//! - **fanout**: sink document building (direct and capability strategies)

pub mod batch;
pub mod decoder;
pub mod diff;
pub mod error;
pub mod fanout;
pub mod home_assistant;
pub mod patch;
pub mod propagate;
pub mod rec;
pub mod resolver;
pub mod value_mapper;

pub use batch::{BatchProcessor, BatchReport};
pub use decoder::{decode_document, decode_object, TelemetryEvent, SUBJECT_PROPERTY};
pub use diff::{extract_changes, flatten_patch, flatten_path, ChangeNotification, PatchEntry};
pub use error::{AggregateError, IngestError, ItemFailure, Result};
pub use fanout::{FanoutEvent, DTID_KEY};
pub use home_assistant::{SensorReading, TelemetryIngestor};
pub use patch::{PatchBuilder, HAS_VALUE_PATH};
pub use propagate::{StatePropagator, STATE_MODEL_ID};
pub use rec::{decode_rec_message, Observation, ObservationIngestor, RecMessage};
pub use resolver::{RelationshipResolver, IS_CAPABILITY_OF};
pub use value_mapper::{Coercion, DeviceClassMapper};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
