//! Home Assistant state-message ingestion.
//!
//! Message shape:
//!
//! ```json
//! {"entity_id": "sensor.LivingRoomTemperature",
//!  "attributes": {"device_class": "temperature"},
//!  "state": "21.5"}
//! ```
//!
//! Entity ids are `<domain>.<identifier>`; the identifier is the twin id,
//! so sensor names must be globally unique across Home Assistant devices.

use serde_json::{Map, Value};
use tracing::debug;
use twinbridge_core::{DynTwinStore, FailurePolicy, IngestConfig};

use crate::batch::{BatchProcessor, BatchReport};
use crate::decoder::{decode_object, json_type_name, required_str, TelemetryEvent};
use crate::error::{IngestError, Result};
use crate::patch::{PatchBuilder, HAS_VALUE_PATH};
use crate::value_mapper::DeviceClassMapper;

/// A sensor state reported by Home Assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub entity_id: String,
    pub twin_id: String,
    pub device_class: Option<String>,
    pub raw_state: String,
}

impl SensorReading {
    /// Parse a decoded state message.
    pub fn from_document(doc: &Map<String, Value>) -> Result<Self> {
        let entity_id = required_str(doc, "entity_id")?;
        let twin_id = twin_id_from_entity(entity_id)?;

        let device_class = doc
            .get("attributes")
            .and_then(|attrs| attrs.get("device_class"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let raw_state = match doc.get("state") {
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            Some(other) => {
                return Err(IngestError::decode(format!(
                    "field 'state' must be a string or number, found {}",
                    json_type_name(other)
                )))
            }
            None => return Err(IngestError::decode("missing field 'state'")),
        };

        Ok(Self {
            entity_id: entity_id.to_string(),
            twin_id,
            device_class,
            raw_state,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_document(&decode_object(bytes)?)
    }
}

/// Twin id of a `<domain>.<identifier>` entity id.
pub fn twin_id_from_entity(entity_id: &str) -> Result<String> {
    match entity_id.split_once('.') {
        Some((_, identifier)) if !identifier.is_empty() => Ok(identifier.to_string()),
        _ => Err(IngestError::decode(format!(
            "entity id '{}' is not of the form <domain>.<identifier>",
            entity_id
        ))),
    }
}

/// Ingests batches of Home Assistant state messages into the twin store.
pub struct TelemetryIngestor {
    store: DynTwinStore,
    mapper: DeviceClassMapper,
    batch: BatchProcessor,
}

impl TelemetryIngestor {
    pub fn new(store: DynTwinStore) -> Self {
        Self {
            store,
            mapper: DeviceClassMapper::default(),
            batch: BatchProcessor::new(),
        }
    }

    pub fn from_config(store: DynTwinStore, config: &IngestConfig) -> Self {
        Self::new(store).with_batch(BatchProcessor::with_concurrency(config.batch_concurrency))
    }

    pub fn with_mapper(mut self, mapper: DeviceClassMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_batch(mut self, batch: BatchProcessor) -> Self {
        self.batch = batch;
        self
    }

    /// Decode, map and write one message.
    pub async fn ingest_one(&self, event: &TelemetryEvent) -> Result<()> {
        let reading = SensorReading::decode(&event.body)?;
        let value = self
            .mapper
            .map(reading.device_class.as_deref(), &reading.raw_state)?;

        debug!(
            "Updating twin '{}' from '{}' ({}): {}",
            reading.twin_id,
            reading.entity_id,
            reading.device_class.as_deref().unwrap_or("no device class"),
            value
        );

        let patch = PatchBuilder::new().replace(HAS_VALUE_PATH, value).build();
        self.store.update_twin(&reading.twin_id, &patch).await?;
        Ok(())
    }

    /// Process every event, isolating failures per event.
    pub async fn process(&self, events: &[TelemetryEvent]) -> BatchReport {
        self.batch
            .run(events, |_, event| self.ingest_one(event))
            .await
    }

    /// Process a batch and apply the 0 / 1 / many failure rule.
    pub async fn ingest_batch(&self, events: &[TelemetryEvent]) -> Result<usize> {
        self.process(events).await.finish(FailurePolicy::Aggregate)
    }
}
