//! RealEstateCore (REC) observation ingestion.
//!
//! An edge message carries a batch of observations:
//!
//! ```json
//! {"format": "rec3.2",
//!  "observations": [
//!    {"sensorId": "https://example.com/building/Sensor:1",
//!     "quantityKind": "https://w3id.org/rec/core/Temperature",
//!     "numericValue": 21.5}
//!  ]}
//! ```
//!
//! Event-grid deliveries wrap the message as a JSON string under `body`.
//! Each observation is an independent batch item.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use twinbridge_core::{DynTwinStore, FailurePolicy, IngestConfig, ScalarValue};
use url::Url;

use crate::batch::{BatchProcessor, BatchReport};
use crate::decoder::{decode_object, json_type_name, TelemetryEvent};
use crate::error::{IngestError, Result};
use crate::patch::{PatchBuilder, HAS_VALUE_PATH};

/// A single REC observation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub sensor_id: Url,
    pub quantity_kind: Url,
    #[serde(default)]
    pub numeric_value: Option<f64>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
    #[serde(default)]
    pub string_value: Option<String>,
}

impl Observation {
    /// Twin id: the sensor URI path without leading `/` and without `:`.
    pub fn twin_id(&self) -> String {
        self.sensor_id.path().trim_start_matches('/').replace(':', "")
    }

    /// The observed value. Numeric takes precedence over boolean over string.
    pub fn value(&self) -> Result<ScalarValue> {
        if let Some(v) = self.numeric_value {
            Ok(ScalarValue::Float(v))
        } else if let Some(v) = self.boolean_value {
            Ok(ScalarValue::Bool(v))
        } else if let Some(v) = &self.string_value {
            Ok(ScalarValue::String(v.clone()))
        } else {
            Err(IngestError::decode(format!(
                "observation from '{}' carries no value",
                self.sensor_id
            )))
        }
    }
}

/// A decoded REC edge message. Observations stay raw until processed so
/// that one malformed observation fails alone.
#[derive(Debug, Clone, PartialEq)]
pub struct RecMessage {
    pub format: Option<String>,
    pub observations: Vec<Value>,
}

/// Decode a REC message, unwrapping an event-grid `body` string if present.
pub fn decode_rec_message(bytes: &[u8]) -> Result<RecMessage> {
    let mut doc = decode_object(bytes)?;

    if !doc.contains_key("observations") {
        if let Some(Value::String(body)) = doc.get("body") {
            doc = decode_object(body.as_bytes())?;
        }
    }

    let format = doc.get("format").and_then(Value::as_str).map(str::to_string);
    let observations = match doc.remove("observations") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(IngestError::decode(format!(
                "field 'observations' must be an array, found {}",
                json_type_name(&other)
            )))
        }
        None => return Err(IngestError::decode("missing field 'observations'")),
    };

    Ok(RecMessage {
        format,
        observations,
    })
}

/// Writes REC observations to the twin store.
pub struct ObservationIngestor {
    store: DynTwinStore,
    batch: BatchProcessor,
    failure_policy: FailurePolicy,
}

impl ObservationIngestor {
    pub fn new(store: DynTwinStore) -> Self {
        Self {
            store,
            batch: BatchProcessor::new(),
            failure_policy: FailurePolicy::Aggregate,
        }
    }

    pub fn from_config(store: DynTwinStore, config: &IngestConfig) -> Self {
        Self::new(store)
            .with_batch(BatchProcessor::with_concurrency(config.batch_concurrency))
            .with_failure_policy(config.observation_failures)
    }

    pub fn with_batch(mut self, batch: BatchProcessor) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Write one observation.
    pub async fn ingest_observation(&self, raw: &Value) -> Result<()> {
        let observation: Observation = serde_json::from_value(raw.clone())
            .map_err(|e| IngestError::decode(format!("malformed observation: {}", e)))?;

        info!(
            "Sensor: {}\tQuantityKind: {}",
            observation.sensor_id, observation.quantity_kind
        );

        let patch = PatchBuilder::new()
            .replace(HAS_VALUE_PATH, observation.value()?)
            .build();
        self.store
            .update_twin(&observation.twin_id(), &patch)
            .await?;
        Ok(())
    }

    /// Process every observation of a message, isolating failures.
    pub async fn process(&self, message: &RecMessage) -> BatchReport {
        self.batch
            .run(&message.observations, |_, raw| self.ingest_observation(raw))
            .await
    }

    /// Decode an event and ingest its observations under the failure policy.
    pub async fn ingest(&self, event: &TelemetryEvent) -> Result<usize> {
        let message = decode_rec_message(&event.body)?;
        info!(
            "REC message ({}) with {} observation(s)",
            message.format.as_deref().unwrap_or("unknown format"),
            message.observations.len()
        );
        self.process(&message).await.finish(self.failure_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observation(v: Value) -> Observation {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_twin_id_from_sensor_uri() {
        let obs = observation(json!({
            "sensorId": "https://example.com/building/Sensor:Temp:1",
            "quantityKind": "https://w3id.org/rec/core/Temperature",
            "numericValue": 21.5
        }));
        assert_eq!(obs.twin_id(), "building/SensorTemp1");
    }

    #[test]
    fn test_value_precedence() {
        let obs = observation(json!({
            "sensorId": "https://example.com/s1",
            "quantityKind": "https://w3id.org/rec/core/Temperature",
            "numericValue": 21.5
        }));
        assert_eq!(obs.value().unwrap(), ScalarValue::Float(21.5));

        let obs = observation(json!({
            "sensorId": "https://example.com/s1",
            "quantityKind": "https://w3id.org/rec/core/Presence",
            "booleanValue": true,
            "stringValue": "present"
        }));
        assert_eq!(obs.value().unwrap(), ScalarValue::Bool(true));

        let obs = observation(json!({
            "sensorId": "https://example.com/s1",
            "quantityKind": "https://w3id.org/rec/core/Status",
            "stringValue": "ok"
        }));
        assert_eq!(obs.value().unwrap(), ScalarValue::String("ok".to_string()));
    }

    #[test]
    fn test_value_missing() {
        let obs = observation(json!({
            "sensorId": "https://example.com/s1",
            "quantityKind": "https://w3id.org/rec/core/Temperature"
        }));
        assert!(matches!(obs.value(), Err(IngestError::Decode(_))));
    }

    #[test]
    fn test_decode_plain_and_wrapped() {
        let inner = json!({"format": "rec3.2", "observations": [{}, {}]});
        let plain = decode_rec_message(inner.to_string().as_bytes()).unwrap();
        assert_eq!(plain.format.as_deref(), Some("rec3.2"));
        assert_eq!(plain.observations.len(), 2);

        let wrapped = json!({"body": inner.to_string(), "properties": {}});
        let unwrapped = decode_rec_message(wrapped.to_string().as_bytes()).unwrap();
        assert_eq!(unwrapped, plain);
    }

    #[test]
    fn test_decode_requires_observations() {
        assert!(decode_rec_message(br#"{"format": "rec3.2"}"#).is_err());
        assert!(decode_rec_message(br#"{"observations": {}}"#).is_err());
        assert!(decode_rec_message(br#"{"body": "not json"}"#).is_err());
    }
}
