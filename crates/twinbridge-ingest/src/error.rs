//! Ingestion error types.

use twinbridge_core::{SinkError, StoreError};

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors raised while ingesting a single item or a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Malformed input payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// The device class declares a typed value but the raw state does not parse
    #[error("Cannot coerce '{raw}' for device class '{device_class}'")]
    ValueCoercion { device_class: String, raw: String },

    /// Twin store read/write failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event sink failure
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Two or more items of a batch failed
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl IngestError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(e: serde_json::Error) -> Self {
        IngestError::Decode(e.to_string())
    }
}

/// A failed batch item and its position in the input.
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub error: IngestError,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {}: {}", self.index, self.error)
    }
}

/// Every failure of a batch, in input order.
#[derive(Debug)]
pub struct AggregateError {
    failures: Vec<ItemFailure>,
}

impl AggregateError {
    pub fn new(failures: Vec<ItemFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} batch items failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::ValueCoercion {
            device_class: "temperature".to_string(),
            raw: "warm".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot coerce 'warm' for device class 'temperature'"
        );

        let err: IngestError = StoreError::NotFound("sensor-1".to_string()).into();
        assert_eq!(err.to_string(), "Twin not found: sensor-1");
    }

    #[test]
    fn test_aggregate_display_lists_items_in_order() {
        let err = AggregateError::new(vec![
            ItemFailure {
                index: 1,
                error: IngestError::decode("bad json"),
            },
            ItemFailure {
                index: 3,
                error: IngestError::decode("missing entity_id"),
            },
        ]);
        assert_eq!(err.len(), 2);
        assert_eq!(
            err.to_string(),
            "2 batch items failed; item 1: Decode error: bad json; item 3: Decode error: missing entity_id"
        );
    }
}
