//! Error types for the twin store, event sink and configuration collaborators.

/// Result type for twin store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Twin store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Twin not found.
    #[error("Twin not found: {0}")]
    NotFound(String),

    /// A read or write request was rejected or failed in transit.
    #[error("Request failed ({status}): {message}")]
    Request { status: u16, message: String },

    /// A graph query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error.
    #[error("Store error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Event sink error types.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink has no consumer attached.
    #[error("Event sink closed")]
    Closed,

    /// Append was rejected.
    #[error("Append failed: {0}")]
    Append(String),

    /// Other error.
    #[error("Sink error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("Application setting \"{0}\" not set")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("Invalid value for \"{name}\": {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("room-1".to_string());
        assert!(err.to_string().contains("room-1"));

        let err = StoreError::Request {
            status: 412,
            message: "precondition failed".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed (412): precondition failed");

        let err = ConfigError::Missing("ADT_SERVICE_URL");
        assert_eq!(
            err.to_string(),
            "Application setting \"ADT_SERVICE_URL\" not set"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: StoreError = anyhow::anyhow!("socket closed").into();
        assert!(matches!(err, StoreError::Other(_)));
        assert!(err.to_string().contains("socket closed"));
    }
}
