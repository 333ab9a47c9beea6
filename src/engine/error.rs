//! Engine error types
//!
//! The error taxonomy follows the read/write asymmetry of the public surface:
//! read operations (watermarks, scans) absorb connectivity failures into
//! degraded results and only error on invalid requests, while mutating
//! operations (reset, delete, produce) always surface broker failures wrapped
//! with the operation name.

use thiserror::Error;

/// Errors that can occur during engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Request rejected before any broker call was made
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Search pattern failed to compile (raised before scanning starts)
    #[error("Invalid search pattern: {0}")]
    PatternInvalid(#[from] regex::Error),

    /// Client-library error with no more specific operation context
    #[error("Kafka client error: {0}")]
    Client(#[from] rdkafka::error::KafkaError),

    /// Broker-side rejection, wrapped with the operation that hit it
    #[error("{op} failed: {source}")]
    Broker {
        op: &'static str,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// Topic does not exist (or reported no partitions)
    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    /// Internal failure (blocking task pool) that is not broker-related
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Wrap a client error with operation context.
    pub(crate) fn broker(op: &'static str, source: rdkafka::error::KafkaError) -> Self {
        EngineError::Broker { op, source }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::error::KafkaError;
    use rdkafka::types::RDKafkaErrorCode;

    #[test]
    fn test_invalid_request_display() {
        let err = EngineError::InvalidRequest("count must be > 0".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid request"));
        assert!(msg.contains("count must be > 0"));
    }

    #[test]
    fn test_broker_error_carries_operation() {
        let err = EngineError::broker(
            "delete_group",
            KafkaError::AdminOp(RDKafkaErrorCode::NonEmptyGroup),
        );
        let msg = format!("{}", err);
        assert!(msg.contains("delete_group failed"));
    }

    #[test]
    fn test_pattern_error_conversion() {
        let bad = regex::Regex::new("(unclosed").unwrap_err();
        let err: EngineError = bad.into();
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid search pattern"));
    }

    #[test]
    fn test_topic_not_found_display() {
        let err = EngineError::TopicNotFound("missing-topic".to_string());
        assert!(format!("{}", err).contains("missing-topic"));
    }
}
