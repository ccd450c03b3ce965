//! Embedded engine error types

use thiserror::Error;

use crate::document::CollectionError;

/// Result type for engine evaluation
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Query, expression or stage operator the engine does not evaluate
    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// Operator or stage with an operand of the wrong shape
    #[error("Malformed {context}: {reason}")]
    Malformed {
        context: &'static str,
        reason: String,
    },

    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// Insert of an `_id` that is already present
    #[error("Duplicate key '{0}'")]
    DuplicateKey(String),

    /// Document without a string `_id`, or an update that changes it
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl EngineError {
    pub fn malformed(context: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            context,
            reason: reason.into(),
        }
    }
}

impl From<EngineError> for CollectionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::DuplicateKey(id) => CollectionError::DuplicateKey(id),
            other => CollectionError::InvalidOperation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_survives_conversion() {
        let err: CollectionError = EngineError::DuplicateKey("d1".into()).into();
        assert_eq!(err, CollectionError::DuplicateKey("d1".into()));
    }

    #[test]
    fn test_other_errors_become_invalid_operation() {
        let err: CollectionError = EngineError::UnsupportedOperator("$where".into()).into();
        assert!(matches!(err, CollectionError::InvalidOperation(msg) if msg.contains("$where")));
    }
}
