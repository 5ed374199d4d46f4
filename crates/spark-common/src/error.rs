//! Error types for document store operations

use thiserror::Error;

/// Result type alias for document store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of a call against the document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or did not answer in time
    #[error("Document store unreachable: {0}")]
    Connectivity(String),

    /// A write or read targeted an index that does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The store answered with an error status
    #[error("Document store rejected request (status {status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The store answered with a body that could not be understood
    #[error("Failed to decode document store response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create a rejection error
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Only connectivity failures (including timeouts) qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connectivity_is_retryable() {
        assert!(StoreError::connectivity("connection refused").is_retryable());
        assert!(!StoreError::IndexNotFound("titanic".to_string()).is_retryable());
        assert!(!StoreError::rejected(400, "mapper_parsing_exception").is_retryable());
        assert!(!StoreError::decode("eof").is_retryable());
    }

    #[test]
    fn test_rejected_message() {
        let err = StoreError::rejected(409, "version conflict");
        assert_eq!(
            err.to_string(),
            "Document store rejected request (status 409): version conflict"
        );
    }
}
