//! Graph store error types.

use reindex_types::ReindexError;
use thiserror::Error;

/// Errors returned by [`GraphStore`](crate::GraphStore) implementations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The store could not be reached or refused the session
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed on the server
    #[error("Query error: {0}")]
    Query(String),

    /// A returned row did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// An index with this name already exists
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// No index with this name exists
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Query vector does not match the index dimension
    #[error("Dimension mismatch for index {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid label, property or index definition
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ReindexError),
}

impl GraphError {
    /// Whether the error means the store is unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GraphError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::IndexNotFound("moviePlots".to_string());
        assert_eq!(err.to_string(), "Index not found: moviePlots");

        let err = GraphError::DimensionMismatch {
            index: "moviePlots_8".to_string(),
            expected: 8,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch for index moviePlots_8: expected 8, got 4"
        );
    }

    #[test]
    fn test_is_connectivity() {
        assert!(GraphError::Connection("refused".to_string()).is_connectivity());
        assert!(!GraphError::Query("syntax".to_string()).is_connectivity());
    }
}
