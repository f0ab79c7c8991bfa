//! Error types for the reindexing pipeline.

use reindex_embeddings::EmbeddingError;
use reindex_graph::GraphError;
use reindex_types::ReindexError;
use thiserror::Error;

/// Errors that can occur in the reindexing pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Graph store operation failed
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Invalid pipeline configuration
    #[error("Config error: {0}")]
    Config(#[from] ReindexError),

    /// A record reached the embedding pass without an identifier
    #[error("Record at offset {offset} has no identifier; run identifier backfill first")]
    MissingIdentifier { offset: usize },

    /// Embedder output does not fit the target index
    #[error("Dimension mismatch: index expects {expected}, embedder produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A record in a batch failed; earlier batches are kept
    #[error("Batch {batch} at offset {offset} failed ({completed} records written before it): {source}")]
    BatchFailed {
        batch: u64,
        offset: usize,
        completed: u64,
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Whether the root cause is an unreachable store.
    pub fn is_connectivity(&self) -> bool {
        match self {
            PipelineError::Graph(e) => e.is_connectivity(),
            PipelineError::BatchFailed { source, .. } => source.is_connectivity(),
            _ => false,
        }
    }
}
