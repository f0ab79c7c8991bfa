//! Errors raised while fetching, loading or running an embedding model.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Tensor or device failure inside Candle
    #[error("Inference failed: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenization failed: {0}")]
    Tokenizer(String),

    /// A cached model file exists but cannot be used
    #[error("Unusable model file {}: {reason}", path.display())]
    ModelFile { path: PathBuf, reason: String },

    /// Fetching a file from the Hub failed
    #[error("Could not fetch {file} from {repo}: {reason}")]
    Download {
        repo: String,
        file: String,
        reason: String,
    },

    #[error("Model cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model produced {actual}-dimensional vectors, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
