//! # reindex-embeddings
//!
//! Text embeddings for the movie reindexing pipeline.
//!
//! ## Features
//! - Local inference via Candle (no Python, no API)
//! - BERT-family sentence encoders, default `intfloat/e5-large-v2`
//! - CPU / CUDA / Metal placement, optional unit normalization
//! - Automatic model file caching
//! - Deterministic [`MockEmbedder`] for tests

pub mod cache;
pub mod candle;
pub mod error;
pub mod mock;
pub mod model;

pub use crate::candle::{CandleEmbedder, EmbedderOptions};
pub use cache::{
    default_cache_dir, get_or_download_model, ModelCache, ModelFile, ModelPaths,
    DEFAULT_MODEL_REPO,
};
pub use error::EmbeddingError;
pub use mock::MockEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
