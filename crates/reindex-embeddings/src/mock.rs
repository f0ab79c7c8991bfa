//! Mock embedder for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimension` buckets; the bucket counts are normalized to unit length.
/// Texts sharing tokens score higher, which is enough to exercise ranking
/// without a model download.
pub struct MockEmbedder {
    info: ModelInfo,
    calls: AtomicUsize,
    fail_on: Option<String>,
}

impl MockEmbedder {
    /// Create a new mock embedder.
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "mock-hashing".to_string(),
                dimension,
                max_sequence_length: 512,
            },
            calls: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    /// Fail every call whose text equals `text`.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on = Some(text.into());
        self
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (hash % self.info.dimension as u64) as usize
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingModel for MockEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(text) {
            return Err(EmbeddingError::InvalidInput(format!(
                "mock failure for {:?}",
                text
            )));
        }

        if self.info.dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "mock embedder dimension must be > 0".to_string(),
            ));
        }

        let mut values = vec![0.0f32; self.info.dimension];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            values[self.bucket(token)] += 1.0;
        }
        Ok(Embedding::normalized(values))
    }
}
