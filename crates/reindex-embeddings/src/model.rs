//! Embedding vectors and the model interface.

use crate::error::EmbeddingError;

/// One text embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

impl Embedding {
    /// Scale to unit length. The zero vector (e.g. from empty text) is kept.
    pub fn normalized(mut values: Vec<f32>) -> Self {
        let norm = l2_norm(&values);
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self { values }
    }

    pub fn unnormalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn norm(&self) -> f32 {
        l2_norm(&self.values)
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Cosine similarity in `[-1, 1]`.
    ///
    /// 0 when either vector is zero or the dimensions differ.
    #[cfg(test)]
    pub(crate) fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.dimension() != other.dimension() {
            return 0.0;
        }
        let (dot, a, b) = self.values.iter().zip(&other.values).fold(
            (0.0f64, 0.0f64, 0.0f64),
            |(dot, a, b), (x, y)| {
                let (x, y) = (f64::from(*x), f64::from(*y));
                (dot + x * y, a + x * x, b + y * y)
            },
        );
        if a == 0.0 || b == 0.0 {
            return 0.0;
        }
        (dot / (a.sqrt() * b.sqrt())) as f32
    }
}

/// Static facts about a loaded model.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Hub repository or other identifying name
    pub name: String,
    /// Length of every vector the model produces
    pub dimension: usize,
    /// Longer inputs are truncated to this many tokens
    pub max_sequence_length: usize,
}

/// A text encoder.
///
/// Output depends only on the text and the model, never on call history.
pub trait EmbeddingModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    /// Embed one text. Empty text still yields a vector of full dimension.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Embed several texts, in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.info().dimension
    }
}
