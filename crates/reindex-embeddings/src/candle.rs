//! Local sentence encoder on Candle.
//!
//! Loads a BERT-family model (default `intfloat/e5-large-v2`) from the model
//! cache and embeds text as the mean of the final hidden states of its real
//! tokens; padding positions are masked out. The vector length is the
//! model's `hidden_size`.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use reindex_types::DeviceKind;

use crate::cache::{get_or_download_model, ModelCache, ModelPaths};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Upper bound on tokens fed to the model
pub const MAX_SEQ_LENGTH: usize = 512;

/// Runtime options for the embedder.
#[derive(Debug, Clone, Copy)]
pub struct EmbedderOptions {
    pub device: DeviceKind,
    /// Scale output vectors to unit length
    pub normalize: bool,
}

impl Default for EmbedderOptions {
    fn default() -> Self {
        Self {
            device: DeviceKind::Cpu,
            normalize: true,
        }
    }
}

/// The parts of `config.json` that size the output.
#[derive(Debug, Deserialize)]
struct ModelDims {
    hidden_size: usize,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

impl ModelDims {
    fn max_tokens(&self) -> usize {
        self.max_position_embeddings
            .unwrap_or(MAX_SEQ_LENGTH)
            .min(MAX_SEQ_LENGTH)
    }
}

fn select_device(kind: DeviceKind) -> Result<Device, EmbeddingError> {
    Ok(match kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Cuda => Device::new_cuda(0)?,
        DeviceKind::Metal => Device::new_metal(0)?,
    })
}

fn read_config(path: &Path) -> Result<(BertConfig, ModelDims), EmbeddingError> {
    let unusable = |reason: String| EmbeddingError::ModelFile {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path)?;
    let config: BertConfig = serde_json::from_str(&raw).map_err(|e| unusable(e.to_string()))?;
    let dims: ModelDims = serde_json::from_str(&raw).map_err(|e| unusable(e.to_string()))?;
    Ok((config, dims))
}

/// Token ids and attention mask of a batch, row-major, padded to `width`.
#[derive(Debug, PartialEq, Eq)]
struct PaddedBatch {
    ids: Vec<u32>,
    mask: Vec<u32>,
    rows: usize,
    width: usize,
}

/// Truncate every sequence to `max_tokens` and right-pad with zeros to the
/// longest remaining length.
fn pad_batch(sequences: &[(&[u32], &[u32])], max_tokens: usize) -> PaddedBatch {
    let width = sequences
        .iter()
        .map(|(ids, _)| ids.len())
        .max()
        .unwrap_or(0)
        .min(max_tokens);

    let mut batch = PaddedBatch {
        ids: Vec::with_capacity(sequences.len() * width),
        mask: Vec::with_capacity(sequences.len() * width),
        rows: sequences.len(),
        width,
    };
    for (ids, mask) in sequences {
        let len = ids.len().min(width);
        batch.ids.extend_from_slice(&ids[..len]);
        batch.ids.resize(batch.ids.len() + width - len, 0);
        batch.mask.extend_from_slice(&mask[..len]);
        batch.mask.resize(batch.mask.len() + width - len, 0);
    }
    batch
}

/// Average `hidden` (batch, tokens, dim) over the positions where `mask`
/// (batch, tokens) is 1.
fn masked_mean(hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let mask = mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.maximum(1e-9)?;
    Ok(summed.broadcast_div(&counts)?)
}

/// BERT-family encoder running in-process.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    normalize: bool,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load from the cache, fetching missing files first.
    pub fn load(cache: &ModelCache, options: EmbedderOptions) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache)?;
        Self::load_from_paths(&cache.repo_id, &paths, options)
    }

    /// Default model, platform cache, CPU.
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default(), EmbedderOptions::default())
    }

    pub fn load_from_paths(
        name: &str,
        paths: &ModelPaths,
        options: EmbedderOptions,
    ) -> Result<Self, EmbeddingError> {
        info!(model = name, device = ?options.device, "Loading embedding model...");

        let device = select_device(options.device)?;
        let (config, dims) = read_config(&paths.config)?;
        let tokenizer = Tokenizer::from_file(&paths.tokenizer).map_err(|e| {
            EmbeddingError::ModelFile {
                path: paths.tokenizer.clone(),
                reason: e.to_string(),
            }
        })?;

        // Safety: cached weights are written once, by rename, and never modified.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                std::slice::from_ref(&paths.weights),
                DType::F32,
                &device,
            )?
        };
        let model = BertModel::load(vb, &config)?;

        let info = ModelInfo {
            name: name.to_string(),
            dimension: dims.hidden_size,
            max_sequence_length: dims.max_tokens(),
        };
        info!(
            model = name,
            dim = info.dimension,
            max_tokens = info.max_sequence_length,
            normalize = options.normalize,
            "Embedding model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            normalize: options.normalize,
            info,
        })
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Encoding>, EmbeddingError> {
        self.tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))
    }
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidInput("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Special tokens are added, so even empty text has at least two.
        let encodings = self.encode(texts)?;
        let sequences: Vec<(&[u32], &[u32])> = encodings
            .iter()
            .map(|e| (e.get_ids(), e.get_attention_mask()))
            .collect();
        let batch = pad_batch(&sequences, self.info.max_sequence_length);
        debug!(texts = batch.rows, tokens = batch.width, "Encoding batch");

        let shape = (batch.rows, batch.width);
        let input_ids = Tensor::from_vec(batch.ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(batch.mask, shape, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled: Vec<Vec<f32>> = masked_mean(&hidden, &attention_mask)?.to_vec2()?;

        pooled
            .into_iter()
            .map(|values| {
                if values.len() != self.info.dimension {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.info.dimension,
                        actual: values.len(),
                    });
                }
                Ok(if self.normalize {
                    Embedding::normalized(values)
                } else {
                    Embedding::unnormalized(values)
                })
            })
            .collect()
    }
}
