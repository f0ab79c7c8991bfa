//! On-disk cache of model files fetched from the Hugging Face Hub.
//!
//! Layout: `<cache_dir>/<owner>_<name>/{config.json,tokenizer.json,model.safetensors}`.
//! Files already present are never fetched again, so once a model has been
//! cached it loads offline.

use std::fs;
use std::path::{Path, PathBuf};

use hf_hub::api::sync::ApiBuilder;
use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Model used when none is configured.
pub const DEFAULT_MODEL_REPO: &str = "intfloat/e5-large-v2";

/// The files a BERT-family encoder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    Config,
    Tokenizer,
    Weights,
}

impl ModelFile {
    pub const ALL: [ModelFile; 3] = [ModelFile::Config, ModelFile::Tokenizer, ModelFile::Weights];

    /// File name in the Hub repository and in the cache.
    pub fn file_name(self) -> &'static str {
        match self {
            ModelFile::Config => "config.json",
            ModelFile::Tokenizer => "tokenizer.json",
            ModelFile::Weights => "model.safetensors",
        }
    }
}

/// Platform cache dir for downloaded models.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("movie-reindex")
        .join("models")
}

/// Where one model's files live.
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub cache_dir: PathBuf,
    /// Hub repository, e.g. "intfloat/e5-large-v2"
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::for_repo(DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    /// Cache for `repo_id` under the platform cache dir.
    pub fn for_repo(repo_id: impl Into<String>) -> Self {
        Self::new(default_cache_dir(), repo_id)
    }

    /// Directory holding this model's files.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    pub fn path(&self, file: ModelFile) -> PathBuf {
        self.model_dir().join(file.file_name())
    }

    /// Files not yet in the cache.
    pub fn missing(&self) -> Vec<ModelFile> {
        ModelFile::ALL
            .into_iter()
            .filter(|f| !self.path(*f).exists())
            .collect()
    }

    pub fn is_cached(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Resolved paths of a cached model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelPaths {
    fn in_cache(cache: &ModelCache) -> Self {
        Self {
            config: cache.path(ModelFile::Config),
            tokenizer: cache.path(ModelFile::Tokenizer),
            weights: cache.path(ModelFile::Weights),
        }
    }
}

/// Return the model's file paths, fetching whatever is missing first.
pub fn get_or_download_model(cache: &ModelCache) -> Result<ModelPaths, EmbeddingError> {
    let missing = cache.missing();
    if missing.is_empty() {
        debug!(path = ?cache.model_dir(), "Using cached model");
    } else {
        info!(repo = %cache.repo_id, missing = missing.len(), "Fetching model files...");
        fetch(cache, &missing)?;
    }
    Ok(ModelPaths::in_cache(cache))
}

fn fetch(cache: &ModelCache, files: &[ModelFile]) -> Result<(), EmbeddingError> {
    let download_error = |file: &str, reason: String| EmbeddingError::Download {
        repo: cache.repo_id.clone(),
        file: file.to_string(),
        reason,
    };

    let api = ApiBuilder::new()
        .with_progress(false)
        .build()
        .map_err(|e| download_error("*", e.to_string()))?;
    let repo = api.model(cache.repo_id.clone());

    fs::create_dir_all(cache.model_dir())?;
    for file in files {
        let name = file.file_name();
        let fetched = repo
            .get(name)
            .map_err(|e| download_error(name, e.to_string()))?;
        install(&fetched, &cache.path(*file))?;
        info!(file = name, "Cached model file");
    }
    Ok(())
}

/// Copy under a temporary name, then rename: a cached file is always complete.
fn install(source: &Path, dest: &Path) -> Result<(), EmbeddingError> {
    let partial = dest.with_extension("partial");
    fs::copy(source, &partial)?;
    fs::rename(&partial, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_cache_uses_e5() {
        let cache = ModelCache::default();
        assert_eq!(cache.repo_id, "intfloat/e5-large-v2");
        assert!(cache.cache_dir.ends_with("movie-reindex/models"));
    }

    #[test]
    fn test_model_dir_flattens_repo() {
        let cache = ModelCache::new("/tmp/models", "intfloat/e5-large-v2");
        assert_eq!(
            cache.path(ModelFile::Weights),
            PathBuf::from("/tmp/models/intfloat_e5-large-v2/model.safetensors")
        );
    }

    #[test]
    fn test_missing_tracks_each_file() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "test/model");
        assert_eq!(cache.missing(), ModelFile::ALL.to_vec());

        fs::create_dir_all(cache.model_dir()).unwrap();
        fs::write(cache.path(ModelFile::Config), "{}").unwrap();
        fs::write(cache.path(ModelFile::Tokenizer), "{}").unwrap();
        assert_eq!(cache.missing(), vec![ModelFile::Weights]);
        assert!(!cache.is_cached());

        fs::write(cache.path(ModelFile::Weights), b"").unwrap();
        assert!(cache.is_cached());
    }

    #[test]
    fn test_cached_model_resolves_without_network() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "test/model");
        fs::create_dir_all(cache.model_dir()).unwrap();
        for file in ModelFile::ALL {
            fs::write(cache.path(file), b"x").unwrap();
        }

        let paths = get_or_download_model(&cache).unwrap();
        assert_eq!(paths.config, cache.model_dir().join("config.json"));
        assert_eq!(paths.tokenizer, cache.model_dir().join("tokenizer.json"));
        assert_eq!(paths.weights, cache.model_dir().join("model.safetensors"));
    }

    #[test]
    fn test_install_leaves_no_partial_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("blob");
        let dest = temp.path().join("config.json");
        fs::write(&source, "{\"hidden_size\": 8}").unwrap();

        install(&source, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "{\"hidden_size\": 8}");
        assert!(!temp.path().join("config.partial").exists());
    }
}
