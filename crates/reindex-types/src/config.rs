//! Configuration loading for movie-reindex.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The `NEO4J_*` variables are applied on top of the `REINDEX_*` ones. They
//! are read from the process environment first, then from a `.env` file in
//! the working directory.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ReindexError;
use crate::record::{
    index_name_for_dimension, validate_identifier, vector_property_for_dimension, RecordSchema,
};

/// Graph store connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Bolt URI (e.g. "neo4j://localhost:7687")
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_username")]
    pub username: String,

    /// Password, never logged
    #[serde(default = "default_password")]
    pub password: SecretString,

    /// Database name; `None` uses the server default
    #[serde(default)]
    pub database: Option<String>,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Rows fetched per pull from the server
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "neo4j://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_password() -> SecretString {
    SecretString::from(String::new())
}

fn default_max_connections() -> usize {
    4
}

fn default_fetch_size() -> usize {
    200
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: default_password(),
            database: None,
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Device the embedding model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

/// Embedding model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    /// Hugging Face repository of the model
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model cache directory; `None` uses the platform cache dir
    #[serde(default)]
    pub cache_dir: Option<String>,

    #[serde(default)]
    pub device: DeviceKind,

    /// Normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_model_repo() -> String {
    "intfloat/e5-large-v2".to_string()
}

fn default_normalize() -> bool {
    true
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_repo: default_model_repo(),
            cache_dir: None,
            device: DeviceKind::default(),
            normalize: default_normalize(),
        }
    }
}

/// Vector index naming.
///
/// The index name and vector property default to names derived from the
/// embedding dimension, so a model change produces a new generation.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
    /// Prefix of derived index names
    #[serde(default = "default_index_base_name")]
    pub base_name: String,

    /// Explicit index name, overriding the derived one
    #[serde(default)]
    pub name: Option<String>,

    /// Explicit vector property, overriding the derived one
    #[serde(default)]
    pub vector_property: Option<String>,

    /// Indexes of earlier generations to drop during migration
    #[serde(default = "default_legacy_names")]
    pub legacy_names: Vec<String>,
}

fn default_index_base_name() -> String {
    "moviePlots".to_string()
}

fn default_legacy_names() -> Vec<String> {
    vec!["moviePlots".to_string()]
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            base_name: default_index_base_name(),
            name: None,
            vector_property: None,
            legacy_names: default_legacy_names(),
        }
    }
}

impl IndexSettings {
    /// Index name for a model of the given dimension.
    pub fn index_name(&self, dimension: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| index_name_for_dimension(&self.base_name, dimension))
    }

    /// Vector property for a model of the given dimension.
    pub fn vector_property(&self, dimension: usize) -> String {
        self.vector_property
            .clone()
            .unwrap_or_else(|| vector_property_for_dimension(dimension))
    }
}

/// Pipeline knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Records per page during embedding backfill
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Text used for the verification query
    #[serde(default = "default_sample_query")]
    pub sample_query: String,

    /// Results returned by the verification query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_batch_size() -> usize {
    50
}

fn default_sample_query() -> String {
    "Toys coming alive".to_string()
}

fn default_top_k() -> usize {
    5
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            sample_query: default_sample_query(),
            top_k: default_top_k(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub schema: RecordSchema,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            schema: RecordSchema::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            pipeline: PipelineSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/movie-reindex/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (REINDEX_*, nested with `__`)
    /// 5. NEO4J_URI / NEO4J_USERNAME / NEO4J_PASSWORD / NEO4J_DATABASE, from
    ///    the environment or else from `./.env`
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ReindexError> {
        Self::load_with_dotenv(cli_config_path, Path::new(DOTENV_FILE))
    }

    /// Like [`Settings::load`], reading `NEO4J_*` fallbacks from `dotenv_path`.
    pub fn load_with_dotenv(
        cli_config_path: Option<&str>,
        dotenv_path: &Path,
    ) -> Result<Self, ReindexError> {
        let config_dir = ProjectDirs::from("", "", "movie-reindex")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| ReindexError::Config(e.to_string()))?
            .set_default("store.uri", default_uri())
            .map_err(|e| ReindexError::Config(e.to_string()))?
            .set_default("pipeline.batch_size", default_batch_size() as i64)
            .map_err(|e| ReindexError::Config(e.to_string()))?
            .set_default("pipeline.top_k", default_top_k() as i64)
            .map_err(|e| ReindexError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: REINDEX_STORE__URI, REINDEX_PIPELINE__BATCH_SIZE, ...
        builder = builder.add_source(
            Environment::with_prefix("REINDEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ReindexError::Config(e.to_string()))?;

        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| ReindexError::Config(e.to_string()))?;

        let dotenv = read_dotenv(dotenv_path)?;
        settings.apply_neo4j_env(|key| {
            std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
        });
        Ok(settings)
    }

    /// Apply the conventional `NEO4J_*` variables.
    pub fn apply_neo4j_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("NEO4J_URI") {
            self.store.uri = uri;
        }
        if let Some(username) = lookup("NEO4J_USERNAME") {
            self.store.username = username;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.store.password = SecretString::from(password);
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.store.database = Some(database);
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ReindexError> {
        self.schema.validate()?;
        validate_identifier(&self.index.base_name)?;
        if let Some(name) = &self.index.name {
            validate_identifier(name)?;
        }
        if let Some(property) = &self.index.vector_property {
            validate_identifier(property)?;
        }
        for name in &self.index.legacy_names {
            validate_identifier(name)?;
        }
        if self.pipeline.batch_size == 0 {
            return Err(ReindexError::Config("pipeline.batch_size must be > 0".to_string()));
        }
        if self.pipeline.top_k == 0 {
            return Err(ReindexError::Config("pipeline.top_k must be > 0".to_string()));
        }
        if self.store.uri.trim().is_empty() {
            return Err(ReindexError::Config("store.uri must not be empty".to_string()));
        }
        Ok(())
    }

    /// Configured model cache directory. `None` means the caller picks the
    /// platform default.
    pub fn model_cache_dir(&self) -> Option<PathBuf> {
        self.embedding.cache_dir.as_ref().map(PathBuf::from)
    }
}

/// Dotenv file looked up in the working directory.
pub const DOTENV_FILE: &str = ".env";

/// Read `KEY=value` pairs from a dotenv file. A missing file yields none.
///
/// The process environment is left untouched.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ReindexError> {
    let invalid = |e: dotenvy::Error| {
        ReindexError::Config(format!("Invalid dotenv file {}: {}", path.display(), e))
    };
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(invalid(e)),
    };
    entries.map(|entry| entry.map_err(invalid)).collect()
}
