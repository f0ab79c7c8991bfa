//! # reindex-types
//!
//! Shared domain types for the movie reindexing pipeline.
//!
//! - Records: graph nodes with a stable identifier, a text field and
//!   per-generation vector properties
//! - Vector index definitions
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use reindex_types::{RecordSchema, Settings};
//!
//! let settings = Settings::default();
//! assert_eq!(settings.schema, RecordSchema::default());
//! ```

pub mod config;
pub mod error;
pub mod record;

pub use config::{
    read_dotenv, DeviceKind, EmbeddingSettings, IndexSettings, PipelineSettings, Settings,
    StoreSettings, DOTENV_FILE,
};
pub use error::ReindexError;
pub use record::{
    index_name_for_dimension, validate_identifier, vector_property_for_dimension,
    IndexDefinition, RecordRow, RecordSchema, ScoredRecord, SimilarityMetric,
};
