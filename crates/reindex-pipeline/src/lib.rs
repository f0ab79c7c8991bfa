//! # reindex-pipeline
//!
//! Re-embeds every movie plot in the graph and moves similarity search onto
//! a fresh vector index.
//!
//! ## Stages
//!
//! 1. Identifier backfill: give every record a stable UUID.
//! 2. Embedding backfill: page through records, embed their text and write
//!    the vector to a property named after the embedding dimension.
//! 3. Index migration: drop the previous index and create one over the new
//!    property.
//! 4. Verification: embed a sample query and log the nearest records.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reindex_embeddings::MockEmbedder;
//! use reindex_graph::InMemoryGraphStore;
//! use reindex_pipeline::{LoggingProgressCallback, ReindexConfig, ReindexPipeline};
//!
//! # async fn example() -> Result<(), reindex_pipeline::PipelineError> {
//! let store = InMemoryGraphStore::new();
//! let embedder = MockEmbedder::new(64);
//! let report = ReindexPipeline::new(&store, &embedder, ReindexConfig::new(64))
//!     .run(&LoggingProgressCallback)
//!     .await?;
//! println!("embedded {}", report.embedding.records_embedded);
//! # Ok(())
//! # }
//! ```

pub mod backfill;
pub mod config;
pub mod embed;
pub mod error;
pub mod migration;
pub mod pipeline;
pub mod verify;

pub use backfill::backfill_identifiers;
pub use config::{
    ReindexConfig, DEFAULT_BATCH_SIZE, DEFAULT_INDEX_BASE, DEFAULT_SAMPLE_QUERY, DEFAULT_TOP_K,
};
pub use embed::{
    backfill_embeddings, EmbedProgress, LoggingProgressCallback, NoOpProgressCallback,
    ProgressCallback,
};
pub use error::PipelineError;
pub use migration::{migrate_index, MigrationOutcome};
pub use pipeline::{PipelineReport, ReindexPipeline};
pub use verify::{search, verify};
