//! Graph store trait.
//!
//! The pipeline talks to the graph only through these operations. Every
//! write is an overwrite keyed by the record identifier, so any step can be
//! repeated after a crash.

use async_trait::async_trait;

use reindex_types::{IndexDefinition, RecordRow, RecordSchema, ScoredRecord};

use crate::error::GraphError;

/// Capability interface over a graph database with vector indexes.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Round-trip a trivial statement to confirm the store is reachable.
    async fn ping(&self) -> Result<(), GraphError>;

    /// Give every record lacking an identifier a fresh UUID.
    ///
    /// Returns the number of records that received one. Records that
    /// already have an identifier are never touched.
    async fn assign_missing_identifiers(&self, schema: &RecordSchema) -> Result<u64, GraphError>;

    /// Read one page of (identifier, text), ordered by identifier.
    async fn fetch_page(
        &self,
        schema: &RecordSchema,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RecordRow>, GraphError>;

    /// Overwrite `property` with `vector` on the record matched by `identifier`.
    ///
    /// Returns `false` when no record matched.
    async fn write_vector(
        &self,
        schema: &RecordSchema,
        identifier: &str,
        property: &str,
        vector: &[f32],
    ) -> Result<bool, GraphError>;

    /// Whether an index (of any kind) with this name exists.
    async fn index_exists(&self, name: &str) -> Result<bool, GraphError>;

    /// All vector indexes in the store.
    async fn list_vector_indexes(&self) -> Result<Vec<IndexDefinition>, GraphError>;

    /// Drop the named index. Returns `false` if it did not exist.
    async fn drop_index(&self, name: &str) -> Result<bool, GraphError>;

    /// Create a vector index. Fails with [`GraphError::IndexAlreadyExists`]
    /// if the name is taken.
    async fn create_vector_index(&self, definition: &IndexDefinition) -> Result<(), GraphError>;

    /// Top-`k` nearest neighbours of `vector` in the named index, best first.
    async fn query_nodes(
        &self,
        schema: &RecordSchema,
        index_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRecord>, GraphError>;
}
