//! End-to-end test infrastructure for movie-reindex.
//!
//! Provides a shared TestHarness: an in-memory graph seeded with movie
//! records and a deterministic embedder, so every pipeline stage can run
//! without Neo4j or a model download.

use reindex_embeddings::MockEmbedder;
use reindex_graph::{GraphStore, InMemoryGraphStore};
use reindex_pipeline::ReindexConfig;
use reindex_types::RecordSchema;

/// Embedding dimension used by the harness.
///
/// Wide enough that the sample plots' tokens land in distinct buckets.
pub const TEST_DIMENSION: usize = 256;

/// Three plots whose nearest neighbour for "Toys coming alive" is known.
pub const SAMPLE_PLOTS: [(&str, &str); 3] = [
    ("Toy Story", "toys come alive"),
    ("Jaws", "a shark terrorizes a beach town"),
    ("WALL-E", "a robot falls in love"),
];

/// Shared test harness for E2E tests.
pub struct TestHarness {
    pub store: InMemoryGraphStore,
    pub embedder: MockEmbedder,
    pub schema: RecordSchema,
}

impl TestHarness {
    /// Empty store, default schema.
    pub fn new() -> Self {
        Self {
            store: InMemoryGraphStore::new(),
            embedder: MockEmbedder::new(TEST_DIMENSION),
            schema: RecordSchema::default(),
        }
    }

    /// Store seeded with [`SAMPLE_PLOTS`].
    pub fn with_sample_plots() -> Self {
        let harness = Self::new();
        for (title, plot) in SAMPLE_PLOTS {
            harness.store.insert_record(&harness.schema, Some(title), Some(plot));
        }
        harness
    }

    /// Store seeded with `count` generated plots.
    pub fn with_generated_plots(count: usize) -> Self {
        let harness = Self::new();
        for (title, plot) in create_test_plots(count) {
            harness
                .store
                .insert_record(&harness.schema, Some(&title), Some(&plot));
        }
        harness
    }

    /// Pipeline config matching the harness embedder.
    pub fn config(&self) -> ReindexConfig {
        ReindexConfig::new(TEST_DIMENSION).with_schema(self.schema.clone())
    }

    /// Identifiers in store order; `None` for records without one.
    pub fn identifiers(&self) -> Vec<Option<String>> {
        self.store
            .nodes()
            .iter()
            .map(|n| n.text(&self.schema.id_property).map(str::to_string))
            .collect()
    }

    /// Identifiers in page order (ascending).
    pub async fn paged_identifiers(&self) -> Vec<String> {
        let rows = self
            .store
            .fetch_page(&self.schema, 0, usize::MAX)
            .await
            .expect("in-memory fetch cannot fail");
        rows.into_iter().filter_map(|r| r.identifier).collect()
    }

    /// Number of records carrying a vector of the configured dimension.
    pub fn vectors_written(&self, property: &str) -> usize {
        self.store
            .nodes()
            .iter()
            .filter(|n| n.vector(property).map(<[f32]>::len) == Some(TEST_DIMENSION))
            .count()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Create N distinct (title, plot) pairs.
pub fn create_test_plots(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| {
            (
                format!("Movie {}", i),
                format!("plot number {} about subject{}", i, i % 7),
            )
        })
        .collect()
}
