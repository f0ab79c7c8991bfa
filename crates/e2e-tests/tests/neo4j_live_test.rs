//! Live Neo4j test.
//!
//! Runs the whole pipeline against a real server using a throwaway label and
//! index, then removes both. Reads NEO4J_URI / NEO4J_USERNAME / NEO4J_PASSWORD.
//!
//! ```bash
//! NEO4J_URI=neo4j://localhost:7687 NEO4J_PASSWORD=secret \
//!     cargo test -p e2e-tests --test neo4j_live_test -- --ignored
//! ```

use neo4rs::{query, Graph};
use pretty_assertions::assert_eq;

use e2e_tests::{SAMPLE_PLOTS, TEST_DIMENSION};
use reindex_embeddings::MockEmbedder;
use reindex_graph::{GraphError, GraphStore, Neo4jGraphStore};
use reindex_pipeline::{search, NoOpProgressCallback, PipelineError, ReindexConfig, ReindexPipeline};
use reindex_types::{RecordSchema, Settings};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::test]
#[ignore = "requires a running Neo4j 5.x server"]
async fn test_pipeline_against_live_neo4j() {
    let uri = env_or("NEO4J_URI", "neo4j://localhost:7687");
    let user = env_or("NEO4J_USERNAME", "neo4j");
    let password = env_or("NEO4J_PASSWORD", "neo4j");
    let graph = Graph::new(uri.clone(), user.clone(), password.clone())
        .await
        .expect("connect to Neo4j");

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let label = format!("ReindexE2E_{}", &suffix[..8]);
    let index_name = format!("reindexE2E_{}", &suffix[..8]);
    let schema = RecordSchema {
        label: label.clone(),
        ..RecordSchema::default()
    };

    for (title, plot) in SAMPLE_PLOTS {
        graph
            .run(
                query(&format!("CREATE (:`{}` {{title: $title, plot: $plot}})", label))
                    .param("title", title)
                    .param("plot", plot),
            )
            .await
            .expect("seed record");
    }

    let mut settings = Settings::default();
    settings.apply_neo4j_env(|key| std::env::var(key).ok());
    let store = Neo4jGraphStore::connect(&settings.store)
        .await
        .expect("connect store");

    let embedder = MockEmbedder::new(TEST_DIMENSION);
    let config = ReindexConfig::new(TEST_DIMENSION)
        .with_schema(schema.clone())
        .with_index_name(index_name.clone())
        .with_legacy_index_names(Vec::new())
        .with_batch_size(2)
        .with_top_k(1);

    let result = ReindexPipeline::new(&store, &embedder, config)
        .run(&NoOpProgressCallback)
        .await;

    // Neo4j populates vector indexes asynchronously; give it a moment before
    // querying again.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    let again = search(&store, &embedder, &schema, &index_name, "Toys coming alive", 1).await;
    let missing = search(&store, &embedder, &schema, "reindexE2E_missing", "x", 1).await;

    graph
        .run(query(&format!("MATCH (n:`{}`) DETACH DELETE n", label)))
        .await
        .expect("cleanup records");
    store.drop_index(&index_name).await.expect("cleanup index");

    let report = result.expect("pipeline run");
    assert_eq!(report.identifiers_assigned, 3);
    assert_eq!(report.embedding.records_embedded, 3);
    assert_eq!(report.embedding.pages, 2);

    let hits = again.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title.as_deref(), Some("Toy Story"));

    assert!(matches!(
        missing,
        Err(PipelineError::Graph(GraphError::IndexNotFound(_)))
    ));
}
