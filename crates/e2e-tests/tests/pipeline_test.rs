//! End-to-end pipeline tests for movie-reindex.
//!
//! Full run: identifier backfill -> embedding backfill -> index migration ->
//! verification query, plus the idempotence and pagination guarantees each
//! stage gives on its own.

use pretty_assertions::assert_eq;

use e2e_tests::{TestHarness, SAMPLE_PLOTS, TEST_DIMENSION};
use reindex_embeddings::{EmbeddingModel, MockEmbedder};
use reindex_graph::{GraphError, GraphStore};
use reindex_pipeline::{
    backfill_embeddings, backfill_identifiers, migrate_index, search, verify, NoOpProgressCallback,
    PipelineError, ReindexPipeline,
};
use reindex_types::IndexDefinition;

/// Three plots, batch size 2, k = 1: the toys plot ranks first.
#[tokio::test]
async fn test_full_pipeline_toys_query_ranks_toy_story_first() {
    let harness = TestHarness::with_sample_plots();
    let config = harness.config().with_batch_size(2).with_top_k(1);

    let report = ReindexPipeline::new(&harness.store, &harness.embedder, config)
        .run(&NoOpProgressCallback)
        .await
        .unwrap();

    assert_eq!(report.identifiers_assigned, 3);
    assert_eq!(report.embedding.records_embedded, 3);
    assert_eq!(report.embedding.pages, 2);
    assert!(report.embedding.completed);
    assert_eq!(report.migration.created.name, format!("moviePlots_{}", TEST_DIMENSION));

    let hits = report.verification.expect("verification enabled by default");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title.as_deref(), Some("Toy Story"));
    assert_eq!(hits[0].text.as_deref(), Some("toys come alive"));
    assert!(hits[0].identifier.is_some());
}

#[tokio::test]
async fn test_identifier_backfill_is_idempotent() {
    let harness = TestHarness::with_sample_plots();

    assert_eq!(backfill_identifiers(&harness.store, &harness.schema).await.unwrap(), 3);
    let first = harness.identifiers();

    assert_eq!(backfill_identifiers(&harness.store, &harness.schema).await.unwrap(), 0);
    let second = harness.identifiers();

    assert_eq!(first, second);
    assert!(first.iter().all(Option::is_some));
}

#[tokio::test]
async fn test_new_records_get_identifiers_on_rerun() {
    let harness = TestHarness::with_sample_plots();
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();
    let before = harness.identifiers();

    harness
        .store
        .insert_record(&harness.schema, Some("Alien"), Some("a creature stalks a ship"));
    assert_eq!(backfill_identifiers(&harness.store, &harness.schema).await.unwrap(), 1);

    let after = harness.identifiers();
    assert_eq!(&after[..3], &before[..]);
    assert!(after[3].is_some());
}

#[tokio::test]
async fn test_embedding_backfill_is_idempotent() {
    let harness = TestHarness::with_sample_plots();
    let config = harness.config();
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

    backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
        .await
        .unwrap();
    let first = harness.store.nodes();

    let progress =
        backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
            .await
            .unwrap();
    let second = harness.store.nodes();

    assert_eq!(progress.records_embedded, 3);
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

/// N records, batch B: every record visited exactly once over ceil(N/B) pages.
#[tokio::test]
async fn test_pagination_visits_every_record_once() {
    for (count, batch) in [(23usize, 5usize), (10, 5), (1, 1), (4, 3)] {
        let harness = TestHarness::with_generated_plots(count);
        let config = harness.config().with_batch_size(batch);
        backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

        let progress =
            backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
                .await
                .unwrap();

        assert_eq!(progress.records_embedded, count as u64, "N={count} B={batch}");
        assert_eq!(progress.pages, count.div_ceil(batch) as u64, "N={count} B={batch}");
        assert_eq!(harness.embedder.calls(), count, "N={count} B={batch}");
        assert_eq!(harness.vectors_written(&config.vector_property), count);
    }
}

#[tokio::test]
async fn test_empty_store_makes_no_embedding_calls() {
    let harness = TestHarness::new();
    let config = harness.config();

    let progress =
        backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
            .await
            .unwrap();

    assert_eq!(progress.pages, 0);
    assert!(progress.completed);
    assert_eq!(harness.embedder.calls(), 0);
}

#[tokio::test]
async fn test_batch_larger_than_store_is_one_page() {
    let harness = TestHarness::with_sample_plots();
    let config = harness.config().with_batch_size(1000);
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

    let progress =
        backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
            .await
            .unwrap();

    assert_eq!(progress.pages, 1);
    assert_eq!(progress.records_embedded, 3);
}

#[tokio::test]
async fn test_record_without_plot_gets_full_width_vector() {
    let harness = TestHarness::with_sample_plots();
    harness.store.insert_record(&harness.schema, Some("Untitled Project"), None);
    let config = harness.config();
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

    let progress =
        backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
            .await
            .unwrap();

    assert_eq!(progress.empty_text, 1);
    assert_eq!(progress.records_embedded, 4);
    assert_eq!(harness.vectors_written(&config.vector_property), 4);
}

/// After migration exactly one index carries the new name and the old one is gone.
#[tokio::test]
async fn test_migration_replaces_legacy_index() {
    let harness = TestHarness::with_sample_plots();
    harness
        .store
        .create_vector_index(&IndexDefinition::new("moviePlots", "Movie", "embedding", 1536))
        .await
        .unwrap();

    let config = harness.config();
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();
    backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
        .await
        .unwrap();
    let outcome = migrate_index(&harness.store, &config).await.unwrap();

    assert_eq!(outcome.dropped, vec!["moviePlots".to_string()]);
    assert_eq!(harness.store.index_names(), vec![config.index_name.clone()]);

    let err = search(
        &harness.store,
        &harness.embedder,
        &harness.schema,
        "moviePlots",
        "Toys coming alive",
        1,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::Graph(GraphError::IndexNotFound(_))));

    let hits = verify(&harness.store, &harness.embedder, &config).await.unwrap();
    assert_eq!(hits.len(), SAMPLE_PLOTS.len());
}

/// A model change writes a new property and moves search onto a new index.
#[tokio::test]
async fn test_model_change_creates_new_generation() {
    let harness = TestHarness::with_sample_plots();
    ReindexPipeline::new(&harness.store, &harness.embedder, harness.config())
        .with_verify(false)
        .run(&NoOpProgressCallback)
        .await
        .unwrap();

    let smaller = MockEmbedder::new(128);
    let config = reindex_pipeline::ReindexConfig::new(smaller.dimension())
        .with_legacy_index_names(vec![
            "moviePlots".to_string(),
            format!("moviePlots_{}", TEST_DIMENSION),
        ])
        .with_top_k(1);

    let report = ReindexPipeline::new(&harness.store, &smaller, config)
        .run(&NoOpProgressCallback)
        .await
        .unwrap();

    assert_eq!(report.identifiers_assigned, 0);
    assert_eq!(
        report.migration.dropped,
        vec![format!("moviePlots_{}", TEST_DIMENSION)]
    );
    assert_eq!(harness.store.index_names(), vec!["moviePlots_128".to_string()]);

    // Both generations of vectors remain on the records.
    for node in harness.store.nodes() {
        assert_eq!(node.vector("embedding_128").map(<[f32]>::len), Some(128));
        assert_eq!(
            node.vector(&format!("embedding_{}", TEST_DIMENSION)).map(<[f32]>::len),
            Some(TEST_DIMENSION)
        );
    }

    let hits = report.verification.unwrap();
    assert_eq!(hits[0].title.as_deref(), Some("Toy Story"));
}

#[tokio::test]
async fn test_full_pipeline_rerun_is_stable() {
    let harness = TestHarness::with_sample_plots();
    let pipeline = ReindexPipeline::new(&harness.store, &harness.embedder, harness.config())
        .with_verify(false);

    pipeline.run(&NoOpProgressCallback).await.unwrap();
    let ids = harness.paged_identifiers().await;
    let nodes = harness.store.nodes();

    let second = pipeline.run(&NoOpProgressCallback).await.unwrap();

    assert_eq!(second.identifiers_assigned, 0);
    assert_eq!(harness.paged_identifiers().await, ids);
    assert_eq!(harness.store.nodes(), nodes);
    assert_eq!(harness.store.index_names().len(), 1);
}
