//! Error path E2E tests for movie-reindex.
//!
//! Connectivity loss, partial batch failure, index naming conflicts and bad
//! configuration must each surface as a typed error, never a panic, and
//! must leave completed work in place.

use pretty_assertions::assert_eq;

use e2e_tests::{TestHarness, TEST_DIMENSION};
use reindex_embeddings::{EmbeddingError, MockEmbedder};
use reindex_graph::{GraphError, GraphStore};
use reindex_pipeline::{
    backfill_embeddings, backfill_identifiers, migrate_index, NoOpProgressCallback, PipelineError,
    ReindexPipeline,
};
use reindex_types::{IndexDefinition, RecordSchema};

#[tokio::test]
async fn test_unreachable_store_aborts_before_any_work() {
    let harness = TestHarness::with_sample_plots();
    harness.store.set_unreachable(true);

    let err = ReindexPipeline::new(&harness.store, &harness.embedder, harness.config())
        .run(&NoOpProgressCallback)
        .await
        .unwrap_err();

    assert!(err.is_connectivity(), "expected connectivity error, got {err}");
    assert_eq!(harness.embedder.calls(), 0);

    harness.store.set_unreachable(false);
    assert!(harness.identifiers().iter().all(Option::is_none));
}

/// A failing write in batch 2 keeps batch 1's vectors and reports where it stopped.
#[tokio::test]
async fn test_partial_batch_failure_keeps_earlier_batches() {
    let harness = TestHarness::with_generated_plots(5);
    let config = harness.config().with_batch_size(2);
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

    let ordered = harness.paged_identifiers().await;
    harness.store.fail_writes_for(ordered[2].clone());

    let err = backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
        .await
        .unwrap_err();

    match &err {
        PipelineError::BatchFailed {
            batch,
            offset,
            completed,
            source,
        } => {
            assert_eq!(*batch, 2);
            assert_eq!(*offset, 2);
            assert_eq!(*completed, 2);
            assert!(matches!(**source, PipelineError::Graph(GraphError::Query(_))));
        }
        other => panic!("expected BatchFailed, got {other}"),
    }

    for node in harness.store.nodes() {
        let id = node.text("uuid").map(str::to_string);
        let has_vector = node.vector(&config.vector_property).is_some();
        let expected = id.as_ref() == Some(&ordered[0]) || id.as_ref() == Some(&ordered[1]);
        assert_eq!(has_vector, expected, "record {:?}", id);
    }
}

#[tokio::test]
async fn test_rerun_after_partial_failure_completes() {
    let harness = TestHarness::with_generated_plots(5);
    let config = harness.config().with_batch_size(2);
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

    let failing = MockEmbedder::new(TEST_DIMENSION).failing_on("plot number 3 about subject3");
    assert!(
        backfill_embeddings(&harness.store, &failing, &config, &NoOpProgressCallback)
            .await
            .is_err()
    );

    let progress =
        backfill_embeddings(&harness.store, &harness.embedder, &config, &NoOpProgressCallback)
            .await
            .unwrap();
    assert_eq!(progress.records_embedded, 5);
    assert_eq!(harness.vectors_written(&config.vector_property), 5);
}

#[tokio::test]
async fn test_embedder_failure_is_wrapped_in_batch_error() {
    let harness = TestHarness::with_sample_plots();
    let embedder = MockEmbedder::new(TEST_DIMENSION).failing_on("a robot falls in love");
    let config = harness.config().with_batch_size(1);
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();

    let err = backfill_embeddings(&harness.store, &embedder, &config, &NoOpProgressCallback)
        .await
        .unwrap_err();

    match err {
        PipelineError::BatchFailed { source, .. } => {
            assert!(matches!(
                *source,
                PipelineError::Embedding(EmbeddingError::InvalidInput(_))
            ));
        }
        other => panic!("expected BatchFailed, got {other}"),
    }
}

#[tokio::test]
async fn test_embedding_without_identifier_backfill_fails() {
    let harness = TestHarness::with_sample_plots();

    let err = backfill_embeddings(
        &harness.store,
        &harness.embedder,
        &harness.config(),
        &NoOpProgressCallback,
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("no identifier"), "got: {err}");
    assert_eq!(harness.embedder.calls(), 0);
}

#[tokio::test]
async fn test_creating_existing_index_fails() {
    let harness = TestHarness::new();
    let def = IndexDefinition::new("moviePlots_256", "Movie", "embedding_256", TEST_DIMENSION);
    harness.store.create_vector_index(&def).await.unwrap();

    let err = harness.store.create_vector_index(&def).await.unwrap_err();
    assert!(matches!(err, GraphError::IndexAlreadyExists(ref name) if name == "moviePlots_256"));

    // Migration drops it first, so it succeeds.
    let outcome = migrate_index(&harness.store, &harness.config()).await.unwrap();
    assert_eq!(outcome.dropped, vec!["moviePlots_256".to_string()]);
}

#[tokio::test]
async fn test_embedder_dimension_must_match_config() {
    let harness = TestHarness::with_sample_plots();
    backfill_identifiers(&harness.store, &harness.schema).await.unwrap();
    let embedder = MockEmbedder::new(64);

    let err = backfill_embeddings(
        &harness.store,
        &embedder,
        &harness.config(),
        &NoOpProgressCallback,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::DimensionMismatch {
            expected: TEST_DIMENSION,
            actual: 64
        }
    ));
}

#[tokio::test]
async fn test_injection_in_schema_names_rejected() {
    let harness = TestHarness::with_sample_plots();
    let schema = RecordSchema {
        text_property: "plot} RETURN n //".to_string(),
        ..RecordSchema::default()
    };

    let err = backfill_identifiers(&harness.store, &schema).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(harness.identifiers().iter().all(Option::is_none));
}

#[tokio::test]
async fn test_zero_batch_size_rejected() {
    let harness = TestHarness::with_sample_plots();
    let err = ReindexPipeline::new(
        &harness.store,
        &harness.embedder,
        harness.config().with_batch_size(0),
    )
    .run(&NoOpProgressCallback)
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
    assert!(harness.identifiers().iter().all(Option::is_none));
}
