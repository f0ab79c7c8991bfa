//! Similarity search against the current index.

use tracing::info;

use reindex_embeddings::EmbeddingModel;
use reindex_graph::GraphStore;
use reindex_types::{validate_identifier, RecordSchema, ScoredRecord};

use crate::config::ReindexConfig;
use crate::error::PipelineError;

/// Embed `text` and return the `k` nearest records in `index_name`.
///
/// Results are ordered by descending score.
pub async fn search<S, E>(
    store: &S,
    embedder: &E,
    schema: &RecordSchema,
    index_name: &str,
    text: &str,
    k: usize,
) -> Result<Vec<ScoredRecord>, PipelineError>
where
    S: GraphStore + ?Sized,
    E: EmbeddingModel + ?Sized,
{
    validate_identifier(index_name)?;
    let embedding = embedder.embed(text)?;
    Ok(store
        .query_nodes(schema, index_name, &embedding.values, k)
        .await?)
}

/// Run the configured sample query against the new index and log the hits.
pub async fn verify<S, E>(
    store: &S,
    embedder: &E,
    config: &ReindexConfig,
) -> Result<Vec<ScoredRecord>, PipelineError>
where
    S: GraphStore + ?Sized,
    E: EmbeddingModel + ?Sized,
{
    let results = search(
        store,
        embedder,
        &config.schema,
        &config.index_name,
        &config.sample_query,
        config.top_k,
    )
    .await?;

    info!(
        query = %config.sample_query,
        index = %config.index_name,
        hits = results.len(),
        "Verification query complete"
    );
    for (rank, hit) in results.iter().enumerate() {
        info!(
            rank = rank + 1,
            title = hit.title.as_deref().unwrap_or("<untitled>"),
            score = hit.score,
            "Match"
        );
    }
    Ok(results)
}
