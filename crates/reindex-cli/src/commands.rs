//! Command implementations for movie-reindex.
//!
//! Every command loads settings, connects to the store, and for the stages
//! that embed text, loads the model before touching the graph.

use anyhow::{Context, Result};
use tracing::info;

use reindex_embeddings::{
    default_cache_dir, CandleEmbedder, EmbedderOptions, EmbeddingModel, ModelCache,
};
use reindex_graph::{GraphStore, Neo4jGraphStore};
use reindex_pipeline::{
    backfill_embeddings, backfill_identifiers, migrate_index, search, LoggingProgressCallback,
    ReindexConfig, ReindexPipeline,
};
use reindex_types::{IndexDefinition, ScoredRecord, Settings};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

async fn connect(settings: &Settings) -> Result<Neo4jGraphStore> {
    Neo4jGraphStore::connect(&settings.store)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.store.uri))
}

async fn load_embedder(settings: &Settings) -> Result<CandleEmbedder> {
    let cache_dir = settings.model_cache_dir().unwrap_or_else(default_cache_dir);
    let cache = ModelCache::new(cache_dir, settings.embedding.model_repo.clone());
    let options = EmbedderOptions {
        device: settings.embedding.device,
        normalize: settings.embedding.normalize,
    };

    // Model loading is CPU-bound and may download files.
    let embedder = tokio::task::spawn_blocking(move || CandleEmbedder::load(&cache, options))
        .await
        .context("Model loading task failed")?
        .context("Failed to load embedding model")?;

    info!(
        model = %embedder.info().name,
        dim = embedder.dimension(),
        "Embedding model ready"
    );
    Ok(embedder)
}

fn pipeline_config(
    settings: &Settings,
    dimension: usize,
    batch_size: Option<usize>,
) -> ReindexConfig {
    let config = ReindexConfig::from_settings(settings, dimension);
    match batch_size {
        Some(size) => config.with_batch_size(size),
        None => config,
    }
}

/// Run every stage.
pub async fn run_reindex(
    settings: &Settings,
    batch_size: Option<usize>,
    skip_verify: bool,
) -> Result<()> {
    let embedder = load_embedder(settings).await?;
    let store = connect(settings).await?;
    let config = pipeline_config(settings, embedder.dimension(), batch_size);

    let report = ReindexPipeline::new(&store, &embedder, config)
        .with_verify(!skip_verify)
        .run(&LoggingProgressCallback)
        .await
        .context("Reindex failed")?;

    println!("Identifiers assigned: {}", report.identifiers_assigned);
    println!(
        "Records embedded:     {} ({} pages, {} empty text, {} skipped)",
        report.embedding.records_embedded,
        report.embedding.pages,
        report.embedding.empty_text,
        report.embedding.skipped
    );
    if !report.migration.dropped.is_empty() {
        println!("Dropped indexes:      {}", report.migration.dropped.join(", "));
    }
    println!("Current index:        {}", report.migration.created.name);
    println!("Elapsed:              {} ms", report.elapsed_ms);

    if let Some(results) = &report.verification {
        println!();
        println!("Verification \"{}\":", settings.pipeline.sample_query);
        print!("{}", format_results(results));
    }
    Ok(())
}

/// Assign identifiers only.
pub async fn backfill_ids(settings: &Settings) -> Result<()> {
    let store = connect(settings).await?;
    let assigned = backfill_identifiers(&store, &settings.schema)
        .await
        .context("Identifier backfill failed")?;
    println!("Identifiers assigned: {}", assigned);
    Ok(())
}

/// Embed every record only.
pub async fn embed(settings: &Settings, batch_size: Option<usize>) -> Result<()> {
    let embedder = load_embedder(settings).await?;
    let store = connect(settings).await?;
    let config = pipeline_config(settings, embedder.dimension(), batch_size);

    let progress = backfill_embeddings(&store, &embedder, &config, &LoggingProgressCallback)
        .await
        .context("Embedding backfill failed")?;
    println!(
        "Records embedded: {} into {} ({} pages)",
        progress.records_embedded, config.vector_property, progress.pages
    );
    Ok(())
}

/// Replace the vector index only.
pub async fn migrate(settings: &Settings) -> Result<()> {
    // The index is sized and named by the model dimension.
    let embedder = load_embedder(settings).await?;
    let store = connect(settings).await?;
    let config = pipeline_config(settings, embedder.dimension(), None);

    let outcome = migrate_index(&store, &config)
        .await
        .context("Index migration failed")?;
    for name in &outcome.dropped {
        println!("Dropped index {}", name);
    }
    println!("Created index {}", format_index(&outcome.created));
    Ok(())
}

/// Query an index with free text.
pub async fn search_index(
    settings: &Settings,
    query: &str,
    top_k: Option<usize>,
    index: Option<String>,
) -> Result<()> {
    let embedder = load_embedder(settings).await?;
    let store = connect(settings).await?;
    let index_name = index.unwrap_or_else(|| settings.index.index_name(embedder.dimension()));
    let k = top_k.unwrap_or(settings.pipeline.top_k);

    let results = search(&store, &embedder, &settings.schema, &index_name, query, k)
        .await
        .with_context(|| format!("Search of index {} failed", index_name))?;
    print!("{}", format_results(&results));
    Ok(())
}

/// List vector indexes.
pub async fn list_indexes(settings: &Settings) -> Result<()> {
    let store = connect(settings).await?;
    let indexes = store
        .list_vector_indexes()
        .await
        .context("Failed to list indexes")?;
    if indexes.is_empty() {
        println!("No vector indexes");
    }
    for index in &indexes {
        println!("{}", format_index(index));
    }
    Ok(())
}

/// Render ranked results, one block per hit.
pub fn format_results(results: &[ScoredRecord]) -> String {
    if results.is_empty() {
        return "No results\n".to_string();
    }
    let mut out = String::new();
    for (rank, hit) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} (score {:.4})\n",
            rank + 1,
            hit.title.as_deref().unwrap_or("<untitled>"),
            hit.score
        ));
        if let Some(text) = hit.text.as_deref().filter(|t| !t.is_empty()) {
            out.push_str(&format!("   {}\n", text));
        }
    }
    out
}

fn format_index(index: &IndexDefinition) -> String {
    format!(
        "{} on :{}({}) dim={} metric={}",
        index.name, index.label, index.property, index.dimension, index.metric
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: Option<&str>, text: Option<&str>, score: f64) -> ScoredRecord {
        ScoredRecord {
            identifier: Some("id".to_string()),
            title: title.map(str::to_string),
            text: text.map(str::to_string),
            score,
        }
    }

    #[test]
    fn test_format_no_results() {
        assert_eq!(format_results(&[]), "No results\n");
    }

    #[test]
    fn test_format_results_ranked() {
        let out = format_results(&[
            hit(Some("Toy Story"), Some("toys come alive"), 0.95),
            hit(None, None, 0.5),
        ]);
        assert_eq!(
            out,
            "1. Toy Story (score 0.9500)\n   toys come alive\n2. <untitled> (score 0.5000)\n"
        );
    }

    #[test]
    fn test_format_index() {
        let def = IndexDefinition::new("moviePlots_1024", "Movie", "embedding_1024", 1024);
        assert_eq!(
            format_index(&def),
            "moviePlots_1024 on :Movie(embedding_1024) dim=1024 metric=cosine"
        );
    }

    #[test]
    fn test_pipeline_config_batch_override() {
        let settings = Settings::default();
        assert_eq!(pipeline_config(&settings, 8, None).batch_size, 50);
        assert_eq!(pipeline_config(&settings, 8, Some(2)).batch_size, 2);
        assert_eq!(pipeline_config(&settings, 8, None).index_name, "moviePlots_8");
    }
}
