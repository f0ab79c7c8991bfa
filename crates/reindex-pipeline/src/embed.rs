//! Paginated embedding backfill.
//!
//! Walks every record in identifier order, one page of `batch_size` at a
//! time, embeds its text and overwrites the versioned vector property. Only
//! one page is held in memory. The loop ends on the first empty page.

use tracing::{debug, info, warn};

use reindex_embeddings::EmbeddingModel;
use reindex_graph::GraphStore;
use reindex_types::RecordRow;

use crate::config::ReindexConfig;
use crate::error::PipelineError;

/// Progress of an embedding backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedProgress {
    /// Records whose vector was written
    pub records_embedded: u64,
    /// Records embedded from missing or empty text
    pub empty_text: u64,
    /// Records whose write matched nothing (deleted mid-run)
    pub skipped: u64,
    /// Non-empty pages processed
    pub pages: u64,
    /// Offset of the next page
    pub offset: usize,
    /// Whether the empty terminating page was reached
    pub completed: bool,
}

impl EmbedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records visited so far.
    pub fn processed(&self) -> u64 {
        self.records_embedded + self.skipped
    }
}

/// Trait for receiving progress after each batch.
pub trait ProgressCallback: Send + Sync {
    fn on_batch(&self, progress: &EmbedProgress);
}

/// A no-op progress callback for when progress reporting isn't needed.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_batch(&self, _progress: &EmbedProgress) {}
}

/// A callback that logs progress at info level.
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_batch(&self, progress: &EmbedProgress) {
        info!(
            processed = progress.processed(),
            pages = progress.pages,
            empty_text = progress.empty_text,
            skipped = progress.skipped,
            "Updated {} records",
            progress.processed()
        );
    }
}

/// Embed every record and write its vector.
///
/// A failure on any record aborts the run with [`PipelineError::BatchFailed`];
/// vectors written by earlier batches are kept. Re-running overwrites them.
pub async fn backfill_embeddings<S, E, P>(
    store: &S,
    embedder: &E,
    config: &ReindexConfig,
    progress_callback: &P,
) -> Result<EmbedProgress, PipelineError>
where
    S: GraphStore + ?Sized,
    E: EmbeddingModel + ?Sized,
    P: ProgressCallback + ?Sized,
{
    config.validate()?;
    if embedder.dimension() != config.dimension {
        return Err(PipelineError::DimensionMismatch {
            expected: config.dimension,
            actual: embedder.dimension(),
        });
    }

    info!(
        label = %config.schema.label,
        property = %config.vector_property,
        batch_size = config.batch_size,
        model = %embedder.info().name,
        "Starting embedding backfill..."
    );

    let mut progress = EmbedProgress::new();

    loop {
        let rows = store
            .fetch_page(&config.schema, progress.offset, config.batch_size)
            .await?;
        if rows.is_empty() {
            break;
        }

        let batch = progress.pages + 1;
        let offset = progress.offset;
        if let Err(e) = embed_page(store, embedder, config, offset, &rows, &mut progress).await {
            return Err(PipelineError::BatchFailed {
                batch,
                offset,
                completed: progress.records_embedded,
                source: Box::new(e),
            });
        }

        progress.pages = batch;
        progress.offset += config.batch_size;
        progress_callback.on_batch(&progress);
    }

    progress.completed = true;
    info!(
        embedded = progress.records_embedded,
        pages = progress.pages,
        empty_text = progress.empty_text,
        skipped = progress.skipped,
        "Embedding backfill complete"
    );
    Ok(progress)
}

async fn embed_page<S, E>(
    store: &S,
    embedder: &E,
    config: &ReindexConfig,
    offset: usize,
    rows: &[RecordRow],
    progress: &mut EmbedProgress,
) -> Result<(), PipelineError>
where
    S: GraphStore + ?Sized,
    E: EmbeddingModel + ?Sized,
{
    for (i, row) in rows.iter().enumerate() {
        let identifier = row
            .identifier
            .as_deref()
            .ok_or(PipelineError::MissingIdentifier { offset: offset + i })?;

        let text = row.text_or_empty();
        if text.is_empty() {
            progress.empty_text += 1;
        }

        let embedding = embedder.embed(text)?;
        if embedding.dimension() != config.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: config.dimension,
                actual: embedding.dimension(),
            });
        }

        let matched = store
            .write_vector(
                &config.schema,
                identifier,
                &config.vector_property,
                &embedding.values,
            )
            .await?;

        if matched {
            progress.records_embedded += 1;
            debug!(identifier, "Wrote vector");
        } else {
            progress.skipped += 1;
            warn!(identifier, "Record vanished before its vector was written");
        }
    }
    Ok(())
}
