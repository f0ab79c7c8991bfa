//! The full reindex run.
//!
//! Stages run in a fixed order: connectivity check, identifier backfill,
//! embedding backfill, index migration and an optional verification query.
//! Each stage is idempotent, so a failed run is recovered by running again.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use reindex_embeddings::EmbeddingModel;
use reindex_graph::GraphStore;
use reindex_types::ScoredRecord;

use crate::backfill::backfill_identifiers;
use crate::config::ReindexConfig;
use crate::embed::{backfill_embeddings, EmbedProgress, ProgressCallback};
use crate::error::PipelineError;
use crate::migration::{migrate_index, MigrationOutcome};
use crate::verify::verify;

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub identifiers_assigned: u64,
    pub embedding: EmbedProgress,
    pub migration: MigrationOutcome,
    /// `None` when verification was skipped
    pub verification: Option<Vec<ScoredRecord>>,
    pub elapsed_ms: u64,
}

/// Runs every stage against one store with one embedder.
pub struct ReindexPipeline<'a, S: ?Sized, E: ?Sized> {
    store: &'a S,
    embedder: &'a E,
    config: ReindexConfig,
    verify: bool,
}

impl<'a, S, E> ReindexPipeline<'a, S, E>
where
    S: GraphStore + ?Sized,
    E: EmbeddingModel + ?Sized,
{
    pub fn new(store: &'a S, embedder: &'a E, config: ReindexConfig) -> Self {
        Self {
            store,
            embedder,
            config,
            verify: true,
        }
    }

    /// Enable or disable the verification query.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Run all stages.
    pub async fn run<P>(&self, progress: &P) -> Result<PipelineReport, PipelineError>
    where
        P: ProgressCallback + ?Sized,
    {
        let started_at = Utc::now();
        let start = Instant::now();
        self.config.validate()?;

        info!(
            index = %self.config.index_name,
            property = %self.config.vector_property,
            dim = self.config.dimension,
            "Starting reindex"
        );

        let result = self.run_stages(progress).await;
        let (identifiers_assigned, embedding, migration, verification) = match result {
            Ok(stages) => stages,
            Err(e) => {
                error!(error = %e, "Reindex failed");
                return Err(e);
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            identifiers_assigned,
            embedded = embedding.records_embedded,
            index = %migration.created.name,
            elapsed_ms,
            "Reindex complete"
        );

        Ok(PipelineReport {
            started_at,
            identifiers_assigned,
            embedding,
            migration,
            verification,
            elapsed_ms,
        })
    }

    async fn run_stages<P>(
        &self,
        progress: &P,
    ) -> Result<(u64, EmbedProgress, MigrationOutcome, Option<Vec<ScoredRecord>>), PipelineError>
    where
        P: ProgressCallback + ?Sized,
    {
        self.store.ping().await?;

        let assigned = backfill_identifiers(self.store, &self.config.schema).await?;
        let embedding =
            backfill_embeddings(self.store, self.embedder, &self.config, progress).await?;
        let migration = migrate_index(self.store, &self.config).await?;
        let verification = if self.verify {
            Some(verify(self.store, self.embedder, &self.config).await?)
        } else {
            None
        };

        Ok((assigned, embedding, migration, verification))
    }
}
