//! Vector index migration.
//!
//! Drops the legacy index and any same-named target index, then creates the
//! target index over the current vector property. The drop and the create
//! are separate statements: an interruption between them leaves no index
//! until the next run.

use tracing::info;

use reindex_graph::GraphStore;
use reindex_types::IndexDefinition;

use crate::config::ReindexConfig;
use crate::error::PipelineError;

/// What a migration changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Indexes that existed and were dropped
    pub dropped: Vec<String>,
    /// The index now current
    pub created: IndexDefinition,
}

/// Replace the current vector index.
pub async fn migrate_index<S>(
    store: &S,
    config: &ReindexConfig,
) -> Result<MigrationOutcome, PipelineError>
where
    S: GraphStore + ?Sized,
{
    config.validate()?;
    let definition = config.index_definition();

    // Legacy names first, then the target itself; creation fails on a taken name.
    let mut candidates: Vec<&str> = Vec::new();
    for name in config
        .legacy_index_names
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(definition.name.as_str()))
    {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }

    let mut dropped = Vec::new();
    for name in candidates {
        if store.index_exists(name).await? && store.drop_index(name).await? {
            info!(index = name, "Dropped existing index");
            dropped.push(name.to_string());
        }
    }

    store.create_vector_index(&definition).await?;
    info!(
        index = %definition.name,
        property = %definition.property,
        dim = definition.dimension,
        dropped = dropped.len(),
        "Index migration complete"
    );

    Ok(MigrationOutcome {
        dropped,
        created: definition,
    })
}
