//! Identifier backfill.

use tracing::info;

use reindex_graph::GraphStore;
use reindex_types::RecordSchema;

use crate::error::PipelineError;

/// Assign a UUID to every record that lacks one.
///
/// One bulk conditional statement; records that already have an identifier
/// are filtered out, so a second run assigns nothing.
pub async fn backfill_identifiers<S>(
    store: &S,
    schema: &RecordSchema,
) -> Result<u64, PipelineError>
where
    S: GraphStore + ?Sized,
{
    schema.validate()?;

    let assigned = store.assign_missing_identifiers(schema).await?;
    info!(
        label = %schema.label,
        property = %schema.id_property,
        assigned,
        "Identifier backfill complete"
    );
    Ok(assigned)
}
