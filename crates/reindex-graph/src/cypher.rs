//! Cypher statements issued by [`Neo4jGraphStore`](crate::Neo4jGraphStore).
//!
//! Labels, property keys and index names cannot be parameters, so they are
//! validated and backtick-quoted before interpolation. Values always travel
//! as parameters.

use reindex_types::{validate_identifier, IndexDefinition, RecordSchema, ReindexError};

/// Quote a validated identifier for interpolation.
pub fn quote(name: &str) -> Result<String, ReindexError> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name))
}

pub const PING: &str = "RETURN 1 AS ok";

/// Bulk conditional identifier assignment.
pub fn assign_identifiers(schema: &RecordSchema) -> Result<String, ReindexError> {
    let label = quote(&schema.label)?;
    let id = quote(&schema.id_property)?;
    Ok(format!(
        "MATCH (n:{label}) WHERE n.{id} IS NULL \
         SET n.{id} = randomUUID() \
         RETURN count(n) AS assigned"
    ))
}

/// Paginated projection; takes `$skip` and `$limit`.
pub fn fetch_page(schema: &RecordSchema) -> Result<String, ReindexError> {
    let label = quote(&schema.label)?;
    let id = quote(&schema.id_property)?;
    let text = quote(&schema.text_property)?;
    Ok(format!(
        "MATCH (n:{label}) \
         RETURN n.{id} AS identifier, n.{text} AS text \
         ORDER BY n.{id} SKIP $skip LIMIT $limit"
    ))
}

/// Exact-match vector write; takes `$identifier` and `$vector`.
pub fn write_vector(schema: &RecordSchema, property: &str) -> Result<String, ReindexError> {
    let label = quote(&schema.label)?;
    let id = quote(&schema.id_property)?;
    let property = quote(property)?;
    Ok(format!(
        "MATCH (n:{label}) WHERE n.{id} = $identifier \
         SET n.{property} = $vector \
         RETURN count(n) AS matched"
    ))
}

/// Index existence check; takes `$name`.
pub const INDEX_EXISTS: &str = "SHOW INDEXES YIELD name WHERE name = $name RETURN count(*) AS found";

pub const LIST_VECTOR_INDEXES: &str = "SHOW INDEXES \
     YIELD name, type, labelsOrTypes, properties, options \
     WHERE type = 'VECTOR' \
     RETURN name, labelsOrTypes, properties, \
     options.indexConfig['vector.dimensions'] AS dimensions, \
     options.indexConfig['vector.similarity_function'] AS similarity \
     ORDER BY name";

pub fn drop_index(name: &str) -> Result<String, ReindexError> {
    Ok(format!("DROP INDEX {} IF EXISTS", quote(name)?))
}

/// Vector index creation, without `IF NOT EXISTS`: a taken name fails.
pub fn create_vector_index(definition: &IndexDefinition) -> Result<String, ReindexError> {
    definition.validate()?;
    let name = quote(&definition.name)?;
    let label = quote(&definition.label)?;
    let property = quote(&definition.property)?;
    Ok(format!(
        "CREATE VECTOR INDEX {name} FOR (n:{label}) ON (n.{property}) \
         OPTIONS {{indexConfig: {{`vector.dimensions`: {dim}, `vector.similarity_function`: '{metric}'}}}}",
        dim = definition.dimension,
        metric = definition.metric.as_str(),
    ))
}

/// Nearest-neighbour query; takes `$index`, `$k` and `$vector`.
pub fn query_nodes(schema: &RecordSchema) -> Result<String, ReindexError> {
    let id = quote(&schema.id_property)?;
    let title = quote(&schema.title_property)?;
    let text = quote(&schema.text_property)?;
    Ok(format!(
        "CALL db.index.vector.queryNodes($index, $k, $vector) YIELD node, score \
         RETURN node.{id} AS identifier, node.{title} AS title, node.{text} AS text, score \
         ORDER BY score DESC"
    ))
}
