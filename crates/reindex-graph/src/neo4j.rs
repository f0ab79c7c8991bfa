//! Neo4j implementation of [`GraphStore`] over Bolt.

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use reindex_types::{
    IndexDefinition, RecordRow, RecordSchema, ReindexError, ScoredRecord, SimilarityMetric,
    StoreSettings,
};

use crate::cypher;
use crate::error::GraphError;
use crate::store::GraphStore;

/// Graph store backed by a Neo4j connection pool.
///
/// The pool is closed when the store is dropped.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Connect and verify the server answers.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, GraphError> {
        info!(uri = %settings.uri, user = %settings.username, "Connecting to Neo4j");

        let mut builder = ConfigBuilder::default()
            .uri(settings.uri.as_str())
            .user(settings.username.as_str())
            .password(settings.password.expose_secret())
            .max_connections(settings.max_connections)
            .fetch_size(settings.fetch_size);
        if let Some(database) = &settings.database {
            builder = builder.db(database.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let store = Self { graph };
        store.ping().await?;
        Ok(store)
    }

    /// Wrap an existing driver handle.
    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    async fn collect(&self, q: Query) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.graph.execute(q).await.map_err(classify)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(classify)? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn single_count(&self, q: Query, column: &str) -> Result<i64, GraphError> {
        let rows = self.collect(q).await?;
        match rows.first() {
            Some(row) => row
                .get::<i64>(column)
                .map_err(|e| GraphError::Decode(format!("{}: {}", column, e))),
            None => Ok(0),
        }
    }
}

/// Map driver errors onto the store taxonomy.
fn classify(err: neo4rs::Error) -> GraphError {
    let message = err.to_string();
    match err {
        neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. } => {
            GraphError::Connection(message)
        }
        _ => GraphError::Query(message),
    }
}

/// Refine a query error when the server reports a schema conflict.
fn classify_index_error(err: GraphError, index: &str) -> GraphError {
    match err {
        GraphError::Query(message) => {
            if message.contains("AlreadyExists") || message.contains("already exists") {
                GraphError::IndexAlreadyExists(index.to_string())
            } else if message.contains("no such vector schema index")
                || message.contains("NoSuchIndex")
            {
                GraphError::IndexNotFound(index.to_string())
            } else {
                GraphError::Query(message)
            }
        }
        other => other,
    }
}

fn parse_metric(raw: Option<String>) -> SimilarityMetric {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("euclidean") => SimilarityMetric::Euclidean,
        _ => SimilarityMetric::Cosine,
    }
}

/// Bolt integers are signed 64-bit.
fn bolt_int(name: &str, value: usize) -> Result<i64, GraphError> {
    i64::try_from(value).map_err(|_| {
        GraphError::InvalidInput(ReindexError::InvalidInput(format!(
            "{} out of range: {}",
            name, value
        )))
    })
}

fn decode<'a, T: serde::Deserialize<'a>>(row: &'a Row, column: &str) -> Result<T, GraphError> {
    row.get::<T>(column)
        .map_err(|e| GraphError::Decode(format!("{}: {}", column, e)))
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn ping(&self) -> Result<(), GraphError> {
        self.collect(query(cypher::PING)).await.map_err(|e| match e {
            GraphError::Query(message) => GraphError::Connection(message),
            other => other,
        })?;
        Ok(())
    }

    async fn assign_missing_identifiers(&self, schema: &RecordSchema) -> Result<u64, GraphError> {
        let stmt = cypher::assign_identifiers(schema)?;
        let assigned = self.single_count(query(&stmt), "assigned").await?;
        Ok(assigned.max(0) as u64)
    }

    async fn fetch_page(
        &self,
        schema: &RecordSchema,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RecordRow>, GraphError> {
        let stmt = cypher::fetch_page(schema)?;
        let q = query(&stmt)
            .param("skip", bolt_int("skip", skip)?)
            .param("limit", bolt_int("limit", limit)?);

        let rows = self.collect(q).await?;
        let mut page = Vec::with_capacity(rows.len());
        for row in &rows {
            let identifier: Option<String> = decode(row, "identifier")?;
            let text: Option<String> = decode(row, "text")?;
            page.push(RecordRow::new(identifier, text));
        }
        debug!(skip, limit, fetched = page.len(), "Fetched page");
        Ok(page)
    }

    async fn write_vector(
        &self,
        schema: &RecordSchema,
        identifier: &str,
        property: &str,
        vector: &[f32],
    ) -> Result<bool, GraphError> {
        let stmt = cypher::write_vector(schema, property)?;
        let values: Vec<f64> = vector.iter().map(|v| f64::from(*v)).collect();
        let q = query(&stmt)
            .param("identifier", identifier)
            .param("vector", values);
        let matched = self.single_count(q, "matched").await?;
        Ok(matched > 0)
    }

    async fn index_exists(&self, name: &str) -> Result<bool, GraphError> {
        let q = query(cypher::INDEX_EXISTS).param("name", name);
        Ok(self.single_count(q, "found").await? > 0)
    }

    async fn list_vector_indexes(&self) -> Result<Vec<IndexDefinition>, GraphError> {
        let rows = self.collect(query(cypher::LIST_VECTOR_INDEXES)).await?;
        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = decode(row, "name")?;
            let labels: Option<Vec<String>> = decode(row, "labelsOrTypes")?;
            let properties: Option<Vec<String>> = decode(row, "properties")?;
            let dimensions: Option<i64> = decode(row, "dimensions")?;
            let similarity: Option<String> = decode(row, "similarity")?;

            let label = labels.and_then(|l| l.into_iter().next()).unwrap_or_default();
            let property = properties
                .and_then(|p| p.into_iter().next())
                .unwrap_or_default();
            indexes.push(
                IndexDefinition::new(name, label, property, dimensions.unwrap_or(0).max(0) as usize)
                    .with_metric(parse_metric(similarity)),
            );
        }
        Ok(indexes)
    }

    async fn drop_index(&self, name: &str) -> Result<bool, GraphError> {
        if !self.index_exists(name).await? {
            return Ok(false);
        }
        let stmt = cypher::drop_index(name)?;
        self.graph.run(query(&stmt)).await.map_err(classify)?;
        info!(index = name, "Dropped index");
        Ok(true)
    }

    async fn create_vector_index(&self, definition: &IndexDefinition) -> Result<(), GraphError> {
        let stmt = cypher::create_vector_index(definition)?;
        self.graph
            .run(query(&stmt))
            .await
            .map_err(|e| classify_index_error(classify(e), &definition.name))?;
        info!(
            index = %definition.name,
            label = %definition.label,
            property = %definition.property,
            dim = definition.dimension,
            metric = %definition.metric,
            "Created vector index"
        );
        Ok(())
    }

    async fn query_nodes(
        &self,
        schema: &RecordSchema,
        index_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRecord>, GraphError> {
        let stmt = cypher::query_nodes(schema)?;
        let values: Vec<f64> = vector.iter().map(|v| f64::from(*v)).collect();
        let q = query(&stmt)
            .param("index", index_name)
            .param("k", bolt_int("k", k)?)
            .param("vector", values);

        let rows = self
            .collect(q)
            .await
            .map_err(|e| classify_index_error(e, index_name))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            results.push(ScoredRecord {
                identifier: decode(row, "identifier")?,
                title: decode(row, "title")?,
                text: decode(row, "text")?,
                score: decode(row, "score")?,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_index_error() {
        let err = classify_index_error(
            GraphError::Query(
                "Neo.ClientError.Schema.EquivalentSchemaRuleAlreadyExists".to_string(),
            ),
            "moviePlots_8",
        );
        assert!(matches!(err, GraphError::IndexAlreadyExists(name) if name == "moviePlots_8"));

        let err = classify_index_error(
            GraphError::Query(
                "Failed to invoke procedure: There is no such vector schema index: moviePlots"
                    .to_string(),
            ),
            "moviePlots",
        );
        assert!(matches!(err, GraphError::IndexNotFound(_)));

        let err = classify_index_error(GraphError::Query("syntax".to_string()), "x");
        assert!(matches!(err, GraphError::Query(_)));
    }

    #[test]
    fn test_bolt_int_rejects_overflow() {
        assert_eq!(bolt_int("limit", 50).unwrap(), 50);

        let err = bolt_int("limit", usize::MAX).unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert!(err.to_string().contains("limit out of range"));
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric(Some("COSINE".to_string())), SimilarityMetric::Cosine);
        assert_eq!(
            parse_metric(Some("EUCLIDEAN".to_string())),
            SimilarityMetric::Euclidean
        );
        assert_eq!(parse_metric(None), SimilarityMetric::Cosine);
    }
}
