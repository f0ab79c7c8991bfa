//! In-process [`GraphStore`] for tests and dry runs.
//!
//! Mirrors the behaviour the pipeline relies on from Neo4j: null identifiers
//! sort last, index names are unique, querying a missing index fails, and
//! cosine scores are reported on Neo4j's `(1 + cos) / 2` scale.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use reindex_types::{IndexDefinition, RecordRow, RecordSchema, ScoredRecord, SimilarityMetric};

use crate::error::GraphError;
use crate::store::GraphStore;

/// A property value held by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Vector(Vec<f32>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            PropertyValue::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            PropertyValue::Vector(v) => Some(v),
            PropertyValue::Text(_) => None,
        }
    }
}

/// A node: labels plus properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub labels: BTreeSet<String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_text)
    }

    pub fn vector(&self, key: &str) -> Option<&[f32]> {
        self.properties.get(key).and_then(PropertyValue::as_vector)
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Vec<Node>,
    indexes: BTreeMap<String, IndexDefinition>,
    unreachable: bool,
    failing_writes: HashSet<String>,
}

/// Graph store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, GraphError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| GraphError::Query(format!("Store lock error: {}", e)))?;
        if inner.unreachable {
            return Err(GraphError::Connection("store unreachable".to_string()));
        }
        Ok(inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, GraphError> {
        let inner = self
            .inner
            .write()
            .map_err(|e| GraphError::Query(format!("Store lock error: {}", e)))?;
        if inner.unreachable {
            return Err(GraphError::Connection("store unreachable".to_string()));
        }
        Ok(inner)
    }

    fn inner_mut(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a node and return its position.
    pub fn insert_node(
        &self,
        label: &str,
        properties: impl IntoIterator<Item = (String, PropertyValue)>,
    ) -> usize {
        let mut inner = self.inner_mut();
        let mut node = Node::default();
        node.labels.insert(label.to_string());
        node.properties.extend(properties);
        inner.nodes.push(node);
        inner.nodes.len() - 1
    }

    /// Insert a record with optional title and text under `schema`.
    pub fn insert_record(
        &self,
        schema: &RecordSchema,
        title: Option<&str>,
        text: Option<&str>,
    ) -> usize {
        let mut properties = Vec::new();
        if let Some(title) = title {
            properties.push((
                schema.title_property.clone(),
                PropertyValue::Text(title.to_string()),
            ));
        }
        if let Some(text) = text {
            properties.push((
                schema.text_property.clone(),
                PropertyValue::Text(text.to_string()),
            ));
        }
        self.insert_node(&schema.label, properties)
    }

    /// Snapshot of all nodes.
    pub fn nodes(&self) -> Vec<Node> {
        self.inner_mut().nodes.clone()
    }

    /// Snapshot of one node.
    pub fn node(&self, position: usize) -> Option<Node> {
        self.inner_mut().nodes.get(position).cloned()
    }

    /// Names of all indexes.
    pub fn index_names(&self) -> Vec<String> {
        self.inner_mut().indexes.keys().cloned().collect()
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner_mut().unreachable = unreachable;
    }

    /// Make vector writes to `identifier` fail.
    pub fn fail_writes_for(&self, identifier: impl Into<String>) {
        self.inner_mut().failing_writes.insert(identifier.into());
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let na: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn similarity(metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f64 {
    match metric {
        SimilarityMetric::Cosine => (1.0 + cosine(a, b)) / 2.0,
        SimilarityMetric::Euclidean => {
            let d2: f64 = a
                .iter()
                .zip(b)
                .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
                .sum();
            1.0 / (1.0 + d2)
        }
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn ping(&self) -> Result<(), GraphError> {
        self.read().map(|_| ())
    }

    async fn assign_missing_identifiers(&self, schema: &RecordSchema) -> Result<u64, GraphError> {
        let mut inner = self.write()?;
        let mut assigned = 0;
        for node in inner.nodes.iter_mut() {
            if node.has_label(&schema.label) && !node.properties.contains_key(&schema.id_property)
            {
                node.properties.insert(
                    schema.id_property.clone(),
                    PropertyValue::Text(uuid::Uuid::new_v4().to_string()),
                );
                assigned += 1;
            }
        }
        Ok(assigned)
    }

    async fn fetch_page(
        &self,
        schema: &RecordSchema,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RecordRow>, GraphError> {
        let inner = self.read()?;
        let mut rows: Vec<RecordRow> = inner
            .nodes
            .iter()
            .filter(|n| n.has_label(&schema.label))
            .map(|n| {
                RecordRow::new(
                    n.text(&schema.id_property).map(str::to_string),
                    n.text(&schema.text_property).map(str::to_string),
                )
            })
            .collect();

        // Ascending, nulls last.
        rows.sort_by(|a, b| match (&a.identifier, &b.identifier) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let page: Vec<RecordRow> = rows.into_iter().skip(skip).take(limit).collect();
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
        let mut inner = self.write()?;
        if inner.failing_writes.contains(identifier) {
            return Err(GraphError::Query(format!(
                "write rejected for {}",
                identifier
            )));
        }

        let mut matched = false;
        for node in inner.nodes.iter_mut() {
            if node.has_label(&schema.label) && node.text(&schema.id_property) == Some(identifier)
            {
                node.properties
                    .insert(property.to_string(), PropertyValue::Vector(vector.to_vec()));
                matched = true;
            }
        }
        Ok(matched)
    }

    async fn index_exists(&self, name: &str) -> Result<bool, GraphError> {
        Ok(self.read()?.indexes.contains_key(name))
    }

    async fn list_vector_indexes(&self) -> Result<Vec<IndexDefinition>, GraphError> {
        Ok(self.read()?.indexes.values().cloned().collect())
    }

    async fn drop_index(&self, name: &str) -> Result<bool, GraphError> {
        Ok(self.write()?.indexes.remove(name).is_some())
    }

    async fn create_vector_index(&self, definition: &IndexDefinition) -> Result<(), GraphError> {
        definition.validate()?;
        let mut inner = self.write()?;
        if inner.indexes.contains_key(&definition.name) {
            return Err(GraphError::IndexAlreadyExists(definition.name.clone()));
        }
        inner
            .indexes
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    async fn query_nodes(
        &self,
        schema: &RecordSchema,
        index_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRecord>, GraphError> {
        let inner = self.read()?;
        let index = inner
            .indexes
            .get(index_name)
            .ok_or_else(|| GraphError::IndexNotFound(index_name.to_string()))?;

        if vector.len() != index.dimension {
            return Err(GraphError::DimensionMismatch {
                index: index_name.to_string(),
                expected: index.dimension,
                actual: vector.len(),
            });
        }

        let mut results: Vec<ScoredRecord> = inner
            .nodes
            .iter()
            .filter(|n| n.has_label(&index.label))
            .filter_map(|n| {
                let stored = n.vector(&index.property)?;
                if stored.len() != index.dimension {
                    return None;
                }
                Some(ScoredRecord {
                    identifier: n.text(&schema.id_property).map(str::to_string),
                    title: n.text(&schema.title_property).map(str::to_string),
                    text: n.text(&schema.text_property).map(str::to_string),
                    score: similarity(index.metric, vector, stored),
                })
            })
            .collect();

        // Stable sort keeps insertion order among ties.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }
}
