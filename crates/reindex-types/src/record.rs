//! Record, schema and vector-index types.
//!
//! A record is a graph node carrying a stable identifier, a text field that
//! gets embedded, and one vector property per embedding generation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ReindexError;

/// Check that a label or property name is safe to interpolate into a statement.
///
/// Labels and property keys cannot be passed as statement parameters, so every
/// name that ends up inside query text must be a plain identifier.
pub fn validate_identifier(name: &str) -> Result<(), ReindexError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ReindexError::InvalidIdentifier(name.to_string()))
    }
}

/// Vector property name for an embedding generation, e.g. `embedding_1024`.
pub fn vector_property_for_dimension(dimension: usize) -> String {
    format!("embedding_{}", dimension)
}

/// Index name for an embedding generation, e.g. `moviePlots_1024`.
pub fn index_name_for_dimension(base: &str, dimension: usize) -> String {
    format!("{}_{}", base, dimension)
}

/// Where records live in the graph and which properties the pipeline touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Node label of records (e.g. "Movie")
    #[serde(default = "default_label")]
    pub label: String,

    /// Property holding the stable identifier
    #[serde(default = "default_id_property")]
    pub id_property: String,

    /// Property holding the text to embed
    #[serde(default = "default_text_property")]
    pub text_property: String,

    /// Property shown next to search results
    #[serde(default = "default_title_property")]
    pub title_property: String,
}

fn default_label() -> String {
    "Movie".to_string()
}

fn default_id_property() -> String {
    "uuid".to_string()
}

fn default_text_property() -> String {
    "plot".to_string()
}

fn default_title_property() -> String {
    "title".to_string()
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            label: default_label(),
            id_property: default_id_property(),
            text_property: default_text_property(),
            title_property: default_title_property(),
        }
    }
}

impl RecordSchema {
    /// Validate every name in the schema.
    pub fn validate(&self) -> Result<(), ReindexError> {
        validate_identifier(&self.label)?;
        validate_identifier(&self.id_property)?;
        validate_identifier(&self.text_property)?;
        validate_identifier(&self.title_property)?;
        Ok(())
    }
}

/// Identifier + text projection of a record, as read during pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    /// Stable identifier; `None` only when identifier backfill has not run
    pub identifier: Option<String>,
    /// Source text; `None` when the property is absent or null
    pub text: Option<String>,
}

impl RecordRow {
    pub fn new(identifier: Option<String>, text: Option<String>) -> Self {
        Self { identifier, text }
    }

    /// Text to embed. Missing text embeds as the empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    /// Similarity score, higher is closer
    pub score: f64,
}

/// Similarity function of a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl SimilarityMetric {
    /// Name used in index options.
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a named vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
    pub name: String,
    pub label: String,
    pub property: String,
    pub dimension: usize,
    pub metric: SimilarityMetric,
}

impl IndexDefinition {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        property: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            property: property.into(),
            dimension,
            metric: SimilarityMetric::Cosine,
        }
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Validate names and dimension.
    pub fn validate(&self) -> Result<(), ReindexError> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.label)?;
        validate_identifier(&self.property)?;
        if self.dimension == 0 {
            return Err(ReindexError::InvalidInput(
                "index dimension must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
