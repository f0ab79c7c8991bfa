//! Pipeline configuration.

use reindex_types::{
    index_name_for_dimension, validate_identifier, vector_property_for_dimension, IndexDefinition,
    RecordSchema, ReindexError, Settings, SimilarityMetric,
};

/// Default number of records per page.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default number of verification results.
pub const DEFAULT_TOP_K: usize = 5;

/// Default verification query.
pub const DEFAULT_SAMPLE_QUERY: &str = "Toys coming alive";

/// Default base name of vector indexes; also the pre-generation index name.
pub const DEFAULT_INDEX_BASE: &str = "moviePlots";

/// Everything one reindex run needs to know.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    /// Where records live
    pub schema: RecordSchema,
    /// Property the vectors are written to
    pub vector_property: String,
    /// Name of the index created by migration
    pub index_name: String,
    /// Earlier indexes dropped by migration
    pub legacy_index_names: Vec<String>,
    /// Embedding dimension
    pub dimension: usize,
    pub metric: SimilarityMetric,
    /// Records per page
    pub batch_size: usize,
    /// Text embedded for the verification query
    pub sample_query: String,
    /// Results returned by the verification query
    pub top_k: usize,
}

impl ReindexConfig {
    /// Defaults for an embedder of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            schema: RecordSchema::default(),
            vector_property: vector_property_for_dimension(dimension),
            index_name: index_name_for_dimension(DEFAULT_INDEX_BASE, dimension),
            legacy_index_names: vec![DEFAULT_INDEX_BASE.to_string()],
            dimension,
            metric: SimilarityMetric::Cosine,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_query: DEFAULT_SAMPLE_QUERY.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Build from loaded settings for an embedder of the given dimension.
    pub fn from_settings(settings: &Settings, dimension: usize) -> Self {
        Self {
            schema: settings.schema.clone(),
            vector_property: settings.index.vector_property(dimension),
            index_name: settings.index.index_name(dimension),
            legacy_index_names: settings.index.legacy_names.clone(),
            dimension,
            metric: SimilarityMetric::Cosine,
            batch_size: settings.pipeline.batch_size,
            sample_query: settings.pipeline.sample_query.clone(),
            top_k: settings.pipeline.top_k,
        }
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    pub fn with_legacy_index_names(mut self, names: Vec<String>) -> Self {
        self.legacy_index_names = names;
        self
    }

    pub fn with_vector_property(mut self, property: impl Into<String>) -> Self {
        self.vector_property = property.into();
        self
    }

    pub fn with_sample_query(mut self, query: impl Into<String>) -> Self {
        self.sample_query = query.into();
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// The index migration creates.
    pub fn index_definition(&self) -> IndexDefinition {
        IndexDefinition::new(
            self.index_name.clone(),
            self.schema.label.clone(),
            self.vector_property.clone(),
            self.dimension,
        )
        .with_metric(self.metric)
    }

    /// Validate names and sizes.
    pub fn validate(&self) -> Result<(), ReindexError> {
        self.schema.validate()?;
        self.index_definition().validate()?;
        for name in &self.legacy_index_names {
            validate_identifier(name)?;
        }
        if self.batch_size == 0 {
            return Err(ReindexError::Config("batch_size must be > 0".to_string()));
        }
        if self.top_k == 0 {
            return Err(ReindexError::Config("top_k must be > 0".to_string()));
        }
        Ok(())
    }
}
