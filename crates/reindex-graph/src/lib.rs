//! # reindex-graph
//!
//! Graph store access for the movie reindexing pipeline.
//!
//! - [`GraphStore`]: the operations the pipeline needs (identifier
//!   assignment, paginated reads, vector writes, vector index lifecycle,
//!   nearest-neighbour queries)
//! - [`Neo4jGraphStore`]: Neo4j over Bolt via `neo4rs`
//! - [`InMemoryGraphStore`]: in-process store with the same semantics, for
//!   tests and dry runs

pub mod cypher;
pub mod error;
pub mod memory;
pub mod neo4j;
pub mod store;

pub use error::GraphError;
pub use memory::{InMemoryGraphStore, Node, PropertyValue};
pub use neo4j::Neo4jGraphStore;
pub use store::GraphStore;
