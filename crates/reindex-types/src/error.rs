//! Error types shared across the reindex workspace.

use thiserror::Error;

/// Errors raised while building or validating shared types.
#[derive(Debug, Error)]
pub enum ReindexError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A label or property name that cannot be placed in a statement
    #[error("Invalid identifier {0:?}: expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
