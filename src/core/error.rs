//! Error types for swarm construction and snapshot handling.

use thiserror::Error;

/// Result type for swarm operations
pub type SwarmResult<T> = Result<T, SwarmError>;

/// Swarm error types
#[derive(Debug, Error)]
pub enum SwarmError {
    /// Role split or algorithm parameters cannot produce a valid population
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// A snapshot is internally inconsistent or does not fit this swarm
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SwarmError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SwarmError::Configuration(msg.into())
    }
}
