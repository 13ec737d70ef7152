//! Error types shared by the pipeline collaborators

use thiserror::Error;

/// Result type alias for collaborator operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Error reported by sinks, producers and database sinks
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The buffering side of the record handoff is gone, or the run was cancelled.
    #[error("record handoff closed")]
    HandoffClosed,
}

impl EtlError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Whether this error only signals that the consumer went away
    pub fn is_handoff_closed(&self) -> bool {
        matches!(self, Self::HandoffClosed)
    }
}
